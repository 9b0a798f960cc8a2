use crate::forest::FEATURE_COUNT;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Euler-Mascheroni constant, for the harmonic-number approximation.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected path length of an unsuccessful BST search over n points:
/// `c(n) = 2·H(n−1) − 2(n−1)/n`. Normalizes isolation depths so scores
/// are comparable across subsample sizes.
pub(crate) fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            let harmonic = (n - 1.0).ln() + EULER_GAMMA;
            2.0 * harmonic - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Unsplit remainder; `size` credits the expected depth of the
    /// points that ended up here.
    Leaf { size: usize },
}

/// One randomized partitioning tree of the ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    /// Grow a tree from a random subsample of `rows`.
    pub(crate) fn grow(
        rows: &[[f64; FEATURE_COUNT]],
        sample_size: usize,
        rng: &mut StdRng,
    ) -> Self {
        let picked: Vec<[f64; FEATURE_COUNT]> = sample(rng, rows.len(), sample_size)
            .iter()
            .map(|i| rows[i])
            .collect();

        // Standard height cap: isolation beyond log2(n) carries no signal
        let height_limit = (sample_size as f64).log2().ceil().max(1.0) as usize;
        let root = build(picked, 0, height_limit, rng);
        Self { root }
    }

    /// Isolation depth of a point, with the leaf-size depth credit.
    pub(crate) fn path_length(&self, point: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] < *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

fn build(
    rows: Vec<[f64; FEATURE_COUNT]>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if rows.len() <= 1 || depth >= height_limit {
        return Node::Leaf { size: rows.len() };
    }

    // Features with any spread left in this partition
    let mut candidates = [false; FEATURE_COUNT];
    let mut any = false;
    for f in 0..FEATURE_COUNT {
        let (min, max) = min_max(&rows, f);
        if max > min {
            candidates[f] = true;
            any = true;
        }
    }
    if !any {
        // All points identical; nothing left to isolate
        return Node::Leaf { size: rows.len() };
    }

    let feature = loop {
        let f = rng.gen_range(0..FEATURE_COUNT);
        if candidates[f] {
            break f;
        }
    };
    let (min, max) = min_max(&rows, feature);
    let threshold = rng.gen_range(min..max);

    let (left_rows, right_rows): (Vec<_>, Vec<_>) =
        rows.into_iter().partition(|r| r[feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build(left_rows, depth + 1, height_limit, rng)),
        right: Box::new(build(right_rows, depth + 1, height_limit, rng)),
    }
}

fn min_max(rows: &[[f64; FEATURE_COUNT]], feature: usize) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for r in rows {
        let v = r[feature];
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    (min, max)
}
