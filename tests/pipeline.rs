//! End-to-end pipeline tests: import -> train -> score through the CLI,
//! plus invalid-input rejection at the ingestion boundary.

use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Steady regions plus one region with a 10x spike in its final period.
fn surveillance_fixture() -> Value {
    let mut rows = Vec::new();
    for (i, region) in ["BRA", "COL", "MEX", "PER"].iter().enumerate() {
        for period in 2000..2012 {
            // incidence ~10/100k with mild wobble
            let cases = 95 + ((period as usize + i) % 5) * 4;
            rows.push(json!({
                "region": region,
                "period": period,
                "cases": cases,
                "population": 1_000_000
            }));
        }
    }
    for period in 2000..2011 {
        rows.push(json!({
            "region": "VEN", "period": period, "cases": 100, "population": 1_000_000
        }));
    }
    rows.push(json!({
        "region": "VEN", "period": 2011, "cases": 1000, "population": 1_000_000
    }));
    Value::Array(rows)
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_str().unwrap().to_string()
    }

    fn write_input(&self, value: &Value) -> String {
        let path = self.path("input.json");
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }
}

fn episcope() -> Command {
    Command::cargo_bin("episcope").unwrap()
}

#[test]
fn test_import_train_score_end_to_end() {
    let ws = Workspace::new();
    let input = ws.write_input(&surveillance_fixture());
    let db = ws.path("episcope.db");
    let model = ws.path("model.json");

    episcope()
        .args(["--db", &db, "import", &input])
        .assert()
        .success();

    episcope()
        .args(["--db", &db, "train", "--model-out", &model])
        .assert()
        .success()
        .stdout(predicates::str::contains("Trained on"));

    let output = episcope()
        .args(["--db", &db, "score", "--model", &model, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let outcomes: Vec<Value> = serde_json::from_slice(&output).unwrap();

    // Spike period must out-score every prior VEN period and exceed Low
    let ven: Vec<&Value> = outcomes
        .iter()
        .filter(|o| o["region"] == "VEN" && o["status"] == "scored")
        .collect();
    let spike = ven.iter().find(|o| o["period"] == 2011).unwrap();
    let spike_risk = spike["risk_score"].as_f64().unwrap();
    for prior in ven.iter().filter(|o| o["period"] != 2011) {
        assert!(
            spike_risk > prior["risk_score"].as_f64().unwrap(),
            "spike risk {spike_risk} not above {prior}"
        );
    }
    assert_ne!(spike["alert_level"], "Low");

    // Warm-up periods are explicit not-scorable markers, never numbers
    let warmup = outcomes
        .iter()
        .find(|o| o["region"] == "BRA" && o["period"] == 2000)
        .unwrap();
    assert_eq!(warmup["status"], "not_scorable");
    assert!(warmup["reason"]
        .as_str()
        .unwrap()
        .contains("insufficient history"));
}

#[test]
fn test_scoring_twice_is_deterministic() {
    let ws = Workspace::new();
    let input = ws.write_input(&surveillance_fixture());
    let db = ws.path("episcope.db");
    let model = ws.path("model.json");

    episcope().args(["--db", &db, "import", &input]).assert().success();
    episcope()
        .args(["--db", &db, "train", "--model-out", &model])
        .assert()
        .success();

    let run = || {
        let out = episcope()
            .args(["--db", &db, "score", "--model", &model, "--json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8(out).unwrap()
    };
    // Same artifact, same corpus: identical output both times
    assert_eq!(run(), run());
}

#[test]
fn test_negative_cases_rejected_on_import() {
    let ws = Workspace::new();
    let input = ws.write_input(&json!([
        { "region": "BRA", "period": 2019, "cases": -5, "population": 1_000_000 }
    ]));
    let db = ws.path("episcope.db");

    episcope()
        .args(["--db", &db, "import", &input])
        .assert()
        .failure()
        .stderr(predicates::str::contains("invalid record"));
}

#[test]
fn test_zero_population_rejected_on_import() {
    let ws = Workspace::new();
    let input = ws.write_input(&json!([
        { "region": "BRA", "period": 2019, "cases": 5, "population": 0 }
    ]));
    let db = ws.path("episcope.db");

    episcope()
        .args(["--db", &db, "import", &input])
        .assert()
        .failure()
        .stderr(predicates::str::contains("population"));
}

#[test]
fn test_training_small_corpus_fails_cleanly() {
    let ws = Workspace::new();
    let input = ws.write_input(&json!([
        { "region": "BRA", "period": 2019, "cases": 5, "population": 1_000_000 },
        { "region": "BRA", "period": 2020, "cases": 6, "population": 1_000_000 }
    ]));
    let db = ws.path("episcope.db");
    let model = ws.path("model.json");

    episcope().args(["--db", &db, "import", &input]).assert().success();
    episcope()
        .args(["--db", &db, "train", "--model-out", &model])
        .assert()
        .failure()
        .stderr(predicates::str::contains("insufficient training data"));

    // A failed run must not leave an artifact behind
    assert!(!std::path::Path::new(&model).exists());
}

#[test]
fn test_invalid_threshold_config_rejected() {
    let ws = Workspace::new();
    let input = ws.write_input(&surveillance_fixture());
    let db = ws.path("episcope.db");
    let model = ws.path("model.json");

    // Cut points with a hole at the top of the scale
    let config_path = ws.path("episcope.toml");
    std::fs::write(
        &config_path,
        r#"
[[alert_cut_points]]
level = "Low"
upper = 40.0

[[alert_cut_points]]
level = "Moderate"
upper = 65.0
"#,
    )
    .unwrap();

    episcope().args(["--db", &db, "import", &input]).assert().success();
    episcope()
        .args(["--db", &db, "train", "--model-out", &model])
        .assert()
        .success();

    episcope()
        .args([
            "--db", &db, "--config", &config_path, "score", "--model", &model, "--json",
        ])
        .assert()
        .failure()
        .stderr(predicates::str::contains("invalid threshold config"));
}
