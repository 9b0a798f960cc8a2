use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use episcope::config::RiskConfig;
use episcope::features::case_record_from_raw;
use episcope::model::{CaseRecord, ScoreOutcome};
use episcope::risk::engine::{group_by_region, score_all, train_model};
use episcope::risk::AlertThresholds;
use episcope::storage;
use serde::Deserialize;

#[derive(Parser)]
#[command(
    name = "episcope",
    about = "Outbreak risk scoring for mosquito-borne disease surveillance",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the surveillance database
    #[arg(long, global = true, default_value = "data/episcope.db")]
    db: String,

    /// Optional TOML config file; unset keys use defaults
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import surveillance records from a JSON file
    Import {
        /// JSON file: array of {region, period, cases, population}
        input: String,
    },

    /// Train the anomaly model on the stored corpus and write the artifact
    Train {
        /// Output path for the model artifact
        #[arg(long, default_value = "data/model.json")]
        model_out: String,
    },

    /// Score all regions against a trained model
    Score {
        /// Path to the trained model artifact
        #[arg(long, default_value = "data/model.json")]
        model: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,

        /// Only print assessments at or above this risk
        #[arg(long, default_value = "0")]
        min_risk: f64,
    },

    /// Start the daemon (scoring API over a loaded model)
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// Path to the trained model artifact
        #[arg(long, default_value = "data/model.json")]
        model: String,
    },
}

/// Raw ingestion row. Signed on purpose: upstream feeds can carry
/// negative garbage and it must be rejected, not wrapped.
#[derive(Debug, Deserialize)]
struct RawRow {
    region: String,
    period: i64,
    cases: i64,
    population: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        // keep stdout clean for --json output
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RiskConfig::load(path)?,
        None => RiskConfig::default(),
    };

    match cli.command {
        Commands::Import { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {input}"))?;
            let rows: Vec<RawRow> =
                serde_json::from_str(&raw).with_context(|| format!("parsing {input}"))?;

            let mut records: Vec<CaseRecord> = Vec::with_capacity(rows.len());
            for row in &rows {
                records.push(case_record_from_raw(
                    &row.region,
                    row.period,
                    row.cases,
                    row.population,
                )?);
            }

            let pool = storage::open_pool(&cli.db)?;
            let count = storage::upsert_case_records(&pool, &records)?;
            tracing::info!(count, db = %cli.db, "Import complete");
        }

        Commands::Train { model_out } => {
            let pool = storage::open_pool(&cli.db)?;
            let records = storage::load_case_records(&pool)?;
            let corpus = group_by_region(records);

            let trained = train_model(&corpus, &config)?;
            // Only a successful run may replace a deployed artifact
            storage::artifact::save_model(&model_out, &trained)?;
            println!(
                "Trained on {} rows ({} trees, seed {}) -> {}",
                trained.training_rows,
                trained.forest.tree_count(),
                trained.seed,
                model_out
            );
        }

        Commands::Score {
            model,
            json,
            min_risk,
        } => {
            let pool = storage::open_pool(&cli.db)?;
            let trained = storage::artifact::load_model(&model)?;
            let thresholds = AlertThresholds::new(config.alert_cut_points.clone())
                .context("validating alert cut points")?;

            let records = storage::load_case_records(&pool)?;
            let corpus = group_by_region(records);
            let outcomes = score_all(&trained, &thresholds, &corpus)?;

            let assessments: Vec<_> = outcomes
                .iter()
                .filter_map(|o| o.assessment().cloned())
                .collect();
            storage::save_assessments(&pool, &assessments)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                println!("{:<8} | {:<6} | {:>6} | {:<9} | Recommendation", "Region", "Period", "Risk", "Level");
                println!("{:-<8}-|-{:-<6}-|-{:-<6}-|-{:-<9}-|-{:-<30}", "", "", "", "", "");
                for outcome in &outcomes {
                    match outcome {
                        ScoreOutcome::Scored(a) if a.risk_score >= min_risk => {
                            println!(
                                "{:<8} | {:<6} | {:>6.1} | {:<9} | {}",
                                a.region,
                                a.period,
                                a.risk_score,
                                a.alert_level.as_str(),
                                a.alert_level.recommendation_text()
                            );
                        }
                        ScoreOutcome::Scored(_) => {}
                        ScoreOutcome::NotScorable { region, period, reason } => {
                            println!("{:<8} | {:<6} | {:>6} | {:<9} | {}", region, period, "-", "-", reason);
                        }
                    }
                }
            }
        }

        Commands::Serve { bind, model } => {
            tracing::info!(%bind, "Starting episcope daemon");
            episcope::serve(&bind, &cli.db, &model, &config).await?;
        }
    }

    Ok(())
}
