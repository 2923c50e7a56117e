//! dwh-etl CLI - load S3 event and song data into the Redshift star schema.

use clap::{Parser, Subcommand};
use dwh_etl::{transform, Config, EtlError, Orchestrator, UserConflictPolicy};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dwh-etl")]
#[command(about = "Load S3 event and song data into a Redshift star schema")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "dwh.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the staging tables and populate the star schema
    Run {
        /// Dry run: validate configuration and print the statements without connecting
        #[arg(long)]
        dry_run: bool,
    },

    /// Drop and recreate all tables
    CreateTables,

    /// Report row counts for every table
    Validate,

    /// Test the warehouse connection
    HealthCheck,

    /// Evaluate the transformation rules over local JSON samples
    Preview {
        /// Event log file or directory (newline-delimited JSON)
        #[arg(long)]
        events: PathBuf,

        /// Song metadata file or directory
        #[arg(long)]
        songs: PathBuf,

        /// User conflict policy: all_distinct or latest_by_timestamp
        #[arg(long, default_value = "all_distinct")]
        user_conflict_policy: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), EtlError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    // Preview works on local files only and needs no configuration.
    if let Commands::Preview {
        events,
        songs,
        user_conflict_policy,
    } = &cli.command
    {
        let policy = UserConflictPolicy::parse(user_conflict_policy)?;
        let summary = transform::preview(events, songs, policy)?;

        if cli.output_json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("Preview ({} policy):", policy.as_str());
            println!("  Events: {} ({} song plays)", summary.events, summary.song_plays);
            println!("  Staged songs: {}", summary.staged_songs);
            println!("  songplays: {}", summary.songplays);
            println!("  users: {}", summary.users);
            println!("  songs: {}", summary.songs);
            println!("  artists: {}", summary.artists);
            println!("  time: {}", summary.time);
        }
        return Ok(());
    }

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);
    let orchestrator = Orchestrator::new(config)?;

    match cli.command {
        Commands::Preview { .. } => unreachable!(), // Handled above
        Commands::Run { dry_run: true } => {
            let plan = orchestrator.plan();

            if cli.output_json {
                let steps: Vec<_> = plan
                    .iter()
                    .map(|(phase, statement)| {
                        serde_json::json!({
                            "phase": phase,
                            "name": statement.name,
                            "table": statement.table,
                            "kind": statement.kind,
                            "sql": statement.sql,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&steps)?);
            } else {
                println!("Dry run: {} statements", plan.len());
                for (phase, statement) in &plan {
                    println!("  [{}] {}", phase, statement.name);
                }
            }
        }

        Commands::Run { dry_run: false } => {
            let result = orchestrator.run().await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nETL run completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Rows staged: {}", result.rows_staged);
                println!("  Rows inserted: {}", result.rows_inserted);
                for phase in &result.phases {
                    for step in &phase.steps {
                        println!("    {}: {} rows ({}ms)", step.name, step.rows, step.duration_ms);
                    }
                }
            }
        }

        Commands::CreateTables => {
            let mut conn = orchestrator.connect().await?;
            let created = orchestrator.create_tables(&mut conn).await;
            close(&mut conn).await;
            let report = created?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Recreated {} tables", report.steps.len() / 2);
            }
        }

        Commands::Validate => {
            let mut conn = orchestrator.connect().await?;
            let counted = orchestrator.validate(&mut conn).await;
            close(&mut conn).await;
            let counts = counted?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                println!("Row counts:");
                for count in &counts {
                    println!("  {:<16} {}", count.table, count.rows);
                }
            }
        }

        Commands::HealthCheck => {
            let result = orchestrator.health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Warehouse ({}): {} ({}ms)",
                    result.target,
                    if result.connected { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
            }

            if !result.connected {
                return Err(EtlError::Connection("Health check failed".to_string()));
            }
        }
    }

    Ok(())
}

async fn close(conn: &mut dwh_etl::PgWarehouse) {
    use dwh_etl::Warehouse;

    if let Err(e) = conn.close().await {
        tracing::warn!("Failed to close warehouse connection: {}", e);
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    // RUST_LOG takes precedence over --verbosity
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
