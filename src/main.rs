use anyhow::Result;
use tracing::{error, info};

use chainscan::config::{Command, Config};
use chainscan::store::Store;
use chainscan::{analyze, collector, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args();

    // Handle version subcommand before logger setup
    if let Command::Version = &config.command {
        println!("chainscan {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize logging
    logging::init(&config.log_format, &config.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "chainscan starting"
    );

    // Validate configuration
    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }

    let result = match &config.command {
        Command::Collect(args) => {
            info!(
                targets = %args.targets,
                output_dir = %args.output_dir,
                "Running in collect mode"
            );
            collector::run(args).await
        }
        Command::Analyze(args) => {
            info!(
                db_path = %args.db_path,
                recreate = args.recreate,
                "Running in analyze mode"
            );
            analyze::run(&args.db_path, args.recreate).map(|_| ())
        }
        Command::Query(args) => run_query(&args.db_path, &args.sql),
        Command::Version => Ok(()),
    };

    if let Err(e) = result {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }

    info!("chainscan completed successfully");
    Ok(())
}

fn run_query(db_path: &str, sql: &str) -> Result<()> {
    let store = Store::open(db_path)?;
    let rows = analyze::run_single_query(&store, sql)?;
    for row in &rows {
        println!("{}", row);
    }
    info!(rows = rows.len(), "Query complete");
    store.close();
    Ok(())
}
