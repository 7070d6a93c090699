use clap::{Args, Parser, Subcommand};

// ============================================
// Environment variable name constants
// These are shared between config parsing and log output
// ============================================
pub mod env {
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
    pub const TARGETS_FILE: &str = "TARGETS_FILE";
    pub const OUTPUT_DIR: &str = "OUTPUT_DIR";
    pub const CONCURRENT_FETCHES: &str = "CONCURRENT_FETCHES";
    pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
    pub const FETCH_INSIGHTS: &str = "FETCH_INSIGHTS";
    pub const RUN_ANALYSIS: &str = "RUN_ANALYSIS";
    pub const DB_PATH: &str = "DB_PATH";
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "chainscan",
    version,
    about = "GitHub supply-chain security artifact collector and analyzer",
    long_about = "Collects release artifacts, CI workflows and branch protection data for a \
                  list of repositories via the GitHub GraphQL API, stores raw and normalized \
                  tables in an embedded DuckDB database, and runs layered SQL models that \
                  detect SBOMs, signatures, attestations and CI security tooling."
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Log format: json or pretty
    #[arg(long, global = true, env = env::LOG_FORMAT, default_value = "pretty")]
    pub log_format: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = env::LOG_LEVEL, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch targets from GitHub and materialize the database
    Collect(CollectArgs),
    /// Run the SQL pattern models against an existing database
    Analyze(AnalyzeArgs),
    /// Run one ad hoc read query and print JSON rows
    Query(QueryArgs),
    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Path to the targets file (flat repo list or project-grouped, YAML or JSON)
    #[arg(long, env = env::TARGETS_FILE)]
    pub targets: String,

    /// Output directory for the database, parquet exports and fetch log
    #[arg(long, env = env::OUTPUT_DIR, default_value = "./chainscan-out")]
    pub output_dir: String,

    /// GitHub personal access token
    #[arg(long, env = env::GITHUB_TOKEN, hide_env_values = true, default_value = "")]
    pub github_token: String,

    /// Maximum concurrent GraphQL fetches
    #[arg(long, env = env::CONCURRENT_FETCHES, default_value = "4")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = env::REQUEST_TIMEOUT_SECS, default_value = "30")]
    pub request_timeout: u64,

    /// Also fetch SECURITY-INSIGHTS.yml from each repository
    #[arg(long, env = env::FETCH_INSIGHTS, default_value = "true")]
    pub fetch_insights: bool,

    /// Run the SQL pattern models after collection
    #[arg(long, env = env::RUN_ANALYSIS, default_value = "true")]
    pub analyze: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to the DuckDB database produced by a collect run
    #[arg(long, env = env::DB_PATH)]
    pub db_path: String,

    /// Drop all derived tables and views before re-running the models
    #[arg(long, default_value = "false")]
    pub recreate: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Path to the DuckDB database produced by a collect run
    #[arg(long, env = env::DB_PATH)]
    pub db_path: String,

    /// SQL text of one read query
    pub sql: String,
}

impl Config {
    pub fn from_args() -> Self {
        Config::parse()
    }

    /// Validate configuration based on subcommand
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Collect(args) => {
                if args.github_token.is_empty() {
                    return Err(format!(
                        "{} is required in collect mode",
                        env::GITHUB_TOKEN
                    ));
                }
                if args.targets.is_empty() {
                    return Err("a targets file is required in collect mode".to_string());
                }
                if args.concurrency == 0 {
                    return Err("concurrency must be at least 1".to_string());
                }
            }
            Command::Analyze(args) => {
                if args.db_path.is_empty() {
                    return Err("a database path is required in analyze mode".to_string());
                }
            }
            Command::Query(args) => {
                if args.db_path.is_empty() {
                    return Err("a database path is required in query mode".to_string());
                }
                if args.sql.trim().is_empty() {
                    return Err("a SQL query is required in query mode".to_string());
                }
            }
            Command::Version => {}
        }
        Ok(())
    }
}

impl CollectArgs {
    /// DuckDB database path inside the output directory
    pub fn db_path(&self) -> String {
        format!("{}/artifacts.db", self.output_dir)
    }

    /// Parquet export directory inside the output directory
    pub fn parquet_dir(&self) -> String {
        format!("{}/parquet", self.output_dir)
    }

    /// Fetch audit log path inside the output directory
    pub fn fetch_log_path(&self) -> String {
        format!("{}/fetch-log.jsonl", self.output_dir)
    }
}
