use clap::{Parser, Subcommand};
use repogen::config::RunSettings;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod cmd;

#[derive(Parser)]
#[command(name = "repogen")]
#[command(version, about = "Bulk-provision copies of a source repository into a GitHub organization")]
pub struct Cli {
    /// Path to the JSON directive file
    #[arg(short, long, global = true, default_value = "repoConfig.json")]
    pub config: PathBuf,

    /// Directory used for local mirror clones during the run
    #[arg(long, global = true, default_value = "localRepos")]
    pub cache_dir: PathBuf,

    /// Directory the rollback manifest is written into
    #[arg(long, global = true, default_value = ".")]
    pub manifest_dir: PathBuf,

    /// Minimum seconds between GitHub API calls (secondary rate limits)
    #[arg(long, global = true, default_value_t = 4)]
    pub interval_secs: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the configured repositories and mirror the sources into them
    Run,
    /// Show the tasks a run would execute, without calling GitHub
    Plan,
}

impl Cli {
    fn settings(&self) -> RunSettings {
        RunSettings {
            config_path: self.config.clone(),
            cache_dir: self.cache_dir.clone(),
            manifest_dir: self.manifest_dir.clone(),
            throttle_interval: Duration::from_secs(self.interval_secs),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = cli.settings();

    match &cli.command {
        Commands::Run => cmd::cmd_run(&settings).await,
        Commands::Plan => cmd::cmd_plan(&settings),
    }
}
