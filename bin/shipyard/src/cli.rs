use std::{path::PathBuf, time::Duration};

use clap::Parser;
use shipyard_deploy::{ConfigOverrides, config::CONFIG_FILENAME};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(
    author,
    version,
    about = "Deploy compiled contracts and verify them on a block explorer"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SHIPYARD_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file. A missing file is not an error: every
    /// value can also come from `SHIPYARD_*` environment variables.
    #[arg(short, long, alias = "conf", env = "SHIPYARD_CONFIG", default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// JSON-RPC endpoint of the target network.
    #[arg(long, alias = "rpc")]
    pub network_url: Option<Url>,

    /// Seconds to wait between the last deployment and the first verification.
    #[arg(long)]
    pub settling_delay: Option<u64>,

    /// Directory holding the compiled contract artifacts.
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,

    /// Write the JSON run report to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Save the resolved configuration (without secrets) to this path before
    /// deploying.
    #[arg(long)]
    pub save_config: Option<PathBuf>,
}

impl Cli {
    /// Values that take precedence over the file and environment.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            network_url: self.network_url.clone(),
            settling_delay: self.settling_delay.map(Duration::from_secs),
            artifacts_dir: self.artifacts_dir.clone(),
            report_path: self.report.clone(),
        }
    }
}
