pub mod settings;
pub mod toml_config;

use clap::Parser;
use std::path::PathBuf;

pub use settings::BrokerSettings;
pub use toml_config::BrokerFileConfig;

/// 命令列參數；未指定時從環境變數讀取
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "kaltura-broker")]
#[command(about = "Service broker that provisions Kaltura partner accounts")]
pub struct CliConfig {
    #[arg(long, env = "PORT", help = "Port to listen on (default 8080)")]
    pub port: Option<u16>,

    #[arg(long, env = "SECURITY_USER_NAME", help = "Basic auth username")]
    pub username: Option<String>,

    #[arg(
        long,
        env = "SECURITY_USER_PASSWORD",
        hide_env_values = true,
        help = "Basic auth password"
    )]
    pub password: Option<String>,

    #[arg(long, env = "BROKER_CONFIG", help = "Optional TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "KALTURA_SERVICE_URL", help = "Partner registration endpoint")]
    pub provider_url: Option<String>,

    #[arg(
        long,
        env = "KALTURA_TIMEOUT_SECONDS",
        help = "Timeout for provider calls in seconds"
    )]
    pub provider_timeout: Option<u64>,

    #[arg(long, env = "BROKER_DASHBOARD_URL", help = "Dashboard URL returned on provision")]
    pub dashboard_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "LOG_JSON", help = "Emit logs as JSON")]
    pub log_json: bool,
}
