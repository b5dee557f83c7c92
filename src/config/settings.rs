use crate::adapters::provider::{DEFAULT_PROVIDER_URL, DEFAULT_TIMEOUT_SECONDS};
use crate::config::{BrokerFileConfig, CliConfig};
use crate::core::catalog::CatalogSettings;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_required_field, validate_url, Validate,
};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DASHBOARD_URL: &str = "https://kmc.kaltura.com/index.php/kmcng/login";

/// 合併後的設定：命令列/環境變數 > 設定檔 > 預設值
#[derive(Clone)]
pub struct BrokerSettings {
    pub port: u16,
    pub username: String,
    pub password: String,
    pub provider_url: String,
    pub provider_timeout: Duration,
    pub dashboard_url: String,
    pub catalog: CatalogSettings,
}

impl BrokerSettings {
    pub fn resolve(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                tracing::info!("📄 Loading configuration from {}", path.display());
                BrokerFileConfig::from_file(path)?
            }
            None => BrokerFileConfig::default(),
        };
        Self::from_sources(cli, file)
    }

    pub fn from_sources(cli: &CliConfig, file: BrokerFileConfig) -> Result<Self> {
        let username = cli.username.clone().or(file.server.username);
        let password = cli.password.clone().or(file.server.password);

        let settings = Self {
            port: cli.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
            username: validate_required_field("username", &username)?.clone(),
            password: validate_required_field("password", &password)?.clone(),
            provider_url: cli
                .provider_url
                .clone()
                .or(file.provider.url)
                .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            provider_timeout: Duration::from_secs(
                cli.provider_timeout
                    .or(file.provider.timeout_seconds)
                    .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            ),
            dashboard_url: cli
                .dashboard_url
                .clone()
                .or(file.dashboard.url)
                .unwrap_or_else(|| DEFAULT_DASHBOARD_URL.to_string()),
            catalog: file.catalog,
        };

        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for BrokerSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("username", &self.username)?;
        validate_non_empty_string("password", &self.password)?;
        validate_url("provider.url", &self.provider_url)?;
        validate_range(
            "provider.timeout_seconds",
            self.provider_timeout.as_secs(),
            1,
            300,
        )?;
        validate_url("dashboard.url", &self.dashboard_url)?;
        self.catalog.validate()?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
