use crate::core::catalog::CatalogSettings;
use crate::utils::error::{BrokerError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 選用的 TOML 設定檔，所有欄位皆可省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerFileConfig {
    pub server: ServerSection,
    pub provider: ProviderSection,
    pub dashboard: DashboardSection,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSection {
    pub url: Option<String>,
}

impl BrokerFileConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BrokerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BrokerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${KALTURA_SERVICE_URL})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BrokerError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = BrokerFileConfig::from_toml_str("").unwrap();
        assert!(config.server.port.is_none());
        assert!(config.provider.url.is_none());
        assert_eq!(config.catalog, CatalogSettings::default());
    }

    #[test]
    fn test_parse_all_sections() {
        let config = BrokerFileConfig::from_toml_str(
            r#"
[server]
port = 9090
username = "broker"

[provider]
url = "https://provider.example.com/register"
timeout_seconds = 10

[dashboard]
url = "https://dashboard.example.com"

[catalog]
service_name = "video-tenant"
plan_id = "plan-1"

[catalog.metadata]
datacenter = "eu-1"
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, Some(9090));
        assert_eq!(config.server.username.as_deref(), Some("broker"));
        assert_eq!(config.provider.timeout_seconds, Some(10));
        assert_eq!(
            config.dashboard.url.as_deref(),
            Some("https://dashboard.example.com")
        );
        assert_eq!(config.catalog.service_name, "video-tenant");
        assert_eq!(config.catalog.plan_id, "plan-1");
        // 未指定的 catalog 欄位沿用預設值
        assert_eq!(
            config.catalog.service_id,
            CatalogSettings::default().service_id
        );
        assert_eq!(config.catalog.metadata["datacenter"], serde_json::json!("eu-1"));
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("KALTURA_BROKER_TEST_PASSWORD", "from-env");
        let config = BrokerFileConfig::from_toml_str(
            r#"
[server]
password = "${KALTURA_BROKER_TEST_PASSWORD}"
username = "${KALTURA_BROKER_TEST_UNDEFINED}"
"#,
        )
        .unwrap();

        assert_eq!(config.server.password.as_deref(), Some("from-env"));
        assert_eq!(
            config.server.username.as_deref(),
            Some("${KALTURA_BROKER_TEST_UNDEFINED}")
        );
    }

    #[test]
    fn test_from_file_and_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[provider]\ntimeout_seconds = 45").unwrap();
        let config = BrokerFileConfig::from_file(file.path()).unwrap();
        assert_eq!(config.provider.timeout_seconds, Some(45));

        assert!(matches!(
            BrokerFileConfig::from_toml_str("[provider\nurl = 1"),
            Err(BrokerError::ConfigError { .. })
        ));
        assert!(matches!(
            BrokerFileConfig::from_file("/definitely/not/here.toml"),
            Err(BrokerError::IoError(_))
        ));
    }
}
