use crate::domain::model::{PartnerId, ProviderAccount, ProvisionRequest};
use crate::domain::ports::ResourceProvider;
use crate::utils::error::{BrokerError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_PROVIDER_URL: &str =
    "https://www.kaltura.com/api_v3/service/partner/action/register";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const PARTNER_DESCRIPTION: &str = "Provisioned through the service broker";

const PARTNER_OBJECT_TYPE: &str = "KalturaPartner";
// format=1 要求 provider 以 JSON 回應
const RESPONSE_FORMAT_JSON: &str = "1";

/// Partner 註冊 API 的 HTTP client
#[derive(Debug, Clone)]
pub struct KalturaClient {
    client: Client,
    endpoint: String,
}

impl KalturaClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::ConfigError {
                message: format!("failed to build provider HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn registration_form<'a>(
        request: &'a ProvisionRequest,
        reference_id: &'a str,
    ) -> Vec<(&'static str, &'a str)> {
        vec![
            ("partner[objectType]", PARTNER_OBJECT_TYPE),
            ("partner[description]", PARTNER_DESCRIPTION),
            ("partner[name]", request.company.as_str()),
            ("partner[adminName]", request.name.as_str()),
            ("partner[adminEmail]", request.email.as_str()),
            ("partner[referenceId]", reference_id),
            ("format", RESPONSE_FORMAT_JSON),
        ]
    }
}

#[async_trait]
impl ResourceProvider for KalturaClient {
    async fn register_account(
        &self,
        request: &ProvisionRequest,
        reference_id: &str,
    ) -> Result<ProviderAccount> {
        tracing::debug!(endpoint = %self.endpoint, reference_id, "Registering partner");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&Self::registration_form(request, reference_id))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(%status, "Provider response status");
        let body = response.text().await?;

        parse_registration(status, &body)
    }
}

/// 成功時含 `id`/`adminSecret`；錯誤時 `objectType` 為某種 Exception
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationResponse {
    object_type: Option<String>,
    id: Option<PartnerId>,
    admin_secret: Option<String>,
    message: Option<String>,
    code: Option<serde_json::Value>,
}

impl RegistrationResponse {
    fn is_exception(&self) -> bool {
        self.object_type
            .as_deref()
            .is_some_and(|t| t.to_ascii_lowercase().contains("exception"))
    }

    fn code(&self) -> Option<String> {
        self.code.as_ref().map(|code| match code {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

pub(crate) fn parse_registration(status: StatusCode, body: &str) -> Result<ProviderAccount> {
    let parsed: RegistrationResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) if status.is_success() => {
            return Err(BrokerError::InvalidProviderResponse {
                message: format!("response is not a registration object: {}", e),
            })
        }
        Err(_) => {
            return Err(BrokerError::ProviderRejected {
                message: format!("provider returned HTTP {}", status),
                code: None,
            })
        }
    };

    if parsed.is_exception() || !status.is_success() {
        let code = parsed.code();
        let message = parsed
            .message
            .unwrap_or_else(|| format!("provider returned HTTP {}", status));
        tracing::warn!(%status, code = code.as_deref().unwrap_or("-"), %message, "Provider rejected registration");
        return Err(BrokerError::ProviderRejected { message, code });
    }

    match (parsed.id, parsed.admin_secret) {
        (Some(partner_id), Some(admin_secret)) => Ok(ProviderAccount {
            partner_id,
            admin_secret,
        }),
        _ => Err(BrokerError::InvalidProviderResponse {
            message: "response is missing id or adminSecret".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const REGISTER_PATH: &str = "/api_v3/service/partner/action/register";

    fn alice() -> ProvisionRequest {
        ProvisionRequest {
            name: "Alice".to_string(),
            company: "Acme".to_string(),
            email: "a@acme.com".to_string(),
        }
    }

    fn client_for(server: &MockServer) -> KalturaClient {
        KalturaClient::new(server.url(REGISTER_PATH), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_register_sends_form_fields_and_parses_account() {
        let server = MockServer::start_async().await;
        let register_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(REGISTER_PATH)
                    .x_www_form_urlencoded_tuple("partner[objectType]", "KalturaPartner")
                    .x_www_form_urlencoded_tuple("partner[description]", PARTNER_DESCRIPTION)
                    .x_www_form_urlencoded_tuple("partner[name]", "Acme")
                    .x_www_form_urlencoded_tuple("partner[adminName]", "Alice")
                    .x_www_form_urlencoded_tuple("partner[adminEmail]", "a@acme.com")
                    .x_www_form_urlencoded_tuple("partner[referenceId]", "instance-1")
                    .x_www_form_urlencoded_tuple("format", "1");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({
                        "objectType": "KalturaPartner",
                        "id": 42,
                        "adminSecret": "s3cr3t"
                    }));
            })
            .await;

        let account = client_for(&server)
            .register_account(&alice(), "instance-1")
            .await
            .unwrap();

        register_mock.assert_async().await;
        assert_eq!(account.partner_id, PartnerId::Numeric(42));
        assert_eq!(account.admin_secret, "s3cr3t");
    }

    #[tokio::test]
    async fn test_exception_object_in_ok_body_is_rejection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(REGISTER_PATH);
                then.status(200).json_body(json!({
                    "objectType": "ProviderException",
                    "code": "PARTNER_ALREADY_EXISTS",
                    "message": "duplicate"
                }));
            })
            .await;

        let err = client_for(&server)
            .register_account(&alice(), "instance-1")
            .await
            .unwrap_err();

        match err {
            BrokerError::ProviderRejected { message, code } => {
                assert_eq!(message, "duplicate");
                assert_eq!(code.as_deref(), Some("PARTNER_ALREADY_EXISTS"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_unreachable() {
        // 保留埠 1 上沒有服務
        let client =
            KalturaClient::new("http://127.0.0.1:1/register", Duration::from_secs(2)).unwrap();

        let err = client.register_account(&alice(), "i-1").await.unwrap_err();
        assert!(matches!(err, BrokerError::ProviderUnreachable(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_as_unreachable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(REGISTER_PATH);
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!({"id": 1, "adminSecret": "late"}));
            })
            .await;

        let client =
            KalturaClient::new(server.url(REGISTER_PATH), Duration::from_millis(200)).unwrap();
        let err = client.register_account(&alice(), "i-1").await.unwrap_err();

        match err {
            BrokerError::ProviderUnreachable(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_registration_variants() {
        let ok = parse_registration(StatusCode::OK, r#"{"id":"p-7","adminSecret":"x"}"#).unwrap();
        assert_eq!(ok.partner_id, PartnerId::Text("p-7".to_string()));

        assert!(matches!(
            parse_registration(StatusCode::OK, r#"{"id":7}"#),
            Err(BrokerError::InvalidProviderResponse { .. })
        ));
        assert!(matches!(
            parse_registration(StatusCode::OK, "<html>oops</html>"),
            Err(BrokerError::InvalidProviderResponse { .. })
        ));
        assert!(matches!(
            parse_registration(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            Err(BrokerError::ProviderRejected { .. })
        ));
        assert!(matches!(
            parse_registration(
                StatusCode::BAD_REQUEST,
                r#"{"message":"invalid email"}"#
            ),
            Err(BrokerError::ProviderRejected { ref message, .. }) if message == "invalid email"
        ));
        assert!(matches!(
            parse_registration(
                StatusCode::OK,
                r#"{"objectType":"KalturaAPIException","message":"bad","code":12}"#
            ),
            Err(BrokerError::ProviderRejected { code: Some(ref c), .. }) if c == "12"
        ));
    }
}
