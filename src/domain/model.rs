use crate::utils::error::{BrokerError, Result};
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 建立帳號所需的參數，由平台的 `parameters` 欄位解析而來
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub email: String,
}

impl ProvisionRequest {
    /// 解析並驗證原始參數；失敗時不會有任何副作用
    pub fn from_parameters(raw: Option<&serde_json::Value>) -> Result<Self> {
        let raw = raw.ok_or_else(|| {
            BrokerError::invalid_parameters("parameters are required: name, company, email")
        })?;

        let request: ProvisionRequest = serde_json::from_value(raw.clone())
            .map_err(|e| BrokerError::invalid_parameters(format!("malformed parameters: {}", e)))?;

        request.validate()?;
        Ok(request)
    }
}

impl Validate for ProvisionRequest {
    fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("company", &self.company),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BrokerError::invalid_parameters(format!(
                "missing or empty fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Provider 回傳的帳號編號，可能是數字或字串
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartnerId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartnerId::Numeric(id) => write!(f, "{}", id),
            PartnerId::Text(id) => f.write_str(id),
        }
    }
}

/// Provider 成功建立帳號後的結果
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderAccount {
    pub partner_id: PartnerId,
    pub admin_secret: String,
}

impl fmt::Debug for ProviderAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAccount")
            .field("partner_id", &self.partner_id)
            .field("admin_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub instance_id: String,
    pub service_id: String,
    pub plan_id: String,
    pub partner_id: PartnerId,
    pub admin_secret: String,
    pub request: ProvisionRequest,
    pub provisioned_at: DateTime<Utc>,
}

impl ServiceInstance {
    pub fn new(
        instance_id: &str,
        details: &ProvisionDetails,
        request: ProvisionRequest,
        account: ProviderAccount,
    ) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            service_id: details.service_id.clone(),
            plan_id: details.plan_id.clone(),
            partner_id: account.partner_id,
            admin_secret: account.admin_secret,
            request,
            provisioned_at: Utc::now(),
        }
    }

    /// 相同 instance 以相同屬性重送 Provision 時視為同一筆
    pub fn matches(&self, details: &ProvisionDetails, request: &ProvisionRequest) -> bool {
        self.service_id == details.service_id
            && self.plan_id == details.plan_id
            && &self.request == request
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            partner_id: self.partner_id.clone(),
            admin_secret: self.admin_secret.clone(),
        }
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("instance_id", &self.instance_id)
            .field("service_id", &self.service_id)
            .field("plan_id", &self.plan_id)
            .field("partner_id", &self.partner_id)
            .field("admin_secret", &"<redacted>")
            .field("request", &self.request)
            .field("provisioned_at", &self.provisioned_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub partner_id: PartnerId,
    pub admin_secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionDetails {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
    pub organization_guid: Option<String>,
    pub space_guid: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub dashboard_url: String,
    pub already_provisioned: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub service_id: Option<String>,
    pub plan_id: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub previous_values: Option<serde_json::Value>,
}

/// Update 參數中描述的對外服務
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposedBinding {
    pub id: String,
    pub name: String,
    pub description: String,
    pub credentials: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateParameters {
    #[serde(default)]
    pub add_bindings: Vec<ExposedBinding>,
    #[serde(default)]
    pub del_bindings: Vec<ExposedBinding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindDetails {
    pub service_id: Option<String>,
    pub plan_id: Option<String>,
    pub app_guid: Option<String>,
    pub bind_resource: Option<serde_json::Value>,
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    pub state: OperationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LastOperation {
    pub fn succeeded() -> Self {
        Self {
            state: OperationState::Succeeded,
            description: None,
        }
    }
}
