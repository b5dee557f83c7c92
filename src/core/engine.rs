use crate::core::catalog::CatalogDescriptor;
use crate::core::registry::{InstanceRegistry, ProvisionSlot};
use crate::domain::catalog::Catalog;
use crate::domain::model::{
    BindDetails, Credentials, LastOperation, ProvisionDetails, ProvisionOutcome,
    ProvisionRequest, ServiceInstance, UpdateDetails, UpdateParameters,
};
use crate::domain::ports::ResourceProvider;
use crate::utils::error::{BrokerError, Result};
use std::sync::Arc;

/// 實作七個 lifecycle 操作。所有操作都在單一請求內同步完成，
/// 不會產生需要輪詢的非同步工作。
pub struct LifecycleEngine<P: ResourceProvider> {
    provider: Arc<P>,
    registry: Arc<InstanceRegistry>,
    catalog: CatalogDescriptor,
    dashboard_url: String,
}

impl<P: ResourceProvider> LifecycleEngine<P> {
    pub fn new(
        provider: P,
        registry: Arc<InstanceRegistry>,
        catalog: CatalogDescriptor,
        dashboard_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: Arc::new(provider),
            registry,
            catalog,
            dashboard_url: dashboard_url.into(),
        }
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn list_services(&self) -> &Catalog {
        tracing::debug!("Catalog requested");
        self.catalog.list_services()
    }

    pub async fn provision(
        &self,
        instance_id: &str,
        details: ProvisionDetails,
    ) -> Result<ProvisionOutcome> {
        tracing::info!(
            instance_id,
            service_id = %details.service_id,
            plan_id = %details.plan_id,
            "📥 Provision requested"
        );

        // 先在本地完成所有驗證，失敗時不呼叫 provider 也不動 registry
        if instance_id.trim().is_empty() {
            return Err(BrokerError::invalid_parameters("instance id cannot be empty"));
        }
        let request = ProvisionRequest::from_parameters(details.parameters.as_ref())?;
        if !self.catalog.offers(&details.service_id, &details.plan_id) {
            return Err(BrokerError::invalid_parameters(format!(
                "unknown service/plan combination: {}/{}",
                details.service_id, details.plan_id
            )));
        }

        let reservation = match self.registry.begin_provision(instance_id)? {
            ProvisionSlot::Existing(existing) => {
                if existing.matches(&details, &request) {
                    tracing::info!(instance_id, "♻️ Instance already provisioned with identical attributes");
                    return Ok(ProvisionOutcome {
                        dashboard_url: self.dashboard_url.clone(),
                        already_provisioned: true,
                    });
                }
                tracing::warn!(instance_id, "Instance already provisioned with different attributes");
                return Err(BrokerError::InstanceConflict {
                    instance_id: instance_id.to_string(),
                });
            }
            ProvisionSlot::Reserved(reservation) => reservation,
        };

        // provider 呼叫與 commit 在獨立 task 執行：請求被取消時結果仍會寫入 registry。
        // 失敗時 reservation 在 task 內被 drop，佔位自動釋放。
        let provider = Arc::clone(&self.provider);
        let registration = tokio::spawn(async move {
            let instance_id = reservation.instance_id().to_string();
            let account = provider
                .register_account(&request, &instance_id)
                .await
                .inspect_err(|e| {
                    tracing::error!(instance_id = %instance_id, error = %e, "❌ Provider registration failed");
                })?;

            tracing::info!(
                instance_id = %instance_id,
                partner_id = %account.partner_id,
                "✅ Provider account created"
            );
            reservation.commit(ServiceInstance::new(&instance_id, &details, request, account));
            Ok::<_, BrokerError>(())
        });
        registration.await.map_err(|e| BrokerError::Internal {
            message: format!("provisioning task failed: {}", e),
        })??;

        Ok(ProvisionOutcome {
            dashboard_url: self.dashboard_url.clone(),
            already_provisioned: false,
        })
    }

    /// 移除 registry 中的紀錄。上游帳號不會被刪除。
    pub fn deprovision(&self, instance_id: &str) -> Result<()> {
        tracing::info!(instance_id, "📤 Deprovision requested");
        let removed = self.registry.remove(instance_id)?;
        tracing::warn!(
            instance_id,
            partner_id = %removed.partner_id,
            "Instance removed from registry; upstream partner account is retained"
        );
        Ok(())
    }

    pub fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        details: &BindDetails,
    ) -> Result<Credentials> {
        tracing::info!(
            instance_id,
            binding_id,
            app_guid = details.app_guid.as_deref().unwrap_or("-"),
            "🔗 Bind requested"
        );
        let instance = self
            .registry
            .get(instance_id)
            .ok_or_else(|| BrokerError::InstanceNotFound {
                instance_id: instance_id.to_string(),
            })?;
        Ok(instance.credentials())
    }

    pub fn unbind(&self, instance_id: &str, binding_id: &str) -> Result<()> {
        tracing::info!(instance_id, binding_id, "Unbind requested");
        Ok(())
    }

    /// 只記錄 add_bindings / del_bindings 的數量，不改變任何狀態，
    /// 參數格式不符時忽略。
    pub fn update(&self, instance_id: &str, details: &UpdateDetails) -> Result<()> {
        let parameters = match &details.parameters {
            Some(raw) => match serde_json::from_value::<UpdateParameters>(raw.clone()) {
                Ok(parameters) => parameters,
                Err(e) => {
                    tracing::warn!(instance_id, error = %e, "Ignoring unrecognised update parameters");
                    UpdateParameters::default()
                }
            },
            None => UpdateParameters::default(),
        };

        tracing::info!(
            instance_id,
            add_bindings = parameters.add_bindings.len(),
            del_bindings = parameters.del_bindings.len(),
            "Update accepted"
        );
        Ok(())
    }

    pub fn last_operation(&self, instance_id: &str, operation: Option<&str>) -> LastOperation {
        tracing::debug!(
            instance_id,
            operation = operation.unwrap_or("-"),
            "Last operation polled"
        );
        LastOperation::succeeded()
    }
}
