use crate::domain::model::{ProviderAccount, ProvisionRequest};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 外部帳號服務（例如影音平台的 partner 註冊 API）
///
/// 實作必須區分三種結果：連線失敗 (`ProviderUnreachable`)、
/// 有回應但被拒絕 (`ProviderRejected`)、以及成功。
#[async_trait]
pub trait ResourceProvider: Send + Sync + 'static {
    /// 建立帳號；`reference_id` 會原樣帶給 provider 以便對帳
    async fn register_account(
        &self,
        request: &ProvisionRequest,
        reference_id: &str,
    ) -> Result<ProviderAccount>;
}
