use crate::domain::model::{ReportArtifacts, ValuationSet};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 報表管道：extract 取得估值，transform 組報表，load 落盤並寄送
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ValuationSet>;
    async fn transform(&self, data: ValuationSet) -> Result<ReportArtifacts>;
    async fn load(&self, artifacts: ReportArtifacts) -> Result<String>;
}
