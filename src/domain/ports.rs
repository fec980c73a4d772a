use crate::domain::model::{ProvisionReport, ServiceHandle, ServiceSpec, StackOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 隔離環境的後端：建立環境、安裝依賴清單、解析直譯器路徑
pub trait EnvRuntime: Send + Sync {
    fn create_env(&self, env_dir: &Path) -> impl std::future::Future<Output = Result<()>> + Send;
    fn install(
        &self,
        env_dir: &Path,
        manifest: &Path,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn interpreter(&self, env_dir: &Path) -> PathBuf;
}

pub trait ConfigProvider: Send + Sync {
    fn backend_spec(&self) -> ServiceSpec;
    fn frontend_spec(&self) -> ServiceSpec;
    fn python_binary(&self) -> &str;
    fn force_provision(&self) -> bool;
}

#[async_trait]
pub trait StackPipeline: Send + Sync {
    async fn provision(&self) -> Result<Vec<ProvisionReport>>;
    async fn start_backend(&self) -> Result<ServiceHandle>;
    async fn run_frontend(&self, backend: ServiceHandle) -> Result<StackOutcome>;
}
