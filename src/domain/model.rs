use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// 一個可啟動的服務：指令、工作目錄、隔離環境與就緒條件
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub workdir: PathBuf,
    pub env_dir: PathBuf,
    pub manifest: PathBuf,
    pub command: Vec<String>,
    pub env: HashMap<String, String>,
    pub url: Option<String>,
    pub readiness: ReadinessSpec,
}

/// 就緒條件。`Delay` 保留給舊式固定延遲啟動，有競爭風險
#[derive(Debug, Clone, PartialEq)]
pub enum ReadinessSpec {
    None,
    Delay {
        duration: Duration,
    },
    Http {
        url: String,
        timeout: Duration,
        interval: Duration,
    },
    Tcp {
        address: String,
        timeout: Duration,
        interval: Duration,
    },
}

/// 環境佈建結果
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub service: String,
    pub env_dir: PathBuf,
    pub created: bool,
    pub installed: bool,
    pub duration: Duration,
}

/// 服務啟動結果
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub service: String,
    pub pid: Option<u32>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ready_after: Option<Duration>,
}

/// 啟動中的服務：子行程與它的啟動報告
#[derive(Debug)]
pub struct ServiceHandle {
    pub child: tokio::process::Child,
    pub report: LaunchReport,
}

#[derive(Debug)]
pub struct StackOutcome {
    pub provision: Vec<ProvisionReport>,
    pub backend: LaunchReport,
    pub frontend: LaunchReport,
    pub exit_code: Option<i32>,
}
