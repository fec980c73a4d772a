use crate::core::{EnvRuntime, ProvisionReport, Result, ServiceSpec};
use crate::utils::error::StackError;
use std::time::Instant;

/// 確保服務的隔離環境存在（冪等）。
///
/// 環境目錄已存在時不做任何建立或安裝動作；`force` 會在既有環境上
/// 重新安裝依賴清單。建立或安裝失敗對整個啟動流程都是致命的，
/// 不重試也不清理殘留狀態。
pub async fn ensure_env<E: EnvRuntime>(
    runtime: &E,
    spec: &ServiceSpec,
    force: bool,
) -> Result<ProvisionReport> {
    let start = Instant::now();
    let exists = spec.env_dir.exists();

    if exists && !force {
        tracing::info!(
            "⏭️ Environment for '{}' already present at {}, skipping provisioning",
            spec.name,
            spec.env_dir.display()
        );
        return Ok(ProvisionReport {
            service: spec.name.clone(),
            env_dir: spec.env_dir.clone(),
            created: false,
            installed: false,
            duration: start.elapsed(),
        });
    }

    // 先驗證清單存在，避免建立到一半才失敗
    if !spec.manifest.exists() {
        return Err(StackError::InvalidConfigValueError {
            field: format!("{}.manifest", spec.name),
            value: spec.manifest.display().to_string(),
            reason: "Dependency manifest does not exist".to_string(),
        });
    }

    let created = if !exists {
        tracing::info!(
            "🔨 Creating environment for '{}' at {}",
            spec.name,
            spec.env_dir.display()
        );
        runtime.create_env(&spec.env_dir).await?;
        true
    } else {
        tracing::info!(
            "🔧 Re-installing dependencies for '{}' (forced)",
            spec.name
        );
        false
    };

    tracing::info!(
        "📦 Installing dependencies for '{}' from {}",
        spec.name,
        spec.manifest.display()
    );
    runtime.install(&spec.env_dir, &spec.manifest).await?;

    Ok(ProvisionReport {
        service: spec.name.clone(),
        env_dir: spec.env_dir.clone(),
        created,
        installed: true,
        duration: start.elapsed(),
    })
}
