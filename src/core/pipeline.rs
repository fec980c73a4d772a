use crate::core::readiness;
use crate::core::{
    ConfigProvider, EnvRuntime, ProvisionReport, ServiceHandle, ServiceSpec, StackOutcome,
    StackPipeline,
};
use crate::core::provision::ensure_env;
use crate::domain::model::LaunchReport;
use crate::utils::error::{Result, StackError};
use std::path::PathBuf;
use std::time::Duration;

/// 啟動服務的子行程。`python`/`python3` 會被換成環境自己的直譯器。
pub fn spawn_service<E: EnvRuntime>(runtime: &E, spec: &ServiceSpec) -> Result<ServiceHandle> {
    if spec.command.is_empty() {
        return Err(StackError::LaunchError {
            service: spec.name.clone(),
            message: "Service command is empty".to_string(),
        });
    }

    let program = if spec.command[0] == "python" || spec.command[0] == "python3" {
        runtime.interpreter(&spec.env_dir)
    } else {
        PathBuf::from(&spec.command[0])
    };

    let mut command = tokio::process::Command::new(&program);
    command
        .args(&spec.command[1..])
        .current_dir(&spec.workdir)
        .envs(spec.env.iter())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| StackError::LaunchError {
        service: spec.name.clone(),
        message: format!("Failed to spawn {}: {}", program.display(), e),
    })?;

    let report = LaunchReport {
        service: spec.name.clone(),
        pid: child.id(),
        started_at: chrono::Utc::now(),
        ready_after: None,
    };

    tracing::info!("🚀 Started '{}' (pid {:?})", spec.name, report.pid);

    Ok(ServiceHandle { child, report })
}

pub struct LocalStackPipeline<E: EnvRuntime, C: ConfigProvider> {
    runtime: E,
    config: C,
    client: reqwest::Client,
}

impl<E: EnvRuntime, C: ConfigProvider> LocalStackPipeline<E, C> {
    pub fn new(runtime: E, config: C) -> Self {
        Self {
            runtime,
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl<E: EnvRuntime, C: ConfigProvider> StackPipeline for LocalStackPipeline<E, C> {
    async fn provision(&self) -> Result<Vec<ProvisionReport>> {
        let mut reports = Vec::new();
        for spec in [self.config.backend_spec(), self.config.frontend_spec()] {
            let report = ensure_env(&self.runtime, &spec, self.config.force_provision()).await?;
            reports.push(report);
        }
        Ok(reports)
    }

    async fn start_backend(&self) -> Result<ServiceHandle> {
        let spec = self.config.backend_spec();
        let mut handle = spawn_service(&self.runtime, &spec)?;

        match readiness::wait_until_ready(
            &self.client,
            &spec.name,
            &spec.readiness,
            &mut handle.child,
        )
        .await
        {
            Ok(ready_after) => {
                handle.report.ready_after = ready_after;
                if let Some(elapsed) = ready_after {
                    tracing::info!("✅ '{}' ready after {:?}", spec.name, elapsed);
                }
                Ok(handle)
            }
            Err(e) => {
                // 後端沒起來，前端絕對不能啟動
                let _ = handle.child.kill().await;
                Err(e)
            }
        }
    }

    async fn run_frontend(&self, mut backend: ServiceHandle) -> Result<StackOutcome> {
        let spec = self.config.frontend_spec();
        let mut frontend = spawn_service(&self.runtime, &spec)?;

        if let Some(url) = spec.url.clone() {
            let client = self.client.clone();
            tokio::spawn(async move {
                for _ in 0..60 {
                    if readiness::http_ready(&client, &url, Duration::from_secs(1)).await {
                        tracing::info!("🌐 Frontend reachable at {}", url);
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            });
        }

        let status = tokio::select! {
            status = frontend.child.wait() => Some(status?),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("🛑 Ctrl-C received, shutting down the stack");
                let _ = frontend.child.kill().await;
                None
            }
        };

        tracing::info!("🛑 Stopping '{}'", backend.report.service);
        let _ = backend.child.kill().await;

        Ok(StackOutcome {
            provision: Vec::new(),
            backend: backend.report,
            frontend: frontend.report,
            exit_code: status.and_then(|s| s.code()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ReadinessSpec;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::TempDir;

    struct ScriptRuntime;

    impl EnvRuntime for ScriptRuntime {
        async fn create_env(&self, env_dir: &Path) -> Result<()> {
            std::fs::create_dir_all(env_dir)?;
            Ok(())
        }

        async fn install(&self, env_dir: &Path, manifest: &Path) -> Result<()> {
            let deps = std::fs::read(manifest)?;
            std::fs::write(env_dir.join("installed.txt"), deps)?;
            Ok(())
        }

        fn interpreter(&self, env_dir: &Path) -> PathBuf {
            env_dir.join("bin/python")
        }
    }

    struct TestConfig {
        backend: ServiceSpec,
        frontend: ServiceSpec,
    }

    impl ConfigProvider for TestConfig {
        fn backend_spec(&self) -> ServiceSpec {
            self.backend.clone()
        }

        fn frontend_spec(&self) -> ServiceSpec {
            self.frontend.clone()
        }

        fn python_binary(&self) -> &str {
            "python3"
        }

        fn force_provision(&self) -> bool {
            false
        }
    }

    fn shell_spec(dir: &Path, name: &str, script: &str, readiness: ReadinessSpec) -> ServiceSpec {
        let workdir = dir.join(name);
        std::fs::create_dir_all(&workdir).unwrap();
        std::fs::write(workdir.join("requirements.txt"), "requests\n").unwrap();
        ServiceSpec {
            name: name.to_string(),
            workdir: workdir.clone(),
            env_dir: workdir.join(".venv"),
            manifest: workdir.join("requirements.txt"),
            command: vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            env: HashMap::new(),
            url: None,
            readiness,
        }
    }

    #[tokio::test]
    async fn test_provision_creates_both_environments() {
        let dir = TempDir::new().unwrap();
        let config = TestConfig {
            backend: shell_spec(dir.path(), "backend", "sleep 30", ReadinessSpec::None),
            frontend: shell_spec(dir.path(), "frontend", "exit 0", ReadinessSpec::None),
        };
        let pipeline = LocalStackPipeline::new(ScriptRuntime, config);

        let reports = pipeline.provision().await.unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.created && r.installed));
        assert!(dir.path().join("backend/.venv/installed.txt").exists());
        assert!(dir.path().join("frontend/.venv/installed.txt").exists());
    }

    #[tokio::test]
    async fn test_start_backend_gates_on_readiness() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start();
        let health_mock = server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).body(r#"{"status":"healthy"}"#);
        });

        let readiness = ReadinessSpec::Http {
            url: server.url("/health"),
            timeout: Duration::from_secs(5),
            interval: Duration::from_millis(50),
        };
        let config = TestConfig {
            backend: shell_spec(dir.path(), "backend", "sleep 30", readiness),
            frontend: shell_spec(dir.path(), "frontend", "exit 0", ReadinessSpec::None),
        };
        let pipeline = LocalStackPipeline::new(ScriptRuntime, config);

        let mut handle = pipeline.start_backend().await.unwrap();

        assert!(handle.report.ready_after.is_some());
        assert!(health_mock.hits() >= 1);
        let _ = handle.child.kill().await;
    }

    #[tokio::test]
    async fn test_start_backend_fails_when_spawn_fails() {
        let dir = TempDir::new().unwrap();
        let mut backend = shell_spec(dir.path(), "backend", "sleep 30", ReadinessSpec::None);
        backend.command = vec!["/definitely/not/a/binary".to_string()];
        let config = TestConfig {
            backend,
            frontend: shell_spec(dir.path(), "frontend", "exit 0", ReadinessSpec::None),
        };
        let pipeline = LocalStackPipeline::new(ScriptRuntime, config);

        let err = pipeline.start_backend().await.unwrap_err();

        assert!(matches!(err, StackError::LaunchError { .. }));
    }

    #[tokio::test]
    async fn test_start_backend_detects_early_exit() {
        let dir = TempDir::new().unwrap();
        let readiness = ReadinessSpec::Http {
            url: "http://127.0.0.1:1/health".to_string(),
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(50),
        };
        let config = TestConfig {
            backend: shell_spec(dir.path(), "backend", "exit 3", readiness),
            frontend: shell_spec(dir.path(), "frontend", "exit 0", ReadinessSpec::None),
        };
        let pipeline = LocalStackPipeline::new(ScriptRuntime, config);

        let err = pipeline.start_backend().await.unwrap_err();

        assert!(matches!(err, StackError::ProcessExited { .. }));
    }

    #[tokio::test]
    async fn test_run_frontend_reaps_backend_when_frontend_exits() {
        let dir = TempDir::new().unwrap();
        let config = TestConfig {
            backend: shell_spec(dir.path(), "backend", "sleep 30", ReadinessSpec::None),
            frontend: shell_spec(dir.path(), "frontend", "exit 0", ReadinessSpec::None),
        };
        let pipeline = LocalStackPipeline::new(ScriptRuntime, config);

        let backend = pipeline.start_backend().await.unwrap();
        let outcome = pipeline.run_frontend(backend).await.unwrap();

        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.backend.service, "backend");
        assert_eq!(outcome.frontend.service, "frontend");
    }

    #[tokio::test]
    async fn test_frontend_exit_code_is_propagated() {
        let dir = TempDir::new().unwrap();
        let config = TestConfig {
            backend: shell_spec(dir.path(), "backend", "sleep 30", ReadinessSpec::None),
            frontend: shell_spec(dir.path(), "frontend", "exit 7", ReadinessSpec::None),
        };
        let pipeline = LocalStackPipeline::new(ScriptRuntime, config);

        let backend = pipeline.start_backend().await.unwrap();
        let outcome = pipeline.run_frontend(backend).await.unwrap();

        assert_eq!(outcome.exit_code, Some(7));
    }
}
