use small_stack::config::sequence_config::SequenceConfig;
use small_stack::core::sequence::{shutdown_all, ServiceSequence, SpecService};
use small_stack::core::{EnvRuntime, ReadinessSpec};
use small_stack::utils::validation::Validate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct ScriptRuntime;

impl EnvRuntime for ScriptRuntime {
    async fn create_env(&self, env_dir: &Path) -> small_stack::Result<()> {
        std::fs::create_dir_all(env_dir)?;
        Ok(())
    }

    async fn install(&self, env_dir: &Path, manifest: &Path) -> small_stack::Result<()> {
        let deps = std::fs::read(manifest)?;
        std::fs::write(env_dir.join("installed.txt"), deps)?;
        Ok(())
    }

    fn interpreter(&self, env_dir: &Path) -> PathBuf {
        env_dir.join("bin/python")
    }
}

/// 產生一份用 /bin/sh 當服務的序列配置，服務都在 TempDir 裡
fn sequence_toml(workspace: &Path) -> String {
    for name in ["hub", "backend", "frontend"] {
        let workdir = workspace.join(name);
        std::fs::create_dir_all(&workdir).unwrap();
        std::fs::write(workdir.join("requirements.txt"), "requests\n").unwrap();
    }

    format!(
        r#"
[launch]
name = "test-stack"
description = "Three shell services"
version = "1.0"
execution_order = ["hub", "backend", "frontend"]

[[services]]
name = "hub"
workdir = "{root}/hub"
command = ["/bin/sh", "-c", "sleep 30"]

[[services]]
name = "backend"
workdir = "{root}/backend"
command = ["/bin/sh", "-c", "sleep 30"]
depends_on = ["hub"]

[[services]]
name = "frontend"
workdir = "{root}/frontend"
command = ["/bin/sh", "-c", "sleep 30"]
depends_on = ["backend"]
"#,
        root = workspace.display()
    )
}

#[tokio::test]
async fn test_sequence_from_config_launches_in_order() {
    let workspace = TempDir::new().unwrap();
    let config = SequenceConfig::from_toml_str(&sequence_toml(workspace.path())).unwrap();
    config.validate().unwrap();

    let runtime = Arc::new(ScriptRuntime);
    let mut sequence = ServiceSequence::new("test_run".to_string());
    for definition in config.get_enabled_services() {
        let spec = config.service_spec(definition);
        sequence.add_service(Box::new(SpecService::new(
            spec,
            runtime.clone(),
            config.force_provision(),
        )));
    }

    let (mut handles, context) = sequence.execute_all().await.unwrap();

    // 嚴格依宣告順序
    let launched: Vec<&str> = context.reports.iter().map(|r| r.service.as_str()).collect();
    assert_eq!(launched, vec!["hub", "backend", "frontend"]);

    // 每個服務的環境都被佈建
    for name in ["hub", "backend", "frontend"] {
        assert!(workspace
            .path()
            .join(name)
            .join(".venv/installed.txt")
            .exists());
    }

    // 啟動時間單調遞增
    for pair in context.reports.windows(2) {
        assert!(pair[0].started_at <= pair[1].started_at);
    }

    shutdown_all(&mut handles).await;
    assert!(handles.is_empty());
}

#[tokio::test]
async fn test_sequence_stops_at_first_failing_service() {
    let workspace = TempDir::new().unwrap();
    let config = SequenceConfig::from_toml_str(&sequence_toml(workspace.path())).unwrap();

    let runtime = Arc::new(ScriptRuntime);
    let mut sequence = ServiceSequence::new("failing_run".to_string());

    for definition in config.get_enabled_services() {
        let mut spec = config.service_spec(definition);
        if spec.name == "backend" {
            // 後端立刻退出，而就緒條件永遠等不到
            spec.command = vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "exit 1".to_string(),
            ];
            spec.readiness = ReadinessSpec::Http {
                url: "http://127.0.0.1:1/health".to_string(),
                timeout: std::time::Duration::from_secs(30),
                interval: std::time::Duration::from_millis(50),
            };
        }
        sequence.add_service(Box::new(SpecService::new(
            spec,
            runtime.clone(),
            false,
        )));
    }

    let err = sequence.execute_all().await.unwrap_err();

    assert!(matches!(
        err,
        small_stack::StackError::ProcessExited { .. }
    ));
    // 排在失敗服務後面的 frontend 不該有環境以外的動靜：
    // 它根本沒被佈建
    assert!(!workspace
        .path()
        .join("frontend/.venv/installed.txt")
        .exists());
}

#[tokio::test]
async fn test_summary_reflects_launched_services() {
    let workspace = TempDir::new().unwrap();
    let config = SequenceConfig::from_toml_str(&sequence_toml(workspace.path())).unwrap();

    let runtime = Arc::new(ScriptRuntime);
    let mut sequence = ServiceSequence::new("summary_run".to_string());
    for definition in config.get_enabled_services() {
        sequence.add_service(Box::new(SpecService::new(
            config.service_spec(definition),
            runtime.clone(),
            false,
        )));
    }

    let (mut handles, context) = sequence.execute_all().await.unwrap();
    let summary = ServiceSequence::get_execution_summary(&context.reports);

    assert_eq!(
        summary.get("total_services").unwrap(),
        &serde_json::Value::Number(3.into())
    );
    let launched = summary
        .get("launched_services")
        .unwrap()
        .as_array()
        .unwrap();
    assert_eq!(launched.len(), 3);

    shutdown_all(&mut handles).await;
}
