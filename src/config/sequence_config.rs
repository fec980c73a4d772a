use crate::config::toml_config::ReadinessSection;
use crate::domain::model::{ReadinessSpec, ServiceSpec};
use crate::utils::error::{Result, StackError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub launch: LaunchInfo,
    pub services: Vec<ServiceDefinition>,
    pub global: Option<GlobalSection>,
    pub monitoring: Option<MonitoringSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchInfo {
    pub name: String,
    pub description: String,
    pub version: String,
    pub execution_order: Vec<String>, // 服務啟動順序
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub workdir: String,
    pub env_dir: Option<String>,
    pub manifest: Option<String>,
    pub command: Vec<String>,
    pub url: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub readiness: Option<ReadinessSection>,
    pub depends_on: Option<Vec<String>>, // 依賴的其他服務
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSection {
    pub python: Option<String>,
    pub force_provision: Option<bool>,
    pub shared_environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
    pub log_level: Option<String>,
    pub export_metrics: Option<bool>,
    pub metrics_file: Option<String>,
}

impl SequenceConfig {
    /// 從 TOML 檔案載入序列配置
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(StackError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析序列配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| StackError::ConfigValidationError {
            field: "sequence_toml_parsing".to_string(),
            message: format!("Sequence TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證序列配置
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("launch.name", &self.launch.name)?;

        if self.launch.execution_order.is_empty() {
            return Err(StackError::MissingConfigError {
                field: "launch.execution_order".to_string(),
            });
        }

        // 服務名稱不可重複
        let mut seen = std::collections::HashSet::new();
        for service in &self.services {
            if !seen.insert(service.name.as_str()) {
                return Err(StackError::InvalidConfigValueError {
                    field: "services.name".to_string(),
                    value: service.name.clone(),
                    reason: "Duplicate service name".to_string(),
                });
            }
        }

        // 啟動順序中的服務都要存在
        for name in &self.launch.execution_order {
            if self.get_service(name).is_none() {
                return Err(StackError::InvalidConfigValueError {
                    field: "launch.execution_order".to_string(),
                    value: name.clone(),
                    reason: "Unknown service name".to_string(),
                });
            }
        }

        // 依賴必須存在且排在前面
        for service in &self.services {
            if let Some(deps) = &service.depends_on {
                let own_position = self.order_position(&service.name);
                for dep in deps {
                    let dep_position = self.order_position(dep);
                    match (own_position, dep_position) {
                        (_, None) => {
                            return Err(StackError::InvalidConfigValueError {
                                field: format!("services.{}.depends_on", service.name),
                                value: dep.clone(),
                                reason: "Dependency is not in the execution order".to_string(),
                            });
                        }
                        (Some(own), Some(dep_pos)) if dep_pos >= own => {
                            return Err(StackError::InvalidConfigValueError {
                                field: format!("services.{}.depends_on", service.name),
                                value: dep.clone(),
                                reason: "Dependency must launch before its dependent".to_string(),
                            });
                        }
                        _ => {}
                    }
                }
            }

            validation::validate_path(
                &format!("services.{}.workdir", service.name),
                &service.workdir,
            )?;

            if service.command.is_empty() {
                return Err(StackError::MissingConfigError {
                    field: format!("services.{}.command", service.name),
                });
            }

            if let Some(url) = &service.url {
                validation::validate_url(&format!("services.{}.url", service.name), url)?;
            }

            if let Some(readiness) = &service.readiness {
                readiness.to_spec(&service.name)?;
            }
        }

        Ok(())
    }

    pub fn get_service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name == name)
    }

    fn order_position(&self, name: &str) -> Option<usize> {
        self.launch.execution_order.iter().position(|n| n == name)
    }

    /// 依啟動順序回傳啟用的服務
    pub fn get_enabled_services(&self) -> Vec<&ServiceDefinition> {
        self.launch
            .execution_order
            .iter()
            .filter_map(|name| self.get_service(name))
            .filter(|s| s.enabled.unwrap_or(true))
            .collect()
    }

    /// 把服務定義轉成執行期的 ServiceSpec
    pub fn service_spec(&self, definition: &ServiceDefinition) -> ServiceSpec {
        let workdir = PathBuf::from(&definition.workdir);
        let env_dir = definition
            .env_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| workdir.join(".venv"));
        let manifest = definition
            .manifest
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| workdir.join("requirements.txt"));

        // 共享環境變數在前，服務自己的覆蓋
        let mut env = self
            .global
            .as_ref()
            .and_then(|g| g.shared_environment.clone())
            .unwrap_or_default();
        if let Some(service_env) = &definition.env {
            env.extend(service_env.clone());
        }

        let readiness = definition
            .readiness
            .as_ref()
            .and_then(|r| r.to_spec(&definition.name).ok())
            .unwrap_or(ReadinessSpec::None);

        ServiceSpec {
            name: definition.name.clone(),
            workdir,
            env_dir,
            manifest,
            command: definition.command.clone(),
            env,
            url: definition.url.clone(),
            readiness,
        }
    }

    pub fn python(&self) -> &str {
        self.global
            .as_ref()
            .and_then(|g| g.python.as_deref())
            .unwrap_or("python3")
    }

    pub fn force_provision(&self) -> bool {
        self.global
            .as_ref()
            .and_then(|g| g.force_provision)
            .unwrap_or(false)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for SequenceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
[launch]
name = "full-stack"
description = "Hub, backend and frontend"
version = "1.0.0"
execution_order = ["hub", "backend", "frontend"]

[[services]]
name = "hub"
workdir = "./hub"
command = ["python", "main.py"]

[[services]]
name = "backend"
workdir = "./backend"
command = ["python", "server.py"]
depends_on = ["hub"]

[services.readiness]
kind = "http"
url = "http://127.0.0.1:8000/health"

[[services]]
name = "frontend"
workdir = "./frontend"
command = ["python", "app.py"]
url = "http://127.0.0.1:8080"
depends_on = ["backend"]
"#
    }

    #[test]
    fn test_parse_and_validate_sequence_config() {
        let config = SequenceConfig::from_toml_str(sample_toml()).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.launch.execution_order.len(), 3);
        assert_eq!(config.get_enabled_services().len(), 3);

        let backend = config.get_service("backend").unwrap();
        let spec = config.service_spec(backend);
        assert_eq!(spec.env_dir, PathBuf::from("./backend/.venv"));
        assert!(matches!(spec.readiness, ReadinessSpec::Http { .. }));
    }

    #[test]
    fn test_unknown_order_entry_is_rejected() {
        let toml_content = r#"
[launch]
name = "bad"
description = "order references a ghost"
version = "1.0"
execution_order = ["ghost"]

[[services]]
name = "backend"
workdir = "./backend"
command = ["python", "server.py"]
"#;

        let config = SequenceConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, StackError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_dependency_must_precede_dependent() {
        let toml_content = r#"
[launch]
name = "bad"
description = "dependency launches after its dependent"
version = "1.0"
execution_order = ["frontend", "backend"]

[[services]]
name = "backend"
workdir = "./backend"
command = ["python", "server.py"]

[[services]]
name = "frontend"
workdir = "./frontend"
command = ["python", "app.py"]
depends_on = ["backend"]
"#;

        let config = SequenceConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_service_names_are_rejected() {
        let toml_content = r#"
[launch]
name = "bad"
description = "two services share a name"
version = "1.0"
execution_order = ["backend"]

[[services]]
name = "backend"
workdir = "./backend"
command = ["python", "server.py"]

[[services]]
name = "backend"
workdir = "./backend2"
command = ["python", "server.py"]
"#;

        let config = SequenceConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_services_are_filtered_out() {
        let toml_content = r#"
[launch]
name = "partial"
description = "one service disabled"
version = "1.0"
execution_order = ["backend", "frontend"]

[[services]]
name = "backend"
workdir = "./backend"
command = ["python", "server.py"]

[[services]]
name = "frontend"
workdir = "./frontend"
command = ["python", "app.py"]
enabled = false
"#;

        let config = SequenceConfig::from_toml_str(toml_content).unwrap();
        let enabled = config.get_enabled_services();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "backend");
    }

    #[test]
    fn test_shared_environment_is_merged() {
        let toml_content = r#"
[launch]
name = "env-test"
description = "shared env"
version = "1.0"
execution_order = ["backend"]

[global]
python = "python3.11"

[global.shared_environment]
STACK_MODE = "development"

[[services]]
name = "backend"
workdir = "./backend"
command = ["python", "server.py"]

[services.env]
PORT = "8000"
"#;

        let config = SequenceConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.python(), "python3.11");

        let spec = config.service_spec(config.get_service("backend").unwrap());
        assert_eq!(spec.env.get("STACK_MODE").unwrap(), "development");
        assert_eq!(spec.env.get("PORT").unwrap(), "8000");
    }
}
