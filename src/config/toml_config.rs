use crate::core::ConfigProvider;
use crate::domain::model::{ReadinessSpec, ServiceSpec};
use crate::utils::error::{Result, StackError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    pub stack: StackInfo,
    pub backend: ServiceSection,
    pub frontend: ServiceSection,
    pub provision: Option<ProvisionSection>,
    pub monitoring: Option<MonitoringSection>,
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackInfo {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    pub workdir: String,
    pub env_dir: Option<String>,
    pub manifest: Option<String>,
    pub command: Vec<String>,
    pub url: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub readiness: Option<ReadinessSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessSection {
    pub kind: String,
    pub url: Option<String>,
    pub address: Option<String>,
    pub delay_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionSection {
    pub python: Option<String>,
    pub force: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl ReadinessSection {
    /// 轉成執行期的就緒條件，缺欄位或 kind 不認得就報錯
    pub fn to_spec(&self, field_prefix: &str) -> Result<ReadinessSpec> {
        let timeout = Duration::from_secs(self.timeout_seconds.unwrap_or(30));
        let interval = Duration::from_millis(self.interval_ms.unwrap_or(250));

        match self.kind.as_str() {
            "none" => Ok(ReadinessSpec::None),
            "delay" => Ok(ReadinessSpec::Delay {
                duration: Duration::from_millis(self.delay_ms.unwrap_or(2000)),
            }),
            "http" => {
                let url = validation::validate_required_field(
                    &format!("{}.readiness.url", field_prefix),
                    &self.url,
                )?;
                validation::validate_url(&format!("{}.readiness.url", field_prefix), url)?;
                Ok(ReadinessSpec::Http {
                    url: url.clone(),
                    timeout,
                    interval,
                })
            }
            "tcp" => {
                let address = validation::validate_required_field(
                    &format!("{}.readiness.address", field_prefix),
                    &self.address,
                )?;
                validation::validate_non_empty_string(
                    &format!("{}.readiness.address", field_prefix),
                    address,
                )?;
                Ok(ReadinessSpec::Tcp {
                    address: address.clone(),
                    timeout,
                    interval,
                })
            }
            other => Err(StackError::InvalidConfigValueError {
                field: format!("{}.readiness.kind", field_prefix),
                value: other.to_string(),
                reason: "Supported kinds: http, tcp, delay, none".to_string(),
            }),
        }
    }

    fn validate(&self, field_prefix: &str) -> Result<()> {
        self.to_spec(field_prefix)?;
        if let Some(timeout) = self.timeout_seconds {
            validation::validate_range(
                &format!("{}.readiness.timeout_seconds", field_prefix),
                timeout,
                1,
                600,
            )?;
        }
        if let Some(interval) = self.interval_ms {
            validation::validate_range(
                &format!("{}.readiness.interval_ms", field_prefix),
                interval,
                10,
                60_000,
            )?;
        }
        Ok(())
    }
}

impl StackConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(StackError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| StackError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BACKEND_PORT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("stack.name", &self.stack.name)?;

        for (prefix, section) in [("backend", &self.backend), ("frontend", &self.frontend)] {
            validation::validate_path(&format!("{}.workdir", prefix), &section.workdir)?;

            if section.command.is_empty() {
                return Err(StackError::MissingConfigError {
                    field: format!("{}.command", prefix),
                });
            }
            validation::validate_non_empty_string(
                &format!("{}.command", prefix),
                &section.command[0],
            )?;

            if let Some(url) = &section.url {
                validation::validate_url(&format!("{}.url", prefix), url)?;
            }

            if let Some(readiness) = &section.readiness {
                readiness.validate(prefix)?;
            }
        }

        if let Some(provision) = &self.provision {
            if let Some(python) = &provision.python {
                validation::validate_non_empty_string("provision.python", python)?;
            }
        }

        Ok(())
    }

    fn service_spec(&self, name: &str, section: &ServiceSection) -> ServiceSpec {
        let workdir = PathBuf::from(&section.workdir);
        let env_dir = section
            .env_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| workdir.join(".venv"));
        let manifest = section
            .manifest
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| workdir.join("requirements.txt"));

        // 全域 [environment] 在前，服務自己的 env 覆蓋
        let mut env = self.environment.clone().unwrap_or_default();
        if let Some(service_env) = &section.env {
            env.extend(service_env.clone());
        }

        let readiness = section
            .readiness
            .as_ref()
            .and_then(|r| r.to_spec(name).ok())
            .unwrap_or(ReadinessSpec::None);

        ServiceSpec {
            name: name.to_string(),
            workdir,
            env_dir,
            manifest,
            command: section.command.clone(),
            env,
            url: section.url.clone(),
            readiness,
        }
    }

    /// 取得 Python 直譯器
    pub fn python(&self) -> &str {
        self.provision
            .as_ref()
            .and_then(|p| p.python.as_deref())
            .unwrap_or("python3")
    }

    /// 是否強制重新安裝依賴
    pub fn force(&self) -> bool {
        self.provision
            .as_ref()
            .and_then(|p| p.force)
            .unwrap_or(false)
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for StackConfig {
    fn backend_spec(&self) -> ServiceSpec {
        self.service_spec("backend", &self.backend)
    }

    fn frontend_spec(&self) -> ServiceSpec {
        self.service_spec("frontend", &self.frontend)
    }

    fn python_binary(&self) -> &str {
        self.python()
    }

    fn force_provision(&self) -> bool {
        self.force()
    }
}

impl Validate for StackConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
