use crate::domain::ports::EnvRuntime;
use crate::utils::error::{Result, StackError};
use std::path::{Path, PathBuf};

/// Python venv 後端：`python -m venv` 建立環境，
/// 用環境自己的直譯器跑 `pip install -r`
#[derive(Debug, Clone)]
pub struct PythonEnvRuntime {
    python: String,
}

impl PythonEnvRuntime {
    pub fn new(python: String) -> Self {
        Self { python }
    }
}

impl EnvRuntime for PythonEnvRuntime {
    async fn create_env(&self, env_dir: &Path) -> Result<()> {
        let output = tokio::process::Command::new(&self.python)
            .args(["-m", "venv"])
            .arg(env_dir)
            .output()
            .await?;

        if !output.status.success() {
            return Err(StackError::ProvisionError {
                service: env_dir.display().to_string(),
                message: format!(
                    "'{} -m venv' failed ({}): {}",
                    self.python,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(())
    }

    async fn install(&self, env_dir: &Path, manifest: &Path) -> Result<()> {
        let output = tokio::process::Command::new(self.interpreter(env_dir))
            .args(["-m", "pip", "install", "-r"])
            .arg(manifest)
            .output()
            .await?;

        if !output.status.success() {
            return Err(StackError::ProvisionError {
                service: env_dir.display().to_string(),
                message: format!(
                    "'pip install -r {}' failed ({}): {}",
                    manifest.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(())
    }

    fn interpreter(&self, env_dir: &Path) -> PathBuf {
        if cfg!(windows) {
            env_dir.join("Scripts").join("python.exe")
        } else {
            env_dir.join("bin").join("python")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpreter_path_is_inside_the_env() {
        let runtime = PythonEnvRuntime::new("python3".to_string());
        let interpreter = runtime.interpreter(Path::new("/tmp/app/.venv"));

        assert!(interpreter.starts_with("/tmp/app/.venv"));
        if cfg!(windows) {
            assert!(interpreter.ends_with("Scripts/python.exe"));
        } else {
            assert!(interpreter.ends_with("bin/python"));
        }
    }
}
