pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// ユーザー設定
///
/// ```yaml
/// docker: podman
/// kubectl: /usr/local/bin/kubectl
/// update_check: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Docker CLI のプログラム名
    pub docker: String,
    /// kubectl のプログラム名
    pub kubectl: String,
    /// `x version` 実行時に新しいバージョンを確認するか
    pub update_check: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            docker: "docker".to_string(),
            kubectl: "kubectl".to_string(),
            update_check: true,
        }
    }
}

/// devx の設定ディレクトリを取得（なければ作成）
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("devx");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// 設定ファイルのパス
///
/// 1. 環境変数 DEVX_CONFIG_PATH (直接パス指定)
/// 2. ~/.config/devx/config.yaml
pub fn settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("DEVX_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("devx")
        .join("config.yaml"))
}

/// 設定を読み込む
///
/// ファイルがなければデフォルト値。その後 DEVX_DOCKER / DEVX_KUBECTL で上書きする。
pub fn load_settings() -> Result<Settings> {
    let path = settings_path()?;
    let mut settings = load_settings_from(&path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// 指定したファイルから設定を読み込む（環境変数による上書きなし）
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!("Settings file not found at {:?}, using defaults", path);
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(docker) = std::env::var("DEVX_DOCKER")
        && !docker.is_empty()
    {
        settings.docker = docker;
    }
    if let Ok(kubectl) = std::env::var("DEVX_KUBECTL")
        && !kubectl.is_empty()
    {
        settings.kubectl = kubectl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.docker, "docker");
        assert_eq!(settings.kubectl, "kubectl");
        assert!(settings.update_check);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&temp_dir.path().join("none.yaml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "docker: podman\n").unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.docker, "podman");
        assert_eq!(settings.kubectl, "kubectl");
        assert!(settings.update_check);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "update_check: [not, a, bool]\n").unwrap();

        assert!(matches!(
            load_settings_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_load_settings_env_path_and_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.yaml");
        fs::write(&path, "docker: podman\nupdate_check: false\n").unwrap();

        temp_env::with_vars(
            [
                ("DEVX_CONFIG_PATH", Some(path.to_str().unwrap())),
                ("DEVX_DOCKER", None),
                ("DEVX_KUBECTL", Some("/opt/bin/kubectl")),
            ],
            || {
                let settings = load_settings().unwrap();
                assert_eq!(settings.docker, "podman");
                assert_eq!(settings.kubectl, "/opt/bin/kubectl");
                assert!(!settings.update_check);
            },
        );
    }

    #[test]
    #[serial]
    fn test_docker_env_override_wins_over_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.yaml");
        fs::write(&path, "docker: podman\n").unwrap();

        temp_env::with_vars(
            [
                ("DEVX_CONFIG_PATH", Some(path.to_str().unwrap())),
                ("DEVX_DOCKER", Some("nerdctl")),
            ],
            || {
                assert_eq!(load_settings().unwrap().docker, "nerdctl");
            },
        );
    }

    #[test]
    #[serial]
    fn test_get_config_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        temp_env::with_var("XDG_CONFIG_HOME", Some(temp_dir.path()), || {
            let config_dir = get_config_dir().unwrap();
            assert!(config_dir.ends_with("devx"));
            assert!(config_dir.exists());
        });
    }
}
