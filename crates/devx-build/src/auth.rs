//! レジストリのログイン状態確認
//!
//! Docker config.json の `auths` を参照し、既にログイン済みのレジストリを判定します。

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Docker config.json の構造（必要な部分のみ）
#[derive(Debug, Deserialize)]
struct DockerConfig {
    /// 認証情報 (レジストリ -> 任意のエントリ)
    #[serde(default)]
    auths: HashMap<String, serde_json::Value>,
}

/// Docker クライアントの認証情報を参照
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    config_path: PathBuf,
}

impl Default for RegistryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryAuth {
    /// 新しい RegistryAuth を作成
    ///
    /// `DOCKER_CONFIG` が設定されていればそのディレクトリ、なければ ~/.docker/config.json を使用
    pub fn new() -> Self {
        let config_path = std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json");

        Self { config_path }
    }

    /// 指定したパスの config.json を使用
    pub fn with_config_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }

    /// レジストリに既にログイン済みか
    ///
    /// `auths` のキーにホスト名を含むものがあればログイン済みとみなす。
    /// Docker Hub は `index.docker.io` として記録されるため読み替える。
    /// config.json が読めない場合は未ログイン扱い。
    pub fn is_logged_in(&self, hostname: &str) -> bool {
        let normalized = normalize_registry(hostname);

        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Docker config.json not readable at {:?}: {}", self.config_path, e);
                return false;
            }
        };

        let config: DockerConfig = match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to parse {:?}: {}", self.config_path, e);
                return false;
            }
        };

        config.auths.keys().any(|host| host.contains(normalized))
    }
}

/// Docker Hub のホスト名を config.json 上の表記に揃える
pub fn normalize_registry(hostname: &str) -> &str {
    if hostname == "docker.io" {
        "index.docker.io"
    } else {
        hostname
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    fn auth_with(content: &str) -> (tempfile::TempDir, RegistryAuth) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, content).unwrap();
        (dir, RegistryAuth::with_config_path(path))
    }

    #[test]
    fn test_normalize_registry() {
        assert_eq!(normalize_registry("docker.io"), "index.docker.io");
        assert_eq!(normalize_registry("ghcr.io"), "ghcr.io");
    }

    #[test]
    fn test_docker_hub_is_matched_as_index() {
        let (_dir, auth) =
            auth_with(r#"{"auths": {"https://index.docker.io/v1/": {"auth": "eDp5"}}}"#);
        assert!(auth.is_logged_in("docker.io"));
        assert!(!auth.is_logged_in("ghcr.io"));
    }

    #[test]
    fn test_other_registry_substring_match() {
        let (_dir, auth) = auth_with(r#"{"auths": {"ghcr.io": {}}, "credsStore": "desktop"}"#);
        assert!(auth.is_logged_in("ghcr.io"));
    }

    #[test]
    fn test_missing_or_broken_config_is_not_logged_in() {
        let dir = tempdir().unwrap();
        let auth = RegistryAuth::with_config_path(dir.path().join("missing.json"));
        assert!(!auth.is_logged_in("docker.io"));

        let (_dir, broken) = auth_with("{ not json");
        assert!(!broken.is_logged_in("docker.io"));

        let (_dir, empty) = auth_with("{}");
        assert!(!empty.is_logged_in("docker.io"));
    }

    #[test]
    #[serial]
    fn test_docker_config_env_overrides_home() {
        let dir = tempdir().unwrap();
        temp_env::with_var("DOCKER_CONFIG", Some(dir.path()), || {
            let auth = RegistryAuth::new();
            assert_eq!(auth.config_path(), dir.path().join("config.json"));
        });
    }
}
