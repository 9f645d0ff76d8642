//! レジストリログインのメモ化
//!
//! 同じホスト名へのログインは1回の実行につき最大1回。並行に要求された場合も
//! 後続は最初の試行の完了を待ち、その結果（失敗を含む）を共有します。

use crate::auth::RegistryAuth;
use crate::builder::ContainerTool;
use crate::error::{BuildError, BuildResult};
use colored::Colorize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type LoginOutcome = Arc<OnceCell<Result<(), String>>>;

/// ホスト名ごとのログイン結果
#[derive(Debug, Default)]
pub struct LoginCache {
    entries: Mutex<HashMap<String, LoginOutcome>>,
}

impl LoginCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `hostname` について `login` を高々1回だけ実行する
    ///
    /// 既に試行済み（または試行中）なら `login` は呼ばれず、その結果を待って返す。
    pub async fn ensure<F, Fut>(&self, hostname: &str, login: F) -> BuildResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BuildResult<()>>,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.entry(hostname.to_string()).or_default().clone()
        };

        let outcome = cell
            .get_or_init(move || async move {
                login().await.map_err(|e| match e {
                    BuildError::LoginFailed { message, .. } => message,
                    other => other.to_string(),
                })
            })
            .await;

        outcome.clone().map_err(|message| BuildError::LoginFailed {
            registry: hostname.to_string(),
            message,
        })
    }

    /// ログイン済みでなければ Docker クライアントでログイン
    pub async fn login(
        &self,
        tool: &dyn ContainerTool,
        auth: &RegistryAuth,
        hostname: &str,
        username: &str,
        password: &str,
    ) -> BuildResult<()> {
        self.ensure(hostname, move || async move {
            if auth.is_logged_in(hostname) {
                println!("  {} Already logged in to {}", "✓".green(), hostname.cyan());
                return Ok(());
            }
            println!("  🔑 Logging in to {}...", hostname.cyan());
            tool.login(hostname, username, password).await?;
            println!("  {} Logged in to {}", "✓".green(), hostname.cyan());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuildRequest;
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingTool {
        logins: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ContainerTool for CountingTool {
        async fn login(&self, hostname: &str, _username: &str, _password: &str) -> BuildResult<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(BuildError::LoginFailed {
                    registry: hostname.to_string(),
                    message: "denied".to_string(),
                });
            }
            Ok(())
        }

        async fn build_and_push(&self, _request: &BuildRequest) -> BuildResult<()> {
            Ok(())
        }
    }

    fn logged_out_auth(dir: &tempfile::TempDir) -> RegistryAuth {
        RegistryAuth::with_config_path(dir.path().join("config.json"))
    }

    #[tokio::test]
    async fn test_concurrent_logins_run_once() {
        let dir = tempdir().unwrap();
        let auth = logged_out_auth(&dir);
        let tool = CountingTool::default();
        let cache = LoginCache::new();

        let attempts = (0..5).map(|_| cache.login(&tool, &auth, "docker.io", "u", "p"));
        let results = join_all(attempts).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(tool.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_retried() {
        let dir = tempdir().unwrap();
        let auth = logged_out_auth(&dir);
        let tool = CountingTool {
            fail: true,
            ..Default::default()
        };
        let cache = LoginCache::new();

        let first = cache.login(&tool, &auth, "ghcr.io", "u", "p").await;
        let second = cache.login(&tool, &auth, "ghcr.io", "u", "p").await;

        match first {
            Err(BuildError::LoginFailed { registry, message }) => {
                assert_eq!(registry, "ghcr.io");
                assert_eq!(message, "denied");
            }
            other => panic!("Expected login failure, got {:?}", other),
        }
        assert!(matches!(second, Err(BuildError::LoginFailed { .. })));
        assert_eq!(tool.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hosts_are_independent() {
        let dir = tempdir().unwrap();
        let auth = logged_out_auth(&dir);
        let tool = CountingTool::default();
        let cache = LoginCache::new();

        cache.login(&tool, &auth, "docker.io", "u", "p").await.unwrap();
        cache.login(&tool, &auth, "ghcr.io", "u", "p").await.unwrap();
        assert_eq!(tool.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_already_logged_in_skips_login() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"auths": {"https://index.docker.io/v1/": {}}}"#).unwrap();
        let auth = RegistryAuth::with_config_path(path);
        let tool = CountingTool::default();
        let cache = LoginCache::new();

        cache.login(&tool, &auth, "docker.io", "u", "p").await.unwrap();
        assert_eq!(tool.logins.load(Ordering::SeqCst), 0);
    }
}
