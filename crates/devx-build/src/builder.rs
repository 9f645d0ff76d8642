//! イメージのビルドとプッシュ
//!
//! Docker CLI を `tokio::process::Command` で呼び出します。

use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use devx_core::{Image, Registry, normalize_path};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// 1イメージ分のビルド要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// `{hostname}/{repository}/{imageName}:{tag}`
    pub tag: String,
    /// Dockerfile の絶対パス
    pub dockerfile: PathBuf,
    /// ビルドコンテキストの絶対パス（コマンドの作業ディレクトリ）
    pub context: PathBuf,
    pub build_args: BTreeMap<String, String>,
    pub target: Option<String>,
}

impl BuildRequest {
    /// イメージ定義から要求を作成
    ///
    /// `dockerfile` と `context` は設定ファイルのディレクトリ基準で解決する。
    pub fn new(image: &Image, registry: &Registry, working_dir: &Path) -> Self {
        Self {
            tag: image.full_name(registry),
            dockerfile: normalize_path(&working_dir.join(&image.dockerfile)),
            context: normalize_path(&working_dir.join(&image.context)),
            build_args: image.build_args.clone(),
            target: image.build_target().map(str::to_string),
        }
    }

    /// `docker` に渡す引数
    pub fn docker_args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--pull".to_string(),
            "--push".to_string(),
            format!("--tag={}", self.tag),
        ];
        if let Some(target) = &self.target {
            args.push(format!("--target={}", target));
        }
        args.push(format!("--file={}", self.dockerfile.display()));
        for (key, value) in &self.build_args {
            args.push(format!("--build-arg={}={}", key, value));
        }
        args.push(".".to_string());
        args
    }
}

/// コンテナツールの抽象化
///
/// 実装は Docker CLI。テストではフェイクに差し替える。
#[async_trait]
pub trait ContainerTool: Send + Sync {
    /// レジストリにログイン
    async fn login(&self, hostname: &str, username: &str, password: &str) -> BuildResult<()>;

    /// イメージをビルドしてプッシュ
    async fn build_and_push(&self, request: &BuildRequest) -> BuildResult<()>;
}

/// Docker CLI wrapper
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> BuildError {
        BuildError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl ContainerTool for DockerCli {
    #[tracing::instrument(skip(self, password))]
    async fn login(&self, hostname: &str, username: &str, password: &str) -> BuildResult<()> {
        let mut child = Command::new(&self.program)
            .arg("login")
            .arg(format!("--username={}", username))
            .arg("--password-stdin")
            .arg(hostname)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // パスワードは引数に載せず stdin で渡す
        if let Some(mut stdin) = child.stdin.take() {
            // 書き込み失敗（早期終了など）は終了コードで判定する
            stdin.write_all(password.as_bytes()).await.ok();
            stdin.shutdown().await.ok();
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::LoginFailed {
                registry: hostname.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        tracing::debug!("Logged in to {}", hostname);
        Ok(())
    }

    #[tracing::instrument(skip(self, request), fields(tag = %request.tag))]
    async fn build_and_push(&self, request: &BuildRequest) -> BuildResult<()> {
        let args = request.docker_args();
        tracing::debug!(
            "Running: {} {} (cwd: {})",
            self.program,
            args.join(" "),
            request.context.display()
        );

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&request.context)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::BuildFailed {
                tag: request.tag.clone(),
                message: stderr.trim().to_string(),
            });
        }

        tracing::debug!("Pushed {}", request.tag);
        Ok(())
    }
}
