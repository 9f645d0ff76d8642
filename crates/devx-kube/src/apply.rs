//! kubectl wrapper
//!
//! マニフェストを stdin から `kubectl apply` に流し込みます。

use crate::error::{KubeError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// 1サービス分の適用要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    /// kubeconfig 内のコンテキスト名
    pub context: String,
    /// `KUBECONFIG` に渡すファイルパス
    pub kubeconfig: PathBuf,
    pub manifest: String,
}

impl ApplyRequest {
    pub fn args(&self) -> Vec<String> {
        vec![
            format!("--context={}", self.context),
            "apply".to_string(),
            "--filename=-".to_string(),
        ]
    }
}

/// クラスタへの適用の抽象化
#[async_trait]
pub trait ClusterApplier: Send + Sync {
    async fn apply(&self, request: &ApplyRequest) -> Result<()>;
}

/// kubectl CLI wrapper
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: String,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl Kubectl {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ClusterApplier for Kubectl {
    #[tracing::instrument(skip(self, request), fields(context = %request.context))]
    async fn apply(&self, request: &ApplyRequest) -> Result<()> {
        let args = request.args();
        tracing::debug!(
            "Running: KUBECONFIG={} {} {}",
            request.kubeconfig.display(),
            self.program,
            args.join(" ")
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .env("KUBECONFIG", &request.kubeconfig)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| KubeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // 書き込み失敗（早期終了など）は終了コードで判定する
            stdin.write_all(request.manifest.as_bytes()).await.ok();
            stdin.shutdown().await.ok();
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KubeError::ApplyFailed {
                context: request.context.clone(),
                message: stderr.trim().to_string(),
            });
        }

        tracing::debug!("{}", String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }
}
