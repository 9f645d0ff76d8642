//! devx-kube
//!
//! サービス定義から Kubernetes マニフェストを生成し、`kubectl apply` で適用します。

pub mod apply;
pub mod error;
pub mod manifest;

pub use apply::{ApplyRequest, ClusterApplier, Kubectl};
pub use error::{KubeError, Result};
pub use manifest::{KubeManifestBuilder, ManifestInput, ManifestSynthesizer, sanitize_host};
