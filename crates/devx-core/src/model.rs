//! デプロイ設定のモデル定義
//!
//! JSON形式：
//! ```json
//! {
//!   "registries": { "dockerhub": { "hostname": "docker.io" } },
//!   "images": { "app": { "registry": "dockerhub", "repository": "me", "imageName": "app" } },
//!   "services": {
//!     "web": { "image": "app", "context": "prod", "namespace": "web" },
//!     "web-staging": { "extends": "web", "namespace": "web-staging" }
//!   }
//! }
//! ```

use schemars::JsonSchema;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// デプロイ設定ドキュメント（JSONファイル1つに対応）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeployDocument {
    /// エディタ補完用のスキーマURL
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub registries: BTreeMap<String, Registry>,
    pub images: BTreeMap<String, Image>,
    pub services: BTreeMap<String, ServiceDef>,
}

/// コンテナレジストリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Registry {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Registry {
    /// ユーザー名とパスワードが両方揃っている場合のみ認証情報を返す
    ///
    /// 空文字列は未設定として扱う。
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((username, password))
    }
}

/// ビルド対象のイメージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// `registries` のキー
    pub registry: String,
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,
    /// マルチステージビルドのターゲット
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
    /// ビルドコンテキスト（設定ファイルのディレクトリからの相対パス）
    #[serde(default = "default_build_context")]
    pub context: String,
    pub repository: String,
    pub image_name: String,
    #[serde(default = "default_tag")]
    pub tag: String,
}

impl Image {
    /// `{hostname}/{repository}/{imageName}:{tag}` 形式の完全なイメージ名
    pub fn full_name(&self, registry: &Registry) -> String {
        format!(
            "{}/{}/{}:{}",
            registry.hostname, self.repository, self.image_name, self.tag
        )
    }

    pub fn build_target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }
}

fn default_dockerfile() -> String {
    "Dockerfile".to_string()
}
fn default_build_context() -> String {
    ".".to_string()
}
fn default_tag() -> String {
    "latest".to_string()
}

/// サービス定義
///
/// `extends` キーの有無で通常定義と継承定義を判別する。
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ServiceDef {
    Extends(ExtendsService),
    Normal(NormalService),
}

impl<'de> Deserialize<'de> for ServiceDef {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("extends").is_some() {
            ExtendsService::deserialize(value)
                .map(ServiceDef::Extends)
                .map_err(de::Error::custom)
        } else {
            NormalService::deserialize(value)
                .map(ServiceDef::Normal)
                .map_err(de::Error::custom)
        }
    }
}

impl From<NormalService> for ServiceDef {
    fn from(service: NormalService) -> Self {
        ServiceDef::Normal(service)
    }
}

impl From<ExtendsService> for ServiceDef {
    fn from(service: ExtendsService) -> Self {
        ServiceDef::Extends(service)
    }
}

/// 継承を含まない（正規化済みの）サービス定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalService {
    /// `images` のキー
    pub image: String,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    /// kubeconfig ファイル（設定ファイルのディレクトリからの相対パス）
    #[serde(default = "default_kubeconfig")]
    pub file: String,
    /// kubectl のコンテキスト名
    pub context: String,
    pub namespace: String,
    #[serde(default = "default_port")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: u16,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub read_only_root_filesystem: bool,
    #[serde(flatten)]
    pub security: SecuritySettings,
    #[serde(flatten)]
    pub resources: ResourceSettings,
    /// Ingress を作成するホスト名
    #[serde(default)]
    pub endpoints: Vec<String>,
}

fn default_replicas() -> u32 {
    1
}
fn default_kubeconfig() -> String {
    "kubeconfig".to_string()
}
fn default_port() -> u16 {
    3000
}

/// 他のサービスを継承するサービス定義
///
/// `extends` 以外のフィールドは全て任意で、指定されたものだけが継承元を上書きする。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtendsService {
    pub extends: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_root_filesystem: Option<bool>,
    #[serde(flatten)]
    pub security: SecuritySettings,
    #[serde(flatten)]
    pub resources: ResourceSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<String>>,
}

/// コンテナの securityContext 設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_group: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_non_root: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_privilege_escalation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
}

impl SecuritySettings {
    /// otherで指定されたフィールドのみ上書き
    pub fn overlay(&mut self, other: &SecuritySettings) {
        if other.run_as_user.is_some() {
            self.run_as_user = other.run_as_user;
        }
        if other.run_as_group.is_some() {
            self.run_as_group = other.run_as_group;
        }
        if other.run_as_non_root.is_some() {
            self.run_as_non_root = other.run_as_non_root;
        }
        if other.allow_privilege_escalation.is_some() {
            self.allow_privilege_escalation = other.allow_privilege_escalation;
        }
        if other.privileged.is_some() {
            self.privileged = other.privileged;
        }
    }
}

/// コンテナのリソース要求・制限（Kubernetes の quantity 文字列）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
}

impl ResourceSettings {
    /// otherで指定されたフィールドのみ上書き
    pub fn overlay(&mut self, other: &ResourceSettings) {
        if other.cpu_request.is_some() {
            self.cpu_request = other.cpu_request.clone();
        }
        if other.cpu_limit.is_some() {
            self.cpu_limit = other.cpu_limit.clone();
        }
        if other.memory_request.is_some() {
            self.memory_request = other.memory_request.clone();
        }
        if other.memory_limit.is_some() {
            self.memory_limit = other.memory_limit.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_request.is_none()
            && self.cpu_limit.is_none()
            && self.memory_request.is_none()
            && self.memory_limit.is_none()
    }
}

impl ExtendsService {
    /// 継承元に対して、指定されたフィールドを上書きする
    ///
    /// - Option<T>: Someなら上書き、Noneなら継承元の値を維持
    /// - env: 継承元にマージ（こちらの値が優先）
    pub fn apply_to(&self, base: &mut NormalService) {
        if let Some(image) = &self.image {
            base.image = image.clone();
        }
        if let Some(replicas) = self.replicas {
            base.replicas = replicas;
        }
        if let Some(file) = &self.file {
            base.file = file.clone();
        }
        if let Some(context) = &self.context {
            base.context = context.clone();
        }
        if let Some(namespace) = &self.namespace {
            base.namespace = namespace.clone();
        }
        if let Some(port) = self.port {
            base.port = port;
        }
        if let Some(read_only) = self.read_only_root_filesystem {
            base.read_only_root_filesystem = read_only;
        }
        if let Some(endpoints) = &self.endpoints {
            base.endpoints = endpoints.clone();
        }
        base.security.overlay(&self.security);
        base.resources.overlay(&self.resources);

        if let Some(env) = &self.env {
            for (key, value) in env {
                base.env.insert(key.clone(), value.clone());
            }
        }
    }
}
