use std::path::PathBuf;
use thiserror::Error;

/// デプロイ設定ファイルのスキーマ検証エラー
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("JSONの解析に失敗しました: {0}")]
    Json(#[from] serde_json::Error),

    #[error("無効な値: {path}\n理由: {message}")]
    InvalidField { path: String, message: String },
}

impl ValidationError {
    pub fn invalid_field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// extends 解決エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("循環依存が検出されました: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    #[error("サービスが見つかりません: {0}")]
    ServiceNotFound(String),
}

/// ファイル単位の読み込みエラー
///
/// いずれもそのファイルをスキップするだけで、実行全体は継続する。
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("ファイルが存在しないか空です: {0}")]
    Missing(PathBuf),

    #[error("ファイル読み込みエラー: {path}\n理由: {message}")]
    Io { path: PathBuf, message: String },

    #[error("無効なデプロイ設定: {path}\n{source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

impl LoadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::Missing(path) => path,
            LoadError::Io { path, .. } => path,
            LoadError::Invalid { path, .. } => path,
        }
    }
}

/// テンプレート生成エラー
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("{0} は既に存在します")]
    AlreadyExists(PathBuf),

    #[error("テンプレートのシリアライズに失敗しました: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("ファイル書き込みエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ValidationError>;
