//! デプロイ設定ローダー
//!
//! ファイル読み込み、環境変数展開、スキーマ検証を統合し、
//! 作業ディレクトリ付きのドキュメントを生成します。

use crate::discovery::DeployArgs;
use crate::envsubst::substitute_env;
use crate::error::{LoadError, ResolveError};
use crate::model::{DeployDocument, Image, NormalService, Registry};
use crate::resolver::resolve_alias;
use crate::schema::parse_document;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument};

/// 読み込み済みのデプロイ設定
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    /// 読み込んだファイル
    pub path: PathBuf,
    /// 相対パス解決の基準ディレクトリ（ファイルの親ディレクトリの絶対パス）
    pub working_dir: PathBuf,
    pub document: DeployDocument,
}

/// ファイルを読み込んでドキュメントを生成
///
/// 1. ファイル読み込み（存在しない・空の場合は `LoadError::Missing`）
/// 2. `${VAR}` の展開
/// 3. スキーマ検証とデフォルト値の適用
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_document(path: &Path) -> Result<LoadedDocument, LoadError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::Missing(path.to_path_buf()));
        }
        Err(e) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    if raw.trim().is_empty() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }

    let expanded = substitute_env(&raw);
    let document = parse_document(&expanded).map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    let working_dir = working_dir_of(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    info!(
        working_dir = %working_dir.display(),
        services = document.services.len(),
        "Deploy document loaded"
    );

    Ok(LoadedDocument {
        path: path.to_path_buf(),
        working_dir,
        document,
    })
}

/// 候補ファイルを順に読み込む
///
/// 失敗したファイルはスキップ対象として結果に含めて返す。
pub fn load_documents(candidates: &[PathBuf]) -> Vec<Result<LoadedDocument, LoadError>> {
    candidates
        .iter()
        .map(|path| load_document(path))
        .collect()
}

fn working_dir_of(path: &Path) -> std::io::Result<PathBuf> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(normalize_path(&std::path::absolute(parent)?))
}

/// `.` と `..` を字句的に取り除く（シンボリックリンクは辿らない）
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

impl LoadedDocument {
    /// フィルタに一致するサービス名を返す
    pub fn selected_services(&self, args: &DeployArgs) -> Vec<String> {
        self.document
            .services
            .keys()
            .filter(|alias| args.matches(alias))
            .cloned()
            .collect()
    }

    /// サービスを正規化
    ///
    /// フィルタで除外されたサービスも継承元として参照できるよう、
    /// 常にフィルタ前の全サービスに対して解決する。
    pub fn resolve_service(&self, alias: &str) -> Result<NormalService, ResolveError> {
        debug!(alias, "Resolving service");
        resolve_alias(alias, &self.document.services)
    }

    pub fn image(&self, key: &str) -> Option<&Image> {
        self.document.images.get(key)
    }

    pub fn registry(&self, key: &str) -> Option<&Registry> {
        self.document.registries.get(key)
    }

    /// 作業ディレクトリ基準でパスを解決
    pub fn resolve_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        normalize_path(&self.working_dir.join(relative))
    }
}
