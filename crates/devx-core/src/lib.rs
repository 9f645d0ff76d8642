//! devx-core
//!
//! デプロイ設定（`*.json`）のモデル、環境変数展開、スキーマ検証、
//! `extends` の解決を提供します。

pub mod discovery;
pub mod envsubst;
pub mod error;
pub mod loader;
pub mod model;
pub mod resolver;
pub mod schema;
pub mod template;

pub use discovery::{DeployArgs, TEMPLATE_FILE_NAME, discover_candidates};
pub use envsubst::{substitute, substitute_env};
pub use error::{LoadError, ResolveError, Result, TemplateError, ValidationError};
pub use loader::{LoadedDocument, load_document, load_documents, normalize_path};
pub use model::{
    DeployDocument, ExtendsService, Image, NormalService, Registry, ResourceSettings,
    SecuritySettings, ServiceDef,
};
pub use resolver::{resolve, resolve_alias};
pub use schema::{deploy_json_schema, is_valid_endpoint, parse_document, validate};
pub use template::{SCHEMA_URL, render_template, template_document, write_template};
