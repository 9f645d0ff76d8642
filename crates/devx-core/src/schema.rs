//! スキーマ検証
//!
//! JSONテキストをデプロイ設定としてパースし、型に表現できない制約
//! （ポート範囲、エンドポイント形式）を検証します。デフォルト値の適用は
//! serde のデシリアライズ時に行われます。

use crate::error::{Result, ValidationError};
use crate::model::{DeployDocument, ServiceDef};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static ENDPOINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("endpoint pattern is valid")
});

/// JSONテキストをパースして検証済みのドキュメントを返す
pub fn parse_document(text: &str) -> Result<DeployDocument> {
    let document: DeployDocument = serde_json::from_str(text)?;
    validate(&document)?;
    debug!(
        registries = document.registries.len(),
        images = document.images.len(),
        services = document.services.len(),
        "Deploy document parsed"
    );
    Ok(document)
}

/// エンドポイントがホスト名形式（`label.label.tld`）かどうか
pub fn is_valid_endpoint(endpoint: &str) -> bool {
    ENDPOINT.is_match(endpoint)
}

/// serde で表現できない制約を検証
pub fn validate(document: &DeployDocument) -> Result<()> {
    for (alias, service) in &document.services {
        let (port, endpoints) = match service {
            ServiceDef::Normal(svc) => (Some(svc.port), Some(&svc.endpoints)),
            ServiceDef::Extends(svc) => (svc.port, svc.endpoints.as_ref()),
        };

        if port == Some(0) {
            return Err(ValidationError::invalid_field(
                format!("services.{}.port", alias),
                "ポートは 1 から 65535 の範囲で指定してください",
            ));
        }

        for (i, endpoint) in endpoints.into_iter().flatten().enumerate() {
            if !is_valid_endpoint(endpoint) {
                return Err(ValidationError::invalid_field(
                    format!("services.{}.endpoints[{}]", alias, i),
                    format!("ホスト名の形式ではありません: {:?}", endpoint),
                ));
            }
        }
    }

    Ok(())
}

/// デプロイ設定の JSON Schema を生成
pub fn deploy_json_schema() -> std::result::Result<serde_json::Value, serde_json::Error> {
    let schema = schemars::schema_for!(DeployDocument);
    serde_json::to_value(&schema)
}
