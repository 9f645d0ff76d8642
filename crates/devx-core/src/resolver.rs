//! サービス継承（extends）の解決
//!
//! 多段の `extends` を辿って正規化済みのサービス定義を生成します。
//! 入力は変更せず、毎回新しい値を返します。

use crate::error::ResolveError;
use crate::model::{ExtendsService, NormalService, ServiceDef};
use std::collections::BTreeMap;

/// 継承サービスを正規化
///
/// `visited` には既に辿ったキーを渡す。継承先が `visited` に含まれていれば循環とみなす。
pub fn resolve(
    service: &ExtendsService,
    services: &BTreeMap<String, ServiceDef>,
    visited: &[String],
) -> Result<NormalService, ResolveError> {
    if visited.contains(&service.extends) {
        let mut chain = visited.to_vec();
        chain.push(service.extends.clone());
        return Err(ResolveError::CircularDependency { chain });
    }

    let mut next_visited = visited.to_vec();
    next_visited.push(service.extends.clone());

    let target = services
        .get(&service.extends)
        .ok_or_else(|| ResolveError::ServiceNotFound(service.extends.clone()))?;

    let mut base = match target {
        ServiceDef::Extends(parent) => resolve(parent, services, &next_visited)?,
        ServiceDef::Normal(normal) => normal.clone(),
    };

    service.apply_to(&mut base);
    Ok(base)
}

/// トップレベルのサービス名を正規化
///
/// 循環時のチェーンはこのサービス名から始まる（例: `A -> B -> A`）。
pub fn resolve_alias(
    alias: &str,
    services: &BTreeMap<String, ServiceDef>,
) -> Result<NormalService, ResolveError> {
    match services.get(alias) {
        Some(ServiceDef::Normal(normal)) => Ok(normal.clone()),
        Some(ServiceDef::Extends(service)) => resolve(service, services, &[alias.to_string()]),
        None => Err(ResolveError::ServiceNotFound(alias.to_string())),
    }
}
