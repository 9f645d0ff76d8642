//! `.deploy.json` テンプレート生成
//!
//! 有効なデプロイ設定が見つからない場合に、最小構成のサンプルを書き出します。

use crate::error::TemplateError;
use crate::model::{DeployDocument, Image, NormalService, Registry, ServiceDef};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// エディタ補完用に埋め込むスキーマの公開URL
pub const SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/chneau/x/refs/heads/master/deployment-schema.json";

/// サンプルのデプロイ設定（デフォルト値適用済み）
pub fn template_document() -> DeployDocument {
    let mut registries = BTreeMap::new();
    registries.insert(
        "dockerhub".to_string(),
        Registry {
            hostname: "docker.io".to_string(),
            username: Some("username".to_string()),
            password: Some("password".to_string()),
        },
    );

    let mut images = BTreeMap::new();
    images.insert(
        "my-image".to_string(),
        Image {
            registry: "dockerhub".to_string(),
            dockerfile: "Dockerfile".to_string(),
            target: None,
            build_args: BTreeMap::new(),
            context: ".".to_string(),
            repository: "my-repo".to_string(),
            image_name: "my-image".to_string(),
            tag: "latest".to_string(),
        },
    );

    let mut env = BTreeMap::new();
    env.insert("ENV".to_string(), "value".to_string());

    let mut services = BTreeMap::new();
    services.insert(
        "my-service".to_string(),
        ServiceDef::Normal(NormalService {
            image: "my-image".to_string(),
            replicas: 1,
            file: "kubeconfig".to_string(),
            context: "my-context".to_string(),
            namespace: "my-namespace".to_string(),
            port: 3000,
            env,
            read_only_root_filesystem: false,
            security: Default::default(),
            resources: Default::default(),
            endpoints: vec!["my-endpoint.com".to_string()],
        }),
    );

    DeployDocument {
        schema: Some(SCHEMA_URL.to_string()),
        registries,
        images,
        services,
    }
}

/// テンプレートを2スペースインデントのJSONとして出力
pub fn render_template() -> Result<String, TemplateError> {
    Ok(serde_json::to_string_pretty(&template_document())?)
}

/// テンプレートを書き出す（既存ファイルは上書きしない）
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn write_template(path: &Path) -> Result<(), TemplateError> {
    let content = render_template()?;
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(TemplateError::AlreadyExists(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(content.as_bytes())?;
    info!("Template written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_document;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_template_is_a_valid_document() {
        let rendered = render_template().unwrap();
        let parsed = parse_document(&rendered).unwrap();
        assert_eq!(parsed, template_document());
    }

    #[test]
    fn test_template_contents() {
        let rendered = render_template().unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["$schema"], SCHEMA_URL);
        assert_eq!(value["registries"]["dockerhub"]["hostname"], "docker.io");
        assert_eq!(value["images"]["my-image"]["imageName"], "my-image");
        assert_eq!(value["images"]["my-image"]["tag"], "latest");
        assert_eq!(value["services"]["my-service"]["port"], 3000);
        assert_eq!(value["services"]["my-service"]["env"]["ENV"], "value");
        assert_eq!(
            value["services"]["my-service"]["endpoints"][0],
            "my-endpoint.com"
        );
        // 2スペースインデント
        assert!(rendered.contains("\n  \"images\""));
    }

    #[test]
    fn test_write_template_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".deploy.json");

        write_template(&path).unwrap();
        assert!(path.exists());

        fs::write(&path, "custom").unwrap();
        let err = write_template(&path).unwrap_err();
        assert!(matches!(err, TemplateError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "custom");
    }
}
