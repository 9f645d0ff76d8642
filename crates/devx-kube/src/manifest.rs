//! Kubernetes マニフェスト生成
//!
//! 1サービス分のリソース（Namespace, Secret, Deployment, Service, Ingress）を
//! `---` 区切りの YAML ストリームとして出力します。

use crate::error::Result;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use devx_core::{Image, NormalService, Registry};
use serde_json::{Map, Value, json};

const DOCKER_CONFIG_SECRET_TYPE: &str = "kubernetes.io/dockerconfigjson";
const INGRESS_CLASS: &str = "nginx";
const CLUSTER_ISSUER: &str = "letsencrypt";

/// マニフェスト生成の入力
#[derive(Debug, Clone, Copy)]
pub struct ManifestInput<'a> {
    pub alias: &'a str,
    pub registry: &'a Registry,
    pub image: &'a Image,
    pub service: &'a NormalService,
    /// `DEPLOYMENT_DATE` に埋め込む時刻
    pub deployed_at: DateTime<Utc>,
}

/// マニフェスト生成の抽象化
pub trait ManifestSynthesizer: Send + Sync {
    fn synthesize(&self, input: &ManifestInput<'_>) -> Result<String>;
}

/// 素の Kubernetes リソースとしてマニフェストを組み立てる
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeManifestBuilder;

impl ManifestSynthesizer for KubeManifestBuilder {
    #[tracing::instrument(skip(self, input), fields(alias = input.alias))]
    fn synthesize(&self, input: &ManifestInput<'_>) -> Result<String> {
        let documents = self.resources(input)?;
        tracing::debug!(resources = documents.len(), "Rendering manifest");

        let mut out = String::new();
        for document in &documents {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(document)?);
        }
        Ok(out)
    }
}

impl KubeManifestBuilder {
    /// 出力するリソースを順に返す
    pub fn resources(&self, input: &ManifestInput<'_>) -> Result<Vec<Value>> {
        let namespace = &input.service.namespace;
        let mut resources = vec![namespace_resource(namespace)];

        let pull_secret = match input.registry.credentials() {
            Some((username, password)) => {
                let secret = docker_config_secret(
                    namespace,
                    &input.registry.hostname,
                    username,
                    password,
                )?;
                let name = secret["metadata"]["name"].clone();
                resources.push(secret);
                Some(name)
            }
            None => None,
        };

        resources.push(deployment_resource(input, pull_secret));
        resources.push(service_resource(input));
        for endpoint in &input.service.endpoints {
            resources.push(ingress_resource(input, endpoint));
        }

        Ok(resources)
    }
}

/// リソース名に使えるようホスト名の `.` `:` `/` を `-` に置換
pub fn sanitize_host(host: &str) -> String {
    host.replace(['.', ':', '/'], "-")
}

fn app_labels(input: &ManifestInput<'_>) -> Value {
    json!({ "app": input.image.image_name })
}

fn namespace_resource(namespace: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": namespace },
    })
}

fn docker_config_secret(
    namespace: &str,
    hostname: &str,
    username: &str,
    password: &str,
) -> Result<Value> {
    let auth = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    let config = json!({
        "auths": {
            hostname: {
                "username": username,
                "password": password,
                "auth": auth,
            }
        }
    });

    Ok(json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": format!("{}-docker-secret", namespace),
            "namespace": namespace,
        },
        "type": DOCKER_CONFIG_SECRET_TYPE,
        "stringData": {
            ".dockerconfigjson": serde_json::to_string_pretty(&config)?,
        },
    }))
}

fn deployment_resource(input: &ManifestInput<'_>, pull_secret: Option<Value>) -> Value {
    let service = input.service;
    let image = input.image;

    let mut env_vars = service.env.clone();
    env_vars.insert(
        "DEPLOYMENT_DATE".to_string(),
        input
            .deployed_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    let env: Vec<Value> = env_vars
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    let mut container = json!({
        "name": image.image_name,
        "image": image.full_name(input.registry),
        "imagePullPolicy": "Always",
        "ports": [{ "containerPort": service.port }],
        "env": env,
        "securityContext": security_context(service),
        "startupProbe": {
            "tcpSocket": { "port": service.port },
            "periodSeconds": 1,
            "failureThreshold": 30,
        },
    });
    if let Some(resources) = resource_requirements(service) {
        container["resources"] = resources;
    }

    let mut pod_spec = json!({
        "terminationGracePeriodSeconds": 0,
        "containers": [container],
    });
    if let Some(name) = pull_secret {
        pod_spec["imagePullSecrets"] = json!([{ "name": name }]);
    }

    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": image.image_name,
            "namespace": service.namespace,
        },
        "spec": {
            "replicas": service.replicas,
            "selector": { "matchLabels": app_labels(input) },
            "template": {
                "metadata": { "labels": app_labels(input) },
                "spec": pod_spec,
            },
        },
    })
}

fn security_context(service: &NormalService) -> Value {
    let security = &service.security;
    let mut context = Map::new();
    context.insert(
        "readOnlyRootFilesystem".to_string(),
        json!(service.read_only_root_filesystem),
    );
    if let Some(user) = security.run_as_user {
        context.insert("runAsUser".to_string(), json!(user));
    }
    if let Some(group) = security.run_as_group {
        context.insert("runAsGroup".to_string(), json!(group));
    }
    if let Some(non_root) = security.run_as_non_root {
        context.insert("runAsNonRoot".to_string(), json!(non_root));
    }
    if let Some(escalation) = security.allow_privilege_escalation {
        context.insert("allowPrivilegeEscalation".to_string(), json!(escalation));
    }
    if let Some(privileged) = security.privileged {
        context.insert("privileged".to_string(), json!(privileged));
    }
    Value::Object(context)
}

fn resource_requirements(service: &NormalService) -> Option<Value> {
    let resources = &service.resources;
    if resources.is_empty() {
        return None;
    }

    let pair = |cpu: &Option<String>, memory: &Option<String>| {
        let mut map = Map::new();
        if let Some(cpu) = cpu {
            map.insert("cpu".to_string(), json!(cpu));
        }
        if let Some(memory) = memory {
            map.insert("memory".to_string(), json!(memory));
        }
        map
    };

    let mut requirements = Map::new();
    let requests = pair(&resources.cpu_request, &resources.memory_request);
    if !requests.is_empty() {
        requirements.insert("requests".to_string(), Value::Object(requests));
    }
    let limits = pair(&resources.cpu_limit, &resources.memory_limit);
    if !limits.is_empty() {
        requirements.insert("limits".to_string(), Value::Object(limits));
    }
    Some(Value::Object(requirements))
}

fn service_resource(input: &ManifestInput<'_>) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": input.image.image_name,
            "namespace": input.service.namespace,
        },
        "spec": {
            "type": "ClusterIP",
            "selector": app_labels(input),
            "ports": [{
                "port": input.service.port,
                "targetPort": input.service.port,
            }],
        },
    })
}

fn ingress_resource(input: &ManifestInput<'_>, host: &str) -> Value {
    let namespace = &input.service.namespace;
    let sanitized = sanitize_host(host);

    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": {
            "name": format!("{}-{}", namespace, sanitized),
            "namespace": namespace,
            "annotations": {
                "cert-manager.io/cluster-issuer": CLUSTER_ISSUER,
            },
        },
        "spec": {
            "ingressClassName": INGRESS_CLASS,
            "rules": [{
                "host": host,
                "http": {
                    "paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": {
                            "service": {
                                "name": input.image.image_name,
                                "port": { "number": input.service.port },
                            },
                        },
                    }],
                },
            }],
            "tls": [{
                "hosts": [host],
                "secretName": sanitized,
            }],
        },
    })
}
