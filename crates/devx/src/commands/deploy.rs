use chrono::Utc;
use colored::Colorize;
use devx_build::{BuildRequest, ContainerTool, DockerCli, LoginCache, RegistryAuth};
use devx_config::Settings;
use devx_core::{
    DeployArgs, LoadError, LoadedDocument, TEMPLATE_FILE_NAME, TemplateError, discover_candidates,
    load_documents, write_template,
};
use devx_kube::{
    ApplyRequest, ClusterApplier, KubeManifestBuilder, Kubectl, ManifestInput, ManifestSynthesizer,
};
use futures_util::future::join_all;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// サービスをスキップした理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ImageNotFound(String),
    RegistryNotFound(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ImageNotFound(key) => write!(f, "イメージ '{}' が見つかりません", key),
            SkipReason::RegistryNotFound(key) => {
                write!(f, "レジストリ '{}' が見つかりません", key)
            }
        }
    }
}

/// サービス単位のデプロイ結果
#[derive(Debug)]
pub enum DeployOutcome {
    Deployed,
    Skipped(SkipReason),
    Failed(anyhow::Error),
}

#[derive(Debug)]
pub struct ServiceReport {
    pub file: PathBuf,
    pub alias: String,
    pub outcome: DeployOutcome,
}

/// 1回の `x deploy` の結果
#[derive(Debug, Default)]
pub struct DeployReport {
    /// 選択されたサービスを含む有効なドキュメントがあったか
    pub found: bool,
    pub services: Vec<ServiceReport>,
}

impl DeployReport {
    fn count(&self, pred: impl Fn(&DeployOutcome) -> bool) -> usize {
        self.services.iter().filter(|s| pred(&s.outcome)).count()
    }

    pub fn deployed(&self) -> usize {
        self.count(|o| matches!(o, DeployOutcome::Deployed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeployOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeployOutcome::Failed(_)))
    }
}

/// デプロイのオーケストレーター
///
/// 外部ツールはトレイト経由で呼び出す。ログイン結果はこのインスタンスの生存期間中共有される。
pub struct Deployer {
    tool: Arc<dyn ContainerTool>,
    applier: Arc<dyn ClusterApplier>,
    synthesizer: Arc<dyn ManifestSynthesizer>,
    auth: RegistryAuth,
    logins: LoginCache,
}

impl Deployer {
    pub fn new(
        tool: Arc<dyn ContainerTool>,
        applier: Arc<dyn ClusterApplier>,
        synthesizer: Arc<dyn ManifestSynthesizer>,
        auth: RegistryAuth,
    ) -> Self {
        Self {
            tool,
            applier,
            synthesizer,
            auth,
            logins: LoginCache::new(),
        }
    }

    /// 設定に従って Docker / kubectl を使うオーケストレーター
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(DockerCli::new(&settings.docker)),
            Arc::new(Kubectl::new(&settings.kubectl)),
            Arc::new(KubeManifestBuilder),
            RegistryAuth::new(),
        )
    }

    /// `dir` を基準にドキュメントを探してデプロイする
    pub async fn run(&self, args: &DeployArgs, dir: &Path) -> DeployReport {
        let mut report = DeployReport::default();
        let mut jobs: Vec<(Arc<LoadedDocument>, String)> = Vec::new();

        let candidates: Vec<PathBuf> = discover_candidates(args, dir)
            .into_iter()
            .map(|candidate| {
                if candidate.is_absolute() {
                    candidate
                } else {
                    dir.join(candidate)
                }
            })
            .collect();

        for loaded in load_documents(&candidates) {
            let document = match loaded {
                Ok(document) => Arc::new(document),
                Err(LoadError::Missing(path)) => {
                    debug!("Skipping missing or empty file {:?}", path);
                    continue;
                }
                Err(e) => {
                    warn!(file = %e.path().display(), "Skipping invalid deploy document");
                    println!("{} {}", "⚠".yellow(), e);
                    continue;
                }
            };

            let selected = document.selected_services(args);
            if selected.is_empty() {
                debug!("No selected services in {:?}", document.path);
                continue;
            }

            report.found = true;
            for alias in selected {
                jobs.push((Arc::clone(&document), alias));
            }
        }

        info!(services = jobs.len(), "Deploying services");
        let outcomes = join_all(
            jobs.iter()
                .map(|(document, alias)| self.deploy_service(document, alias)),
        )
        .await;

        for ((document, alias), outcome) in jobs.into_iter().zip(outcomes) {
            report.services.push(ServiceReport {
                file: document.path.clone(),
                alias,
                outcome,
            });
        }

        report
    }

    async fn deploy_service(&self, document: &LoadedDocument, alias: &str) -> DeployOutcome {
        println!("🕒 {} をデプロイします...", alias.cyan());
        let outcome = match self.try_deploy(document, alias).await {
            Ok(outcome) => outcome,
            Err(e) => DeployOutcome::Failed(e),
        };

        match &outcome {
            DeployOutcome::Deployed => {
                println!("  {} {} をデプロイしました", "✓".green(), alias.cyan());
            }
            DeployOutcome::Skipped(reason) => {
                warn!(alias, %reason, "Service skipped");
                println!("  {} {} (スキップ: {})", "⚠".yellow(), alias, reason);
            }
            DeployOutcome::Failed(e) => {
                warn!(alias, error = %e, "Service deployment failed");
                println!(
                    "  {} {} ({})\n    {:#}",
                    "✗".red(),
                    alias,
                    document.path.display(),
                    e
                );
            }
        }
        outcome
    }

    #[tracing::instrument(skip(self, document), fields(file = %document.path.display()))]
    async fn try_deploy(
        &self,
        document: &LoadedDocument,
        alias: &str,
    ) -> anyhow::Result<DeployOutcome> {
        let service = document.resolve_service(alias)?;

        let Some(image) = document.image(&service.image) else {
            return Ok(DeployOutcome::Skipped(SkipReason::ImageNotFound(
                service.image.clone(),
            )));
        };
        let Some(registry) = document.registry(&image.registry) else {
            return Ok(DeployOutcome::Skipped(SkipReason::RegistryNotFound(
                image.registry.clone(),
            )));
        };

        // 認証情報のないレジストリはビルド済みイメージをそのままデプロイする
        if let Some((username, password)) = registry.credentials() {
            self.logins
                .login(
                    self.tool.as_ref(),
                    &self.auth,
                    &registry.hostname,
                    username,
                    password,
                )
                .await?;

            let request = BuildRequest::new(image, registry, &document.working_dir);
            println!("  🔨 {} をビルド中...", request.tag.cyan());
            self.tool.build_and_push(&request).await?;
            println!("  {} {} をプッシュしました", "✓".green(), request.tag);
        }

        let manifest = self.synthesizer.synthesize(&ManifestInput {
            alias,
            registry,
            image,
            service: &service,
            deployed_at: Utc::now(),
        })?;
        debug!(bytes = manifest.len(), "Manifest synthesized");

        let request = ApplyRequest {
            context: service.context.clone(),
            kubeconfig: document.resolve_path(&service.file),
            manifest,
        };
        println!("  🚀 {} を適用中 (context: {})...", alias.cyan(), service.context);
        self.applier.apply(&request).await?;

        Ok(DeployOutcome::Deployed)
    }
}

/// `x deploy [FILE.json ...] [SERVICE ...]`
pub async fn handle(args: &[String], settings: &Settings) -> anyhow::Result<()> {
    let args = DeployArgs::parse(args);
    let dir = std::env::current_dir()?;

    let deployer = Deployer::from_settings(settings);
    let report = deployer.run(&args, &dir).await;

    if !report.found {
        if args.is_targeting_files() {
            println!("{} 有効なデプロイ設定が見つかりません", "❌".red());
        } else {
            create_template(&dir.join(TEMPLATE_FILE_NAME));
        }
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn create_template(path: &Path) {
    println!("🕒 {} を作成します...", TEMPLATE_FILE_NAME);
    match write_template(path) {
        Ok(()) => println!("{} {} を作成しました", "✓".green(), TEMPLATE_FILE_NAME),
        Err(TemplateError::AlreadyExists(_)) => {
            println!("{} {} は既に存在します", "❌".red(), TEMPLATE_FILE_NAME)
        }
        Err(e) => println!("{} {}", "❌".red(), e),
    }
}

fn print_report(report: &DeployReport) {
    println!();
    println!(
        "{}",
        format!(
            "デプロイ完了: {} 成功, {} スキップ, {} 失敗",
            report.deployed(),
            report.skipped(),
            report.failed()
        )
        .bold()
    );
}
