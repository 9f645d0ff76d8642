mod commands;
mod self_update;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "chneau's utility CLI: JSON 1つからビルド・プッシュ・Kubernetes デプロイ", long_about = None)]
struct Cli {
    /// 詳細ログを出力（RUST_LOG が優先）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// サービスをビルドして Kubernetes にデプロイ
    ///
    /// `.json` で終わる引数はデプロイ設定ファイル、それ以外はサービス名として扱う。
    /// ファイル未指定時はカレントディレクトリの *.json と .deploy.json を読み込む。
    Deploy {
        /// デプロイ設定ファイル (*.json) とサービス名
        #[arg(value_name = "FILE.json|SERVICE")]
        args: Vec<String>,
    },
    /// デプロイ設定の JSON Schema を出力
    Schema {
        /// 出力先
        #[arg(short, long, default_value = "deployment-schema.json")]
        output: PathBuf,
    },
    /// x 自体を最新版に更新
    Update,
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = devx_config::load_settings()?;
    tracing::debug!(?settings, "Settings loaded");

    match cli.command {
        Commands::Deploy { args } => commands::deploy::handle(&args, &settings).await,
        Commands::Schema { output } => commands::schema::handle(&output),
        Commands::Update => self_update::self_update().await,
        Commands::Version => {
            println!("x {}", env!("CARGO_PKG_VERSION"));
            if settings.update_check {
                self_update::notify_if_outdated().await;
            }
            Ok(())
        }
    }
}
