use colored::Colorize;
use std::time::Duration;

const RELEASES_URL: &str = "https://api.github.com/repos/chneau/x/releases/latest";
const REPOSITORY_URL: &str = "https://github.com/chneau/x";
const INSTALL_ATTEMPTS: u32 = 5;

/// x self-update: GitHub Releases の最新タグを cargo install で導入
pub async fn self_update() -> anyhow::Result<()> {
    println!("{}", "🔄 x update".blue().bold());
    println!();

    let current_version = env!("CARGO_PKG_VERSION");
    println!("現在のバージョン: {}", current_version.cyan());
    println!("最新バージョンを確認中...");

    let client = reqwest::Client::new();
    let latest_version = fetch_latest_version(&client).await?;
    println!("最新バージョン: {}", latest_version.green());

    if !is_newer_version(&latest_version, current_version) {
        println!();
        println!("{}", "✓ 既に最新版です！".green().bold());
        return Ok(());
    }

    println!();
    println!(
        "{}",
        format!("新しいバージョン {} が利用可能です", latest_version).yellow()
    );

    cargo_install_update(&latest_version).await
}

/// `x version` 実行時に新しいバージョンがあれば通知する
/// CI/CD環境（CI環境変数が設定されている場合）ではスキップする
pub async fn notify_if_outdated() {
    if std::env::var("CI").is_ok() {
        return;
    }

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(_) => return,
    };

    // ネットワークエラーは無視
    let Ok(latest_version) = fetch_latest_version(&client).await else {
        return;
    };

    let current_version = env!("CARGO_PKG_VERSION");
    if is_newer_version(&latest_version, current_version) {
        println!();
        println!(
            "📦 新しいバージョン {} が利用可能です（現在: {}）",
            latest_version.green(),
            current_version.yellow()
        );
        println!("{}", "   更新するには: x update".dimmed());
    }
}

/// GitHub API から最新リリースのバージョン（先頭の `v` を除く）を取得
async fn fetch_latest_version(client: &reqwest::Client) -> anyhow::Result<String> {
    let response = client
        .get(RELEASES_URL)
        .header("User-Agent", "devx")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!(
            "GitHubからリリース情報を取得できませんでした: {}",
            response.status()
        ));
    }

    let release: serde_json::Value = response.json().await?;
    let tag = release["tag_name"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("tag_nameが見つかりません"))?;

    Ok(tag.trim_start_matches('v').to_string())
}

/// バージョン比較: new_ver が current_ver より新しければ true
fn is_newer_version(new_ver: &str, current_ver: &str) -> bool {
    let parse_version =
        |v: &str| -> Vec<u32> { v.split('.').filter_map(|s| s.parse().ok()).collect() };

    let new_parts = parse_version(new_ver);
    let current_parts = parse_version(current_ver);

    for (n, c) in new_parts.iter().zip(current_parts.iter()) {
        if n > c {
            return true;
        }
        if n < c {
            return false;
        }
    }

    // 桁数が多い方が新しい (例: 1.0.1 > 1.0)
    new_parts.len() > current_parts.len()
}

fn install_args(version: &str) -> Vec<String> {
    vec![
        "install".to_string(),
        "--git".to_string(),
        REPOSITORY_URL.to_string(),
        "--tag".to_string(),
        format!("v{}", version),
        "--force".to_string(),
    ]
}

/// cargo install で指定バージョンを導入（失敗時は1秒待って再試行）
async fn cargo_install_update(version: &str) -> anyhow::Result<()> {
    let args = install_args(version);
    println!("{}", format!("🔧 cargo {}", args.join(" ")).cyan());
    println!();

    let mut last_code = None;
    for attempt in 1..=INSTALL_ATTEMPTS {
        let status = tokio::process::Command::new("cargo")
            .args(&args)
            .status()
            .await?;

        if status.success() {
            println!();
            println!(
                "{}",
                format!("✓ x {} に更新しました！", version).green().bold()
            );
            return Ok(());
        }

        last_code = status.code();
        tracing::warn!(attempt, code = ?last_code, "cargo install failed");
        if attempt < INSTALL_ATTEMPTS {
            println!(
                "{}",
                format!("⚠ 更新に失敗しました。再試行します ({}/{})", attempt, INSTALL_ATTEMPTS)
                    .yellow()
            );
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    Err(anyhow::anyhow!(
        "cargo install に失敗しました（終了コード: {:?}）",
        last_code
    ))
}
