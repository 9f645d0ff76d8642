use colored::Colorize;
use std::path::Path;

/// デプロイ設定の JSON Schema をファイルに書き出す
pub fn handle(output: &Path) -> anyhow::Result<()> {
    let schema = devx_core::deploy_json_schema()?;
    let mut content = serde_json::to_string_pretty(&schema)?;
    content.push('\n');
    std::fs::write(output, content)?;

    println!(
        "{} JSON Schema を書き出しました: {}",
        "✓".green(),
        output.display().to_string().cyan()
    );
    Ok(())
}
