//! デプロイ設定ファイルの発見
//!
//! 引数から `.json` ファイルとサービス名フィルタを分離し、
//! ファイル指定がなければカレントディレクトリから候補を探します。

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 規約上のデプロイ設定ファイル名（テンプレートの出力先も兼ねる）
pub const TEMPLATE_FILE_NAME: &str = ".deploy.json";

/// `x deploy` の位置引数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployArgs {
    /// 明示的に指定された `.json` ファイル
    pub files: Vec<PathBuf>,
    /// デプロイ対象のサービス名
    pub filters: Vec<String>,
}

impl DeployArgs {
    /// `.json` で終わる引数をファイル、それ以外をサービス名として分類
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            if arg.ends_with(".json") {
                parsed.files.push(PathBuf::from(arg));
            } else {
                parsed.filters.push(arg.to_string());
            }
        }
        parsed
    }

    /// ファイルが明示的に指定されているか
    pub fn is_targeting_files(&self) -> bool {
        !self.files.is_empty()
    }

    /// サービス名がフィルタに一致するか（フィルタ未指定なら全て一致）
    pub fn matches(&self, alias: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| f == alias)
    }
}

/// 読み込み候補のファイル一覧を返す
///
/// 明示指定があればそれのみ。なければ `dir` 直下の `*.json`（名前順）と
/// `.deploy.json` を候補にする。存在確認は読み込み時に行う。
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn discover_candidates(args: &DeployArgs, dir: &Path) -> Vec<PathBuf> {
    if args.is_targeting_files() {
        debug!(files = args.files.len(), "Using explicitly targeted files");
        return args.files.clone();
    }

    let mut candidates = Vec::new();
    // ディレクトリ名に `[` などが含まれてもパターンとして解釈させない
    let pattern = PathBuf::from(glob::Pattern::escape(&dir.to_string_lossy())).join("*.json");
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..Default::default()
    };

    match glob::glob_with(&pattern.to_string_lossy(), options) {
        Ok(paths) => {
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => {
                        debug!(file = %path.display(), "Found candidate");
                        candidates.push(path);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Failed to read directory entry"),
                }
            }
        }
        Err(e) => warn!(error = %e, "Invalid glob pattern"),
    }
    candidates.sort();

    let conventional = dir.join(TEMPLATE_FILE_NAME);
    if !candidates.contains(&conventional) {
        candidates.push(conventional);
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_splits_files_and_filters() {
        let args = DeployArgs::parse(["prod.json", "web", "api", "other.json"]);
        assert_eq!(
            args.files,
            vec![PathBuf::from("prod.json"), PathBuf::from("other.json")]
        );
        assert_eq!(args.filters, vec!["web".to_string(), "api".to_string()]);
        assert!(args.is_targeting_files());
    }

    #[test]
    fn test_matches_exact_alias() {
        let args = DeployArgs::parse(["web"]);
        assert!(args.matches("web"));
        assert!(!args.matches("web-staging"));
        assert!(!args.matches("api"));

        let all = DeployArgs::parse(Vec::<String>::new());
        assert!(all.matches("anything"));
    }

    #[test]
    fn test_explicit_files_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("found.json"), "{}").unwrap();

        let args = DeployArgs::parse(["explicit.json"]);
        let candidates = discover_candidates(&args, dir.path());
        assert_eq!(candidates, vec![PathBuf::from("explicit.json")]);
    }

    #[test]
    fn test_auto_discovery_sorted_plus_conventional() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("dir.json")).unwrap();

        let candidates = discover_candidates(&DeployArgs::default(), dir.path());
        assert_eq!(
            candidates,
            vec![
                dir.path().join("a.json"),
                dir.path().join("b.json"),
                dir.path().join(TEMPLATE_FILE_NAME),
            ]
        );
    }

    #[test]
    fn test_auto_discovery_in_directory_with_glob_characters() {
        let root = tempdir().unwrap();
        let dir = root.path().join("proj[1]");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("deploy.json"), "{}").unwrap();

        let candidates = discover_candidates(&DeployArgs::default(), &dir);
        assert_eq!(
            candidates,
            vec![dir.join("deploy.json"), dir.join(TEMPLATE_FILE_NAME)]
        );
    }

    #[test]
    fn test_conventional_file_is_not_duplicated() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(TEMPLATE_FILE_NAME), "{}").unwrap();

        let candidates = discover_candidates(&DeployArgs::default(), dir.path());
        assert_eq!(candidates, vec![dir.path().join(TEMPLATE_FILE_NAME)]);
    }
}
