//! 環境変数展開
//!
//! JSONパースの前に `${NAME}` を環境変数の値で置換します。
//! 未定義（または空）の変数は空文字列になります。エスケープ手段はありません。

use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(.*?)\}").expect("placeholder pattern is valid"));

/// `lookup` を使って `${NAME}` を置換
pub fn substitute<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// プロセスの環境変数で `${NAME}` を置換
pub fn substitute_env(text: &str) -> String {
    substitute(text, |name| std::env::var(name).ok())
}
