use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("レジストリへのログインに失敗しました: {registry}\n理由: {message}")]
    LoginFailed { registry: String, message: String },

    #[error("イメージのビルドに失敗しました: {tag}\n{message}")]
    BuildFailed { tag: String, message: String },

    #[error("{program} を起動できません: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::LoginFailed { registry, message } => {
                format!(
                    "{} へのログインに失敗しました: {}\n\
                     \n\
                     registries の username / password を確認してください。",
                    registry, message
                )
            }
            BuildError::Spawn { program, .. } => {
                format!(
                    "{} が見つかりません\n\
                     \n\
                     Docker がインストールされ、PATH に含まれているか確認してください。",
                    program
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
