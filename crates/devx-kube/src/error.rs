use thiserror::Error;

#[derive(Error, Debug)]
pub enum KubeError {
    #[error("マニフェストの生成に失敗しました: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("docker config の生成に失敗しました: {0}")]
    DockerConfig(#[from] serde_json::Error),

    #[error("kubectl apply に失敗しました (context: {context})\n{message}")]
    ApplyFailed { context: String, message: String },

    #[error("{program} を起動できません: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KubeError>;
