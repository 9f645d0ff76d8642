//! devx のイメージビルド機能
//!
//! Docker CLI によるレジストリログイン、イメージのビルドとプッシュを提供します。

pub mod auth;
pub mod builder;
pub mod error;
pub mod login;

pub use auth::RegistryAuth;
pub use builder::{BuildRequest, ContainerTool, DockerCli};
pub use error::{BuildError, BuildResult};
pub use login::LoginCache;
