use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write(&self, name: &str, content: &str) {
        fs::write(self.root.path().join(name), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.root.path().join(name)).unwrap()
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// ユーザー設定・ネットワークの影響を受けない `x` コマンド
    #[allow(deprecated)]
    pub fn x(&self) -> Command {
        let mut cmd = Command::cargo_bin("x").unwrap();
        cmd.current_dir(self.path())
            .env("DEVX_CONFIG_PATH", missing_settings(self.root.path()))
            .env("CI", "1")
            .env_remove("DEVX_DOCKER")
            .env_remove("DEVX_KUBECTL")
            .env_remove("RUST_LOG");
        cmd
    }
}

fn missing_settings(root: &Path) -> PathBuf {
    root.join("no-such-settings.yaml")
}
