mod common;

use common::TestProject;
use predicates::prelude::*;

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let project = TestProject::new();
    project
        .x()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("schema"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("version"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let project = TestProject::new();
    project
        .x()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "x {}",
            env!("CARGO_PKG_VERSION")
        )));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    let project = TestProject::new();
    project.x().arg("invalid-command").assert().failure();
}

/// deployコマンドのヘルプに位置引数が表示されることを確認
#[test]
fn test_deploy_help() {
    let project = TestProject::new();
    project
        .x()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FILE.json|SERVICE"));
}

/// 設定ファイルがなければテンプレートを作成する
#[test]
fn test_deploy_creates_template_when_nothing_found() {
    let project = TestProject::new();
    project
        .x()
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::contains(".deploy.json"));

    let template: serde_json::Value =
        serde_json::from_str(&project.read(".deploy.json")).unwrap();
    assert_eq!(template["registries"]["dockerhub"]["hostname"], "docker.io");
    assert_eq!(template["services"]["my-service"]["namespace"], "my-namespace");
}

/// 既存の（無効な）.deploy.json は上書きしない
#[test]
fn test_deploy_does_not_overwrite_existing_template() {
    let project = TestProject::new();
    project.write(".deploy.json", "{}");

    project
        .x()
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("既に存在します"));

    assert_eq!(project.read(".deploy.json"), "{}");
}

/// 明示的に指定したファイルが無効でも終了コードは0、テンプレートは作らない
#[test]
fn test_deploy_explicit_invalid_file() {
    let project = TestProject::new();
    project.write("bad.json", r#"{"services": {}}"#);

    project
        .x()
        .args(["deploy", "bad.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("有効なデプロイ設定が見つかりません"));

    assert!(!project.file(".deploy.json").exists());
}

/// 適用に失敗したサービスがあっても終了コードは0
#[cfg(unix)]
#[test]
fn test_deploy_failure_is_reported_not_fatal() {
    let project = TestProject::new();
    project.write(
        "deploy.json",
        r#"{
            "registries": { "ghcr": { "hostname": "ghcr.io" } },
            "images": { "app": { "registry": "ghcr", "repository": "org", "imageName": "app" } },
            "services": { "web": { "image": "app", "context": "prod", "namespace": "web" } }
        }"#,
    );

    project
        .x()
        .env("DEVX_KUBECTL", "false")
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 成功"))
        .stdout(predicate::str::contains("1 失敗"))
        // 失敗行はサマリーより前に出力される
        .stdout(predicate::str::is_match(r"(?s)✗.*web.*kubectl apply.*デプロイ完了").unwrap());
}

/// 参照切れのサービスはその場でスキップが表示される
#[test]
fn test_deploy_skip_is_reported_inline() {
    let project = TestProject::new();
    project.write(
        "deploy.json",
        r#"{
            "images": {},
            "services": { "web": { "image": "ghost", "context": "prod", "namespace": "web" } }
        }"#,
    );

    project
        .x()
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)⚠.*web.*スキップ: イメージ 'ghost'.*デプロイ完了").unwrap())
        .stdout(predicate::str::contains("0 成功, 1 スキップ, 0 失敗"));
}

/// JSON Schema を書き出せることを確認
#[test]
fn test_schema_output() {
    let project = TestProject::new();
    project
        .x()
        .args(["schema", "--output", "schema.json"])
        .assert()
        .success();

    let schema: serde_json::Value = serde_json::from_str(&project.read("schema.json")).unwrap();
    assert!(schema["properties"].get("services").is_some());
}
