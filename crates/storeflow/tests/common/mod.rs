use assert_cmd::Command;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CREDENTIAL_VARS: [&str; 8] = [
    "S3_REGION",
    "AZURE_TENANT_ID",
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
    "AZURE_SUBSCRIPTION_ID",
    "AZURE_RESOURCE_GROUP",
    "AZURE_AUTHORITY_HOST",
    "AZURE_MANAGEMENT_ENDPOINT",
];

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_manifest(&self, content: &str) {
        fs::write(self.root.path().join("storeflow.yaml"), content).unwrap();
    }

    /// `.storeflow/state.json` に (name, tags) の一覧を書き込む
    #[allow(dead_code)]
    pub fn write_state(&self, provider: &str, items: &[(&str, &str)]) {
        let dir = self.root.path().join(".storeflow");
        fs::create_dir_all(&dir).unwrap();
        let items: Vec<_> = items
            .iter()
            .map(|(name, tags)| {
                json!({
                    "id": format!("arn:aws:s3:::{}", name),
                    "name": name,
                    "date": "2026-01-01T00:00:00Z",
                    "tags": tags,
                })
            })
            .collect();
        let state = json!({
            "version": 1,
            "items": items,
            "lastUpdated": "2026-01-01T00:00:00Z",
            "providerIdentity": {
                "providerKind": provider,
                "subscriptionOrAccountId": "default",
                "defaultRegion": "us-east-1",
            },
        });
        fs::write(
            dir.join("state.json"),
            serde_json::to_string_pretty(&state).unwrap(),
        )
        .unwrap();
    }

    #[allow(dead_code)]
    pub fn state_path(&self) -> PathBuf {
        self.root.path().join(".storeflow").join("state.json")
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// プロジェクト内で実行する `store` コマンド（認証情報とグローバル設定は隔離）
    pub fn store(&self) -> Command {
        let mut cmd = Command::cargo_bin("store").unwrap();
        cmd.current_dir(self.path())
            .env("NO_COLOR", "1")
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env_remove("STOREFLOW_CONFIG_PATH");
        for var in CREDENTIAL_VARS {
            cmd.env_remove(var);
        }
        cmd
    }
}
