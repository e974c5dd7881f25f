use anyhow::Context;
use std::path::{Path, PathBuf};
use storeflow_cloud::{StateManager, StateSnapshot};
use storeflow_config::Manifest;
use storeflow_registry::{ConfiguredProvider, CredentialsEnv};

/// 読み込み済みのマニフェストと状態ファイルの置き場所
pub struct Project {
    pub manifest_path: PathBuf,
    pub root: PathBuf,
    pub manifest: Manifest,
    pub state: StateManager,
}

impl Project {
    pub fn load(manifest_path: &Path) -> anyhow::Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let root = storeflow_config::project_root(manifest_path);
        tracing::debug!(
            manifest = %manifest_path.display(),
            root = %root.display(),
            "Project loaded"
        );
        Ok(Self {
            manifest_path: manifest_path.to_path_buf(),
            state: StateManager::new(&root),
            root,
            manifest,
        })
    }

    /// 環境変数からプロバイダーを構成し、認証情報を確認する
    pub async fn connect(&self) -> anyhow::Result<ConfiguredProvider> {
        let env = CredentialsEnv::from_process();
        let provider = storeflow_registry::configure_with_group(
            &self.manifest.provider,
            &env,
            self.manifest.parent_group.as_deref(),
        )
        .await
        .with_context(|| format!("プロバイダー '{}' の構成に失敗しました", self.manifest.provider))?;
        Ok(provider)
    }

    /// 前回の状態を読み込み、プロバイダーの種類が一致するか確認する
    pub async fn load_state(&self) -> anyhow::Result<Option<StateSnapshot>> {
        let snapshot = self
            .state
            .load()
            .await
            .with_context(|| format!("状態ファイルを読み込めません: {}", self.state.state_path().display()))?;

        if let Some(snapshot) = &snapshot {
            let kind = self.manifest.provider_kind()?;
            let recorded = snapshot.provider_identity.provider_kind;
            if recorded != kind {
                anyhow::bail!(
                    "状態ファイルのプロバイダー ({}) がマニフェスト ({}) と一致しません",
                    recorded,
                    kind
                );
            }
        }
        Ok(snapshot)
    }
}
