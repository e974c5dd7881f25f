//! storeflow.yaml マニフェスト

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use storeflow_cloud::{DesiredResource, ProviderKind, WaitConfig};

/// 宣言されたストレージリソース一式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// aws | azure
    pub provider: String,
    /// 階層型プロバイダー (azure) のリソースグループ名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group: Option<String>,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub buckets: Vec<BucketSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketSpec {
    pub name: String,
    #[serde(default)]
    pub tags: String,
}

impl Manifest {
    /// ファイルから読み込んで検証する
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// YAML 文字列から読み込んで検証する
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        self.provider_kind()?;

        let mut seen = HashSet::new();
        for bucket in &self.buckets {
            let name = bucket.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid("バケット名が空です".to_string()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "バケット名が重複しています: {}",
                    name
                )));
            }
        }

        if let Some(group) = &self.parent_group {
            if group.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "parent_group が空です".to_string(),
                ));
            }
        }

        let multiplier = self.wait.multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "wait.multiplier は 1.0 以上にしてください".to_string(),
            ));
        }
        if self.wait.initial_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "wait.initial_delay_ms は 0 より大きくしてください".to_string(),
            ));
        }
        if self.wait.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "wait.timeout_secs は 0 より大きくしてください".to_string(),
            ));
        }

        Ok(())
    }

    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.provider
            .parse::<ProviderKind>()
            .map_err(|_| ConfigError::UnknownProvider(self.provider.clone()))
    }

    /// 宣言順の DesiredResource 一覧
    pub fn desired(&self) -> Vec<DesiredResource> {
        self.buckets
            .iter()
            .map(|b| DesiredResource::new(b.name.trim(), b.tags.clone()))
            .collect()
    }
}
