pub mod error;
pub mod manifest;

pub use error::*;
pub use manifest::{BucketSpec, Manifest};

use std::path::{Path, PathBuf};

/// マニフェストのファイル名 (優先順)
const CANDIDATES: [&str; 4] = [
    "storeflow.local.yaml",
    ".storeflow.local.yaml",
    "storeflow.yaml",
    ".storeflow.yaml",
];

/// プロジェクト内の作業ディレクトリ名
pub const PROJECT_DIR: &str = ".storeflow";

/// プロジェクトの storeflow.yaml を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 STOREFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: storeflow.local.yaml, .storeflow.local.yaml, storeflow.yaml, .storeflow.yaml
/// 3. ./.storeflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/storeflow/storeflow.yaml (グローバル設定)
pub fn find_manifest() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("STOREFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリ
    if let Some(path) = first_existing(&current_dir) {
        return Ok(path);
    }

    // 3. ./.storeflow/
    let project_dir = current_dir.join(PROJECT_DIR);
    if project_dir.is_dir() {
        if let Some(path) = first_existing(&project_dir) {
            return Ok(path);
        }
    }

    // 4. グローバル設定
    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("storeflow").join("storeflow.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ManifestNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// マニフェストの位置からプロジェクトルートを決める
///
/// `.storeflow/` 内のマニフェストはその親ディレクトリがルートになる。
pub fn project_root(manifest: &Path) -> PathBuf {
    let parent = manifest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if parent.file_name().is_some_and(|name| name == PROJECT_DIR) {
        parent.parent().unwrap_or(parent).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn in_dir<F: FnOnce()>(dir: &Path, f: F) {
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        temp_env::with_var_unset("STOREFLOW_CONFIG_PATH", f);
        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_manifest_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("storeflow.yaml"), "provider: aws\n").unwrap();

        in_dir(temp_dir.path(), || {
            let found = find_manifest().unwrap();
            assert!(found.ends_with("storeflow.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_local_manifest_takes_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("storeflow.yaml"), "provider: aws\n").unwrap();
        fs::write(temp_dir.path().join(".storeflow.local.yaml"), "provider: aws\n").unwrap();

        in_dir(temp_dir.path(), || {
            let found = find_manifest().unwrap();
            // .storeflow.local.yaml が storeflow.yaml より優先される
            assert!(found.ends_with(".storeflow.local.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_find_manifest_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(PROJECT_DIR);
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("storeflow.yaml"), "provider: aws\n").unwrap();

        in_dir(temp_dir.path(), || {
            let found = find_manifest().unwrap();
            assert!(found.ends_with(".storeflow/storeflow.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_find_manifest_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "provider: azure\n").unwrap();

        temp_env::with_var("STOREFLOW_CONFIG_PATH", Some(&config_path), || {
            assert_eq!(find_manifest().unwrap(), config_path);
        });
    }

    #[test]
    #[serial]
    fn test_find_manifest_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();

        in_dir(temp_dir.path(), || {
            // グローバル設定が存在する環境では見つかってしまうため、その場合は検証しない
            let global_exists = dirs::config_dir()
                .map(|d| d.join("storeflow").join("storeflow.yaml").exists())
                .unwrap_or(false);
            if !global_exists {
                assert!(matches!(find_manifest(), Err(ConfigError::ManifestNotFound)));
            }
        });
    }

    #[test]
    fn test_project_root() {
        assert_eq!(
            project_root(Path::new("/work/app/storeflow.yaml")),
            PathBuf::from("/work/app")
        );
        assert_eq!(
            project_root(Path::new("/work/app/.storeflow/storeflow.yaml")),
            PathBuf::from("/work/app")
        );
        assert_eq!(project_root(Path::new("storeflow.yaml")), PathBuf::from("."));
    }
}
