use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "マニフェストが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: storeflow.yaml, storeflow.local.yaml, .storeflow.yaml, .storeflow.local.yaml\n\
        - ./.storeflow/ ディレクトリ\n\
        - ~/.config/storeflow/storeflow.yaml\n\
        または STOREFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ManifestNotFound,

    #[error("マニフェストの解析に失敗しました ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("不明なプロバイダー: {0} (aws または azure を指定してください)")]
    UnknownProvider(String),

    #[error("無効なマニフェスト: {0}")]
    Invalid(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
