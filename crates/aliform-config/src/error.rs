use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "{field} が設定されていません。以下のいずれかで指定してください:\n\
        - プロバイダー設定で直接指定\n\
        - 環境変数 {env}\n\
        - ~/.config/aliform/credentials.yaml"
    )]
    MissingValue {
        field: &'static str,
        env: &'static str,
    },

    #[error(
        "マニフェストが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: aliform.yaml, aliform.yml\n\
        または ALIFORM_MANIFEST 環境変数で直接指定できます"
    )]
    ManifestNotFound,

    #[error("マニフェストの解析に失敗しました ({path}): {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("マニフェストが不正です: {0}")]
    InvalidManifest(String),

    #[error("認証情報ファイルの解析に失敗しました ({path}): {source}")]
    CredentialsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
