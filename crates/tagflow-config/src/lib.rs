pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tagflow_cloud::{ReconcileSettings, WaitConfig};

/// 設定ファイル名
pub const CONFIG_FILE_NAME: &str = "tagflow.yaml";

/// 設定ファイルパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "TAGFLOW_CONFIG_PATH";

/// タグ確認待ちの間隔とタイムアウト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagWait {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for TagWait {
    fn default() -> Self {
        let wait = WaitConfig::default();
        Self {
            interval_secs: wait.interval.as_secs(),
            timeout_secs: wait.timeout.as_secs(),
        }
    }
}

/// tagflow.yaml の内容
///
/// すべてのキーは省略可能。ファイル自体が無い場合もデフォルト値で動作する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ls / rm で使うデフォルトのプロファイル
    pub profile: Option<String>,

    /// ユーザーデータスクリプトのディレクトリ
    pub userdata_dir: PathBuf,

    /// NATインスタンスの Name タグパターン（`{customer}` を置換、`*` 可）
    pub nat_instance_name: String,

    pub tag_wait: TagWait,

    /// インスタンスのタグとしてコピーする追加フィールド
    pub extra_tag_fields: Vec<String>,

    /// Debian イメージの所有アカウント
    pub debian_image_owner: String,

    pub db_password_length: usize,
}

// デフォルト値はエンジン側の ReconcileSettings に合わせる
impl Default for Settings {
    fn default() -> Self {
        let engine = ReconcileSettings::default();
        Self {
            profile: None,
            userdata_dir: engine.userdata.dir().to_path_buf(),
            nat_instance_name: engine.nat_instance_name,
            tag_wait: TagWait::default(),
            extra_tag_fields: engine.extra_tag_fields,
            debian_image_owner: engine.debian_image_owner,
            db_password_length: engine.db_password_length,
        }
    }
}

impl Settings {
    /// YAML文字列から読み込む
    pub fn from_yaml(path: &Path, content: &str) -> Result<Self> {
        // 空ファイルはデフォルト扱い
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Settings =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.tag_wait.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "tag_wait.interval_secs は1以上を指定してください".to_string(),
            ));
        }
        if self.tag_wait.timeout_secs < self.tag_wait.interval_secs {
            return Err(ConfigError::InvalidValue(
                "tag_wait.timeout_secs は interval_secs 以上を指定してください".to_string(),
            ));
        }
        if self.db_password_length == 0 {
            return Err(ConfigError::InvalidValue(
                "db_password_length は1以上を指定してください".to_string(),
            ));
        }
        Ok(())
    }
}

/// TagFlowの設定ディレクトリ (~/.config/tagflow)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("tagflow");
    Ok(config_dir)
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 TAGFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: tagflow.yaml, .tagflow.yaml
/// 3. ./.tagflow/tagflow.yaml
/// 4. ~/.config/tagflow/tagflow.yaml (グローバル設定)
///
/// 見つからなければ `None`
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in [CONFIG_FILE_NAME, ".tagflow.yaml"] {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 3. ./.tagflow/ ディレクトリ
    let local = current_dir.join(".tagflow").join(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    // 4. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("tagflow").join(CONFIG_FILE_NAME);
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// 設定を読み込む。設定ファイルが無ければデフォルト値
pub fn load_settings() -> Result<Settings> {
    match find_config_file()? {
        Some(path) => load_settings_from(&path),
        None => Ok(Settings::default()),
    }
}

/// 指定パスの設定ファイルを読み込む
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    Settings::from_yaml(path, &content)
}
