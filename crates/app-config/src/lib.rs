//! アプリケーション設定管理
//!
//! このクレートはチャットアプリケーションの設定を管理します。
//! - デフォルト設定の提供
//! - TOML ファイルからの読み込み
//! - 設定の保存

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 会話データの保存先ベースディレクトリ
    /// （実体は `<base_dir>/chat_data/<user_id>/...` に置かれる）
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// デフォルトのプロバイダ指定（"<provider>:<capability>" 形式）
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// デフォルトモデル名
    #[serde(default = "default_model")]
    pub default_model: String,

    /// 会話IDの桁数（ゼロ埋め）
    #[serde(default = "default_id_width")]
    pub conversation_id_width: usize,

    /// 最初のターンの前に差し込むシステムプロンプト
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_base_dir() -> PathBuf {
    get_default_data_dir()
}

fn default_provider() -> String {
    "openai:chat.completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_id_width() -> usize {
    3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            default_provider: default_provider(),
            default_model: default_model(),
            conversation_id_width: default_id_width(),
            system_prompt: None,
        }
    }
}

impl AppConfig {
    /// デフォルト設定を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// TOML ファイルから設定を読み込み
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// デフォルト設定ファイルパスから読み込み（なければデフォルト設定を返す）
    pub fn load_or_default() -> Self {
        let config_path = get_default_config_path();

        if config_path.exists() {
            Self::load_from_file(&config_path).unwrap_or_else(|e| {
                log::warn!("Failed to load config ({}), using defaults", e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// 設定をファイルに保存
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        // 親ディレクトリを作成
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// デフォルト設定ファイルパスに保存
    pub fn save(&self) -> Result<()> {
        let config_path = get_default_config_path();
        self.save_to_file(&config_path)
    }
}

/// デフォルトのデータディレクトリを取得
/// Windows: %USERPROFILE%\.ai-chat
/// Unix: ~/.ai-chat
pub fn get_default_data_dir() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        home.join(".ai-chat")
    } else {
        PathBuf::from(".ai-chat")
    }
}

/// デフォルトの設定ファイルパスを取得
pub fn get_default_config_path() -> PathBuf {
    get_default_data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai:chat.completions");
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.conversation_id_width, 3);
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config = AppConfig {
            base_dir: PathBuf::from("/tmp/chat"),
            default_provider: "anthropic:chat.completions".to_string(),
            default_model: "claude-sonnet-4-20250514".to_string(),
            conversation_id_width: 5,
            system_prompt: Some("Be concise.".to_string()),
        };

        // 保存
        config.save_to_file(&config_path).unwrap();

        // 読み込み
        let loaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.base_dir, config.base_dir);
        assert_eq!(loaded.default_provider, config.default_provider);
        assert_eq!(loaded.default_model, config.default_model);
        assert_eq!(loaded.conversation_id_width, config.conversation_id_width);
        assert_eq!(loaded.system_prompt, config.system_prompt);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "default_model = \"gpt-4o\"\n").unwrap();

        let loaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.default_model, "gpt-4o");
        assert_eq!(loaded.default_provider, "openai:chat.completions");
        assert_eq!(loaded.conversation_id_width, 3);
    }

    #[test]
    fn test_load_or_default() {
        // 設定ファイルが無くてもデフォルトが返る
        let config = AppConfig::load_or_default();
        assert!(!config.default_provider.is_empty());
    }
}
