use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";

/// 占位用的 API key，视为未配置
const PLACEHOLDER_API_KEY: &str = "your-gemini-api-key";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: f32,
    pub max_prompt_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_file_bytes: u64,
    pub strict_cleaning: bool,
}

/// 显式传入需要调用 Gemini 的组件，核心模块不读取全局环境
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_key: String,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl AppConfig {
    /// 默认配置 → config/settings.toml → VIDYA__ 环境变量
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("VIDYA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("读取配置失败: {}", path.display()))?;

        let mut app_config: AppConfig = settings
            .try_deserialize()
            .context("配置格式错误")?;

        if !is_real_key(&app_config.gemini.api_key) {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                app_config.gemini.api_key = key;
            }
        }

        Ok(app_config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 仅当配置了真实的 API key 时返回凭证
    pub fn credentials(&self) -> Option<ApiCredentials> {
        is_real_key(&self.gemini.api_key).then(|| ApiCredentials::new(self.gemini.api_key.trim()))
    }
}

fn is_real_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != PLACEHOLDER_API_KEY
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            temperature: 0.4,
            max_prompt_chars: 30_000,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            strict_cleaning: false,
        }
    }
}
