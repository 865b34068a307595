//! # Config 模块
//!
//! 运行时配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use exhibit_core::ResourceConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::images::ImageLoaderOptions;
use crate::resources::path::is_absolute_url;
use crate::resources::{
    Fetcher, FsFetcher, HttpFetcher, ResourceError, ResourceManager, RoutedFetcher, ZipFetcher,
};

/// 本地资源来源类型
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetSourceType {
    /// 文件系统（开发模式）
    #[default]
    Fs,
    /// ZIP 文件（发布模式）
    Zip,
    /// HTTP（相对 URL 拼接到 base_url）
    Http,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 相对 URL 的来源类型（fs/zip/http）
    #[serde(default)]
    pub asset_source: AssetSourceType,

    /// 站点根目录（仅 Fs 模式使用），`/assets/...` 在其下解析
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,

    /// ZIP 文件路径（仅 Zip 模式使用）
    #[serde(default)]
    pub zip_path: Option<PathBuf>,

    /// 站点源（Http 模式必须配置，如 `https://museum.example.com`）
    #[serde(default)]
    pub base_url: Option<String>,

    /// 展览配置的资源来源
    #[serde(default)]
    pub resource: ResourceConfig,

    /// 图片载入配置
    #[serde(default)]
    pub images: ImagesConfig,

    /// 音频配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// HTTP 配置
    #[serde(default)]
    pub http: HttpConfig,

    /// 语言偏好文件
    #[serde(default = "default_preferences_path")]
    pub preferences_path: PathBuf,
}

/// 图片载入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// 是否启用预载
    #[serde(default = "default_true")]
    pub enable_preload: bool,

    /// 是否按可见性延迟载入（关闭时登记即载入）
    #[serde(default = "default_true")]
    pub lazy_loading: bool,

    /// 每批并行预载数量
    #[serde(default = "default_preload_count")]
    pub preload_count: usize,

    /// 单张图片最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 批次之间的间隔（毫秒）
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,
}

/// 音频配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// 展览未指定时使用的导览语言
    #[serde(default = "default_language")]
    pub default_language: String,

    /// 初始音量 (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub volume: f64,
}

/// HTTP 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// 请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// 默认值函数
fn default_assets_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from("preferences.json")
}

fn default_true() -> bool {
    true
}

fn default_preload_count() -> usize {
    3
}

fn default_max_retries() -> u32 {
    exhibit_core::MAX_IMAGE_RETRIES
}

fn default_drain_interval_ms() -> u64 {
    100
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_volume() -> f64 {
    0.8
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            asset_source: AssetSourceType::default(),
            assets_root: default_assets_root(),
            zip_path: None,
            base_url: None,
            resource: ResourceConfig::default(),
            images: ImagesConfig::default(),
            audio: AudioConfig::default(),
            http: HttpConfig::default(),
            preferences_path: default_preferences_path(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enable_preload: true,
            lazy_loading: true,
            preload_count: default_preload_count(),
            max_retries: default_max_retries(),
            drain_interval_ms: default_drain_interval_ms(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            volume: default_volume(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl From<&ImagesConfig> for ImageLoaderOptions {
    fn from(config: &ImagesConfig) -> Self {
        Self {
            enable_preload: config.enable_preload,
            lazy_loading: config.lazy_loading,
            preload_count: config.preload_count,
            max_retries: config.max_retries,
            drain_interval: Duration::from_millis(config.drain_interval_ms),
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.asset_source {
            AssetSourceType::Fs => {
                if !self.assets_root.exists() {
                    return Err(ConfigError::ValidationFailed(format!(
                        "资源目录不存在: {:?}",
                        self.assets_root
                    )));
                }
            }
            AssetSourceType::Zip => {
                let zip_path = self.zip_path.as_ref().ok_or_else(|| {
                    ConfigError::ValidationFailed("Zip 模式必须配置 zip_path".to_string())
                })?;

                if !zip_path.exists() {
                    return Err(ConfigError::ValidationFailed(format!(
                        "ZIP 文件不存在: {:?}",
                        zip_path
                    )));
                }
            }
            AssetSourceType::Http => match &self.base_url {
                Some(base) if is_absolute_url(base) => {}
                _ => {
                    return Err(ConfigError::ValidationFailed(
                        "Http 模式必须配置 http(s) 开头的 base_url".to_string(),
                    ));
                }
            },
        }

        if !ResourceManager::validate_config(&self.resource) {
            return Err(ConfigError::ValidationFailed(format!(
                "资源配置无效（模式: {}）",
                self.resource.mode
            )));
        }

        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(ConfigError::ValidationFailed(
                "音量必须在 0.0 - 1.0 之间".to_string(),
            ));
        }

        if self.images.preload_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "preload_count 必须大于 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 按配置构建抓取来源
    ///
    /// 绝对 URL 总是走 HTTP；相对 URL 按 `asset_source` 选择本地来源。
    pub fn build_fetcher(&self) -> Result<Arc<dyn Fetcher>, ResourceError> {
        let timeout = Duration::from_secs(self.http.timeout_secs);
        let remote: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(timeout, self.base_url.clone())?);

        let local: Arc<dyn Fetcher> = match self.asset_source {
            AssetSourceType::Fs => Arc::new(FsFetcher::new(&self.assets_root)),
            AssetSourceType::Zip => {
                let zip_path = self.zip_path.as_ref().ok_or_else(|| {
                    ResourceError::Misconfigured {
                        message: "Zip 模式必须配置 zip_path".to_string(),
                    }
                })?;
                Arc::new(ZipFetcher::new(zip_path))
            }
            AssetSourceType::Http => return Ok(remote),
        };

        Ok(Arc::new(RoutedFetcher::new(local, remote)))
    }
}

/// 配置错误
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
