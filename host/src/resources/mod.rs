//! # Resources 模块
//!
//! 展览配置载入系统：按资源配置的模式取得 [`ExhibitionConfig`]，
//! 改写相对媒体 URL，并在主要来源失败时尝试一次备援来源。
//!
//! ## 载入模式
//!
//! | 模式 | 配置来源 | 媒体 URL 改写 |
//! |------|----------|---------------|
//! | `static` | `{staticPath}{id}/config.json` | `{staticPath}{id}/images|audio/{url}` |
//! | `api` | `{apiEndpoint}/{id}` | 不改写 |
//! | `hybrid` | `{apiEndpoint}/{id}` | `{cdnBaseUrl}/{url}`（配置了 CDN 时） |
//!
//! 绝对 HTTP(S) URL 永远不改写，判断按字段独立进行。

pub mod path;

mod error;
mod source;

pub use error::ResourceError;
pub use source::{Fetcher, FsFetcher, HttpFetcher, RoutedFetcher, ZipFetcher};

use exhibit_core::{ExhibitionConfig, FallbackStrategy, ResourceConfig, ResourceMode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use path::{is_absolute_url, join_url, static_config_url, static_media_url};

/// 抓取并解析 JSON
pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn Fetcher,
    url: &str,
) -> Result<T, ResourceError> {
    let bytes = fetcher.fetch(url).await?;
    serde_json::from_slice(&bytes).map_err(|e| ResourceError::InvalidFormat {
        path: fetcher.describe(url),
        message: e.to_string(),
    })
}

/// 资源管理器
pub struct ResourceManager {
    config: ResourceConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl ResourceManager {
    pub fn new(config: ResourceConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    /// 配置对其模式是否有效
    ///
    /// `static` 总是有效；`api` / `hybrid` 需要 `apiEndpoint`；其他模式无效。
    pub fn validate_config(config: &ResourceConfig) -> bool {
        config.is_valid()
    }

    /// 当前资源配置的副本
    pub fn config(&self) -> ResourceConfig {
        self.config.clone()
    }

    /// 替换资源配置，无效配置会被拒绝
    pub fn update_config(&mut self, config: ResourceConfig) -> Result<(), ResourceError> {
        if !Self::validate_config(&config) {
            return Err(ResourceError::Misconfigured {
                message: format!("无效的资源配置（模式: {}）", config.mode),
            });
        }
        self.config = config;
        Ok(())
    }

    /// 载入展览
    ///
    /// 主要来源失败且配置了备援策略时，以备援模式重试一次；
    /// 备援也失败时返回同时包含两者消息的 [`ResourceError::FallbackFailed`]。
    pub async fn load_exhibition(&self, exhibition_id: &str) -> Result<ExhibitionConfig, ResourceError> {
        let primary = match self.load_primary(exhibition_id).await {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        let Some(mode) = self.config.fallback_strategy.as_mode() else {
            return Err(primary);
        };

        warn!(
            exhibition = exhibition_id,
            mode = %self.config.mode,
            fallback = %mode,
            error = %primary,
            "主要来源载入失败，尝试备援来源"
        );

        // 备援管理器不再有备援，避免链式重试
        let fallback_manager = ResourceManager::new(
            ResourceConfig {
                mode,
                fallback_strategy: FallbackStrategy::None,
                ..self.config.clone()
            },
            self.fetcher.clone(),
        );

        match fallback_manager.load_primary(exhibition_id).await {
            Ok(config) => {
                info!(exhibition = exhibition_id, "备援来源载入成功");
                Ok(config)
            }
            Err(fallback) => {
                error!(
                    exhibition = exhibition_id,
                    primary = %primary,
                    fallback = %fallback,
                    "备援来源也载入失败"
                );
                Err(ResourceError::FallbackFailed {
                    primary: primary.to_string(),
                    fallback: fallback.to_string(),
                })
            }
        }
    }

    /// 只使用当前模式载入（不备援）
    pub async fn load_primary(&self, exhibition_id: &str) -> Result<ExhibitionConfig, ResourceError> {
        let config = match &self.config.mode {
            ResourceMode::Static => self.load_static(exhibition_id).await?,
            ResourceMode::Api => self.load_api(exhibition_id).await?,
            ResourceMode::Hybrid => self.load_hybrid(exhibition_id).await?,
            ResourceMode::Unsupported(mode) => {
                return Err(ResourceError::Misconfigured {
                    message: format!("不支持的资源载入模式: {}", mode),
                });
            }
        };

        config
            .check()
            .map_err(|e| ResourceError::InvalidFormat {
                path: exhibition_id.to_string(),
                message: e.to_string(),
            })?;

        Ok(config)
    }

    async fn load_static(&self, exhibition_id: &str) -> Result<ExhibitionConfig, ResourceError> {
        let static_path = self.config.static_path();
        let url = static_config_url(static_path, exhibition_id);
        debug!(url = %url, "载入静态展览配置");

        let mut config: ExhibitionConfig = fetch_json(self.fetcher.as_ref(), &url).await?;
        config.rewrite_media_urls(|kind, url| {
            (!is_absolute_url(url))
                .then(|| static_media_url(static_path, exhibition_id, kind, url))
        });
        Ok(config)
    }

    async fn load_api(&self, exhibition_id: &str) -> Result<ExhibitionConfig, ResourceError> {
        let endpoint = self
            .config
            .api_endpoint()
            .ok_or_else(|| ResourceError::Misconfigured {
                message: format!("{} 模式需要 apiEndpoint 配置", self.config.mode),
            })?;

        let url = join_url(endpoint, exhibition_id);
        debug!(url = %url, "从 API 载入展览配置");
        fetch_json(self.fetcher.as_ref(), &url).await
    }

    async fn load_hybrid(&self, exhibition_id: &str) -> Result<ExhibitionConfig, ResourceError> {
        let mut config = self.load_api(exhibition_id).await?;

        if let Some(cdn) = self.config.cdn_base_url() {
            config.rewrite_media_urls(|_, url| (!is_absolute_url(url)).then(|| join_url(cdn, url)));
        }
        Ok(config)
    }
}
