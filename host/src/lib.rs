//! # Host 层
//!
//! 线上展览浏览器的宿主层实现。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 抓取展览配置与媒体（文件系统 / ZIP / HTTP）
//! - 图片预载与延迟载入
//! - 音频导览播放
//! - 访客偏好持久化
//! - 把 exhibit-core 的状态类型接到实际 IO 上
//!
//! Host 层不包含展览数据的业务规则，这些在 `exhibit-core` 中。

pub mod audio;
pub mod config;
pub mod images;
pub mod preferences;
pub mod resources;
pub mod session;

#[cfg(test)]
mod testing;

pub use audio::{AudioBackend, AudioError, AudioGuide, HeadlessAudioBackend};
pub use config::{AppConfig, AssetSourceType, AudioConfig, ConfigError, HttpConfig, ImagesConfig};
pub use images::{ElementId, ImageLoadEvent, ImageLoader, ImageLoaderOptions};
pub use preferences::{
    JsonFilePreferences, MemoryPreferences, PREFERRED_LANGUAGE_KEY, PreferenceError,
    PreferenceStore,
};
pub use resources::{
    Fetcher, FsFetcher, HttpFetcher, ResourceError, ResourceManager, RoutedFetcher, ZipFetcher,
};
pub use session::ExhibitionSession;
