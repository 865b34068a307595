//! # Exhibit Core
//!
//! 线上展览浏览器的核心逻辑库。
//!
//! ## 架构概述
//!
//! `exhibit-core` 是纯逻辑核心，不依赖任何 IO 或异步运行时。
//! 宿主层（Host）负责抓取配置与媒体，再把结果交给这里的状态类型：
//!
//! ```text
//! Host                                 Core
//!   │                                    │
//!   │── ExhibitionConfig ──────────────►│ ExhibitionNavigator
//!   │                                    │
//!   │◄── adjacent_preload_items() ───────│ PreloadQueue / ImageStateMap
//!   │                                    │
//!   │◄── choose_language() ──────────────│ AudioGuideState
//! ```
//!
//! ## 模块结构
//!
//! - [`model`]：展览、场景、资源配置等数据模型
//! - [`i18n`]：多语言文字解析
//! - [`navigation`]：场景游标
//! - [`preload`]：预载队列、图片状态与统计
//! - [`audio`]：音频导览状态
//! - [`listener`]：订阅者集合
//! - [`validate`]：配置验证工具
//! - [`error`]：错误类型定义

pub mod audio;
pub mod error;
pub mod i18n;
pub mod listener;
pub mod model;
pub mod navigation;
pub mod preload;
pub mod validate;

// 重导出核心类型
pub use audio::{AudioGuideState, AudioPhase, choose_language, clamp_progress, clamp_volume};
pub use error::{CoreError, ModelError};
pub use i18n::{FALLBACK_LANGUAGE, LocalizedText, localized_text, resolve_description};
pub use listener::{ListenerId, ListenerSnapshot, Listeners};
pub use model::{
    AudioFile, AudioFormat, DEFAULT_STATIC_PATH, ExhibitionConfig, ExhibitionSettings,
    FallbackStrategy, ImageInfo, MediaKind, ResourceConfig, ResourceMode, Scene, SceneMetadata,
};
pub use navigation::ExhibitionNavigator;
pub use preload::{
    ImageLoadState, ImageStateMap, LoadingStats, MAX_IMAGE_RETRIES, PreloadQueue,
    PreloadQueueItem, RetryRejected, adjacent_preload_items,
};
pub use validate::{
    ValidationReport, ValidationSummary, validate_exhibition_config, validate_json,
};
