//! # Audio 模块
//!
//! 音频导览系统。
//!
//! ## 组成
//!
//! - [`AudioBackend`]：播放后端接口（载入、播放、暂停、定位、音量、事件）
//! - [`HeadlessAudioBackend`]：不输出声音的后端，用 rodio 解码探测时长，按墙钟推进播放位置
//! - [`AudioGuide`]：每个场景的导览状态机（语言选择、切换语言保留进度等）
//!
//! 同一时间只有一条音轨处于活动状态。

mod guide;
mod headless;

pub use guide::AudioGuide;
pub use headless::HeadlessAudioBackend;

use async_trait::async_trait;
use exhibit_core::{CoreError, ListenerId};
use thiserror::Error;

use crate::preferences::PreferenceError;

/// 音频错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// 音频抓取失败
    #[error("音频载入失败: {url} - {message}")]
    Load { url: String, message: String },

    /// 音频解码失败
    #[error("音频解码失败: {url} - {message}")]
    Decode { url: String, message: String },

    /// 播放失败
    #[error("音频播放失败: {message}")]
    Playback { message: String },

    /// 语言不可用、没有场景等
    #[error(transparent)]
    Core(#[from] CoreError),

    /// 偏好读写失败
    #[error(transparent)]
    Preference(#[from] PreferenceError),
}

/// 播放进度事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioProgress {
    /// 当前位置（秒）
    pub current_time: f64,
    /// 时长（秒），未知时为 0
    pub duration: f64,
    /// 进度 [0, 1]
    pub progress: f64,
}

/// 音轨载入完成事件
#[derive(Debug, Clone, PartialEq)]
pub struct AudioLoaded {
    pub url: String,
    pub language: String,
    pub duration: f64,
}

pub type ProgressCallback = Box<dyn FnMut(&AudioProgress) + Send>;
pub type LoadCallback = Box<dyn FnMut(&AudioLoaded) + Send>;

/// 音频播放后端
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// 载入音轨（不播放），返回时长（秒，未知时为 0）
    ///
    /// 已载入的音轨直接返回。
    async fn load_audio(&self, url: &str, language: &str) -> Result<f64, AudioError>;

    /// 播放音轨，必要时先载入；其他音轨会被停止
    async fn play_audio(&self, url: &str, language: &str) -> Result<(), AudioError>;

    fn pause_audio(&self);

    /// 停止并回到开头
    fn stop_audio(&self);

    /// 定位到指定秒数
    fn seek(&self, position: f64);

    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// 活动音轨是否为指定语言的该 URL
    ///
    /// 只有活动音轨的位置、时长与播放状态能通过上面的方法读取。
    fn is_active(&self, url: &str, language: &str) -> bool;

    fn set_volume(&self, volume: f64);

    fn volume(&self) -> f64;

    fn on_progress(&self, callback: ProgressCallback) -> ListenerId;

    fn off_progress(&self, id: ListenerId) -> bool;

    fn on_load(&self, callback: LoadCallback) -> ListenerId;

    fn off_load(&self, id: ListenerId) -> bool;
}
