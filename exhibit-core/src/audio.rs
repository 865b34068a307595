//! # Audio 模块
//!
//! 音频导览的纯状态部分：播放状态快照、阶段划分以及语言选择规则。
//! 实际的解码与播放由宿主层的音频后端负责。

use crate::model::Scene;

/// 音频导览状态
#[derive(Debug, Clone, PartialEq)]
pub struct AudioGuideState {
    pub current_language: String,
    pub is_playing: bool,
    pub is_loading: bool,
    /// 当前播放位置（秒）
    pub current_time: f64,
    /// 音轨时长（秒）
    pub duration: f64,
    /// 音量，始终在 [0, 1]
    pub volume: f64,
    pub error_message: Option<String>,
}

impl Default for AudioGuideState {
    fn default() -> Self {
        Self {
            current_language: String::new(),
            is_playing: false,
            is_loading: false,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
            error_message: None,
        }
    }
}

impl AudioGuideState {
    /// 以指定语言与音量创建
    pub fn new(language: impl Into<String>, volume: f64) -> Self {
        Self {
            current_language: language.into(),
            volume: clamp_volume(volume),
            ..Self::default()
        }
    }

    /// 播放进度，时长为 0 时为 0
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            clamp_progress(self.current_time / self.duration)
        } else {
            0.0
        }
    }

    /// 切换场景时重置播放相关字段，保留语言与音量
    pub fn reset_playback(&mut self) {
        self.is_playing = false;
        self.is_loading = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.error_message = None;
    }

    /// 当前阶段
    pub fn phase(&self, has_scene: bool) -> AudioPhase {
        if !has_scene {
            AudioPhase::Idle
        } else if self.is_loading {
            AudioPhase::Loading
        } else if self.error_message.is_some() {
            AudioPhase::Error
        } else if self.duration > 0.0 || self.is_playing {
            AudioPhase::Ready
        } else {
            AudioPhase::Idle
        }
    }
}

/// 单个场景内的音频阶段
///
/// ```text
/// Idle ──load──► Loading ──► Ready ⇄ (播放 / 暂停)
///                   │
///                   └──► Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPhase {
    Idle,
    Loading,
    Ready,
    Error,
}

/// 为场景选择导览语言
///
/// 顺序：已保存的偏好 → 预设语言 → 第一个有音频的语言。
/// 场景没有任何音频时返回 None。
pub fn choose_language(preferred: Option<&str>, default_language: &str, scene: &Scene) -> Option<String> {
    preferred
        .filter(|lang| scene.has_audio_for(lang))
        .or_else(|| Some(default_language).filter(|lang| scene.has_audio_for(lang)))
        .map(str::to_string)
        .or_else(|| scene.audio.keys().next().cloned())
}

/// 把音量限制到 [0, 1]，NaN 视为 0
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// 把进度限制到 [0, 1]，NaN 视为 0
pub fn clamp_progress(progress: f64) -> f64 {
    clamp_volume(progress)
}
