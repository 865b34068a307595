//! 无声音输出的音频后端

use async_trait::async_trait;
use exhibit_core::{ListenerId, Listeners, clamp_progress, clamp_volume};
use rodio::Source;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tracing::{debug, error};

use super::{AudioBackend, AudioError, AudioLoaded, AudioProgress, LoadCallback, ProgressCallback};
use crate::resources::Fetcher;

/// 音轨缓存键：`{language}-{url}`
fn track_key(language: &str, url: &str) -> String {
    format!("{}-{}", language, url)
}

/// 用 rodio 解码器探测时长
fn decode_duration(bytes: Vec<u8>) -> Result<Option<f64>, String> {
    let decoder = rodio::Decoder::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    Ok(decoder.total_duration().map(|d| d.as_secs_f64()))
}

struct ActiveTrack {
    key: String,
    /// 0 表示未知
    duration: f64,
    /// 最近一次锚定时的位置（秒）
    offset: f64,
    /// 播放中时为开始计时的时刻
    started_at: Option<Instant>,
}

impl ActiveTrack {
    fn new(key: String, duration: f64) -> Self {
        Self {
            key,
            duration,
            offset: 0.0,
            started_at: None,
        }
    }

    fn position(&self) -> f64 {
        let elapsed = self
            .started_at
            .map_or(0.0, |t| t.elapsed().as_secs_f64());
        let position = self.offset + elapsed;
        if self.duration > 0.0 {
            position.min(self.duration)
        } else {
            position
        }
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    fn progress(&self) -> AudioProgress {
        let current_time = self.position();
        AudioProgress {
            current_time,
            duration: self.duration,
            progress: if self.duration > 0.0 {
                clamp_progress(current_time / self.duration)
            } else {
                0.0
            },
        }
    }
}

struct PlaybackState {
    /// 已载入音轨的时长
    tracks: HashMap<String, f64>,
    active: Option<ActiveTrack>,
    volume: f64,
}

/// 无声音输出的音频后端
///
/// 音频通过 [`Fetcher`] 抓取并由 rodio 解码验证，播放位置按墙钟推进。
/// 调用 [`HeadlessAudioBackend::tick`] 发布进度事件。
pub struct HeadlessAudioBackend {
    fetcher: Arc<dyn Fetcher>,
    state: Mutex<PlaybackState>,
    progress_listeners: Mutex<Listeners<AudioProgress>>,
    load_listeners: Mutex<Listeners<AudioLoaded>>,
}

impl HeadlessAudioBackend {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            state: Mutex::new(PlaybackState {
                tracks: HashMap::new(),
                active: None,
                volume: 1.0,
            }),
            progress_listeners: Mutex::new(Listeners::new()),
            load_listeners: Mutex::new(Listeners::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 已缓存的音轨数量
    pub fn cached_tracks(&self) -> usize {
        self.state().tracks.len()
    }

    /// 推进播放并发布进度事件
    ///
    /// 播放到结尾时自动停在结尾。没有活动音轨时返回 None。
    pub fn tick(&self) -> Option<AudioProgress> {
        let progress = {
            let mut state = self.state();
            let active = state.active.as_mut()?;
            if active.is_playing() && active.duration > 0.0 && active.position() >= active.duration {
                active.offset = active.duration;
                active.started_at = None;
                debug!(track = %active.key, "音轨播放结束");
            }
            active.progress()
        };

        let listeners = self
            .progress_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        for id in listeners.emit(&progress) {
            error!(listener = ?id, "音频进度订阅者 panic");
        }
        Some(progress)
    }
}

#[async_trait]
impl AudioBackend for HeadlessAudioBackend {
    async fn load_audio(&self, url: &str, language: &str) -> Result<f64, AudioError> {
        let key = track_key(language, url);
        let cached = self.state().tracks.get(&key).copied();
        if let Some(duration) = cached {
            return Ok(duration);
        }

        let bytes = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| AudioError::Load {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let duration = decode_duration(bytes)
            .map_err(|message| AudioError::Decode {
                url: url.to_string(),
                message,
            })?
            .unwrap_or(0.0);

        self.state().tracks.insert(key, duration);
        debug!(url = %url, language = %language, duration, "音轨载入完成");

        let event = AudioLoaded {
            url: url.to_string(),
            language: language.to_string(),
            duration,
        };
        let listeners = self
            .load_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        for id in listeners.emit(&event) {
            error!(listener = ?id, "音频载入订阅者 panic");
        }

        Ok(duration)
    }

    async fn play_audio(&self, url: &str, language: &str) -> Result<(), AudioError> {
        let duration = self.load_audio(url, language).await?;
        let key = track_key(language, url);

        let mut state = self.state();
        match state.active.as_mut() {
            Some(active) if active.key == key => {
                if !active.is_playing() {
                    if active.duration > 0.0 && active.offset >= active.duration {
                        active.offset = 0.0;
                    }
                    active.started_at = Some(Instant::now());
                }
            }
            _ => {
                let mut track = ActiveTrack::new(key, duration);
                track.started_at = Some(Instant::now());
                state.active = Some(track);
            }
        }
        Ok(())
    }

    fn pause_audio(&self) {
        if let Some(active) = self.state().active.as_mut()
            && active.is_playing()
        {
            active.offset = active.position();
            active.started_at = None;
        }
    }

    fn stop_audio(&self) {
        if let Some(active) = self.state().active.as_mut() {
            active.offset = 0.0;
            active.started_at = None;
        }
    }

    fn seek(&self, position: f64) {
        if let Some(active) = self.state().active.as_mut() {
            let position = if position.is_nan() { 0.0 } else { position.max(0.0) };
            active.offset = if active.duration > 0.0 {
                position.min(active.duration)
            } else {
                position
            };
            if active.is_playing() {
                active.started_at = Some(Instant::now());
            }
        }
    }

    fn current_time(&self) -> f64 {
        self.state().active.as_ref().map_or(0.0, ActiveTrack::position)
    }

    fn duration(&self) -> f64 {
        self.state().active.as_ref().map_or(0.0, |a| a.duration)
    }

    fn is_playing(&self) -> bool {
        self.state()
            .active
            .as_ref()
            .is_some_and(ActiveTrack::is_playing)
    }

    fn is_active(&self, url: &str, language: &str) -> bool {
        let key = track_key(language, url);
        self.state().active.as_ref().is_some_and(|a| a.key == key)
    }

    fn set_volume(&self, volume: f64) {
        self.state().volume = clamp_volume(volume);
    }

    fn volume(&self) -> f64 {
        self.state().volume
    }

    fn on_progress(&self, callback: ProgressCallback) -> ListenerId {
        self.progress_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(callback)
    }

    fn off_progress(&self, id: ListenerId) -> bool {
        self.progress_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe(id)
    }

    fn on_load(&self, callback: LoadCallback) -> ListenerId {
        self.load_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(callback)
    }

    fn off_load(&self, id: ListenerId) -> bool {
        self.load_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe(id)
    }
}
