//! 音频导览状态机
//!
//! ```text
//! Idle ──load_scene──► Loading ──► Ready(暂停) ⇄ Ready(播放)
//!                         │
//!                         └──► Error ──retry_load──► Loading
//! ```
//!
//! 任何状态在 `load_scene(None)` 或 `teardown()` 后回到 Idle。

use exhibit_core::{
    AudioGuideState, AudioPhase, CoreError, Scene, choose_language, clamp_progress, clamp_volume,
    resolve_description,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{AudioBackend, AudioError};
use crate::preferences::PreferenceStore;

/// 音轨开始播放时要恢复的位置
#[derive(Debug, Clone, Copy, PartialEq)]
enum ResumePoint {
    /// 进度比例（切换语言时保存）
    Progress(f64),
    /// 秒数（音轨尚未活动时的定位）
    Time(f64),
}

fn no_scene() -> AudioError {
    CoreError::InvalidState {
        message: "没有载入场景".to_string(),
    }
    .into()
}

/// 音频导览
pub struct AudioGuide {
    backend: Arc<dyn AudioBackend>,
    preferences: Arc<dyn PreferenceStore>,
    default_language: String,
    scene: Option<Scene>,
    state: AudioGuideState,
    /// 下次播放时恢复的位置
    resume: Option<ResumePoint>,
}

impl AudioGuide {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        preferences: Arc<dyn PreferenceStore>,
        default_language: impl Into<String>,
        volume: f64,
    ) -> Self {
        let default_language = default_language.into();
        let state = AudioGuideState::new(default_language.clone(), volume);
        backend.set_volume(state.volume);

        Self {
            backend,
            preferences,
            default_language,
            scene: None,
            state,
            resume: None,
        }
    }

    pub fn state(&self) -> &AudioGuideState {
        &self.state
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// 设置预设语言（通常来自展览配置）
    pub fn set_default_language(&mut self, language: impl Into<String>) {
        self.default_language = language.into();
    }

    pub fn phase(&self) -> AudioPhase {
        self.state.phase(self.scene.is_some())
    }

    /// 当前场景有音频的语言
    pub fn available_languages(&self) -> Vec<String> {
        self.scene
            .as_ref()
            .map(Scene::audio_languages)
            .unwrap_or_default()
    }

    /// 当前场景是否有当前语言的音频
    pub fn has_audio(&self) -> bool {
        self.scene
            .as_ref()
            .is_some_and(|s| s.has_audio_for(&self.state.current_language))
    }

    /// 当前语言的导览文字
    pub fn current_description(&self) -> String {
        self.scene
            .as_ref()
            .map(|scene| {
                resolve_description(
                    &scene.description,
                    &self.state.current_language,
                    &self.default_language,
                )
            })
            .unwrap_or_default()
    }

    /// 当前语言的音轨是否为后端的活动音轨
    fn track_is_active(&self) -> bool {
        self.current_track()
            .is_some_and(|(url, _)| self.backend.is_active(&url, &self.state.current_language))
    }

    /// 从后端同步播放位置与状态
    ///
    /// 后端的活动音轨仍属于上一个场景或语言时不同步。
    pub fn sync(&mut self) {
        if !self.track_is_active() {
            return;
        }
        self.state.current_time = self.backend.current_time();
        self.state.is_playing = self.backend.is_playing();
        let duration = self.backend.duration();
        if duration > 0.0 {
            self.state.duration = duration;
        }
    }

    fn current_track(&self) -> Option<(String, f64)> {
        self.scene
            .as_ref()
            .and_then(|s| s.audio_file(&self.state.current_language))
            .map(|audio| (audio.url.clone(), audio.duration))
    }

    // ============ 载入 ============

    /// 载入场景
    ///
    /// 停止当前播放，按偏好 → 预设 → 第一个可用语言选择语言，并开始载入（不播放）。
    pub async fn load_scene(&mut self, scene: Option<&Scene>) -> Result<(), AudioError> {
        self.backend.stop_audio();
        self.state.reset_playback();
        self.resume = None;

        let Some(scene) = scene else {
            self.scene = None;
            return Ok(());
        };
        self.scene = Some(scene.clone());

        let preferred = self.preferences.preferred_language().unwrap_or_else(|e| {
            warn!(error = %e, "读取语言偏好失败");
            None
        });

        match choose_language(preferred.as_deref(), &self.default_language, scene) {
            Some(language) => {
                self.state.current_language = language;
                self.load_current_language().await
            }
            None => {
                debug!(scene = %scene.id, "场景没有音频");
                Ok(())
            }
        }
    }

    async fn load_current_language(&mut self) -> Result<(), AudioError> {
        let Some((url, declared)) = self.current_track() else {
            return Ok(());
        };

        self.state.is_loading = true;
        self.state.error_message = None;
        let result = self
            .backend
            .load_audio(&url, &self.state.current_language)
            .await;
        self.state.is_loading = false;

        match result {
            Ok(decoded) => {
                self.state.duration = if decoded > 0.0 { decoded } else { declared };
                self.state.current_time = 0.0;
                Ok(())
            }
            Err(e) => {
                self.state.error_message = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// 重新载入当前语言的音频（由调用方触发，无次数限制）
    pub async fn retry_load(&mut self) -> Result<(), AudioError> {
        if self.scene.is_none() {
            return Err(no_scene());
        }
        self.load_current_language().await
    }

    /// 切换导览语言
    ///
    /// 语言不可用时直接返回错误，状态不变。播放中切换会保存进度比例，
    /// 新音轨载入后从相同比例继续播放。载入失败时回滚语言。
    pub async fn switch_language(&mut self, language: &str) -> Result<(), AudioError> {
        let scene = self.scene.as_ref().ok_or_else(no_scene)?;
        if !scene.has_audio_for(language) {
            return Err(CoreError::LanguageUnavailable {
                language: language.to_string(),
            }
            .into());
        }
        if language == self.state.current_language {
            return Ok(());
        }

        self.sync();
        let was_playing = self.state.is_playing;
        if was_playing {
            self.resume = Some(ResumePoint::Progress(self.state.progress()));
        }

        let previous =
            std::mem::replace(&mut self.state.current_language, language.to_string());
        self.backend.stop_audio();
        self.state.is_playing = false;

        if let Err(e) = self.load_current_language().await {
            self.state.current_language = previous;
            self.resume = None;
            return Err(e);
        }

        if let Err(e) = self.preferences.set_preferred_language(language) {
            warn!(language = %language, error = %e, "保存语言偏好失败");
        }

        if was_playing {
            self.play().await?;
        }
        Ok(())
    }

    /// 预载多个语言的音频
    ///
    /// 未指定时预载当前场景的所有语言。单个语言失败只记录警告，返回成功数量。
    pub async fn preload_languages(&self, languages: Option<&[String]>) -> usize {
        let Some(scene) = &self.scene else {
            return 0;
        };

        let requested = languages
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| scene.audio_languages());

        let mut targets: Vec<(String, String)> = Vec::with_capacity(requested.len());
        for lang in requested {
            match scene.audio_file(&lang) {
                Some(audio) => targets.push((lang, audio.url.clone())),
                None => {
                    let error = CoreError::LanguageUnavailable {
                        language: lang.clone(),
                    };
                    warn!(language = %lang, scene = %scene.id, error = %error, "预载音频失败");
                }
            }
        }

        let results = join_all(
            targets
                .iter()
                .map(|(lang, url)| self.backend.load_audio(url, lang)),
        )
        .await;

        let mut loaded = 0;
        for ((lang, url), result) in targets.iter().zip(results) {
            match result {
                Ok(_) => loaded += 1,
                Err(e) => warn!(language = %lang, url = %url, error = %e, "预载音频失败"),
            }
        }
        loaded
    }

    // ============ 播放控制 ============

    pub async fn play(&mut self) -> Result<(), AudioError> {
        let (url, _) = self.current_track().ok_or_else(|| {
            AudioError::from(CoreError::InvalidState {
                message: "当前场景没有可播放的音频".to_string(),
            })
        })?;

        if let Err(e) = self
            .backend
            .play_audio(&url, &self.state.current_language)
            .await
        {
            self.state.is_playing = false;
            self.state.error_message = Some(e.to_string());
            return Err(e);
        }

        match self.resume.take() {
            Some(ResumePoint::Progress(progress)) => {
                self.backend.seek(progress * self.state.duration);
            }
            Some(ResumePoint::Time(time)) => self.backend.seek(time),
            None => {}
        }

        self.state.error_message = None;
        self.sync();
        self.state.is_playing = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.track_is_active() {
            self.backend.pause_audio();
            self.sync();
        }
        self.state.is_playing = false;
    }

    /// 停止并回到开头，清除保存的进度
    pub fn stop(&mut self) {
        self.backend.stop_audio();
        self.state.is_playing = false;
        self.state.current_time = 0.0;
        self.resume = None;
    }

    pub async fn toggle_play_pause(&mut self) -> Result<(), AudioError> {
        self.sync();
        if self.state.is_playing {
            self.pause();
            Ok(())
        } else {
            self.play().await
        }
    }

    /// 从头重播
    pub async fn replay(&mut self) -> Result<(), AudioError> {
        self.stop();
        self.play().await
    }

    /// 设置音量（限制到 [0, 1]）
    pub fn set_volume(&mut self, volume: f64) {
        let volume = clamp_volume(volume);
        self.state.volume = volume;
        self.backend.set_volume(volume);
    }

    /// 按进度比例定位（限制到 [0, 1]）
    pub fn seek_to_progress(&mut self, progress: f64) {
        let position = clamp_progress(progress) * self.state.duration;
        self.seek_to(position);
    }

    /// 定位到指定秒数（限制到音轨范围内）
    ///
    /// 音轨尚未开始播放时记下位置，`play` 时生效。
    pub fn seek_to(&mut self, time: f64) {
        let time = if time.is_nan() { 0.0 } else { time.max(0.0) };
        let time = if self.state.duration > 0.0 {
            time.min(self.state.duration)
        } else {
            time
        };
        if self.track_is_active() {
            self.backend.seek(time);
        } else {
            self.resume = Some(ResumePoint::Time(time));
        }
        self.state.current_time = time;
    }

    /// 卸载：停止播放并回到 Idle
    pub fn teardown(&mut self) {
        self.backend.stop_audio();
        self.scene = None;
        self.state.reset_playback();
        self.resume = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::HeadlessAudioBackend;
    use crate::preferences::MemoryPreferences;
    use crate::testing::{MockFetcher, scene, wav_bytes};
    use std::time::Duration;

    struct Fixture {
        guide: AudioGuide,
        fetcher: Arc<MockFetcher>,
        preferences: Arc<MemoryPreferences>,
    }

    /// 场景 `s1` 有 zh/en 两种语言的 4 秒音轨
    fn fixture() -> (Fixture, Scene) {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with("s1-zh.mp3", wav_bytes(4, 8000))
                .with("s1-en.mp3", wav_bytes(4, 8000)),
        );
        let backend = Arc::new(HeadlessAudioBackend::new(fetcher.clone()));
        let preferences = Arc::new(MemoryPreferences::new());
        let guide = AudioGuide::new(backend, preferences.clone(), "zh", 0.8);
        (
            Fixture {
                guide,
                fetcher,
                preferences,
            },
            scene("s1", &["zh", "en"]),
        )
    }

    #[tokio::test]
    async fn test_load_scene_selects_language() {
        let (mut f, scene) = fixture();
        assert_eq!(f.guide.phase(), AudioPhase::Idle);

        f.guide.load_scene(Some(&scene)).await.unwrap();
        assert_eq!(f.guide.state().current_language, "zh");
        assert_eq!(f.guide.phase(), AudioPhase::Ready);
        assert!(!f.guide.state().is_playing);
        assert_eq!(f.guide.available_languages(), vec!["en", "zh"]);
        assert_eq!(f.guide.current_description(), "s1 in zh");

        f.preferences.set_preferred_language("en").unwrap();
        f.guide.load_scene(Some(&scene)).await.unwrap();
        assert_eq!(f.guide.state().current_language, "en");
    }

    #[tokio::test]
    async fn test_load_failure_is_recorded() {
        let (mut f, scene) = fixture();
        f.fetcher.remove("s1-zh.mp3");

        assert!(f.guide.load_scene(Some(&scene)).await.is_err());
        assert_eq!(f.guide.phase(), AudioPhase::Error);
        assert!(f.guide.state().error_message.is_some());

        f.fetcher.insert("s1-zh.mp3", wav_bytes(1, 8000));
        f.guide.retry_load().await.unwrap();
        assert_eq!(f.guide.phase(), AudioPhase::Ready);
    }

    #[tokio::test]
    async fn test_switch_to_missing_language_leaves_state_unchanged() {
        let (mut f, scene) = fixture();
        f.guide.load_scene(Some(&scene)).await.unwrap();

        let err = f.guide.switch_language("fr").await.unwrap_err();
        assert_eq!(
            err,
            AudioError::Core(CoreError::LanguageUnavailable {
                language: "fr".to_string()
            })
        );
        assert_eq!(f.guide.state().current_language, "zh");
        assert_eq!(f.preferences.preferred_language().unwrap(), None);
    }

    #[tokio::test]
    async fn test_switch_rolls_back_on_load_failure() {
        let (mut f, scene) = fixture();
        f.guide.load_scene(Some(&scene)).await.unwrap();
        f.fetcher.remove("s1-en.mp3");

        assert!(f.guide.switch_language("en").await.is_err());
        assert_eq!(f.guide.state().current_language, "zh");
        assert_eq!(f.preferences.preferred_language().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_while_playing_resumes_at_same_progress() {
        let (mut f, scene) = fixture();
        f.guide.load_scene(Some(&scene)).await.unwrap();
        f.guide.play().await.unwrap();

        tokio::time::advance(Duration::from_secs(1)).await;
        f.guide.switch_language("en").await.unwrap();

        let state = f.guide.state();
        assert_eq!(state.current_language, "en");
        assert!(state.is_playing);
        assert!((state.progress() - 0.25).abs() < 0.01);
        assert_eq!(f.preferences.preferred_language().unwrap().as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_switch_while_paused_does_not_autoplay() {
        let (mut f, scene) = fixture();
        f.guide.load_scene(Some(&scene)).await.unwrap();

        f.guide.switch_language("en").await.unwrap();
        assert!(!f.guide.state().is_playing);
        assert_eq!(f.guide.state().current_time, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_controls() {
        let (mut f, scene) = fixture();
        f.guide.load_scene(Some(&scene)).await.unwrap();

        f.guide.toggle_play_pause().await.unwrap();
        assert!(f.guide.state().is_playing);

        tokio::time::advance(Duration::from_secs(2)).await;
        f.guide.toggle_play_pause().await.unwrap();
        assert!(!f.guide.state().is_playing);
        assert!((f.guide.state().current_time - 2.0).abs() < 0.01);

        f.guide.seek_to_progress(1.7);
        assert!((f.guide.state().current_time - f.guide.state().duration).abs() < 1e-9);
        f.guide.seek_to_progress(-3.0);
        assert_eq!(f.guide.state().current_time, 0.0);

        f.guide.replay().await.unwrap();
        assert!(f.guide.state().is_playing);
        assert!(f.guide.state().current_time < 0.01);

        f.guide.stop();
        assert!(!f.guide.state().is_playing);
        assert_eq!(f.guide.state().current_time, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_before_play_is_kept() {
        let (mut f, scene) = fixture();
        f.guide.load_scene(Some(&scene)).await.unwrap();

        f.guide.seek_to_progress(0.5);
        assert!((f.guide.state().current_time - 2.0).abs() < 1e-9);

        f.guide.play().await.unwrap();
        assert!(f.guide.state().is_playing);
        assert!((f.guide.state().current_time - 2.0).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_scene_track_does_not_leak_into_state() {
        let (mut f, first) = fixture();
        f.fetcher.insert("s2-zh.mp3", wav_bytes(1, 8000));
        let second = scene("s2", &["zh"]);

        f.guide.load_scene(Some(&first)).await.unwrap();
        f.guide.play().await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        f.guide.load_scene(Some(&second)).await.unwrap();
        assert!((f.guide.state().duration - 1.0).abs() < 0.05);

        f.guide.pause();
        f.guide.sync();
        let state = f.guide.state();
        assert!((state.duration - 1.0).abs() < 0.05);
        assert_eq!(state.current_time, 0.0);
        assert!(!state.is_playing);

        // 新场景的定位在播放时作用于新音轨
        f.guide.seek_to(0.5);
        f.guide.play().await.unwrap();
        assert!((f.guide.state().current_time - 0.5).abs() < 0.01);
        assert!((f.guide.state().duration - 1.0).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_volume_is_clamped() {
        let (mut f, _) = fixture();
        for (input, expected) in [(-2.0, 0.0), (0.4, 0.4), (9.0, 1.0)] {
            f.guide.set_volume(input);
            assert_eq!(f.guide.state().volume, expected);
        }
    }

    #[tokio::test]
    async fn test_preload_languages_settles_all() {
        let (mut f, scene) = fixture();
        f.guide.load_scene(Some(&scene)).await.unwrap();
        f.fetcher.remove("s1-en.mp3");

        assert_eq!(f.guide.preload_languages(None).await, 1);
        let calls = f.fetcher.call_count();
        let requested = vec!["en".to_string(), "fr".to_string()];
        assert_eq!(f.guide.preload_languages(Some(&requested)).await, 0);
        // 没有音频条目的语言不会触发抓取
        assert_eq!(f.fetcher.call_count(), calls + 1);
    }

    #[tokio::test]
    async fn test_teardown_returns_to_idle() {
        let (mut f, scene) = fixture();
        f.guide.load_scene(Some(&scene)).await.unwrap();
        f.guide.play().await.unwrap();

        f.guide.teardown();
        assert_eq!(f.guide.phase(), AudioPhase::Idle);
        assert!(f.guide.current_scene().is_none());
        assert!(!f.guide.has_audio());
        assert!(f.guide.play().await.is_err());
    }
}
