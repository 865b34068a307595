//! # Session 模块
//!
//! 展览会话：ResourceManager → Navigator → ImageLoader + AudioGuide。
//!
//! ```text
//! open(id) ──► load_exhibition ──► set_exhibition ──► enter_scene(0)
//!                                                        │
//! next/previous/go_to ──────────────────────────────────►│
//!                                                        ├─► preload_adjacent_scenes
//!                                                        ├─► audio.load_scene
//!                                                        └─► autoplay → audio.play
//! ```

use exhibit_core::{ExhibitionConfig, ExhibitionNavigator, Scene};
use std::sync::Arc;
use tracing::{info, warn};

use crate::audio::{AudioBackend, AudioGuide, HeadlessAudioBackend};
use crate::config::AppConfig;
use crate::images::{ImageLoader, ImageLoaderOptions};
use crate::preferences::{JsonFilePreferences, PreferenceStore};
use crate::resources::{Fetcher, ResourceError, ResourceManager};

/// 展览会话
pub struct ExhibitionSession {
    resources: ResourceManager,
    navigator: ExhibitionNavigator,
    images: ImageLoader,
    audio: AudioGuide,
}

impl ExhibitionSession {
    pub fn new(resources: ResourceManager, images: ImageLoader, audio: AudioGuide) -> Self {
        Self {
            resources,
            navigator: ExhibitionNavigator::new(),
            images,
            audio,
        }
    }

    /// 按应用配置组装会话（无声音输出的音频后端）
    pub fn from_config(config: &AppConfig) -> Result<Self, ResourceError> {
        let fetcher: Arc<dyn Fetcher> = config.build_fetcher()?;
        let preferences: Arc<dyn PreferenceStore> =
            Arc::new(JsonFilePreferences::new(&config.preferences_path));
        let backend: Arc<dyn AudioBackend> = Arc::new(HeadlessAudioBackend::new(fetcher.clone()));

        let resources = ResourceManager::new(config.resource.clone(), fetcher.clone());
        let images = ImageLoader::new(fetcher, ImageLoaderOptions::from(&config.images));
        let audio = AudioGuide::new(
            backend,
            preferences,
            config.audio.default_language.clone(),
            config.audio.volume,
        );
        Ok(Self::new(resources, images, audio))
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    pub fn navigator(&self) -> &ExhibitionNavigator {
        &self.navigator
    }

    pub fn images(&self) -> &ImageLoader {
        &self.images
    }

    pub fn audio(&self) -> &AudioGuide {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioGuide {
        &mut self.audio
    }

    pub fn exhibition(&self) -> Option<&ExhibitionConfig> {
        self.navigator.exhibition()
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.navigator.current_scene()
    }

    /// 载入展览并进入第一个场景
    ///
    /// 失败时错误记录在导航状态上，之前载入的展览保持不变。
    pub async fn open(&mut self, exhibition_id: &str) -> Result<(), ResourceError> {
        self.navigator.set_loading(true);
        self.navigator.set_error(None);

        let config = match self.resources.load_exhibition(exhibition_id).await {
            Ok(config) => config,
            Err(e) => {
                self.navigator.set_error(Some(e.to_string()));
                self.navigator.set_loading(false);
                return Err(e);
            }
        };

        info!(
            exhibition = %config.id,
            scenes = config.scene_count(),
            "展览载入完成"
        );
        self.audio
            .set_default_language(config.default_language.clone());
        self.navigator.set_exhibition(config);
        self.navigator.set_loading(false);

        self.enter_scene().await;
        Ok(())
    }

    /// 下一个场景，已在最后一个时返回 false
    pub async fn next(&mut self) -> bool {
        if !self.navigator.next_scene() {
            return false;
        }
        self.enter_scene().await;
        true
    }

    /// 上一个场景，已在第一个时返回 false
    pub async fn previous(&mut self) -> bool {
        if !self.navigator.previous_scene() {
            return false;
        }
        self.enter_scene().await;
        true
    }

    /// 跳转到指定场景，索引越界时返回 false
    pub async fn go_to(&mut self, index: usize) -> bool {
        if !self.navigator.navigate_to_scene(index) {
            return false;
        }
        self.enter_scene().await;
        true
    }

    async fn enter_scene(&mut self) {
        let Some(exhibition) = self.navigator.exhibition() else {
            return;
        };
        let index = self.navigator.current_scene_index();
        let autoplay = exhibition.settings.autoplay;
        let scene = exhibition.scene(index).cloned();

        self.images.preload_adjacent_scenes(index, &exhibition.scenes);

        if let Err(e) = self.audio.load_scene(scene.as_ref()).await {
            warn!(scene = index, error = %e, "场景导览载入失败");
            return;
        }

        if autoplay
            && self.audio.has_audio()
            && let Err(e) = self.audio.play().await
        {
            warn!(scene = index, error = %e, "自动播放失败");
        }
    }

    /// 关闭会话：停止音频并清除图片状态
    pub fn close(&mut self) {
        self.audio.teardown();
        self.images.destroy();
    }
}
