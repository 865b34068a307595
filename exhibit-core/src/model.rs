//! # Model 模块
//!
//! 展览数据模型：展览配置、场景、图片、多语言音频以及资源来源配置。
//!
//! ## 设计原则
//!
//! - 所有模型可直接从展览 `config.json` 反序列化（camelCase 字段名）
//! - 多语言映射使用有序 Map，"第一个可用语言"因此是确定的
//! - 构造不变量由 [`ExhibitionConfig::check`] 显式检查

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::ModelError;

/// 静态模式下未配置 `staticPath` 时使用的默认路径
pub const DEFAULT_STATIC_PATH: &str = "/assets/exhibitions/";

/// 音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Ogg,
    Wav,
}

/// 单一语言的音频文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFile {
    /// 音频 URL（可以是相对路径，由资源管理器解析）
    pub url: String,
    /// 时长（秒）
    #[serde(default)]
    pub duration: f64,
    /// 音频格式
    #[serde(default)]
    pub format: AudioFormat,
    /// 文件大小（字节）
    #[serde(default)]
    pub size: u64,
}

/// 场景图片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// 图片 URL（可以是相对路径）
    pub url: String,
    /// 替代文字
    #[serde(default)]
    pub alt: String,
    /// 宽度（像素）
    #[serde(default)]
    pub width: u32,
    /// 高度（像素）
    #[serde(default)]
    pub height: u32,
    /// 缩略图 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl ImageInfo {
    /// 是否提供了有效的尺寸信息
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// 作品元数据，每个字段都可选
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
}

/// 场景：一件展品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// 展览内唯一的稳定 ID
    pub id: String,
    /// 标题
    pub title: String,
    /// 多语言导览文字（语言代码 -> 文字）
    #[serde(default)]
    pub description: BTreeMap<String, String>,
    /// 场景图片
    pub image: ImageInfo,
    /// 多语言音频（语言代码 -> 音频文件）
    #[serde(default)]
    pub audio: BTreeMap<String, AudioFile>,
    /// 排序提示（不要求连续）
    pub order: f64,
    /// 作品元数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SceneMetadata>,
}

impl Scene {
    /// 获取指定语言的音频文件
    pub fn audio_file(&self, language: &str) -> Option<&AudioFile> {
        self.audio.get(language)
    }

    /// 是否有指定语言的音频
    pub fn has_audio_for(&self, language: &str) -> bool {
        self.audio.contains_key(language)
    }

    /// 有音频的语言列表（有序）
    pub fn audio_languages(&self) -> Vec<String> {
        self.audio.keys().cloned().collect()
    }
}

/// 资源载入模式
///
/// 未知模式不会在反序列化时失败，而是保留为 [`ResourceMode::Unsupported`]，
/// 由载入流程和校验工具分别处理。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceMode {
    /// 静态 JSON 文件
    Static,
    /// 远端 API
    Api,
    /// API 配置 + CDN 媒体
    Hybrid,
    /// 不支持的模式
    Unsupported(String),
}

impl ResourceMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Static => "static",
            Self::Api => "api",
            Self::Hybrid => "hybrid",
            Self::Unsupported(mode) => mode,
        }
    }
}

impl From<String> for ResourceMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "static" => Self::Static,
            "api" => Self::Api,
            "hybrid" => Self::Hybrid,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<ResourceMode> for String {
    fn from(value: ResourceMode) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 主要来源失败后的备援策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackStrategy {
    Static,
    Api,
    #[default]
    None,
}

impl FallbackStrategy {
    /// 备援对应的载入模式（`None` 表示不备援）
    pub fn as_mode(&self) -> Option<ResourceMode> {
        match self {
            Self::Static => Some(ResourceMode::Static),
            Self::Api => Some(ResourceMode::Api),
            Self::None => None,
        }
    }
}

/// 资源来源配置：描述如何取得一份 [`ExhibitionConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// 载入模式
    pub mode: ResourceMode,
    /// 静态文件路径（如 `/assets/exhibitions/`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_path: Option<String>,
    /// API 端点（如 `/api/exhibitions`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    /// CDN 基础 URL（仅 hybrid 模式使用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_base_url: Option<String>,
    /// 备援策略
    #[serde(default)]
    pub fallback_strategy: FallbackStrategy,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            mode: ResourceMode::Static,
            static_path: Some(DEFAULT_STATIC_PATH.to_string()),
            api_endpoint: None,
            cdn_base_url: None,
            fallback_strategy: FallbackStrategy::None,
        }
    }
}

impl ResourceConfig {
    /// 生效的静态路径（未配置或为空时使用默认值）
    pub fn static_path(&self) -> &str {
        self.static_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_STATIC_PATH)
    }

    /// 生效的 API 端点（空字符串视为未配置）
    pub fn api_endpoint(&self) -> Option<&str> {
        self.api_endpoint.as_deref().filter(|e| !e.is_empty())
    }

    /// 生效的 CDN 基础 URL（空字符串视为未配置）
    pub fn cdn_base_url(&self) -> Option<&str> {
        self.cdn_base_url.as_deref().filter(|u| !u.is_empty())
    }

    /// 配置对其模式是否有效
    ///
    /// - `static`：总是有效（`staticPath` 有默认值）
    /// - `api` / `hybrid`：必须配置 `apiEndpoint`
    /// - 其他模式：无效
    pub fn is_valid(&self) -> bool {
        match self.mode {
            ResourceMode::Static => true,
            ResourceMode::Api | ResourceMode::Hybrid => self.api_endpoint().is_some(),
            ResourceMode::Unsupported(_) => false,
        }
    }

    /// 以另一种模式复制本配置（其他字段保持不变）
    pub fn with_mode(&self, mode: ResourceMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }
}

/// 展览设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitionSettings {
    #[serde(default)]
    pub autoplay: bool,
    #[serde(default = "default_true")]
    pub show_thumbnails: bool,
    #[serde(default = "default_true")]
    pub enable_keyboard: bool,
    #[serde(default = "default_preload_count")]
    pub preload_count: usize,
}

fn default_true() -> bool {
    true
}

fn default_preload_count() -> usize {
    2
}

impl Default for ExhibitionSettings {
    fn default() -> Self {
        Self {
            autoplay: false,
            show_thumbnails: true,
            enable_keyboard: true,
            preload_count: default_preload_count(),
        }
    }
}

/// 展览配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitionConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 有序场景列表（不可为空）
    pub scenes: Vec<Scene>,
    /// 预设语言（必须包含在 `available_languages` 中）
    pub default_language: String,
    pub available_languages: Vec<String>,
    pub resource_config: ResourceConfig,
    #[serde(default)]
    pub settings: ExhibitionSettings,
}

impl ExhibitionConfig {
    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 检查构造不变量
    ///
    /// - 场景列表不可为空
    /// - 预设语言必须在可用语言列表中
    /// - 场景 ID 在展览内唯一
    pub fn check(&self) -> Result<(), ModelError> {
        if self.scenes.is_empty() {
            return Err(ModelError::NoScenes {
                exhibition: self.id.clone(),
            });
        }

        if !self.available_languages.contains(&self.default_language) {
            return Err(ModelError::DefaultLanguageUnavailable {
                language: self.default_language.clone(),
            });
        }

        let mut seen = HashSet::new();
        for scene in &self.scenes {
            if !seen.insert(scene.id.as_str()) {
                return Err(ModelError::DuplicateSceneId {
                    scene_id: scene.id.clone(),
                });
            }
        }

        Ok(())
    }

    /// 获取指定索引的场景
    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    /// 场景数量
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// 对每个场景的所有媒体 URL（图片、缩略图、各语言音频）应用改写
    ///
    /// `rewrite` 收到媒体类型和原始 URL，返回 `Some(new_url)` 表示替换。
    pub fn rewrite_media_urls<F>(&mut self, mut rewrite: F)
    where
        F: FnMut(MediaKind, &str) -> Option<String>,
    {
        for scene in &mut self.scenes {
            if let Some(url) = rewrite(MediaKind::Image, &scene.image.url) {
                scene.image.url = url;
            }

            if let Some(thumbnail) = scene.image.thumbnail.as_mut()
                && let Some(url) = rewrite(MediaKind::Image, thumbnail)
            {
                *thumbnail = url;
            }

            for audio in scene.audio.values_mut() {
                if let Some(url) = rewrite(MediaKind::Audio, &audio.url) {
                    audio.url = url;
                }
            }
        }
    }
}

/// 媒体类型（决定静态模式下的子目录）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// 静态模式下的子目录名
    pub fn directory(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Audio => "audio",
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn scene(id: &str, languages: &[&str]) -> Scene {
        Scene {
            id: id.to_string(),
            title: format!("Scene {id}"),
            description: languages
                .iter()
                .map(|l| (l.to_string(), format!("{id} in {l}")))
                .collect(),
            image: ImageInfo {
                url: format!("{id}.jpg"),
                alt: format!("{id} alt"),
                width: 800,
                height: 600,
                thumbnail: Some(format!("{id}-thumb.jpg")),
            },
            audio: languages
                .iter()
                .map(|l| {
                    (
                        l.to_string(),
                        AudioFile {
                            url: format!("{id}-{l}.mp3"),
                            duration: 60.0,
                            format: AudioFormat::Mp3,
                            size: 1024,
                        },
                    )
                })
                .collect(),
            order: 1.0,
            metadata: None,
        }
    }

    pub fn exhibition(scene_count: usize) -> ExhibitionConfig {
        ExhibitionConfig {
            id: "test-exhibition".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            scenes: (0..scene_count)
                .map(|i| scene(&format!("scene-{i}"), &["zh", "en"]))
                .collect(),
            default_language: "zh".to_string(),
            available_languages: vec!["zh".to_string(), "en".to_string()],
            resource_config: ResourceConfig::default(),
            settings: ExhibitionSettings::default(),
        }
    }
}
