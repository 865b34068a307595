//! 单元测试共用的替身与样本数据

use async_trait::async_trait;
use exhibit_core::{
    AudioFile, AudioFormat, ExhibitionConfig, ExhibitionSettings, ImageInfo, ResourceConfig, Scene,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;

use crate::resources::{Fetcher, ResourceError};

/// 内存中的来源，记录每一次抓取
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, url: &str, bytes: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes);
    }

    pub fn remove(&self, url: &str) {
        self.responses.lock().unwrap().remove(url);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.responses.lock().unwrap().get(url).cloned();
        response.ok_or_else(|| ResourceError::NotFound {
            path: url.to_string(),
        })
    }

    fn describe(&self, url: &str) -> String {
        format!("mock://{}", url)
    }
}

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

pub fn exhibition(id: &str, scene_count: usize) -> ExhibitionConfig {
    ExhibitionConfig {
        id: id.to_string(),
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

pub fn to_json_bytes(config: &ExhibitionConfig) -> Vec<u8> {
    serde_json::to_vec(config).unwrap()
}

/// 指定尺寸的 PNG 字节
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::new_rgba8(width, height)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// 16-bit 单声道静音 WAV
pub fn wav_bytes(seconds: u32, sample_rate: u32) -> Vec<u8> {
    let data_len = seconds * sample_rate * 2;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    bytes
}
