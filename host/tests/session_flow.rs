//! 会话端到端测试：文件系统上的静态展览 → 导航 → 图片预载 → 音频导览

use exhibit_core::{AudioPhase, validate_json};
use exhibit_host::{AppConfig, ExhibitionSession, ImagesConfig};
use serde_json::json;
use std::io::Cursor;
use std::path::Path;

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// 16-bit 单声道静音 WAV
fn wav(seconds: u32) -> Vec<u8> {
    let rate = 8000u32;
    let data_len = seconds * rate * 2;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&rate.to_le_bytes());
    bytes.extend_from_slice(&(rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    bytes
}

fn write(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// 在 `root/assets/exhibitions/gallery/` 下写入三个场景的展览
fn write_exhibition(root: &Path) -> String {
    let scenes: Vec<_> = (1..=3)
        .map(|i| {
            json!({
                "id": format!("scene-{i}"),
                "title": format!("作品 {i}"),
                "description": {
                    "zh": format!("第 {i} 件作品"),
                    "en": format!("Artwork {i}")
                },
                "image": {
                    "url": format!("scene-{i}.png"),
                    "alt": format!("作品 {i}"),
                    "thumbnail": format!("scene-{i}-thumb.png")
                },
                "audio": {
                    "zh": { "url": format!("scene-{i}-zh.wav"), "duration": 30, "format": "wav" },
                    "en": { "url": format!("scene-{i}-en.wav"), "duration": 30, "format": "wav" }
                },
                "order": i
            })
        })
        .collect();

    let config = json!({
        "id": "gallery",
        "title": "测试展览",
        "description": "集成测试",
        "scenes": scenes,
        "defaultLanguage": "zh",
        "availableLanguages": ["zh", "en"],
        "resourceConfig": { "mode": "static", "staticPath": "/assets/exhibitions/" },
        "settings": { "autoplay": false, "preloadCount": 2 }
    });
    let text = serde_json::to_string_pretty(&config).unwrap();

    let base = "assets/exhibitions/gallery";
    write(root, &format!("{base}/config.json"), text.as_bytes());
    for i in 1..=3 {
        write(root, &format!("{base}/images/scene-{i}.png"), &png(8, 6));
        write(root, &format!("{base}/images/scene-{i}-thumb.png"), &png(4, 3));
        write(root, &format!("{base}/audio/scene-{i}-zh.wav"), &wav(2));
        write(root, &format!("{base}/audio/scene-{i}-en.wav"), &wav(3));
    }
    text
}

fn app_config(root: &Path) -> AppConfig {
    AppConfig {
        assets_root: root.to_path_buf(),
        preferences_path: root.join("prefs/preferences.json"),
        images: ImagesConfig {
            drain_interval_ms: 1,
            ..ImagesConfig::default()
        },
        ..AppConfig::default()
    }
}

#[test]
fn written_config_passes_validation() {
    let dir = tempfile::tempdir().unwrap();
    let text = write_exhibition(dir.path());

    let report = validate_json(&text);
    assert!(report.is_valid, "{}", report.render());
    assert_eq!(report.summary.unwrap().total_scenes, 3);
}

#[tokio::test]
async fn browse_exhibition_from_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    write_exhibition(dir.path());
    let config = app_config(dir.path());

    let mut session = ExhibitionSession::from_config(&config).unwrap();
    session.open("gallery").await.unwrap();

    let scene = session.current_scene().unwrap();
    assert_eq!(scene.image.url, "/assets/exhibitions/gallery/images/scene-1.png");
    assert_eq!(session.audio().phase(), AudioPhase::Ready);
    assert_eq!(session.audio().current_description(), "第 1 件作品");
    // 探测到的时长优先于声明的时长
    assert!((session.audio().state().duration - 2.0).abs() < 0.05);

    session.images().flush().await;
    let next_image = session
        .images()
        .get_image_state("/assets/exhibitions/gallery/images/scene-2.png");
    assert!(next_image.is_loaded);
    assert_eq!(next_image.dimensions, Some((8, 6)));

    assert!(session.next().await);
    assert_eq!(session.navigator().current_scene_index(), 1);

    session.audio_mut().switch_language("en").await.unwrap();
    assert_eq!(session.audio().current_description(), "Artwork 2");
    assert!((session.audio().state().duration - 3.0).abs() < 0.05);

    session.close();

    // 语言偏好跨会话保留
    let mut reopened = ExhibitionSession::from_config(&config).unwrap();
    reopened.open("gallery").await.unwrap();
    assert_eq!(reopened.audio().state().current_language, "en");
}

#[tokio::test]
async fn missing_exhibition_is_reported_on_navigator() {
    let dir = tempfile::tempdir().unwrap();
    let config = app_config(dir.path());

    let mut session = ExhibitionSession::from_config(&config).unwrap();
    let err = session.open("nowhere").await.unwrap_err();

    assert_eq!(session.navigator().error(), Some(err.to_string().as_str()));
    assert!(session.exhibition().is_none());
}
