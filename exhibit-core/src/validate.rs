//! # 配置验证模块
//!
//! 供展览作者使用的配置检查工具，不依赖 IO。
//!
//! ## 设计原则
//!
//! - 直接检查 JSON 值，缺字段与类型错误都能报告，而不是在反序列化时整体失败
//! - 分级：错误（阻止发布）与警告（建议修正）
//! - 静态模式缺少 `staticPath` 只是警告：载入时会使用默认路径

use serde::Serialize;
use serde_json::Value;

use crate::model::DEFAULT_STATIC_PATH;

/// 展览与场景 ID 允许的字符：小写字母、数字与连字号
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// 单段音频的建议最大时长（秒）
pub const MAX_RECOMMENDED_AUDIO_SECS: f64 = 300.0;

/// 建议的预载数量范围
pub const RECOMMENDED_PRELOAD_RANGE: std::ops::RangeInclusive<f64> = 0.0..=5.0;

const REQUIRED_FIELDS: [&str; 6] = [
    "id",
    "title",
    "scenes",
    "defaultLanguage",
    "availableLanguages",
    "resourceConfig",
];

const REQUIRED_SCENE_FIELDS: [&str; 4] = ["id", "title", "description", "image"];

const VALID_MODES: [&str; 3] = ["static", "api", "hybrid"];

const VALID_FALLBACKS: [&str; 3] = ["static", "api", "none"];

const BOOLEAN_SETTINGS: [&str; 3] = ["autoplay", "showThumbnails", "enableKeyboard"];

/// 配置摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total_scenes: usize,
    pub languages: usize,
    pub resource_mode: String,
}

/// 验证结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// JSON 无法解析时为 None
    pub summary: Option<ValidationSummary>,
}

impl ValidationReport {
    /// 生成可读的验证报告
    pub fn render(&self) -> String {
        let mut sections = vec!["=== 展览配置验证报告 ===".to_string()];

        sections.push(if self.is_valid {
            "✅ 配置文件验证通过！".to_string()
        } else {
            "❌ 配置文件存在错误，请修正后重新验证。".to_string()
        });

        if let Some(summary) = &self.summary {
            sections.push(format!(
                "📊 配置摘要:\n- 场景数量: {}\n- 支持语言: {}\n- 载入模式: {}",
                summary.total_scenes, summary.languages, summary.resource_mode
            ));
        }

        if !self.errors.is_empty() {
            sections.push(numbered("🚨 错误 (必须修正):", &self.errors));
        }

        if !self.warnings.is_empty() {
            sections.push(numbered("⚠️  警告 (建议修正):", &self.warnings));
        }

        if self.is_valid && self.warnings.is_empty() {
            sections.push("🎉 配置文件没有任何问题！".to_string());
        }

        sections.join("\n\n")
    }
}

fn numbered(title: &str, items: &[String]) -> String {
    let mut out = title.to_string();
    for (index, item) in items.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", index + 1, item));
    }
    out
}

/// 值是否"有内容"：缺失、null、false、0 与空字符串视为没有
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn as_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

#[derive(Default)]
struct Collector {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Collector {
    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// 验证 JSON 字符串
pub fn validate_json(json: &str) -> ValidationReport {
    match serde_json::from_str::<Value>(json) {
        Ok(config) => validate_exhibition_config(&config),
        Err(e) => ValidationReport {
            is_valid: false,
            errors: vec![format!("JSON 格式错误: {}", e)],
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// 验证展览配置对象
pub fn validate_exhibition_config(config: &Value) -> ValidationReport {
    let mut out = Collector::default();

    for field in REQUIRED_FIELDS {
        if !is_present(config.get(field)) {
            out.error(format!("缺少必要字段: {}", field));
        }
    }

    if let Some(id) = config.get("id").and_then(Value::as_str)
        && !id.is_empty()
        && !is_valid_id(id)
    {
        out.error("展览 ID 只能包含小写字母、数字和连字号");
    }

    match config.get("scenes") {
        Some(Value::Array(scenes)) if scenes.is_empty() => out.error("至少需要一个场景"),
        Some(Value::Array(scenes)) => {
            for (index, scene) in scenes.iter().enumerate() {
                validate_scene(scene, index, &mut out);
            }
        }
        value if is_present(value) => out.error("scenes 必须是数组"),
        _ => {}
    }

    let default_language = config.get("defaultLanguage").and_then(Value::as_str);
    let available = config.get("availableLanguages");
    if let Some(default_language) = default_language
        && is_present(available)
    {
        let contained = available
            .and_then(Value::as_array)
            .is_some_and(|langs| langs.iter().any(|l| l.as_str() == Some(default_language)));
        if !contained {
            out.error("预设语言必须包含在可用语言列表中");
        }
    }

    if let Some(resource) = config.get("resourceConfig").filter(|v| is_present(Some(v))) {
        validate_resource_config(resource, &mut out);
    }

    if let Some(settings) = config.get("settings").filter(|v| is_present(Some(v))) {
        validate_settings(settings, &mut out);
    }

    let summary = ValidationSummary {
        total_scenes: config
            .get("scenes")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        languages: available.and_then(Value::as_array).map_or(0, Vec::len),
        resource_mode: config
            .get("resourceConfig")
            .and_then(|r| r.get("mode"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
    };

    ValidationReport {
        is_valid: out.errors.is_empty(),
        errors: out.errors,
        warnings: out.warnings,
        summary: Some(summary),
    }
}

fn validate_scene(scene: &Value, index: usize, out: &mut Collector) {
    let prefix = format!("场景 {}", index + 1);

    for field in REQUIRED_SCENE_FIELDS {
        if !is_present(scene.get(field)) {
            out.error(format!("{}: 缺少必要字段 {}", prefix, field));
        }
    }

    // order 为 0 是合法的，只检查是否存在
    match scene.get("order") {
        None | Some(Value::Null) => out.error(format!("{}: 缺少必要字段 order", prefix)),
        Some(Value::Number(_)) => {}
        Some(_) => out.error(format!("{}: order 必须是数字", prefix)),
    }

    if let Some(id) = scene.get("id").and_then(Value::as_str)
        && !id.is_empty()
        && !is_valid_id(id)
    {
        out.error(format!("{}: 场景 ID 格式不正确", prefix));
    }

    if let Some(image) = scene.get("image").filter(|v| is_present(Some(v))) {
        if !is_present(image.get("url")) {
            out.error(format!("{}: 图片缺少 URL", prefix));
        }
        if !is_present(image.get("alt")) {
            out.warn(format!("{}: 建议提供图片替代文字 (alt)", prefix));
        }
        if !is_present(image.get("width")) || !is_present(image.get("height")) {
            out.warn(format!("{}: 建议提供图片尺寸信息", prefix));
        }
    }

    if let Some(Value::Object(description)) = scene.get("description")
        && description.is_empty()
    {
        out.error(format!("{}: 描述不能为空", prefix));
    }

    if let Some(Value::Object(audio)) = scene.get("audio") {
        if audio.is_empty() {
            out.warn(format!("{}: 没有提供音频文件", prefix));
        }
        for (lang, file) in audio {
            if !is_present(file.get("url")) {
                out.error(format!("{}: {} 语言音频缺少 URL", prefix, lang));
            }
            match as_number(file.get("duration")) {
                Some(d) if d > MAX_RECOMMENDED_AUDIO_SECS => out.warn(format!(
                    "{}: {} 语言音频时长超过 5 分钟，可能影响使用体验",
                    prefix, lang
                )),
                Some(d) if d > 0.0 => {}
                _ => out.warn(format!("{}: {} 语言音频建议提供时长信息", prefix, lang)),
            }
        }
    }
}

fn validate_resource_config(resource: &Value, out: &mut Collector) {
    let mode = resource.get("mode").and_then(Value::as_str);

    match mode {
        None | Some("") => out.error("资源配置缺少 mode 字段"),
        Some(mode) if !VALID_MODES.contains(&mode) => {
            out.error(format!("无效的资源载入模式: {}", mode))
        }
        _ => {}
    }

    match mode {
        Some("static") => {
            if !is_present(resource.get("staticPath")) {
                out.warn(format!(
                    "静态模式未配置 staticPath，将使用默认路径 {}",
                    DEFAULT_STATIC_PATH
                ));
            }
        }
        Some("api") => {
            if !is_present(resource.get("apiEndpoint")) {
                out.error("API 模式需要 apiEndpoint 配置");
            }
        }
        Some("hybrid") => {
            if !is_present(resource.get("apiEndpoint")) {
                out.error("混合模式需要 apiEndpoint 配置");
            }
            if !is_present(resource.get("cdnBaseUrl")) {
                out.warn("混合模式建议配置 cdnBaseUrl 以获得最佳性能");
            }
        }
        _ => {}
    }

    if let Some(fallback) = resource.get("fallbackStrategy").filter(|v| is_present(Some(v))) {
        let valid = fallback
            .as_str()
            .is_some_and(|f| VALID_FALLBACKS.contains(&f));
        if !valid {
            out.warn(format!("无效的备援策略: {}", display_value(fallback)));
        }
    }
}

fn validate_settings(settings: &Value, out: &mut Collector) {
    if let Some(count) = as_number(settings.get("preloadCount"))
        && !RECOMMENDED_PRELOAD_RANGE.contains(&count)
    {
        out.warn("建议预载数量设置在 0-5 之间");
    }

    for field in BOOLEAN_SETTINGS {
        if let Some(value) = settings.get(field)
            && !value.is_boolean()
        {
            out.warn(format!("{} 应该是布尔值 (true/false)", field));
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
