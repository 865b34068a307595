//! # i18n 模块
//!
//! 多语言文字解析：根据语言偏好链把多语言字段解析为单一显示字符串。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 通用的备用语言
pub const FALLBACK_LANGUAGE: &str = "en";

/// 多语言文字：纯字符串或语言映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_string())
    }
}

impl From<BTreeMap<String, String>> for LocalizedText {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Localized(value)
    }
}

/// 解析多语言文字
///
/// 顺序：请求语言 → 预设语言 → `en` → 第一个可用语言 → 空字符串。
/// 纯字符串直接返回。
pub fn localized_text(text: Option<&LocalizedText>, language: &str, default_language: &str) -> String {
    match text {
        None => String::new(),
        Some(LocalizedText::Plain(s)) => s.clone(),
        Some(LocalizedText::Localized(map)) => {
            resolve_with_chain(map, &[language, default_language, FALLBACK_LANGUAGE])
        }
    }
}

/// 解析场景导览文字
///
/// 顺序：请求语言 → 预设语言 → 第一个可用语言 → 空字符串。
pub fn resolve_description(
    map: &BTreeMap<String, String>,
    language: &str,
    default_language: &str,
) -> String {
    resolve_with_chain(map, &[language, default_language])
}

/// 依偏好链查找第一个非空值，找不到时回退到第一个非空值
pub fn resolve_with_chain(map: &BTreeMap<String, String>, chain: &[&str]) -> String {
    chain
        .iter()
        .find_map(|lang| map.get(*lang).filter(|s| !s.is_empty()))
        .or_else(|| map.values().find(|s| !s.is_empty()))
        .cloned()
        .unwrap_or_default()
}
