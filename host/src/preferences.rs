//! # Preferences 模块
//!
//! 访客偏好（与 config.json 分离）。目前只保存导览语言。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::warn;

/// 导览语言偏好的键
pub const PREFERRED_LANGUAGE_KEY: &str = "exhibition.preferredLanguage";

/// 偏好存储错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreferenceError {
    #[error("偏好文件读写失败: {path} - {message}")]
    Io { path: String, message: String },

    #[error("偏好序列化失败: {0}")]
    Serialization(String),
}

/// 键值偏好存储
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;

    /// 已保存的导览语言
    fn preferred_language(&self) -> Result<Option<String>, PreferenceError> {
        self.get(PREFERRED_LANGUAGE_KEY)
    }

    fn set_preferred_language(&self, language: &str) -> Result<(), PreferenceError> {
        self.set(PREFERRED_LANGUAGE_KEY, language)
    }
}

/// 内存偏好存储
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON 文件偏好存储
///
/// 首次访问时读取整个文件，写入时覆盖整个文件。
/// 文件损坏时视为空并记录警告，下次写入会覆盖它。
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, String>>>,
}

impl JsonFilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(PreferenceError::Io {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "解析偏好文件失败，视为空");
            BTreeMap::new()
        }))
    }

    fn with_values<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> R,
    ) -> Result<R, PreferenceError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.is_none() {
            *cache = Some(self.read_file()?);
        }
        let values = cache.get_or_insert_with(BTreeMap::new);
        Ok(f(values))
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        self.with_values(|values| values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let snapshot = self.with_values(|values| {
            values.insert(key.to_string(), value.to_string());
            values.clone()
        })?;

        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| PreferenceError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| PreferenceError::Io {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
        }

        std::fs::write(&self.path, content).map_err(|e| PreferenceError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryPreferences::new();
        assert_eq!(store.preferred_language().unwrap(), None);

        store.set_preferred_language("en").unwrap();
        assert_eq!(store.preferred_language().unwrap().as_deref(), Some("en"));
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/preferences.json");

        let store = JsonFilePreferences::new(&path);
        assert_eq!(store.preferred_language().unwrap(), None);
        store.set_preferred_language("ja").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"exhibition.preferredLanguage\": \"ja\""));

        let reopened = JsonFilePreferences::new(&path);
        assert_eq!(reopened.preferred_language().unwrap().as_deref(), Some("ja"));
    }

    #[test]
    fn test_corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFilePreferences::new(&path);
        assert_eq!(store.preferred_language().unwrap(), None);

        store.set_preferred_language("zh").unwrap();
        let reopened = JsonFilePreferences::new(&path);
        assert_eq!(reopened.preferred_language().unwrap().as_deref(), Some("zh"));
    }
}
