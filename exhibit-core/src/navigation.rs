//! # Navigation 模块
//!
//! 展览导航状态：当前场景索引游标，越界操作一律为 no-op。

use crate::model::{ExhibitionConfig, Scene};

/// 展览导航器
#[derive(Debug, Clone, Default)]
pub struct ExhibitionNavigator {
    exhibition: Option<ExhibitionConfig>,
    current_scene_index: usize,
    is_loading: bool,
    error: Option<String>,
}

impl ExhibitionNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置展览，游标重置为 0 并清除错误
    pub fn set_exhibition(&mut self, config: ExhibitionConfig) {
        self.exhibition = Some(config);
        self.current_scene_index = 0;
        self.error = None;
    }

    /// 当前展览
    pub fn exhibition(&self) -> Option<&ExhibitionConfig> {
        self.exhibition.as_ref()
    }

    /// 当前场景索引
    pub fn current_scene_index(&self) -> usize {
        self.current_scene_index
    }

    /// 当前场景
    pub fn current_scene(&self) -> Option<&Scene> {
        self.exhibition
            .as_ref()
            .and_then(|e| e.scenes.get(self.current_scene_index))
    }

    /// 场景总数
    pub fn total_scenes(&self) -> usize {
        self.exhibition.as_ref().map_or(0, |e| e.scenes.len())
    }

    pub fn is_first_scene(&self) -> bool {
        self.current_scene_index == 0
    }

    pub fn is_last_scene(&self) -> bool {
        self.current_scene_index + 1 == self.total_scenes()
    }

    /// 跳转到指定场景
    ///
    /// 索引越界时不做任何事。返回游标是否移动。
    pub fn navigate_to_scene(&mut self, index: usize) -> bool {
        if index >= self.total_scenes() || index == self.current_scene_index {
            return false;
        }
        self.current_scene_index = index;
        true
    }

    /// 下一个场景（最后一个时 no-op）
    pub fn next_scene(&mut self) -> bool {
        if self.total_scenes() == 0 || self.is_last_scene() {
            return false;
        }
        self.current_scene_index += 1;
        true
    }

    /// 上一个场景（第一个时 no-op）
    pub fn previous_scene(&mut self) -> bool {
        if self.is_first_scene() {
            return false;
        }
        self.current_scene_index -= 1;
        true
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}
