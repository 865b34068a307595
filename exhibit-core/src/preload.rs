//! # Preload 模块
//!
//! 图片预载的纯逻辑部分：优先级队列、按 URL 记录的载入状态以及载入统计。
//! 真正的抓取与解码由宿主层驱动。
//!
//! ## 状态转换
//!
//! ```text
//! 未载入 ──begin_load──► 载入中 ──finish_load──► 已载入
//!                          │
//!                          └──fail_load──► 错误 ──reset_for_retry──► 未载入
//! ```
//!
//! 重试次数达到 [`MAX_IMAGE_RETRIES`] 后不再允许重试。

use std::collections::HashMap;

use crate::model::Scene;

/// 单张图片的最大重试次数
pub const MAX_IMAGE_RETRIES: u32 = 3;

/// 相邻场景主图片的基础优先级
pub const ADJACENT_IMAGE_PRIORITY: i32 = 10;

/// 相邻场景缩略图的基础优先级
pub const ADJACENT_THUMBNAIL_PRIORITY: i32 = 5;

/// 单张图片的载入状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageLoadState {
    pub is_loading: bool,
    pub is_loaded: bool,
    pub has_error: bool,
    pub retry_count: u32,
    /// 开始载入时间（毫秒）
    pub load_start_time: Option<f64>,
    /// 完成载入时间（毫秒）
    pub load_end_time: Option<f64>,
    /// 解码后的像素尺寸
    pub dimensions: Option<(u32, u32)>,
}

impl ImageLoadState {
    /// 载入耗时（毫秒），需要两个时间戳都存在
    pub fn load_time(&self) -> Option<f64> {
        match (self.load_start_time, self.load_end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// 预载队列条目
#[derive(Debug, Clone, PartialEq)]
pub struct PreloadQueueItem {
    pub url: String,
    /// 数值越大越优先
    pub priority: i32,
    pub scene_id: String,
}

impl PreloadQueueItem {
    pub fn new(url: impl Into<String>, priority: i32, scene_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            priority,
            scene_id: scene_id.into(),
        }
    }
}

/// 预载优先级队列
///
/// 以 URL 去重：已在队列中的 URL 再次加入时忽略（不论新优先级）。
/// 同优先级按加入顺序排列。
#[derive(Debug, Clone, Default)]
pub struct PreloadQueue {
    /// (加入序号, 条目)，保持按优先级降序
    items: Vec<(u64, PreloadQueueItem)>,
    sequence: u64,
}

impl PreloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入队列，返回是否真的加入
    pub fn push(&mut self, item: PreloadQueueItem) -> bool {
        if self.contains(&item.url) {
            return false;
        }

        let seq = self.sequence;
        self.sequence += 1;
        self.items.push((seq, item));
        self.items
            .sort_by(|(seq_a, a), (seq_b, b)| b.priority.cmp(&a.priority).then(seq_a.cmp(seq_b)));
        true
    }

    /// 取出前 `count` 个条目
    pub fn take_batch(&mut self, count: usize) -> Vec<PreloadQueueItem> {
        let count = count.min(self.items.len());
        self.items.drain(..count).map(|(_, item)| item).collect()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.items.iter().any(|(_, item)| item.url == url)
    }

    /// 按出队顺序排列的条目
    pub fn items(&self) -> impl Iterator<Item = &PreloadQueueItem> {
        self.items.iter().map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// 计算相邻场景的预载条目
///
/// 只考虑 `current_index - 1` 与 `current_index + 1`（在范围内时）。
/// 主图片优先级 10，缩略图 5；列表中排在后面的邻居少 1 分。
pub fn adjacent_preload_items(current_index: usize, scenes: &[Scene]) -> Vec<PreloadQueueItem> {
    let neighbours = [current_index.checked_sub(1), current_index.checked_add(1)];

    neighbours
        .into_iter()
        .flatten()
        .filter(|&index| index < scenes.len())
        .enumerate()
        .flat_map(|(rank, index)| {
            let scene = &scenes[index];
            let penalty = rank as i32;
            let mut items = vec![PreloadQueueItem::new(
                scene.image.url.clone(),
                ADJACENT_IMAGE_PRIORITY - penalty,
                scene.id.clone(),
            )];
            if let Some(thumbnail) = &scene.image.thumbnail {
                items.push(PreloadQueueItem::new(
                    thumbnail.clone(),
                    ADJACENT_THUMBNAIL_PRIORITY - penalty,
                    format!("{}-thumb", scene.id),
                ));
            }
            items
        })
        .collect()
}

/// 载入统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadingStats {
    pub total_images: usize,
    pub loaded_images: usize,
    pub failed_images: usize,
    /// 平均载入耗时（毫秒），没有样本时为 0
    pub average_load_time: f64,
}

impl LoadingStats {
    /// 格式化为可读字符串
    pub fn format(&self) -> String {
        format!(
            "Images: {} total, {} loaded, {} failed, avg load {:.1}ms",
            self.total_images, self.loaded_images, self.failed_images, self.average_load_time
        )
    }
}

/// 重试被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryRejected {
    /// 已达最大重试次数
    Exhausted { retry_count: u32 },
}

/// 按 URL 记录的图片载入状态表
#[derive(Debug, Clone, Default)]
pub struct ImageStateMap {
    states: HashMap<String, ImageLoadState>,
}

impl ImageStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取状态，未知 URL 返回全 false/0 的默认状态
    pub fn get(&self, url: &str) -> ImageLoadState {
        self.states.get(url).cloned().unwrap_or_default()
    }

    /// 登记 URL（已存在时不变）
    pub fn register(&mut self, url: &str) {
        self.states.entry(url.to_string()).or_default();
    }

    /// 开始载入，已载入或正在载入时返回 false
    pub fn begin_load(&mut self, url: &str, now: f64) -> bool {
        let state = self.states.entry(url.to_string()).or_default();
        if state.is_loaded || state.is_loading {
            return false;
        }
        state.is_loading = true;
        state.load_start_time = Some(now);
        true
    }

    /// 载入成功
    pub fn finish_load(&mut self, url: &str, now: f64, dimensions: Option<(u32, u32)>) {
        let state = self.states.entry(url.to_string()).or_default();
        state.is_loading = false;
        state.is_loaded = true;
        state.has_error = false;
        state.load_end_time = Some(now);
        state.dimensions = dimensions;
    }

    /// 载入失败，返回累计重试次数
    pub fn fail_load(&mut self, url: &str) -> u32 {
        let state = self.states.entry(url.to_string()).or_default();
        state.is_loading = false;
        state.has_error = true;
        state.retry_count += 1;
        state.retry_count
    }

    /// 为重试重置状态
    ///
    /// 清除错误与已载入标记，但保留重试次数。
    pub fn reset_for_retry(&mut self, url: &str, max_retries: u32) -> Result<(), RetryRejected> {
        let state = self.states.entry(url.to_string()).or_default();
        if state.retry_count >= max_retries {
            return Err(RetryRejected::Exhausted {
                retry_count: state.retry_count,
            });
        }
        state.is_loading = false;
        state.is_loaded = false;
        state.has_error = false;
        Ok(())
    }

    /// 汇总统计
    pub fn stats(&self) -> LoadingStats {
        let loaded_times: Vec<f64> = self
            .states
            .values()
            .filter(|s| s.is_loaded)
            .filter_map(ImageLoadState::load_time)
            .collect();

        let average_load_time = if loaded_times.is_empty() {
            0.0
        } else {
            loaded_times.iter().sum::<f64>() / loaded_times.len() as f64
        };

        LoadingStats {
            total_images: self.states.len(),
            loaded_images: self.states.values().filter(|s| s.is_loaded).count(),
            failed_images: self.states.values().filter(|s| s.has_error).count(),
            average_load_time,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::scene;

    #[test]
    fn test_queue_dedup_by_url() {
        let mut queue = PreloadQueue::new();
        assert!(queue.push(PreloadQueueItem::new("a.jpg", 1, "s1")));
        assert!(!queue.push(PreloadQueueItem::new("a.jpg", 9, "s2")));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.items().next().unwrap().priority, 1);
    }

    #[test]
    fn test_queue_priority_order() {
        let mut queue = PreloadQueue::new();
        queue.push(PreloadQueueItem::new("low.jpg", 1, ""));
        queue.push(PreloadQueueItem::new("high.jpg", 10, ""));
        queue.push(PreloadQueueItem::new("mid.jpg", 5, ""));

        let batch = queue.take_batch(2);
        let urls: Vec<_> = batch.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["high.jpg", "mid.jpg"]);
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.take_batch(5).len(), 1);
        assert!(queue.is_empty());
        assert!(queue.take_batch(3).is_empty());
    }

    #[test]
    fn test_adjacent_interior() {
        let scenes: Vec<_> = (0..5).map(|i| scene(&format!("s{i}"), &["zh"])).collect();
        let items = adjacent_preload_items(2, &scenes);

        let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["s1.jpg", "s1-thumb.jpg", "s3.jpg", "s3-thumb.jpg"]
        );
        let priorities: Vec<_> = items.iter().map(|i| i.priority).collect();
        assert_eq!(priorities, vec![10, 5, 9, 4]);
        assert!(!urls.contains(&"s2.jpg"));
    }

    #[test]
    fn test_adjacent_edges() {
        let scenes: Vec<_> = (0..3).map(|i| scene(&format!("s{i}"), &["zh"])).collect();

        let first = adjacent_preload_items(0, &scenes);
        assert_eq!(first[0].url, "s1.jpg");
        assert_eq!(first[0].priority, 10);
        assert_eq!(first.len(), 2);

        let last = adjacent_preload_items(2, &scenes);
        assert_eq!(last[0].url, "s1.jpg");
        assert_eq!(last.len(), 2);

        assert!(adjacent_preload_items(0, &scenes[..1]).is_empty());
    }

    #[test]
    fn test_adjacent_without_thumbnail() {
        let mut scenes: Vec<_> = (0..3).map(|i| scene(&format!("s{i}"), &["zh"])).collect();
        scenes[2].image.thumbnail = None;
        let items = adjacent_preload_items(1, &scenes);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_unknown_url_default_state() {
        let states = ImageStateMap::new();
        assert_eq!(states.get("missing.jpg"), ImageLoadState::default());
    }

    #[test]
    fn test_load_lifecycle() {
        let mut states = ImageStateMap::new();
        assert!(states.begin_load("a.jpg", 100.0));
        assert!(!states.begin_load("a.jpg", 101.0));

        states.finish_load("a.jpg", 150.0, Some((4, 3)));
        let state = states.get("a.jpg");
        assert!(state.is_loaded && !state.is_loading && !state.has_error);
        assert_eq!(state.load_time(), Some(50.0));
        assert!(!states.begin_load("a.jpg", 200.0));
    }

    #[test]
    fn test_retry_cap() {
        let mut states = ImageStateMap::new();
        for attempt in 1..=MAX_IMAGE_RETRIES {
            assert!(states.reset_for_retry("bad.jpg", MAX_IMAGE_RETRIES).is_ok());
            assert!(states.begin_load("bad.jpg", 0.0));
            assert_eq!(states.fail_load("bad.jpg"), attempt);
        }
        assert_eq!(
            states.reset_for_retry("bad.jpg", MAX_IMAGE_RETRIES),
            Err(RetryRejected::Exhausted { retry_count: 3 })
        );
        assert!(states.get("bad.jpg").has_error);
    }

    #[test]
    fn test_stats() {
        let mut states = ImageStateMap::new();
        assert_eq!(states.stats(), LoadingStats::default());

        states.begin_load("a.jpg", 0.0);
        states.finish_load("a.jpg", 40.0, None);
        states.begin_load("b.jpg", 10.0);
        states.finish_load("b.jpg", 30.0, None);
        states.begin_load("c.jpg", 0.0);
        states.fail_load("c.jpg");
        states.register("d.jpg");

        let stats = states.stats();
        assert_eq!(stats.total_images, 4);
        assert_eq!(stats.loaded_images, 2);
        assert_eq!(stats.failed_images, 1);
        assert_eq!(stats.average_load_time, 30.0);
        assert!(stats.format().contains("2 loaded"));
    }
}
