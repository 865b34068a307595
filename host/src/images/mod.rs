//! # Images 模块
//!
//! 图片载入器：把"图片可见或即将需要"与"抓取图片字节"分离开。
//!
//! ## 职责
//!
//! - 可见性触发的延迟载入（一次性）
//! - 优先级预载队列，按批并行抓取，批次之间让出执行
//! - 按 URL 记录载入状态，失败可手动重试（有上限）
//! - 载入事件通过订阅者集合发布
//!
//! 载入器可以廉价克隆，所有克隆共享同一份状态。锁从不跨越 `await`。

use exhibit_core::{
    ImageLoadState, ImageStateMap, ListenerId, Listeners, LoadingStats, MAX_IMAGE_RETRIES,
    PreloadQueue, PreloadQueueItem, RetryRejected, Scene, adjacent_preload_items,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::resources::{Fetcher, ResourceError};

/// 被观察元素的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// 图片载入事件
#[derive(Debug, Clone, PartialEq)]
pub enum ImageLoadEvent {
    Loaded { url: String, width: u32, height: u32 },
    Error { url: String, message: String },
}

/// 载入器选项
#[derive(Debug, Clone)]
pub struct ImageLoaderOptions {
    /// 关闭时预载队列与相邻预载都不生效
    pub enable_preload: bool,
    /// 是否具备可见性观察能力；关闭时登记即载入
    pub lazy_loading: bool,
    /// 每批并行数量
    pub preload_count: usize,
    pub max_retries: u32,
    /// 批次之间的间隔
    pub drain_interval: Duration,
}

impl Default for ImageLoaderOptions {
    fn default() -> Self {
        Self {
            enable_preload: true,
            lazy_loading: true,
            preload_count: 3,
            max_retries: MAX_IMAGE_RETRIES,
            drain_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Default)]
struct LoaderState {
    images: ImageStateMap,
    queue: PreloadQueue,
    observed: HashMap<ElementId, String>,
    draining: bool,
}

struct Inner {
    fetcher: Arc<dyn Fetcher>,
    options: ImageLoaderOptions,
    epoch: Instant,
    state: Mutex<LoaderState>,
    listeners: Mutex<Listeners<ImageLoadEvent>>,
}

/// 图片载入器
#[derive(Clone)]
pub struct ImageLoader {
    inner: Arc<Inner>,
}

impl ImageLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, options: ImageLoaderOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                options,
                epoch: Instant::now(),
                state: Mutex::new(LoaderState::default()),
                listeners: Mutex::new(Listeners::new()),
            }),
        }
    }

    pub fn options(&self) -> &ImageLoaderOptions {
        &self.inner.options
    }

    fn state(&self) -> MutexGuard<'_, LoaderState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 自载入器创建以来的毫秒数
    fn now_ms(&self) -> f64 {
        self.inner.epoch.elapsed().as_secs_f64() * 1000.0
    }

    // ============ 事件 ============

    /// 订阅载入事件
    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: FnMut(&ImageLoadEvent) + Send + 'static,
    {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe(id)
    }

    /// 在锁外通知订阅者，订阅者可以在回调中取消订阅
    fn emit(&self, event: ImageLoadEvent) {
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        for id in listeners.emit(&event) {
            error!(listener = ?id, event = ?event, "图片事件订阅者 panic");
        }
    }

    // ============ 载入 ============

    /// 载入单张图片
    ///
    /// 已载入或正在载入的 URL 直接返回 `Ok`。失败会记录在状态中并发布 `Error` 事件。
    pub async fn load_image(&self, url: &str) -> Result<(), ResourceError> {
        let now = self.now_ms();
        if !self.state().images.begin_load(url, now) {
            return Ok(());
        }

        match self.fetch_and_decode(url).await {
            Ok((width, height)) => {
                let now = self.now_ms();
                self.state()
                    .images
                    .finish_load(url, now, Some((width, height)));
                debug!(url = %url, width, height, "图片载入完成");
                self.emit(ImageLoadEvent::Loaded {
                    url: url.to_string(),
                    width,
                    height,
                });
                Ok(())
            }
            Err(e) => {
                let retry_count = self.state().images.fail_load(url);
                debug!(url = %url, retry_count, error = %e, "图片载入失败");
                self.emit(ImageLoadEvent::Error {
                    url: url.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn fetch_and_decode(&self, url: &str) -> Result<(u32, u32), ResourceError> {
        let bytes = self.inner.fetcher.fetch(url).await?;
        let image = image::load_from_memory(&bytes).map_err(|e| ResourceError::InvalidFormat {
            path: self.inner.fetcher.describe(url),
            message: format!("无法解码图片: {}", e),
        })?;
        Ok((image.width(), image.height()))
    }

    /// 重试载入失败的图片
    ///
    /// 重试次数达到上限时不做任何事并返回 `Ok(false)`。
    pub async fn retry_image_load(&self, url: &str) -> Result<bool, ResourceError> {
        let reset = self
            .state()
            .images
            .reset_for_retry(url, self.inner.options.max_retries);

        if let Err(RetryRejected::Exhausted { retry_count }) = reset {
            warn!(url = %url, retry_count, "已达最大重试次数，放弃重试");
            return Ok(false);
        }

        self.load_image(url).await.map(|_| true)
    }

    // ============ 可见性 ============

    /// 登记元素，首次可见时载入
    ///
    /// 不具备可见性观察能力（`lazy_loading = false`）时立即载入。
    pub async fn observe_image(&self, element: ElementId, url: &str) -> Result<(), ResourceError> {
        if !self.inner.options.lazy_loading {
            return self.load_image(url).await;
        }

        let mut state = self.state();
        state.images.register(url);
        state.observed.insert(element, url.to_string());
        Ok(())
    }

    /// 可见性回调：载入元素对应的图片并停止观察
    ///
    /// 元素未被观察时返回 `Ok(false)`。
    pub async fn notify_visible(&self, element: ElementId) -> Result<bool, ResourceError> {
        let url = self.state().observed.remove(&element);
        match url {
            Some(url) => self.load_image(&url).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// 停止观察元素
    pub fn unobserve(&self, element: ElementId) -> bool {
        self.state().observed.remove(&element).is_some()
    }

    /// 正在观察的元素数量
    pub fn observed_count(&self) -> usize {
        self.state().observed.len()
    }

    // ============ 预载队列 ============

    /// 加入预载队列（URL 已在队列中时忽略）
    ///
    /// 在 tokio 运行时中调用时会在后台启动队列处理。返回是否真的加入。
    pub fn add_to_preload_queue(&self, url: &str, priority: i32, scene_id: &str) -> bool {
        if !self.inner.options.enable_preload {
            return false;
        }

        let added = self
            .state()
            .queue
            .push(PreloadQueueItem::new(url, priority, scene_id));

        if added && let Ok(handle) = tokio::runtime::Handle::try_current() {
            let loader = self.clone();
            handle.spawn(async move { loader.process_preload_queue().await });
        }
        added
    }

    /// 预载相邻场景的图片与缩略图
    pub fn preload_adjacent_scenes(&self, current_index: usize, scenes: &[Scene]) {
        if !self.inner.options.enable_preload {
            return;
        }
        for item in adjacent_preload_items(current_index, scenes) {
            self.add_to_preload_queue(&item.url, item.priority, &item.scene_id);
        }
    }

    /// 处理预载队列
    ///
    /// 每批取出至多 `preload_count` 项并行载入，整批结束（成功或失败）后
    /// 若仍有剩余，等待 `drain_interval` 再处理下一批。已在处理时直接返回。
    pub async fn process_preload_queue(&self) {
        {
            let mut state = self.state();
            if state.draining || state.queue.is_empty() {
                return;
            }
            state.draining = true;
        }

        let batch_size = self.inner.options.preload_count.max(1);
        loop {
            let batch = {
                let mut state = self.state();
                let batch = state.queue.take_batch(batch_size);
                if batch.is_empty() {
                    state.draining = false;
                    return;
                }
                batch
            };

            let results = join_all(batch.iter().map(|item| self.load_image(&item.url))).await;
            for (item, result) in batch.iter().zip(results) {
                if let Err(e) = result {
                    warn!(url = %item.url, scene = %item.scene_id, error = %e, "预载图片失败");
                }
            }

            {
                let mut state = self.state();
                if state.queue.is_empty() {
                    state.draining = false;
                    return;
                }
            }

            tokio::time::sleep(self.inner.options.drain_interval).await;
        }
    }

    /// 等待队列清空且没有批次在处理
    pub async fn flush(&self) {
        loop {
            let (draining, pending) = {
                let state = self.state();
                (state.draining, state.queue.len())
            };

            if !draining && pending == 0 {
                return;
            }
            if draining {
                tokio::time::sleep(self.inner.options.drain_interval.max(Duration::from_millis(1)))
                    .await;
            } else {
                self.process_preload_queue().await;
            }
        }
    }

    /// 队列快照（按出队顺序）
    pub fn queued(&self) -> Vec<PreloadQueueItem> {
        self.state().queue.items().cloned().collect()
    }

    pub fn is_draining(&self) -> bool {
        self.state().draining
    }

    // ============ 状态 ============

    /// 图片状态，未知 URL 返回默认状态
    pub fn get_image_state(&self, url: &str) -> ImageLoadState {
        self.state().images.get(url)
    }

    pub fn loading_stats(&self) -> LoadingStats {
        self.state().images.stats()
    }

    /// 清除所有观察、状态与队列
    pub fn destroy(&self) {
        let mut state = self.state();
        state.observed.clear();
        state.images.clear();
        state.queue.clear();
    }
}
