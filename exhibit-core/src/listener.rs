//! # Listener 模块
//!
//! 订阅者集合：注册返回句柄，按句柄移除，事件发生时同步通知所有订阅者。
//! 单个订阅者 panic 不会阻止其余订阅者收到通知。
//!
//! 集合放在锁后面时，先取 [`Listeners::snapshot`] 再释放锁，然后在快照上
//! [`ListenerSnapshot::emit`]。这样订阅者在回调中可以再订阅或取消订阅。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

/// 订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<T> = Arc<Mutex<dyn FnMut(&T) + Send>>;

/// 订阅者集合
pub struct Listeners<T> {
    next_id: u64,
    entries: Vec<(ListenerId, Callback<T>)>,
}

/// 某一时刻的订阅者列表，与集合本身解耦
pub struct ListenerSnapshot<T> {
    entries: Vec<(ListenerId, Callback<T>)>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> std::fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册订阅者
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&T) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let callback: Callback<T> = Arc::new(Mutex::new(callback));
        self.entries.push((id, callback));
        id
    }

    /// 移除订阅者，返回是否存在
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// 当前订阅者的快照
    pub fn snapshot(&self) -> ListenerSnapshot<T> {
        ListenerSnapshot {
            entries: self.entries.clone(),
        }
    }

    /// 通知所有订阅者
    ///
    /// 返回 panic 的订阅者句柄，由调用方决定如何记录。
    pub fn emit(&self, event: &T) -> Vec<ListenerId> {
        self.snapshot().emit(event)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> ListenerSnapshot<T> {
    /// 按注册顺序通知快照中的订阅者，返回 panic 的订阅者句柄
    pub fn emit(&self, event: &T) -> Vec<ListenerId> {
        let mut failed = Vec::new();
        for (id, callback) in &self.entries {
            let mut callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
            if catch_unwind(AssertUnwindSafe(|| (*callback)(event))).is_err() {
                failed.push(*id);
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
