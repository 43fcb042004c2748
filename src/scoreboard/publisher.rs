//! 排行榜广播器
//!
//! 把 Score Store 的变更扇出给所有订阅者。为了扛住高点击量，
//! 广播按去抖间隔合并：一个间隔内的多次自增只产生一次全量快照
//! 广播。订阅者看到的是单调变新的快照序列，不会出现新旧倒挂；
//! 代价是不保证每次点击都对应一次广播，这是订阅方依赖的契约。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{Notify, mpsc};
use tokio::time::{Duration, sleep};
use tracing::{debug, trace, warn};

use super::store::{ScoreStore, StandingsSnapshot};

type SubscriberMap = DashMap<u64, mpsc::Sender<StandingsSnapshot>>;

/// 一次订阅：持有接收端，退订后立即停止投递
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<StandingsSnapshot>,
    subscribers: Arc<SubscriberMap>,
}

impl Subscription {
    /// 接收下一份快照；广播器侧退订后返回 None
    pub async fn recv(&mut self) -> Option<StandingsSnapshot> {
        self.rx.recv().await
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// 退订，幂等：注册表条目在返回前移除，之后不会再收到快照
    pub fn unsubscribe(&self) {
        if self.subscribers.remove(&self.id).is_some() {
            trace!("Subscriber {} unsubscribed", self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

pub struct StandingsPublisher {
    store: Arc<dyn ScoreStore>,
    /// 订阅者注册表：订阅者 id → 投递通道
    subscribers: Arc<SubscriberMap>,
    next_id: AtomicU64,
    /// 变更标记；Notify 自带单许可语义，广播期间的标记不会丢
    dirty: Notify,
    debounce: Duration,
    buffer: usize,
}

impl StandingsPublisher {
    pub fn new(store: Arc<dyn ScoreStore>, debounce: Duration, buffer: usize) -> Self {
        Self {
            store,
            subscribers: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            dirty: Notify::new(),
            debounce,
            buffer: buffer.max(1),
        }
    }

    /// 注册一个订阅者，返回的句柄退订或 Drop 后停止投递
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.insert(id, tx);
        debug!("Subscriber {} registered", id);
        Subscription {
            id,
            rx,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// 标记排行榜已变更（自增或轮转后调用）
    pub fn mark_dirty(&self) {
        self.dirty.notify_one();
    }

    /// 启动广播循环（作为异步方法运行，不会返回）
    pub async fn run(&self) {
        loop {
            self.dirty.notified().await;
            // 去抖窗口：窗口内到达的变更合并进同一次广播
            sleep(self.debounce).await;
            self.broadcast_current().await;
        }
    }

    /// 立刻取一份快照广播给所有订阅者
    pub async fn broadcast_current(&self) {
        let snapshot = match self.store.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("StandingsPublisher: snapshot failed, broadcast skipped: {}", e);
                return;
            }
        };

        let mut closed = Vec::new();
        for entry in self.subscribers.iter() {
            match entry.value().try_send(snapshot.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // 慢订阅者：丢掉这份中间快照而不是阻塞广播，
                    // 它队列里已有的快照仍按旧到新的顺序送达
                    trace!("Subscriber {} lagging, snapshot dropped", entry.key());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    closed.push(*entry.key());
                }
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
            trace!("Subscriber {} gone, removed from registry", id);
        }

        trace!(
            "Broadcast epoch={} total={} to {} subscribers",
            snapshot.epoch_id,
            snapshot.total_clicks,
            self.subscribers.len()
        );
    }
}
