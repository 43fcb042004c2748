//! Standings Publisher 测试
//!
//! 覆盖订阅/退订语义、去抖合并和慢订阅者不阻塞广播。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use clickwar::scoreboard::{MemoryScoreStore, ScoreStore, StandingsPublisher, StandingsSnapshot};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn publisher(store: &Arc<MemoryScoreStore>, debounce_ms: u64) -> Arc<StandingsPublisher> {
    Arc::new(StandingsPublisher::new(
        Arc::clone(store) as Arc<dyn ScoreStore>,
        Duration::from_millis(debounce_ms),
        8,
    ))
}

/// 把广播循环跑在后台
fn spawn_run_loop(publisher: &Arc<StandingsPublisher>) {
    let publisher = Arc::clone(publisher);
    tokio::spawn(async move { publisher.run().await });
}

#[tokio::test]
async fn test_subscriber_receives_full_snapshot() {
    let store = Arc::new(MemoryScoreStore::new());
    let publisher = publisher(&store, 10);

    let mut sub = publisher.subscribe();
    assert_eq!(publisher.subscriber_count(), 1);

    store.increment("FR", "France", 2).await.unwrap();
    store.increment("DE", "Germany", 5).await.unwrap();
    publisher.broadcast_current().await;

    let snapshot: StandingsSnapshot = timeout(RECV_TIMEOUT, sub.recv())
        .await
        .expect("broadcast should arrive")
        .expect("channel should be open");

    assert_eq!(snapshot.total_clicks, 7);
    let codes: Vec<&str> = snapshot
        .countries
        .iter()
        .map(|c| c.country_code.as_str())
        .collect();
    assert_eq!(codes, vec!["DE", "FR"]);
}

#[tokio::test]
async fn test_debounce_coalesces_bursts() {
    let store = Arc::new(MemoryScoreStore::new());
    let publisher = publisher(&store, 50);
    spawn_run_loop(&publisher);

    let mut sub = publisher.subscribe();

    // 一个去抖窗口内的 50 次变更
    for _ in 0..50 {
        store.increment("FR", "France", 1).await.unwrap();
        publisher.mark_dirty();
    }

    // 等广播循环消化完
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut received = Vec::new();
    while let Ok(Some(snapshot)) = timeout(Duration::from_millis(50), sub.recv()).await {
        received.push(snapshot);
    }

    // 合并成了少量广播，而不是 50 次
    assert!(!received.is_empty());
    assert!(
        received.len() <= 5,
        "expected coalesced broadcasts, got {}",
        received.len()
    );
    // 最后一份快照反映全部点击
    assert_eq!(received.last().unwrap().total_clicks, 50);
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery_immediately() {
    let store = Arc::new(MemoryScoreStore::new());
    let publisher = publisher(&store, 10);

    let mut sub = publisher.subscribe();
    sub.unsubscribe();
    assert_eq!(publisher.subscriber_count(), 0);

    // 退订是幂等的
    sub.unsubscribe();

    store.increment("FR", "France", 1).await.unwrap();
    publisher.broadcast_current().await;

    // 注册表条目已移除，发送端被丢弃，recv 立即返回 None
    assert!(sub.recv().await.is_none());
}

#[tokio::test]
async fn test_drop_unsubscribes() {
    let store = Arc::new(MemoryScoreStore::new());
    let publisher = publisher(&store, 10);

    {
        let _sub = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);
    }
    assert_eq!(publisher.subscriber_count(), 0);
}

#[tokio::test]
async fn test_slow_subscriber_does_not_block_broadcast() {
    let store = Arc::new(MemoryScoreStore::new());
    // 容量 1 的慢订阅者通道
    let publisher = Arc::new(StandingsPublisher::new(
        Arc::clone(&store) as Arc<dyn ScoreStore>,
        Duration::from_millis(10),
        1,
    ));

    let _slow = publisher.subscribe();
    let mut fast = publisher.subscribe();

    // 慢订阅者从不消费；广播多轮不能被它卡住
    for i in 0..5 {
        store.increment("FR", "France", 1).await.unwrap();
        publisher.broadcast_current().await;

        if i == 4 {
            // 快订阅者队列里有数据可取（中间快照可能被丢弃）
            let snapshot = timeout(RECV_TIMEOUT, fast.recv())
                .await
                .expect("fast subscriber should still be served")
                .expect("channel should be open");
            assert!(snapshot.total_clicks >= 1);
        }
    }

    // 两个订阅者都还在注册表里（慢订阅者只是丢帧，不会被踢掉）
    assert_eq!(publisher.subscriber_count(), 2);
}

#[tokio::test]
async fn test_broadcast_reflects_epoch_rollover() {
    let store = Arc::new(MemoryScoreStore::new());
    let publisher = publisher(&store, 10);

    store.increment("FR", "France", 3).await.unwrap();

    let tomorrow = chrono::Utc::now() + chrono::Duration::days(1);
    store.rollover_if_stale(tomorrow).await.unwrap();
    publisher.mark_dirty();

    let mut sub = publisher.subscribe();
    publisher.broadcast_current().await;

    let snapshot = timeout(RECV_TIMEOUT, sub.recv())
        .await
        .expect("broadcast should arrive")
        .expect("channel should be open");

    // 轮转后的快照：新纪元、零分
    assert_eq!(snapshot.total_clicks, 0);
    assert!(snapshot.countries.is_empty());
}
