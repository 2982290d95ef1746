//! Shared test doubles for the dispatch integration tests.

use async_trait::async_trait;
use notifyhub::{ChannelRegistry, ChannelSender, NotifyToId, NotifyToIds, SendResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

/// Routes tracing output to the test harness. Safe to call from every
/// test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Tracks the number of concurrently running sends and the peak seen.
#[derive(Default)]
pub struct InflightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InflightGauge {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A scriptable channel sender: counts calls, records what it was asked
/// to send, and can delay, fail, panic or wait on a barrier.
pub struct MockSender {
    pub tag: &'static str,
    calls: AtomicUsize,
    pub seen: Mutex<Vec<(Vec<String>, String, String)>>,
    pub gauge: Option<Arc<InflightGauge>>,
    pub delay: Duration,
    pub barrier: Option<Arc<Barrier>>,
    pub fail_with: Option<String>,
    pub panic_with: Option<String>,
}

impl MockSender {
    fn base(tag: &'static str) -> Self {
        Self {
            tag,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gauge: None,
            delay: Duration::ZERO,
            barrier: None,
            fail_with: None,
            panic_with: None,
        }
    }

    pub fn ok(tag: &'static str) -> Arc<Self> {
        Arc::new(Self::base(tag))
    }

    pub fn failing(tag: &'static str, error: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(error.to_string()),
            ..Self::base(tag)
        })
    }

    pub fn panicking(tag: &'static str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            panic_with: Some(message.to_string()),
            ..Self::base(tag)
        })
    }

    pub fn gauged(tag: &'static str, gauge: Arc<InflightGauge>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            gauge: Some(gauge),
            delay,
            ..Self::base(tag)
        })
    }

    pub fn with_barrier(tag: &'static str, barrier: Arc<Barrier>) -> Arc<Self> {
        Arc::new(Self {
            barrier: Some(barrier),
            ..Self::base(tag)
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Delegating wrapper so one shared mock can be handed out by a registry
/// builder on every `build` call.
struct SharedSender(Arc<MockSender>);

#[async_trait]
impl ChannelSender for SharedSender {
    async fn send(&self, to: &[String], title: &str, content: &str) -> anyhow::Result<SendResult> {
        let mock = &self.0;
        mock.calls.fetch_add(1, Ordering::SeqCst);
        mock.seen
            .lock()
            .unwrap()
            .push((to.to_vec(), title.to_string(), content.to_string()));

        if let Some(message) = &mock.panic_with {
            panic!("{}", message);
        }
        if let Some(gauge) = &mock.gauge {
            gauge.enter();
        }
        if let Some(barrier) = &mock.barrier {
            barrier.wait().await;
        }
        if !mock.delay.is_zero() {
            tokio::time::sleep(mock.delay).await;
        }
        if let Some(gauge) = &mock.gauge {
            gauge.exit();
        }
        if let Some(error) = &mock.fail_with {
            anyhow::bail!("{}", error);
        }
        Ok(SendResult::pending(mock.tag).completed())
    }

    fn channel_type(&self) -> &'static str {
        self.0.tag
    }
}

/// Registers `sender` under its tag; every build hands out the same
/// shared mock.
pub fn register_mock(registry: &mut ChannelRegistry, sender: Arc<MockSender>) {
    let tag = sender.tag;
    registry.register(tag, move |_config| Ok(Box::new(SharedSender(sender.clone()))));
}

/// A registry containing only the given mocks.
pub fn mock_registry(senders: &[Arc<MockSender>]) -> ChannelRegistry {
    let mut registry = ChannelRegistry::empty();
    for sender in senders {
        register_mock(&mut registry, sender.clone());
    }
    registry
}

/// One recipient reachable on every channel.
pub fn full_recipients() -> NotifyToIds {
    NotifyToIds(vec![NotifyToId {
        email: "alice@example.com".to_string(),
        phone: "13800000000".to_string(),
        wecom: "alice".to_string(),
        ding: "13800000000".to_string(),
        lark: "ou_alice".to_string(),
        webhook: "room-1".to_string(),
    }])
}
