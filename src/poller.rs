use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::client::FleetSource;
use crate::error::ConfigError;
use crate::store::{Applied, Collection, Store};

/// Periodic refresh of the store from a [`FleetSource`].
///
/// `start()` fetches immediately and then once per interval. `stop()` (or
/// dropping the poller) cancels the timer and tears the store down, so fetches
/// still in flight complete without writing anything.
pub struct Poller<S: FleetSource> {
    source: Arc<S>,
    store: Store,
    interval: Duration,
    log_limit: usize,
    handle: Option<JoinHandle<()>>,
}

impl<S: FleetSource> Poller<S> {
    /// Fails on a zero interval or zero log limit.
    pub fn new(source: S, store: Store, interval: Duration, log_limit: usize) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::Zero("poll interval"));
        }
        if log_limit == 0 {
            return Err(ConfigError::Zero("log limit"));
        }

        Ok(Self {
            source: Arc::new(source),
            store,
            interval,
            log_limit,
            handle: None,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Must be called from within a tokio runtime. No-op if already started
    /// or if the store was torn down.
    pub fn start(&mut self) {
        if self.handle.is_some() || !self.store.is_active() {
            return;
        }

        log::info!(
            "Starting refresh every {:?} (log limit {})",
            self.interval,
            self.log_limit
        );

        let source = self.source.clone();
        let store = self.store.clone();
        let period = self.interval;
        let log_limit = self.log_limit;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // first tick completes immediately
                ticker.tick().await;
                if !store.is_active() {
                    log::debug!("Refresh loop stopping, store torn down");
                    return;
                }
                spawn_tick(&source, &store, log_limit);
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::info!("Refresh stopped");
        }
        self.store.teardown();
    }

    /// One awaited refresh cycle, both fetches concurrently.
    pub async fn refresh(&self) -> (Applied, Applied) {
        refresh_once(&self.source, &self.store, self.log_limit).await
    }
}

impl<S: FleetSource> Drop for Poller<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fire both fetches without waiting for them; each applies its own result.
fn spawn_tick<S: FleetSource>(source: &Arc<S>, store: &Store, log_limit: usize) {
    if let Some(ticket) = store.begin(Collection::Devices) {
        let source = source.clone();
        let store = store.clone();
        tokio::spawn(async move {
            let result = source.list_devices().await;
            store.apply_devices(ticket, result);
        });
    }

    if let Some(ticket) = store.begin(Collection::Logs) {
        let source = source.clone();
        let store = store.clone();
        tokio::spawn(async move {
            let result = source.list_logs(log_limit).await;
            store.apply_logs(ticket, result);
        });
    }
}

async fn refresh_once<S: FleetSource>(source: &Arc<S>, store: &Store, log_limit: usize) -> (Applied, Applied) {
    let devices = async {
        match store.begin(Collection::Devices) {
            Some(ticket) => store.apply_devices(ticket, source.list_devices().await),
            None => Applied::Discarded,
        }
    };
    let logs = async {
        match store.begin(Collection::Logs) {
            Some(ticket) => store.apply_logs(ticket, source.list_logs(log_limit).await),
            None => Applied::Discarded,
        }
    };

    tokio::join!(devices, logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{Device, LogEntry};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_secs(5);

    fn device(id: &str) -> Device {
        Device {
            device_id: id.to_string(),
            device_name: id.to_string(),
            owner: String::new(),
            location: String::new(),
            status: "online".to_string(),
            hostname: String::new(),
            ip_address: String::new(),
        }
    }

    fn log(id: &str, device_id: &str) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            device_id: device_id.to_string(),
            log_type: String::new(),
            hardware_type: String::new(),
            event: "connected".to_string(),
            message: String::new(),
            severity: String::new(),
            timestamp: String::new(),
        }
    }

    /// Scripted responses; the last device response repeats once the script runs out.
    #[derive(Default)]
    struct FakeSource {
        devices: Mutex<VecDeque<(Duration, Vec<Device>)>>,
        last_devices: Mutex<Vec<Device>>,
        logs: Mutex<Option<Vec<LogEntry>>>,
        device_calls: AtomicUsize,
        log_calls: AtomicUsize,
    }

    impl FakeSource {
        fn with_devices(devices: Vec<Device>) -> Self {
            let fake = FakeSource::default();
            *fake.last_devices.lock().unwrap() = devices;
            fake
        }

        fn script(self, delay: Duration, devices: Vec<Device>) -> Self {
            self.devices.lock().unwrap().push_back((delay, devices));
            self
        }

        fn logs(self, logs: Option<Vec<LogEntry>>) -> Self {
            *self.logs.lock().unwrap() = logs;
            self
        }
    }

    impl FleetSource for FakeSource {
        async fn list_devices(&self) -> Result<Vec<Device>, FetchError> {
            self.device_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.devices.lock().unwrap().pop_front();
            match next {
                Some((delay, devices)) => {
                    sleep(delay).await;
                    Ok(devices)
                }
                None => Ok(self.last_devices.lock().unwrap().clone()),
            }
        }

        async fn list_logs(&self, _limit: usize) -> Result<Vec<LogEntry>, FetchError> {
            self.log_calls.fetch_add(1, Ordering::SeqCst);
            let logs = self.logs.lock().unwrap().clone();
            logs.ok_or(FetchError::Timeout(Duration::from_secs(10)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_refreshes_immediately() {
        let source = FakeSource::with_devices(vec![device("A")]).logs(Some(vec![log("1", "A")]));
        let mut poller = Poller::new(source, Store::new(), PERIOD, 50).unwrap();
        poller.start();

        sleep(Duration::from_millis(10)).await;

        let view = poller.store().snapshot();
        assert!(!view.loading);
        assert_eq!(view.devices.len(), 1);
        assert_eq!(view.logs.len(), 1);
        assert_eq!(poller.source.device_calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.source.log_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_every_interval() {
        let source = FakeSource::with_devices(vec![device("A")]).logs(Some(vec![]));
        let mut poller = Poller::new(source, Store::new(), PERIOD, 50).unwrap();
        poller.start();

        sleep(PERIOD * 2 + Duration::from_millis(500)).await;

        assert_eq!(poller.source.device_calls.load(Ordering::SeqCst), 3);
        assert_eq!(poller.source.log_calls.load(Ordering::SeqCst), 3);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_timer_and_discards_in_flight() {
        let source = FakeSource::with_devices(vec![device("late")])
            .script(Duration::from_secs(1), vec![device("late")])
            .logs(Some(vec![]));
        let mut poller = Poller::new(source, Store::new(), PERIOD, 50).unwrap();
        poller.start();

        sleep(Duration::from_millis(100)).await;
        poller.stop();
        let before = poller.store().snapshot();

        sleep(PERIOD * 3).await;

        let after = poller.store().snapshot();
        assert_eq!(after, before);
        assert!(after.devices.is_empty());
        assert!(after.loading);
        assert_eq!(poller.source.device_calls.load(Ordering::SeqCst), 1);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_response_does_not_overwrite() {
        let source = FakeSource::default()
            .script(Duration::from_secs(8), vec![device("old")])
            .script(Duration::ZERO, vec![device("new")])
            .logs(Some(vec![]));
        let mut poller = Poller::new(source, Store::new(), PERIOD, 50).unwrap();
        poller.start();

        // tick 0 resolves at 8s, tick 1 at 5s
        sleep(Duration::from_secs(9)).await;

        let view = poller.store().snapshot();
        assert_eq!(view.devices.len(), 1);
        assert_eq!(view.devices[0].device_id, "new");
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let source = FakeSource::with_devices(vec![device("A"), device("B")])
            .logs(Some(vec![log("1", "A"), log("2", "B")]));
        let poller = Poller::new(source, Store::new(), PERIOD, 50).unwrap();

        assert_eq!(poller.refresh().await, (Applied::Replaced, Applied::Replaced));
        let first = poller.store().snapshot();
        poller.refresh().await;
        let second = poller.store().snapshot();

        assert_eq!(first, second);
        assert_eq!(second.devices.len(), 2);
        assert_eq!(second.logs.len(), 2);
    }

    #[tokio::test]
    async fn log_failure_is_isolated() {
        let source = FakeSource::with_devices(vec![device("A")]).logs(None);
        let poller = Poller::new(source, Store::new(), PERIOD, 50).unwrap();

        assert_eq!(poller.refresh().await, (Applied::Replaced, Applied::Failed));

        let view = poller.store().snapshot();
        assert!(!view.loading);
        assert_eq!(view.devices.len(), 1);
        assert!(view.logs.is_empty());
        assert!(view.logs_status.is_failed());
    }

    #[tokio::test]
    async fn log_failure_keeps_previous_logs() {
        let source = FakeSource::with_devices(vec![device("A")]).logs(Some(vec![log("1", "A")]));
        let poller = Poller::new(source, Store::new(), PERIOD, 50).unwrap();
        poller.refresh().await;

        *poller.source.logs.lock().unwrap() = None;
        poller.refresh().await;

        assert_eq!(poller.store().snapshot().logs.len(), 1);
    }

    #[tokio::test]
    async fn start_after_stop_is_noop() {
        let source = FakeSource::with_devices(vec![]).logs(Some(vec![]));
        let mut poller = Poller::new(source, Store::new(), PERIOD, 50).unwrap();
        poller.stop();
        poller.start();

        assert!(!poller.is_running());
        assert_eq!(poller.refresh().await, (Applied::Discarded, Applied::Discarded));
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let source = FakeSource::with_devices(vec![device("A")]).logs(Some(vec![]));
        let res = Poller::new(source, Store::new(), Duration::ZERO, 50);
        assert!(matches!(res, Err(ConfigError::Zero("poll interval"))));
    }

    #[tokio::test]
    async fn zero_log_limit_is_rejected() {
        let source = FakeSource::with_devices(vec![]).logs(Some(vec![]));
        let res = Poller::new(source, Store::new(), PERIOD, 0);
        assert!(matches!(res, Err(ConfigError::Zero("log limit"))));
    }
}
