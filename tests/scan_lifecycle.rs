// tests/scan_lifecycle.rs
//
// Scan trigger / poll / completion lifecycle against a scripted backend.
// Time is paused, so every poll interval elapses instantly and in order.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;

use cloud_watcher::display::PLACEHOLDER;
use cloud_watcher::scan::DEFAULT_POLL_INTERVAL;
use cloud_watcher::{
    ApiError, DynApi, Endpoint, ScanMonitor, ScanObserver, ScanPhase, ScanState, ScriptedClient,
    StatsSnapshot, TriggerOutcome, TriggerReply,
};

use common::{dashboard, feed, scan};

#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<u8>>,
    completed: Mutex<Vec<u32>>,
    failures: Mutex<usize>,
}

#[async_trait::async_trait]
impl ScanObserver for Recorder {
    fn status_polled(&self, status: &ScanState) {
        self.progress.lock().push(status.progress);
    }

    async fn scan_completed(&self, status: &ScanState) {
        self.completed.lock().push(status.new_added);
    }

    fn scan_failed(&self, _error: &ApiError) {
        *self.failures.lock() += 1;
    }
}

fn started() -> TriggerReply {
    TriggerReply::Started {
        message: Some("Scan started".into()),
    }
}

fn monitor(client: &Arc<ScriptedClient>) -> Arc<ScanMonitor> {
    let api: DynApi = client.clone();
    Arc::new(ScanMonitor::new(api, DEFAULT_POLL_INTERVAL))
}

#[tokio::test(start_paused = true)]
async fn progress_is_reported_per_tick_and_completion_fires_once() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(30, true, 0)))
        .push_scan_status(Ok(scan(70, true, 0)))
        .push_scan_status(Ok(scan(100, false, 2)));
    let monitor = monitor(&client);
    let rec = Arc::new(Recorder::default());

    assert_eq!(monitor.trigger(rec.clone()).await, TriggerOutcome::Started);
    assert_eq!(monitor.phase(), ScanPhase::Polling);
    assert!(monitor.is_scanning());
    // The first tick lands one interval after the trigger.
    assert_eq!(client.calls(Endpoint::ScanStatus), 0);

    monitor.wait().await;

    assert_eq!(*rec.progress.lock(), vec![30, 70, 100]);
    assert_eq!(*rec.completed.lock(), vec![2]);
    assert_eq!(monitor.phase(), ScanPhase::Completed);
    assert_eq!(monitor.progress(), 100);
    assert!(!monitor.status().is_scanning);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(client.calls(Endpoint::ScanStatus), 3, "no tick after completion");
    assert_eq!(rec.completed.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_failure_stops_the_loop() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(30, true, 0)))
        .push_scan_status(Err(ApiError::network(Endpoint::ScanStatus, "connection reset")));
    let monitor = monitor(&client);
    let rec = Arc::new(Recorder::default());

    monitor.trigger(rec.clone()).await;
    monitor.wait().await;

    assert_eq!(monitor.phase(), ScanPhase::Failed);
    assert!(!monitor.status().is_scanning);
    assert_eq!(*rec.failures.lock(), 1);
    assert!(rec.completed.lock().is_empty());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(client.calls(Endpoint::ScanStatus), 2);
}

#[tokio::test(start_paused = true)]
async fn rejected_trigger_returns_to_idle_and_allows_retry() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Err(ApiError::network(Endpoint::TriggerScan, "refused")))
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(100, false, 0)));
    let monitor = monitor(&client);
    let rec = Arc::new(Recorder::default());

    match monitor.trigger(rec.clone()).await {
        TriggerOutcome::Rejected(e) => assert_eq!(e.endpoint(), Endpoint::TriggerScan),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(monitor.phase(), ScanPhase::Idle);

    assert_eq!(monitor.trigger(rec.clone()).await, TriggerOutcome::Started);
    monitor.wait().await;
    assert_eq!(monitor.phase(), ScanPhase::Completed);
}

#[tokio::test(start_paused = true)]
async fn completed_monitor_accepts_a_new_trigger() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(100, false, 1)));
    let monitor = monitor(&client);
    let rec = Arc::new(Recorder::default());

    monitor.trigger(rec.clone()).await;
    monitor.wait().await;
    assert_eq!(monitor.phase(), ScanPhase::Completed);

    assert_eq!(monitor.trigger(rec.clone()).await, TriggerOutcome::Started);
    monitor.wait().await;
    assert_eq!(*rec.completed.lock(), vec![1, 1]);
    assert_eq!(client.calls(Endpoint::TriggerScan), 2);
}

#[tokio::test(start_paused = true)]
async fn response_in_flight_at_dispose_is_discarded() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(100, false, 3)))
        .set_latency(Endpoint::ScanStatus, Duration::from_secs(5));
    let dash = dashboard(&client);

    assert_eq!(dash.trigger_scan().await, TriggerOutcome::Started);
    // Tick at 1s sends the request; it answers at 6s.
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(client.calls(Endpoint::ScanStatus), 1);
    dash.shutdown();
    assert_eq!(dash.monitor().phase(), ScanPhase::Idle);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(client.calls(Endpoint::ScanStatus), 1);
    assert_eq!(client.calls(Endpoint::News), 0, "no completion refresh");
    assert_eq!(dash.monitor().phase(), ScanPhase::Idle);
    assert_eq!(dash.monitor().progress(), 0);
    assert_eq!(dash.timestamps().last_scan, PLACEHOLDER);
    assert!(!dash.has_new_data());
}

#[tokio::test(start_paused = true)]
async fn status_check_in_flight_at_dispose_does_not_start_polling() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_scan_status(Ok(scan(40, true, 0)))
        .set_latency(Endpoint::ScanStatus, Duration::from_secs(5));
    let monitor = monitor(&client);
    let rec = Arc::new(Recorder::default());

    let m = monitor.clone();
    let r = rec.clone();
    let resumed = tokio::spawn(async move { m.resume(r).await });
    sleep(Duration::from_secs(1)).await;
    monitor.dispose();

    assert!(!resumed.await.unwrap());
    assert_eq!(monitor.phase(), ScanPhase::Idle);
    assert!(rec.progress.lock().is_empty());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(client.calls(Endpoint::ScanStatus), 1);
}

#[tokio::test(start_paused = true)]
async fn trigger_while_starting_is_ignored() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(100, false, 0)))
        .set_latency(Endpoint::TriggerScan, Duration::from_millis(300));
    let monitor = monitor(&client);
    let rec = Arc::new(Recorder::default());

    let (first, second) = tokio::join!(monitor.trigger(rec.clone()), async {
        sleep(Duration::from_millis(100)).await;
        monitor.trigger(rec.clone()).await
    });
    assert_eq!(first, TriggerOutcome::Started);
    assert_eq!(second, TriggerOutcome::AlreadyRunning);
    assert_eq!(client.calls(Endpoint::TriggerScan), 1);
    monitor.wait().await;
}

// --- through the dashboard ---

#[tokio::test(start_paused = true)]
async fn completed_scan_refreshes_once_and_raises_new_data() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(30, true, 0)))
        .push_scan_status(Ok(scan(70, true, 0)))
        .push_scan_status(Ok(scan(100, false, 2)))
        .push_news(Ok(feed()))
        .push_stats(Ok(StatsSnapshot::default()));
    let dash = dashboard(&client);

    assert_eq!(dash.trigger_scan().await, TriggerOutcome::Started);
    dash.monitor().wait().await;

    assert_eq!(dash.monitor().phase(), ScanPhase::Completed);
    assert!(dash.has_new_data());
    assert_eq!(client.calls(Endpoint::News), 1);
    assert_eq!(client.calls(Endpoint::Stats), 1);
    // Three ticks plus the timestamp read of the completion refresh.
    assert_eq!(client.calls(Endpoint::ScanStatus), 4);
    assert_eq!(dash.news().len(), 4);
    assert_eq!(dash.timestamps().last_scan, "14:00");
    assert!(!dash.is_loading());
}

#[tokio::test(start_paused = true)]
async fn dispose_during_completion_refresh_releases_loading() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(100, false, 2)))
        .push_news(Ok(feed()))
        .set_latency(Endpoint::News, Duration::from_secs(3));
    let dash = dashboard(&client);

    dash.trigger_scan().await;
    // Completion at 1s starts a refresh whose /news answers at 4s.
    sleep(Duration::from_millis(1500)).await;
    assert!(dash.is_loading());
    dash.shutdown();

    sleep(Duration::from_secs(10)).await;
    assert!(!dash.is_loading());
    assert_eq!(client.calls(Endpoint::Stats), 0, "aborted refresh went no further");

    dash.refresh().await;
    assert!(!dash.is_loading());
    assert_eq!(dash.news().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn new_trigger_cancels_previous_completion_hook() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(100, false, 2)))
        .push_news(Ok(feed()))
        .set_latency(Endpoint::News, Duration::from_secs(3));
    let dash = dashboard(&client);

    dash.trigger_scan().await;
    sleep(Duration::from_millis(1500)).await;
    // The first lifecycle is Completed and busy refreshing.
    assert_eq!(dash.trigger_scan().await, TriggerOutcome::Started);
    dash.shutdown();

    sleep(Duration::from_secs(10)).await;
    assert_eq!(client.calls(Endpoint::Stats), 0);
    assert!(!dash.is_loading());
    assert!(!dash.has_new_data());
}

#[tokio::test(start_paused = true)]
async fn nothing_new_leaves_the_flag_down() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(started()))
        .push_scan_status(Ok(scan(100, false, 0)))
        .push_news(Ok(feed()));
    let dash = dashboard(&client);

    dash.trigger_scan().await;
    dash.monitor().wait().await;

    assert_eq!(dash.monitor().phase(), ScanPhase::Completed);
    assert!(!dash.has_new_data());
    assert_eq!(client.calls(Endpoint::News), 1);
}

#[tokio::test(start_paused = true)]
async fn busy_backend_is_followed_instead() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_trigger(Ok(TriggerReply::Busy {
            message: Some("Already scanning".into()),
        }))
        .push_scan_status(Ok(scan(55, true, 0)))
        .push_scan_status(Ok(scan(100, false, 4)))
        .push_news(Ok(feed()));
    let dash = dashboard(&client);

    assert_eq!(dash.trigger_scan().await, TriggerOutcome::Busy);
    assert_eq!(dash.monitor().phase(), ScanPhase::Polling);
    assert_eq!(dash.monitor().progress(), 55);

    dash.monitor().wait().await;
    assert_eq!(dash.monitor().phase(), ScanPhase::Completed);
    assert!(dash.has_new_data());
    assert_eq!(client.calls(Endpoint::News), 1);
}

#[tokio::test(start_paused = true)]
async fn start_attaches_to_a_running_scan() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_scan_status(Ok(scan(20, true, 0)))
        .push_scan_status(Ok(scan(20, true, 0)))
        .push_scan_status(Ok(scan(100, false, 1)))
        .push_news(Ok(feed()));
    let dash = dashboard(&client);

    dash.start().await;
    assert_eq!(dash.monitor().phase(), ScanPhase::Polling);
    assert_eq!(client.calls(Endpoint::TriggerScan), 0);

    dash.monitor().wait().await;
    assert_eq!(dash.monitor().phase(), ScanPhase::Completed);
    assert!(dash.has_new_data());
    // Startup refresh plus completion refresh.
    assert_eq!(client.calls(Endpoint::News), 2);
}

#[tokio::test(start_paused = true)]
async fn start_with_idle_backend_does_not_poll() {
    let client = Arc::new(ScriptedClient::new());
    client
        .push_scan_status(Ok(scan(0, false, 0)))
        .push_news(Ok(feed()));
    let dash = dashboard(&client);

    dash.start().await;
    assert_eq!(dash.monitor().phase(), ScanPhase::Idle);

    sleep(Duration::from_secs(5)).await;
    // One read from the refresh, one from the resume check.
    assert_eq!(client.calls(Endpoint::ScanStatus), 2);
}
