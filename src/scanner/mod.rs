//! Scanner module - coordinates the concurrent scan.
//!
//! A fixed pool of workers drains a pre-filled [`WorkQueue`]. Each worker
//! cycles through
//!
//! ```text
//! Idle -> Claiming -> Probing -> (Banner-Acquiring) -> Reporting -> Idle
//! ```
//!
//! and stops (`Done`) the first time a claim finds the queue empty. The scan
//! returns only after every worker has finished, so every claimed port has
//! been probed and reported.

mod queue;
pub mod tcp;
pub mod traits;

pub use queue::WorkQueue;
pub use tcp::TcpConnectScanner;
pub use traits::{Banner, ScanOutcome, Scanner};

use crate::banner::BannerSettings;
use crate::output::{ReportOptions, Reporter};
use crate::types::{Port, ScanTarget};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, trace, warn};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default number of workers requested.
pub const DEFAULT_THREADS: usize = 50;

/// Immutable configuration shared by every worker of one scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Resolved target.
    pub target: ScanTarget,
    /// Bound on each connect attempt.
    pub connect_timeout: Duration,
    /// Requested worker count, clamped to the port count.
    pub concurrency: usize,
    /// Whether open ports get a banner attempt.
    pub grab_banners: bool,
    /// Banner read loop and probe table.
    pub banner: BannerSettings,
    /// What the reporter prints.
    pub report: ReportOptions,
}

impl ScanConfig {
    /// Create a configuration with default timeouts and concurrency.
    pub fn new(target: ScanTarget) -> Self {
        Self {
            target,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            concurrency: DEFAULT_THREADS,
            grab_banners: false,
            banner: BannerSettings::default(),
            report: ReportOptions::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Enable banner grabbing.
    pub fn with_banners(mut self) -> Self {
        self.grab_banners = true;
        self
    }

    pub fn with_banner_settings(mut self, settings: BannerSettings) -> Self {
        self.banner = settings;
        self
    }

    pub fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.report = options;
        self
    }
}

/// Number of workers for `ports` ports when `requested` were asked for.
///
/// Never more than there is work, and never zero when there is any.
pub fn worker_count(requested: usize, ports: usize) -> usize {
    if ports == 0 {
        0
    } else {
        requested.clamp(1, ports)
    }
}

/// Per-classification totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub open: usize,
    pub closed: usize,
    pub filtered: usize,
    pub errors: usize,
}

impl ScanCounts {
    pub fn record(&mut self, outcome: &ScanOutcome) {
        match outcome {
            ScanOutcome::Open { .. } => self.open += 1,
            ScanOutcome::ClosedRefused => self.closed += 1,
            ScanOutcome::FilteredTimeout | ScanOutcome::FilteredOther { .. } => {
                self.filtered += 1
            }
            ScanOutcome::ResolutionError | ScanOutcome::UnexpectedError { .. } => {
                self.errors += 1
            }
        }
    }

    pub fn total(&self) -> usize {
        self.open + self.closed + self.filtered + self.errors
    }
}

/// State shared by all workers: the report sink and the counters.
pub struct ScanContext {
    reporter: Reporter,
    counts: Mutex<ScanCounts>,
}

impl ScanContext {
    pub fn new(reporter: Reporter) -> Self {
        Self {
            reporter,
            counts: Mutex::new(ScanCounts::default()),
        }
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Count and report one outcome.
    pub fn record(&self, port: Port, outcome: &ScanOutcome) {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(outcome);
        self.reporter.report(port, outcome);
    }

    /// Snapshot of the counters.
    pub fn counts(&self) -> ScanCounts {
        *self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of a completed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Wall-clock time from worker start to the join barrier.
    pub elapsed: Duration,
    pub counts: ScanCounts,
    /// Workers actually started.
    pub workers: usize,
    /// Ports in the scanned set.
    pub ports: usize,
}

/// Drive a scan of `ports` to completion with a bounded worker pool.
///
/// Each outcome is reported through `context` as soon as it is known. A probe
/// that panics is reported as [`ScanOutcome::UnexpectedError`] and does not
/// take its worker down.
pub async fn run_scan(
    scanner: Arc<dyn Scanner>,
    ports: Vec<Port>,
    concurrency: usize,
    context: Arc<ScanContext>,
) -> ScanSummary {
    let queue = Arc::new(WorkQueue::new(ports));
    let total = queue.len();
    let workers = worker_count(concurrency, total);

    info!(ports = total, workers, "starting scan");
    let start = Instant::now();

    let mut set = JoinSet::new();
    for id in 0..workers {
        set.spawn(worker(
            id,
            Arc::clone(&queue),
            Arc::clone(&scanner),
            Arc::clone(&context),
        ));
    }
    let started = set.len();

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "scan worker exited abnormally");
        }
    }

    let elapsed = start.elapsed();
    let counts = context.counts();
    info!(?elapsed, ?counts, "scan complete");

    ScanSummary {
        elapsed,
        counts,
        workers: started,
        ports: total,
    }
}

async fn worker(
    id: usize,
    queue: Arc<WorkQueue>,
    scanner: Arc<dyn Scanner>,
    context: Arc<ScanContext>,
) {
    while let Some(port) = queue.claim() {
        trace!(worker = id, %port, "claimed");

        // Run the probe as its own task so a panic stays contained.
        let probe = {
            let scanner = Arc::clone(&scanner);
            tokio::spawn(async move { scanner.scan_port(port).await })
        };
        let outcome = match probe.await {
            Ok(outcome) => outcome,
            Err(e) => ScanOutcome::UnexpectedError {
                message: e.to_string(),
            },
        };

        context.record(port, &outcome);
    }
    trace!(worker = id, "queue drained");
}

/// Scan `ports` on the configured target with the TCP connect scanner,
/// writing the header, per-port lines and summary through `reporter`.
pub async fn run(config: &ScanConfig, ports: Vec<Port>, reporter: Reporter) -> ScanSummary {
    let scanner: Arc<dyn Scanner> = Arc::new(TcpConnectScanner::from_config(config));
    let context = Arc::new(ScanContext::new(reporter));

    context.reporter().header(&config.target);
    let summary = run_scan(scanner, ports, config.concurrency, Arc::clone(&context)).await;
    context.reporter().summary(&summary);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed table and records every call.
    #[derive(Default)]
    struct StubScanner {
        answers: HashMap<u16, ScanOutcome>,
        panic_on: Option<u16>,
        calls: Mutex<Vec<u16>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl StubScanner {
        fn with_answers(answers: &[(u16, ScanOutcome)]) -> Self {
            Self {
                answers: answers.iter().cloned().collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<u16> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort_unstable();
            calls
        }
    }

    #[async_trait]
    impl Scanner for StubScanner {
        async fn scan_port(&self, port: Port) -> ScanOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(port.as_u16());

            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_on == Some(port.as_u16()) {
                panic!("probe blew up");
            }
            self.answers
                .get(&port.as_u16())
                .cloned()
                .unwrap_or(ScanOutcome::ClosedRefused)
        }
    }

    fn ports(list: impl IntoIterator<Item = u16>) -> Vec<Port> {
        list.into_iter().filter_map(Port::new).collect()
    }

    fn context(options: ReportOptions) -> (Arc<ScanContext>, MemorySink) {
        let sink = MemorySink::new();
        let reporter = Reporter::new(sink.clone(), options);
        (Arc::new(ScanContext::new(reporter)), sink)
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count(50, 4), 4);
        assert_eq!(worker_count(3, 100), 3);
        assert_eq!(worker_count(0, 10), 1);
        assert_eq!(worker_count(50, 0), 0);
        assert_eq!(worker_count(1, 1), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_port_probed_exactly_once() {
        let stub = Arc::new(StubScanner::default());
        let (ctx, _) = context(ReportOptions::default());

        let summary = run_scan(stub.clone(), ports(1..=300), 7, ctx).await;

        assert_eq!(stub.calls(), (1..=300).collect::<Vec<u16>>());
        assert_eq!(summary.ports, 300);
        assert_eq!(summary.workers, 7);
        assert_eq!(summary.counts.total(), 300);
        assert_eq!(summary.counts.closed, 300);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_workers() {
        let stub = Arc::new(StubScanner::default());
        let (ctx, _) = context(ReportOptions::default());

        let summary = run_scan(stub.clone(), ports(1..=60), 5, ctx).await;

        assert_eq!(summary.workers, 5);
        let peak = stub.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 5, "peak in-flight was {}", peak);
    }

    #[tokio::test]
    async fn test_workers_clamped_to_port_count() {
        let stub = Arc::new(StubScanner::default());
        let (ctx, _) = context(ReportOptions::default());

        let summary = run_scan(stub, ports([22, 80, 443]), 50, ctx).await;
        assert_eq!(summary.workers, 3);
    }

    #[tokio::test]
    async fn test_empty_port_set() {
        let stub = Arc::new(StubScanner::default());
        let (ctx, sink) = context(ReportOptions::default());

        let summary = run_scan(stub.clone(), Vec::new(), 50, ctx).await;
        assert_eq!(summary.workers, 0);
        assert_eq!(summary.counts, ScanCounts::default());
        assert!(stub.calls().is_empty());
        assert!(sink.contents().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_probe_is_contained() {
        let stub = Arc::new(StubScanner {
            panic_on: Some(2),
            ..StubScanner::default()
        });
        let (ctx, sink) = context(ReportOptions::default());

        let summary = run_scan(stub.clone(), ports(1..=4), 1, ctx).await;

        assert_eq!(stub.calls(), vec![1, 2, 3, 4]);
        assert_eq!(summary.counts.errors, 1);
        assert_eq!(summary.counts.closed, 3);
        assert!(sink.contents().contains("[ERR] While scanning port 2."));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mixed_scenario_report() {
        let stub = Arc::new(StubScanner::with_answers(&[
            (22, ScanOutcome::Open { banner: None }),
            (80, ScanOutcome::Open { banner: None }),
            (443, ScanOutcome::FilteredTimeout),
            (9999, ScanOutcome::ClosedRefused),
        ]));
        let (ctx, sink) = context(ReportOptions {
            show_closed: true,
            ..ReportOptions::default()
        });

        let summary = run_scan(stub, ports([22, 80, 443, 9999]), 50, ctx).await;

        assert_eq!(
            summary.counts,
            ScanCounts {
                open: 2,
                closed: 1,
                filtered: 1,
                errors: 0
            }
        );

        let output = sink.contents();
        let mut lines: Vec<&str> = output.lines().collect();
        lines.sort_unstable();
        assert_eq!(
            lines,
            vec![
                "[*] Port 443   is filtered. (timeout)",
                "[+] Port 22    is open",
                "[+] Port 80    is open",
                "[-] Port 9999  closed (connection refused)",
            ]
        );
    }

    #[tokio::test]
    async fn test_hidden_lines_still_counted() {
        let stub = Arc::new(StubScanner::with_answers(&[
            (1, ScanOutcome::FilteredTimeout),
            (2, ScanOutcome::FilteredOther { code: 113 }),
        ]));
        let (ctx, sink) = context(ReportOptions {
            hide_filtered: true,
            ..ReportOptions::default()
        });

        let summary = run_scan(stub, ports([1, 2, 3]), 2, ctx).await;
        assert_eq!(summary.counts.filtered, 2);
        assert_eq!(summary.counts.closed, 1);
        assert!(sink.contents().is_empty());
    }
}
