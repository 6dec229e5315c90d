//! Per-port report lines.
//!
//! Workers report each outcome as soon as it is known. The sink sits behind a
//! mutex and every port's lines go out under one lock, so concurrent reports
//! never interleave mid-line.

use crate::scanner::{Banner, ScanOutcome, ScanSummary};
use crate::types::{Port, ScanTarget};
use console::style;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

const RULE_WIDTH: usize = 50;

/// Which outcomes get printed, and how.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Print refused ports and the closed-port total.
    pub show_closed: bool,
    /// Suppress filtered/unreachable ports.
    pub hide_filtered: bool,
    /// Emit ANSI colour on line markers.
    pub color: bool,
}

/// Serialized writer for scan output.
pub struct Reporter {
    sink: Mutex<Box<dyn Write + Send>>,
    options: ReportOptions,
}

impl Reporter {
    pub fn new(sink: impl Write + Send + 'static, options: ReportOptions) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
            options,
        }
    }

    /// Reporter writing to standard output.
    pub fn stdout(options: ReportOptions) -> Self {
        Self::new(io::stdout(), options)
    }

    /// Report one port's outcome. Returns whether anything was printed.
    pub fn report(&self, port: Port, outcome: &ScanOutcome) -> bool {
        match self.render(port, outcome) {
            Some(text) => {
                self.write(&text);
                true
            }
            None => false,
        }
    }

    /// Lines for one outcome, or `None` when the options suppress it.
    pub fn render(&self, port: Port, outcome: &ScanOutcome) -> Option<String> {
        let text = match outcome {
            ScanOutcome::Open { banner } => {
                let mut text = format!("{} Port {:<5} is open", self.marker("[+]"), port);
                match banner {
                    Some(Banner::Text(banner)) => {
                        text.push_str(&format!("\n    |__Banner: {}", banner));
                    }
                    Some(Banner::Missing) => text.push_str("\n    |__Banner: (no banner obtained)"),
                    Some(Banner::Failed(detail)) => {
                        text.push_str(&format!("\n    |__Banner error: {}", detail));
                    }
                    None => {}
                }
                text
            }
            ScanOutcome::ClosedRefused => {
                if !self.options.show_closed {
                    return None;
                }
                format!("{} Port {:<5} closed (connection refused)", self.marker("[-]"), port)
            }
            ScanOutcome::FilteredTimeout => {
                if self.options.hide_filtered {
                    return None;
                }
                format!("{} Port {:<5} is filtered. (timeout)", self.marker("[*]"), port)
            }
            ScanOutcome::FilteredOther { code } => {
                if self.options.hide_filtered {
                    return None;
                }
                format!(
                    "{} Port {:<5} is filtered or cannot be reached. (errno: {})",
                    self.marker("[*]"),
                    port,
                    code
                )
            }
            ScanOutcome::ResolutionError => format!(
                "{} Could not resolve hostname while scanning port {}.",
                self.marker("[ERR]"),
                port
            ),
            ScanOutcome::UnexpectedError { message } => format!(
                "{} While scanning port {}. {}",
                self.marker("[ERR]"),
                port,
                message
            ),
        };
        Some(text)
    }

    /// Banner printed before the first worker starts.
    pub fn header(&self, target: &ScanTarget) {
        self.write(&format!(
            "{} '{}' ({}) Scanning...\n{}",
            self.marker("[*]"),
            target.original,
            target.ip,
            "-".repeat(RULE_WIDTH)
        ));
    }

    /// Closing lines once the join barrier has returned.
    pub fn summary(&self, summary: &ScanSummary) {
        let info = self.marker("[*]");
        let mut text = format!(
            "{}\n{} Scan complete.\n{} Time elapsed: {:.2} seconds.",
            "-".repeat(RULE_WIDTH),
            info,
            info,
            summary.elapsed.as_secs_f64()
        );
        if self.options.show_closed {
            text.push_str(&format!(
                "\n{} Total closed ports: {}",
                info, summary.counts.closed
            ));
        }
        self.write(&text);
    }

    fn marker(&self, marker: &'static str) -> String {
        if !self.options.color {
            return marker.to_string();
        }
        let styled = style(marker).force_styling(true);
        match marker {
            "[+]" => styled.green().bold(),
            "[-]" => styled.red(),
            "[ERR]" => styled.red().bold(),
            _ => styled.yellow(),
        }
        .to_string()
    }

    fn write(&self, text: &str) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(sink, "{}", text).and_then(|()| sink.flush()) {
            warn!(error = %e, "failed to write report line");
        }
    }
}

/// Cloneable in-memory sink; every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
