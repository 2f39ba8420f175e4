//! Opt-in diagnostic log layer. Enabled with DASH_DEBUG_HOOKS=1; lines go to
//! stderr and to a log file in the data dir so a misbehaving poll loop can be
//! traced after the fact.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use chrono::Utc;

use crate::poll::PollPeriods;

static ENABLED: OnceLock<bool> = OnceLock::new();
static FILE_HANDLE: OnceLock<Mutex<std::fs::File>> = OnceLock::new();

fn logging_enabled() -> bool {
    *ENABLED.get_or_init(|| {
        std::env::var("DASH_DEBUG_HOOKS")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(false)
    })
}

fn log_file() -> &'static Mutex<std::fs::File> {
    FILE_HANDLE.get_or_init(|| {
        let dir = crate::settings::data_dir();
        let _ = std::fs::create_dir_all(&dir);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("debug_hooks.log"))
            .unwrap_or_else(|_| {
                std::fs::File::create("/tmp/dash_debug_hooks.log").expect("fallback log create")
            });
        Mutex::new(file)
    })
}

fn log_line(topic: &str, msg: impl AsRef<str>) {
    if !logging_enabled() {
        return;
    }

    let ts = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let formatted = format!("[{ts}][{topic}] {}", msg.as_ref());

    if let Ok(mut f) = log_file().lock() {
        let _ = writeln!(f, "{formatted}");
    }

    eprintln!("{formatted}");
}

pub fn log_poll_start(periods: &PollPeriods) {
    log_line(
        "poll",
        format!(
            "starting tasks; history={}s status={}s market={}s",
            periods.history.as_secs(),
            periods.status.as_secs(),
            periods.market.as_secs()
        ),
    );
}

/// Per-tick payload summaries; sampled so a healthy loop stays quiet.
pub fn log_poll_payload(topic: &str, detail: impl AsRef<str>) {
    static COUNT: AtomicU64 = AtomicU64::new(0);
    let n = COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    if n <= 10 || n % 50 == 0 {
        log_line(topic, format!("tick #{n}: {}", detail.as_ref()));
    }
}

pub fn log_chart_apply(count: usize) {
    log_line("chart.apply", format!("replaced series with {count} candles"));
}

pub fn log_chart_skip(count: usize) {
    log_line(
        "chart.skip",
        format!("ignored refresh of {count} candles; keeping previous series"),
    );
}

pub fn log_chart_resize(width: f32, height: f32) {
    static COUNT: AtomicU64 = AtomicU64::new(0);
    let n = COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    if n <= 10 || n % 50 == 0 {
        log_line("chart.resize", format!("viewport #{n}: {width}x{height}"));
    }
}
