//! The polling coordinator: three independently-cadenced refresh tasks.
//!
//! Fetch side runs on a background thread driving a current-thread tokio
//! runtime; every tick spawns one fetch so a slow request never delays or
//! skips the task's next tick. Decoded payloads cross to the UI thread over
//! an mpsc channel and are applied in arrival order, each as a full replace.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::api::{ApiClient, Candle, HistoryResponse, MarketDataResponse, StatusSnapshot};
use crate::chart::ChartAdapter;
use crate::debug_hooks;
use crate::panels::PanelRenderer;

pub const DEFAULT_HISTORY_SECS: u64 = 5;
pub const DEFAULT_STATUS_SECS: u64 = 2;
pub const DEFAULT_MARKET_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPeriods {
    pub history: Duration,
    pub status: Duration,
    pub market: Duration,
}

impl Default for PollPeriods {
    fn default() -> Self {
        Self {
            history: Duration::from_secs(DEFAULT_HISTORY_SECS),
            status: Duration::from_secs(DEFAULT_STATUS_SECS),
            market: Duration::from_secs(DEFAULT_MARKET_SECS),
        }
    }
}

/// One successfully fetched and decoded payload, ready to apply.
#[derive(Debug)]
pub enum PollEvent {
    History(HistoryResponse),
    MarketData(MarketDataResponse),
    Status(StatusSnapshot),
}

/// Spawn the fetch side. The returned thread runs for the life of the
/// process; every task ticks once immediately before its first timed wait.
pub fn spawn(
    client: ApiClient,
    periods: PollPeriods,
    tx: Sender<PollEvent>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new().name("poller".to_string()).spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        let local = tokio::task::LocalSet::new();

        debug_hooks::log_poll_start(&periods);

        local.spawn_local(history_task(client.clone(), periods.history, tx.clone()));
        local.spawn_local(status_task(client.clone(), periods.status, tx.clone()));
        local.spawn_local(market_task(client, periods.market, tx));

        // The tasks never finish, so this drives the LocalSet forever.
        rt.block_on(local);
    })
}

async fn history_task(client: ApiClient, period: Duration, tx: Sender<PollEvent>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let client = client.clone();
        let tx = tx.clone();
        tokio::task::spawn_local(async move {
            match client.fetch_history().await {
                Ok(payload) => {
                    debug_hooks::log_poll_payload(
                        "poll.history",
                        format!("trades={} cycles={}", payload.trades.len(), payload.cycles.len()),
                    );
                    let _ = tx.send(PollEvent::History(payload));
                }
                Err(err) => eprintln!("[poll.history] fetch failed: {err}"),
            }
        });
    }
}

async fn status_task(client: ApiClient, period: Duration, tx: Sender<PollEvent>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let client = client.clone();
        let tx = tx.clone();
        tokio::task::spawn_local(async move {
            match client.fetch_status().await {
                Ok(payload) => {
                    debug_hooks::log_poll_payload(
                        "poll.status",
                        format!(
                            "status={} balance={}",
                            payload.status.is_some(),
                            payload.balance.is_some()
                        ),
                    );
                    let _ = tx.send(PollEvent::Status(payload));
                }
                Err(err) => eprintln!("[poll.status] fetch failed: {err}"),
            }
        });
    }
}

async fn market_task(client: ApiClient, period: Duration, tx: Sender<PollEvent>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let client = client.clone();
        let tx = tx.clone();
        tokio::task::spawn_local(async move {
            match client.fetch_market_data().await {
                Ok(payload) => {
                    debug_hooks::log_poll_payload(
                        "poll.market",
                        format!("symbol={} candles={}", payload.symbol, payload.data.len()),
                    );
                    let _ = tx.send(PollEvent::MarketData(payload));
                }
                Err(err) => eprintln!("[poll.market] fetch failed: {err}"),
            }
        });
    }
}

/// The chart series keys on time, so the candle sequence must be ascending
/// before it is handed over; the backend's ordering is not trusted.
pub fn sort_candles(candles: &mut [Candle]) {
    candles.sort_by_key(|c| c.time);
}

/// Apply side, run on the UI thread. Each arm hands the payload to the one
/// component that owns the matching view models.
pub fn apply_event(event: PollEvent, chart: &mut ChartAdapter, panels: &PanelRenderer) {
    match event {
        PollEvent::History(history) => {
            panels.render_history(&history.trades);
            panels.render_cycles(&history.cycles);
        }
        PollEvent::Status(snapshot) => {
            panels.render_status(&snapshot);
        }
        PollEvent::MarketData(mut market) => {
            if !market.data.is_empty() {
                sort_candles(&mut market.data);
                chart.set_candles(&market.data);
                chart.set_title(&market.symbol);
            }
        }
    }
}
