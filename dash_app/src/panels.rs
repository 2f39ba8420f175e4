//! Trade-history, cycle, and status panel rendering. Every render is a total
//! rebuild of the owned view models; given the same snapshot it produces the
//! same visible output.

use slint::{ModelRc, SharedString, VecModel, Weak};

use crate::api::{CycleRecord, StatusSnapshot, Trade};
use crate::format::{format_currency, format_time_local, SENTINEL};
use crate::{AppWindow, CycleRow, TradeRow};

/// Plain view-model rows, built before any Slint type enters the picture.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub symbol: String,
    pub time: String,
    pub detail: String,
    pub status: String,
    pub is_buy: bool,
}

pub fn history_row(trade: &Trade) -> HistoryRow {
    HistoryRow {
        symbol: trade.symbol.clone(),
        time: trade
            .time
            .map(format_time_local)
            .unwrap_or_else(|| SENTINEL.to_string()),
        detail: format!(
            "{} {} @ {}",
            trade.side.to_uppercase(),
            trade.size,
            trade.price
        ),
        status: format!("Status: {}", trade.status),
        is_buy: trade.is_buy(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    pub status: String,
    pub time: String,
    pub logs: String,
}

pub fn activity_row(cycle: &CycleRecord) -> ActivityRow {
    ActivityRow {
        status: cycle
            .status
            .clone()
            .unwrap_or_else(|| SENTINEL.to_string()),
        time: cycle.time.clone().unwrap_or_else(|| SENTINEL.to_string()),
        logs: cycle
            .logs
            .as_deref()
            .and_then(|l| l.lines().next())
            .unwrap_or("")
            .to_string(),
    }
}

pub struct PanelRenderer {
    ui: Weak<AppWindow>,
}

impl PanelRenderer {
    pub fn new(ui: Weak<AppWindow>) -> Self {
        Self { ui }
    }

    /// Clears and fully rebuilds the trade list. Source order is preserved;
    /// the backend already returns newest-first.
    pub fn render_history(&self, trades: &[Trade]) {
        let Some(ui) = self.ui.upgrade() else {
            return;
        };
        let rows: Vec<TradeRow> = trades
            .iter()
            .map(|t| {
                let row = history_row(t);
                TradeRow {
                    symbol: SharedString::from(row.symbol),
                    time: SharedString::from(row.time),
                    detail: SharedString::from(row.detail),
                    status: SharedString::from(row.status),
                    is_buy: row.is_buy,
                }
            })
            .collect();
        ui.set_trade_rows(ModelRc::new(VecModel::from(rows)));
    }

    pub fn render_cycles(&self, cycles: &[CycleRecord]) {
        let Some(ui) = self.ui.upgrade() else {
            return;
        };
        let rows: Vec<CycleRow> = cycles
            .iter()
            .map(|c| {
                let row = activity_row(c);
                CycleRow {
                    status: SharedString::from(row.status),
                    time: SharedString::from(row.time),
                    logs: SharedString::from(row.logs),
                }
            })
            .collect();
        ui.set_cycle_rows(ModelRc::new(VecModel::from(rows)));
    }

    /// Each field is guarded on its own: an absent value renders the sentinel
    /// rather than stale data, and never panics.
    pub fn render_status(&self, snapshot: &StatusSnapshot) {
        let Some(ui) = self.ui.upgrade() else {
            return;
        };
        ui.set_balance_total(SharedString::from(format_currency(snapshot.usdt_total())));
        ui.set_balance_free(SharedString::from(format_currency(snapshot.usdt_free())));
        ui.set_status_text(SharedString::from(
            snapshot.status.as_deref().unwrap_or(SENTINEL),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(side: &str) -> Trade {
        Trade {
            symbol: "BTC/USDT".to_string(),
            time: Some(1_700_000_000_000),
            side: side.to_string(),
            size: 0.5,
            price: 30000.0,
            status: "closed".to_string(),
        }
    }

    #[test]
    fn buy_and_sell_rows_differ_only_in_side() {
        let buy = history_row(&trade("buy"));
        let sell = history_row(&trade("sell"));

        assert!(buy.is_buy);
        assert!(!sell.is_buy);
        assert_eq!(buy.detail, "BUY 0.5 @ 30000");
        assert_eq!(sell.detail, "SELL 0.5 @ 30000");
        assert_eq!(buy.symbol, sell.symbol);
        assert_eq!(buy.time, sell.time);
        assert_eq!(buy.status, sell.status);
    }

    #[test]
    fn missing_time_renders_sentinel() {
        let mut t = trade("buy");
        t.time = None;
        assert_eq!(history_row(&t).time, "--");
    }

    #[test]
    fn large_history_builds_linearly() {
        let trades: Vec<Trade> = (0..1000).map(|_| trade("buy")).collect();
        let rows: Vec<HistoryRow> = trades.iter().map(history_row).collect();
        assert_eq!(rows.len(), 1000);
    }

    #[test]
    fn activity_row_takes_first_log_line() {
        let cycle = CycleRecord {
            id: Some(3),
            status: Some("completed".to_string()),
            time: Some("2024-01-01T00:00:00".to_string()),
            logs: Some("decision: hold\nfetched 100 candles".to_string()),
        };
        let row = activity_row(&cycle);
        assert_eq!(row.status, "completed");
        assert_eq!(row.logs, "decision: hold");
    }

    #[test]
    fn activity_row_sentinels_for_empty_cycle() {
        let row = activity_row(&CycleRecord {
            id: None,
            status: None,
            time: None,
            logs: None,
        });
        assert_eq!(row.status, "--");
        assert_eq!(row.time, "--");
        assert_eq!(row.logs, "");
    }
}
