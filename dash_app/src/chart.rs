//! Chart ownership: one candlestick series, its axis ticks, and the viewport
//! it is laid out against. The adapter retains the last good dataset so a bad
//! refresh never blanks a working chart.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use slint::{ModelRc, SharedString, VecModel, Weak};

use crate::api::Candle;
use crate::debug_hooks;
use crate::{AppWindow, AxisTick, CandlePoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self { width: 0.0, height: 0.0 }
    }
}

/// A candle as the series keys it: whole-second time, raw prices.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartCandle {
    pub time_secs: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// The series' retained dataset. Replacement is all-or-nothing.
#[derive(Debug, Default)]
pub struct ChartSeries {
    candles: Vec<ChartCandle>,
}

impl ChartSeries {
    /// Replace the dataset. Returns false (and keeps the previous data) when
    /// the batch is empty or malformed.
    pub fn replace(&mut self, candles: &[Candle]) -> bool {
        match prepare_candles(candles) {
            Some(prepared) => {
                self.candles = prepared;
                true
            }
            None => false,
        }
    }

    pub fn candles(&self) -> &[ChartCandle] {
        &self.candles
    }
}

/// Validate and convert one refresh worth of candles. The input must already
/// be sorted ascending by time; units convert from epoch-ms to whole seconds
/// here. None means "do not touch the chart".
pub fn prepare_candles(candles: &[Candle]) -> Option<Vec<ChartCandle>> {
    if candles.is_empty() {
        return None;
    }
    let mut out = Vec::with_capacity(candles.len());
    for c in candles {
        if !c.is_well_formed() {
            return None;
        }
        out.push(ChartCandle {
            time_secs: c.time / 1000,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
        });
    }
    Some(out)
}

pub struct ChartAdapter {
    ui: Weak<AppWindow>,
    series: ChartSeries,
    viewport: ViewportSize,
}

impl ChartAdapter {
    /// Binds the adapter to the window's single candlestick series. Call once
    /// at startup, before any data is applied.
    pub fn new(ui: Weak<AppWindow>) -> Self {
        Self {
            ui,
            series: ChartSeries::default(),
            viewport: ViewportSize::default(),
        }
    }

    /// Subscribes to the chart container's size stream for the lifetime of
    /// the window. Every reported change is applied, no debouncing.
    pub fn observe_resize(adapter: &Rc<RefCell<ChartAdapter>>, ui: &AppWindow) {
        let adapter = Rc::clone(adapter);
        ui.on_viewport_changed(move |width, height| {
            adapter.borrow_mut().handle_resize(width, height);
        });
    }

    fn handle_resize(&mut self, width: f32, height: f32) {
        self.viewport = ViewportSize { width, height };
        debug_hooks::log_chart_resize(width, height);
        self.apply();
    }

    /// Full dataset replacement; no append mode. Empty or malformed input is
    /// a logged no-op that retains the previous chart.
    pub fn set_candles(&mut self, candles: &[Candle]) {
        if self.series.replace(candles) {
            debug_hooks::log_chart_apply(candles.len());
            self.apply();
        } else {
            debug_hooks::log_chart_skip(candles.len());
        }
    }

    pub fn set_title(&mut self, text: &str) {
        if let Some(ui) = self.ui.upgrade() {
            ui.set_chart_title(SharedString::from(text));
        }
    }

    fn apply(&self) {
        let Some(ui) = self.ui.upgrade() else {
            return;
        };
        let candles = self.series.candles();
        ui.set_candle_points(ModelRc::new(VecModel::from(build_candle_points(candles))));
        ui.set_price_ticks(ModelRc::new(VecModel::from(build_price_ticks(
            candles,
            self.viewport.height,
        ))));
        ui.set_time_ticks(ModelRc::new(VecModel::from(build_time_ticks(
            candles,
            self.viewport.width,
        ))));
    }
}

/// Normalize candles into 0..1 chart space (y inverted, 0 = top).
pub fn build_candle_points(candles: &[ChartCandle]) -> Vec<CandlePoint> {
    if candles.is_empty() {
        return Vec::new();
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for c in candles {
        lo = lo.min(c.low);
        hi = hi.max(c.high);
    }

    let mut span = hi - lo;
    if !span.is_finite() || span <= 0.0 {
        span = hi.abs().max(1.0);
        lo = hi - span;
    }
    let pad = span * 0.02;
    lo -= pad;
    hi += pad;
    let span = (hi - lo).max(1e-9);

    let y = |price: f64| -> f32 { ((hi - price) / span).clamp(0.0, 1.0) as f32 };

    let n = candles.len().max(1);
    let w = (1.0 / n as f32).clamp(0.01, 0.2);

    candles
        .iter()
        .enumerate()
        .map(|(i, c)| CandlePoint {
            x: (i as f32 + 0.5) / n as f32,
            w,
            open: y(c.open),
            high: y(c.high),
            low: y(c.low),
            close: y(c.close),
            is_up: c.close >= c.open,
        })
        .collect()
}

fn price_tick_count(height: f32) -> usize {
    ((height / 48.0) as usize).clamp(3, 9)
}

fn time_tick_count(width: f32) -> usize {
    ((width / 110.0) as usize).clamp(2, 7)
}

pub fn build_price_ticks(candles: &[ChartCandle], height: f32) -> Vec<AxisTick> {
    let mut out = Vec::new();
    if candles.is_empty() {
        return out;
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for c in candles {
        lo = lo.min(c.low);
        hi = hi.max(c.high);
    }
    if !lo.is_finite() || !hi.is_finite() || hi <= lo {
        return out;
    }
    let span = hi - lo;

    let decimals = if span >= 1000.0 {
        0
    } else if span >= 100.0 {
        1
    } else if span >= 10.0 {
        2
    } else if span >= 1.0 {
        3
    } else if span >= 0.1 {
        4
    } else {
        5
    };

    let steps = price_tick_count(height);
    for i in 0..steps {
        let frac = i as f64 / (steps - 1).max(1) as f64;
        let price = hi - frac * span;
        out.push(AxisTick {
            pos: frac as f32,
            label: format!("{price:.decimals$}").into(),
        });
    }
    out
}

pub fn build_time_ticks(candles: &[ChartCandle], width: f32) -> Vec<AxisTick> {
    let mut out = Vec::new();
    let n = candles.len();
    if n == 0 {
        return out;
    }

    let first = candles[0].time_secs as f64;
    let last = candles[n - 1].time_secs as f64;

    let steps = time_tick_count(width);
    for i in 0..steps {
        let frac = i as f64 / (steps - 1).max(1) as f64;
        let ts = first + (last - first) * frac;
        out.push(AxisTick {
            pos: frac as f32,
            label: format_utc(ts as i64).into(),
        });
    }
    out
}

fn format_utc(ts_secs: i64) -> String {
    match DateTime::<Utc>::from_timestamp(ts_secs, 0) {
        Some(dt) => dt.format("%H:%M UTC").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle { time, open, high, low, close }
    }

    #[test]
    fn prepare_converts_ms_to_whole_seconds() {
        let prepared =
            prepare_candles(&[candle(1_700_000_000_000, 10.0, 12.0, 9.0, 11.0)]).unwrap();
        assert_eq!(prepared[0].time_secs, 1_700_000_000);
    }

    #[test]
    fn prepare_rejects_empty_and_malformed() {
        assert!(prepare_candles(&[]).is_none());
        assert!(prepare_candles(&[candle(0, 10.0, 9.0, 12.0, 11.0)]).is_none());
        assert!(prepare_candles(&[candle(0, f64::NAN, 12.0, 9.0, 11.0)]).is_none());
    }

    #[test]
    fn series_keeps_previous_data_on_bad_refresh() {
        let mut series = ChartSeries::default();
        assert!(series.replace(&[candle(1000, 10.0, 12.0, 9.0, 11.0)]));
        assert_eq!(series.candles().len(), 1);

        assert!(!series.replace(&[]));
        assert_eq!(series.candles().len(), 1, "empty refresh must not clear");

        assert!(!series.replace(&[candle(2000, 10.0, 9.0, 12.0, 11.0)]));
        assert_eq!(series.candles()[0].time_secs, 1);
    }

    #[test]
    fn points_are_normalized_and_directional() {
        let prepared = prepare_candles(&[
            candle(1000, 10.0, 12.0, 9.0, 11.0),
            candle(2000, 11.0, 11.5, 10.0, 10.2),
        ])
        .unwrap();
        let points = build_candle_points(&prepared);
        assert_eq!(points.len(), 2);
        assert!(points[0].is_up);
        assert!(!points[1].is_up);
        for p in &points {
            for v in [p.x, p.open, p.high, p.low, p.close] {
                assert!((0.0..=1.0).contains(&v));
            }
            // y axis is inverted: the high sits above the low
            assert!(p.high <= p.low);
        }
    }

    #[test]
    fn points_empty_for_no_data() {
        assert!(build_candle_points(&[]).is_empty());
    }

    #[test]
    fn tick_counts_follow_viewport() {
        assert_eq!(price_tick_count(0.0), 3);
        assert_eq!(price_tick_count(480.0), 9);
        assert_eq!(price_tick_count(10_000.0), 9);
        assert_eq!(time_tick_count(0.0), 2);
        assert_eq!(time_tick_count(770.0), 7);
    }

    #[test]
    fn price_ticks_span_hi_to_lo() {
        let prepared = prepare_candles(&[candle(1000, 10.0, 20.0, 10.0, 15.0)]).unwrap();
        let ticks = build_price_ticks(&prepared, 480.0);
        assert_eq!(ticks.len(), 9);
        assert_eq!(ticks.first().unwrap().label.as_str(), "20.00");
        assert_eq!(ticks.last().unwrap().label.as_str(), "10.00");
    }

    #[test]
    fn flat_series_ticks_are_skipped() {
        let prepared = prepare_candles(&[candle(1000, 10.0, 10.0, 10.0, 10.0)]).unwrap();
        assert!(build_price_ticks(&prepared, 480.0).is_empty());
        // geometry still renders
        assert_eq!(build_candle_points(&prepared).len(), 1);
    }
}
