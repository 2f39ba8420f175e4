mod api;
mod chart;
mod debug_hooks;
mod format;
mod panels;
mod poll;
mod settings;

slint::include_modules!();

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context;
use slint::{ComponentHandle, SharedString, Timer, TimerMode};

use crate::chart::ChartAdapter;
use crate::panels::PanelRenderer;

const DRAIN_INTERVAL: Duration = Duration::from_millis(200);

fn main() -> anyhow::Result<()> {
    let cfg = settings::DashSettings::load_or_write_default();
    println!("[dash] starting; api base {}", cfg.api_base);

    let app = AppWindow::new().context("failed to create window")?;

    let chart = Rc::new(RefCell::new(ChartAdapter::new(app.as_weak())));
    ChartAdapter::observe_resize(&chart, &app);

    let panels = PanelRenderer::new(app.as_weak());

    let client = api::ApiClient::new(cfg.api_base.clone());
    let (tx, rx) = mpsc::channel();
    poll::spawn(client, cfg.periods(), tx).context("failed to spawn poller")?;

    // Drain poll results onto the UI thread and keep the header clock fresh.
    let drain_timer = Timer::default();
    {
        let chart = chart.clone();
        let app_weak = app.as_weak();
        drain_timer.start(TimerMode::Repeated, DRAIN_INTERVAL, move || {
            for event in rx.try_iter() {
                poll::apply_event(event, &mut chart.borrow_mut(), &panels);
            }
            if let Some(app) = app_weak.upgrade() {
                app.set_current_time(SharedString::from(format::clock_now()));
            }
        });
    }

    app.run().context("event loop failed")?;
    Ok(())
}
