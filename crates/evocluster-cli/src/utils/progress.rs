use evocluster::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const SPINNER_TICK_MS: u64 = 100;

/// Terminal rendering of search progress: a spinner per phase, a bar per task and one line for
/// every improvement of the best geometry.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: Arc<Mutex<ProgressBar>>,
    best: Arc<Mutex<Option<(u64, f64)>>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        bar.finish_and_clear();
        Self {
            bar: Arc::new(Mutex::new(bar)),
            best: Arc::new(Mutex::new(None)),
        }
    }

    /// Best geometry reported so far.
    pub fn best(&self) -> Option<(u64, f64)> {
        *self.best.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();
        let best = self.best.clone();

        Box::new(move |progress: Progress| {
            let bar = bar.lock().unwrap_or_else(PoisonError::into_inner);
            match progress {
                Progress::PhaseStart { name } => {
                    bar.reset();
                    bar.set_length(0);
                    bar.set_style(spinner_style());
                    bar.set_message(name);
                    bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                }
                Progress::PhaseFinish => {
                    bar.disable_steady_tick();
                    bar.finish_with_message("done");
                }
                Progress::TaskStart { total_steps } => {
                    bar.disable_steady_tick();
                    bar.reset();
                    bar.set_length(total_steps);
                    bar.set_style(bar_style());
                }
                Progress::TaskIncrement => bar.inc(1),
                Progress::TaskFinish => {
                    bar.set_position(bar.length().unwrap_or(0));
                    bar.finish();
                }
                Progress::NewBest { id, fitness } => {
                    *best.lock().unwrap_or_else(PoisonError::into_inner) = Some((id, fitness));
                    bar.println(format!("  new best: geometry {id} at {fitness:.6}"));
                }
                Progress::Message(msg) => bar.println(format!("  {msg}")),
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
