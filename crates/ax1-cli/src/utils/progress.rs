use ax1::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;
/// Resolution of the transient bar; simulated time is mapped onto `0..=TRANSIENT_STEPS`.
const TRANSIENT_STEPS: u64 = 1000;

struct BarState {
    pb: ProgressBar,
    t_end: f64,
}

#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(BarState { pb, t_end: 0.0 })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = self.state.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut guard) = state.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    guard.pb.reset();
                    guard.pb.set_length(0);
                    guard.pb.set_style(Self::spinner_style());
                    guard
                        .pb
                        .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    guard.pb.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    guard.pb.disable_steady_tick();
                    guard.pb.finish_with_message("✓ Done");
                }
                Progress::TaskStart { total_steps } => {
                    guard.pb.disable_steady_tick();
                    guard.pb.reset();
                    guard.pb.set_length(total_steps);
                    guard.pb.set_position(0);
                    guard.pb.set_style(Self::bar_style());
                }
                Progress::TaskIncrement => {
                    guard.pb.inc(1);
                }
                Progress::TaskFinish => {
                    let length = guard.pb.length().unwrap_or(0);
                    if guard.pb.position() < length {
                        guard.pb.set_position(length);
                    }
                    guard.pb.finish();
                }
                Progress::TransientStart { t_end } => {
                    guard.t_end = t_end;
                    guard.pb.disable_steady_tick();
                    guard.pb.reset();
                    guard.pb.set_length(TRANSIENT_STEPS);
                    guard.pb.set_position(0);
                    guard.pb.set_style(Self::transient_style());
                    guard.pb.set_message("t = 0.000 μs");
                }
                Progress::CycleFinished {
                    cycle,
                    time,
                    eigenvalue,
                } => {
                    let position = transient_position(time, guard.t_end);
                    guard.pb.set_position(position);
                    guard.pb.set_message(format!(
                        "cycle {cycle}, t = {time:.3} μs, eigenvalue {eigenvalue:.6}"
                    ));
                }
                Progress::Message(msg) => {
                    if !guard.pb.is_finished() {
                        guard.pb.println(format!("  {}", msg));
                    } else {
                        guard.pb.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }

    fn transient_style() -> ProgressStyle {
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.green/white}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn transient_position(time: f64, t_end: f64) -> u64 {
    if !(t_end.is_finite() && t_end > 0.0 && time.is_finite()) {
        return 0;
    }
    let fraction = (time / t_end).clamp(0.0, 1.0);
    (fraction * TRANSIENT_STEPS as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let guard = handler.state.lock().unwrap();
        assert_eq!(guard.pb.length(), Some(0));
        assert!(guard.pb.is_finished());
    }

    #[test]
    fn callback_updates_task_bar_state() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Critical Geometry Search",
        });
        {
            let guard = handler.state.lock().unwrap();
            assert_eq!(guard.pb.message(), "Critical Geometry Search");
            assert!(!guard.pb.is_finished());
        }

        callback(Progress::TaskStart { total_steps: 30 });
        callback(Progress::TaskIncrement);
        {
            let guard = handler.state.lock().unwrap();
            assert_eq!(guard.pb.length(), Some(30));
            assert_eq!(guard.pb.position(), 1);
        }

        callback(Progress::TaskFinish);
        {
            let guard = handler.state.lock().unwrap();
            assert!(guard.pb.is_finished());
            assert_eq!(guard.pb.position(), 30);
        }

        callback(Progress::PhaseFinish);
        let guard = handler.state.lock().unwrap();
        assert_eq!(guard.pb.message(), "✓ Done");
    }

    #[test]
    fn cycle_events_advance_transient_bar_by_simulated_time() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::TransientStart { t_end: 200.0 });
        callback(Progress::CycleFinished {
            cycle: 7,
            time: 50.0,
            eigenvalue: 0.0125,
        });
        {
            let guard = handler.state.lock().unwrap();
            assert_eq!(guard.pb.length(), Some(TRANSIENT_STEPS));
            assert_eq!(guard.pb.position(), 250);
            assert!(guard.pb.message().contains("cycle 7"));
        }

        callback(Progress::CycleFinished {
            cycle: 8,
            time: 250.0,
            eigenvalue: 0.0,
        });
        let guard = handler.state.lock().unwrap();
        assert_eq!(guard.pb.position(), TRANSIENT_STEPS);
    }

    #[test]
    fn transient_position_handles_degenerate_end_time() {
        assert_eq!(transient_position(10.0, 0.0), 0);
        assert_eq!(transient_position(f64::NAN, 100.0), 0);
        assert_eq!(transient_position(-5.0, 100.0), 0);
        assert_eq!(transient_position(100.0, 100.0), TRANSIENT_STEPS);
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                name: "Thread Test",
            });
            callback(Progress::TaskIncrement);
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let guard = handler.state.lock().unwrap();
        assert!(guard.pb.is_finished());
        assert_eq!(guard.pb.message(), "✓ Done");
    }
}
