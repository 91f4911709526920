//! Per-group detection loop
//!
//! Each enabled group runs this loop on its own thread with its own capture
//! source and template set. All cross-thread traffic goes through the
//! command/status channels and the shared running flag; nothing else is
//! shared, so one group can never stall its siblings.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::capture::{CaptureBackend, CaptureSource};
use crate::config::GroupConfig;
use crate::input::{Actuator, KeyboardBackend};
use crate::matching::TemplateSet;

use super::messages::{RunState, StatusEvent, WorkerCommand};

pub(crate) const FPS_REPORT_INTERVAL: Duration = Duration::from_millis(500);
pub(crate) const FPS_RESET_INTERVAL: Duration = Duration::from_secs(5);
pub(crate) const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Indicator color reported after a triggered action completes
const ACTIVE_COLOR: &str = "#00FF00";

/// Everything a worker needs, captured at spawn time.
///
/// The group configuration is a snapshot; edits made after spawn are not
/// observed until the worker is restarted.
pub struct WorkerContext {
    pub group: GroupConfig,
    pub images_dir: PathBuf,
    pub capture: Arc<dyn CaptureBackend>,
    pub keyboard: Arc<dyn KeyboardBackend>,
    pub commands: Receiver<WorkerCommand>,
    pub status: Sender<StatusEvent>,
    pub running: Arc<AtomicBool>,
}

/// Run one group's detection loop until the running flag goes false.
///
/// The flag is checked at the top of every iteration, so shutdown latency is
/// bounded by a single tick.
pub fn run_group_worker(ctx: WorkerContext) {
    let WorkerContext {
        group,
        images_dir,
        capture,
        keyboard,
        commands,
        status,
        running,
    } = ctx;

    let source = match capture.open_region(group.search_region) {
        Ok(source) => source,
        Err(e) => {
            log::error!("[{}] failed to open capture source: {e:#}", group.name);
            let _ = status.send(StatusEvent::Status {
                group_id: group.id.clone(),
                status: RunState::Stopped,
            });
            return;
        }
    };

    let templates = TemplateSet::load(&group.templates, &images_dir);
    log::info!(
        "[{}] worker started, {} active templates",
        group.name,
        templates.len()
    );

    let mut worker = GroupWorker {
        actuator: Actuator::new(keyboard),
        group,
        templates,
        source,
        status,
        last_spam: None,
    };

    worker.send_status(RunState::Ready);

    let mut search_running = false;
    let mut frame_count: u64 = 0;
    let mut fps_window_start = Instant::now();
    let mut last_fps_report = Instant::now();

    while running.load(Ordering::SeqCst) {
        // Commands are drained before the frame phase, so a toggle or stop
        // issued during tick n is honored no later than tick n's capture.
        while let Ok(command) = commands.try_recv() {
            match command {
                WorkerCommand::Toggle => {
                    search_running = !search_running;
                    worker.send_status(if search_running {
                        RunState::Running
                    } else {
                        RunState::Stopped
                    });
                    log::info!(
                        "[{}] {}",
                        worker.group.name,
                        if search_running { "started" } else { "stopped" }
                    );
                    frame_count = 0;
                    fps_window_start = Instant::now();
                }
                WorkerCommand::Stop => {
                    search_running = false;
                    worker.send_status(RunState::Stopped);
                }
            }
        }

        if search_running {
            worker.process_frame();
            frame_count += 1;

            let now = Instant::now();
            if now.duration_since(last_fps_report) >= FPS_REPORT_INTERVAL {
                let elapsed = now.duration_since(fps_window_start).as_secs_f64();
                let fps = if elapsed > 0.0 {
                    frame_count as f64 / elapsed
                } else {
                    0.0
                };
                worker.send(StatusEvent::Fps {
                    group_id: worker.group.id.clone(),
                    fps: (fps * 10.0).round() / 10.0,
                    name: worker.group.name.clone(),
                });
                last_fps_report = now;

                // Reset the window periodically so the average stays live
                if elapsed >= FPS_RESET_INTERVAL.as_secs_f64() {
                    frame_count = 0;
                    fps_window_start = now;
                }
            }
        } else {
            thread::sleep(IDLE_SLEEP);
        }
    }

    log::info!("[{}] worker stopped", worker.group.name);
}

struct GroupWorker {
    group: GroupConfig,
    templates: TemplateSet,
    source: Box<dyn CaptureSource>,
    actuator: Actuator,
    status: Sender<StatusEvent>,
    last_spam: Option<Instant>,
}

impl GroupWorker {
    fn send(&self, event: StatusEvent) {
        // The coordinator may already be gone during shutdown
        let _ = self.status.send(event);
    }

    fn send_status(&self, status: RunState) {
        self.send(StatusEvent::Status {
            group_id: self.group.id.clone(),
            status,
        });
    }

    /// One capture-and-match pass. Errors are logged and the tick skipped;
    /// they never terminate the worker.
    fn process_frame(&mut self) {
        if self.templates.is_empty() {
            self.press_spam_key();
            return;
        }

        let frame_start = Instant::now();

        let frame = match self.source.capture() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("[{}] screen capture error: {e:#}", self.group.name);
                return;
            }
        };

        let hit = self.templates.find_trigger(&frame);
        let elapsed_ms = frame_start.elapsed().as_secs_f64() * 1000.0;

        let Some(template) = hit else {
            self.press_spam_key();
            return;
        };

        // Flash the template color, run the action, then reset the
        // indicator; the gap between the two events reflects real latency.
        self.send(StatusEvent::Match {
            group_id: self.group.id.clone(),
            color: template.config.color.clone(),
            template: Some(template.config.name.clone()),
            time_ms: Some((elapsed_ms * 100.0).round() / 100.0),
        });

        let result = if template.config.use_macro && !template.config.macro_actions.is_empty() {
            self.actuator.execute_macro(&template.config.macro_actions)
        } else {
            self.actuator
                .press_combo(&template.config.key_combo, &template.config.timing)
        };
        if let Err(e) = result {
            // The action may have been left half-executed; the next tick
            // proceeds regardless.
            log::error!(
                "[{}] action failed for template '{}': {e}",
                self.group.name,
                template.config.name
            );
        }

        self.send(StatusEvent::Match {
            group_id: self.group.id.clone(),
            color: ACTIVE_COLOR.to_string(),
            template: None,
            time_ms: None,
        });
    }

    /// Press the idle key if configured, at most once per interval
    fn press_spam_key(&mut self) {
        if !self.group.spam_enabled {
            return;
        }
        let Some(key) = self.group.spam_key.clone() else {
            return;
        };

        let due = self
            .last_spam
            .map_or(true, |last| {
                last.elapsed().as_secs_f64() >= self.group.spam_key_interval
            });
        if !due {
            return;
        }

        if let Err(e) = self.actuator.press_with_timing(&key, &self.group.spam_timing) {
            log::error!("[{}] spam key press failed: {e}", self.group.name);
        }
        self.last_spam = Some(Instant::now());
    }
}
