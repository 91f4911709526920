//! Worker lifecycle management and message routing
//!
//! The coordinator owns every per-group resource explicitly: command sender,
//! running flag and join handle, keyed by group id. Startup is all-or-nothing
//! behind an aggregated validation pass; teardown is a courtesy flag flip
//! with a bounded grace period.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::capture::CaptureBackend;
use crate::config::GroupConfig;
use crate::error::{EngineError, Result, ValidationIssue, ValidationReport};
use crate::hotkeys::HotkeyBindings;
use crate::input::KeyboardBackend;
use crate::worker::{run_group_worker, StatusEvent, WorkerCommand, WorkerContext};

/// How long `stop` waits for workers to exit before detaching them
const STOP_GRACE: Duration = Duration::from_secs(1);

struct WorkerHandle {
    name: String,
    commands: Sender<WorkerCommand>,
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Spawns, routes to and tears down one worker per enabled group.
pub struct Coordinator {
    capture: Arc<dyn CaptureBackend>,
    keyboard: Arc<dyn KeyboardBackend>,
    images_dir: PathBuf,
    workers: HashMap<String, WorkerHandle>,
    status_rx: Option<Receiver<StatusEvent>>,
    bindings: Arc<HotkeyBindings>,
}

impl Coordinator {
    pub fn new(
        capture: Arc<dyn CaptureBackend>,
        keyboard: Arc<dyn KeyboardBackend>,
        images_dir: PathBuf,
    ) -> Self {
        Self {
            capture,
            keyboard,
            images_dir,
            workers: HashMap::new(),
            status_rx: None,
            bindings: Arc::new(HotkeyBindings::new()),
        }
    }

    /// The hotkey binding table, for wiring up a listener
    pub fn bindings(&self) -> Arc<HotkeyBindings> {
        self.bindings.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Whether a group's worker thread is still alive.
    ///
    /// A dead worker is only ever detected indirectly; no restart is
    /// attempted.
    pub fn worker_alive(&self, group_id: &str) -> bool {
        self.workers
            .get(group_id)
            .map(|h| !h.thread.is_finished())
            .unwrap_or(false)
    }

    /// Ids of all groups with a registered worker
    pub fn active_groups(&self) -> Vec<String> {
        self.workers.keys().cloned().collect()
    }

    /// Validate and spawn one worker per enabled group.
    ///
    /// Any precondition violation aborts the whole start with every
    /// violation reported at once and zero workers spawned.
    pub fn start(&mut self, groups: &[GroupConfig]) -> Result<()> {
        if !self.workers.is_empty() {
            return Err(EngineError::AlreadyRunning);
        }

        let report = validate(groups, &self.images_dir);
        if !report.is_empty() {
            return Err(EngineError::Validation(report));
        }

        let (status_tx, status_rx) = unbounded();

        for group in groups.iter().filter(|g| g.enabled) {
            let (command_tx, command_rx) = unbounded();
            let running = Arc::new(AtomicBool::new(true));

            let context = WorkerContext {
                group: group.clone(),
                images_dir: self.images_dir.clone(),
                capture: self.capture.clone(),
                keyboard: self.keyboard.clone(),
                commands: command_rx,
                status: status_tx.clone(),
                running: running.clone(),
            };

            let thread = thread::Builder::new()
                .name(format!("group-worker-{}", group.name))
                .spawn(move || run_group_worker(context))?;

            self.workers.insert(
                group.id.clone(),
                WorkerHandle {
                    name: group.name.clone(),
                    commands: command_tx,
                    running,
                    thread,
                },
            );

            if !group.toggle_key.is_empty() {
                self.bindings.bind(&group.toggle_key, &group.id);
            }
        }

        self.status_rx = Some(status_rx);
        log::info!("{} workers started", self.workers.len());
        Ok(())
    }

    /// Signal every worker to exit, wait briefly, then detach stragglers.
    ///
    /// Threads cannot be terminated from outside; a worker that ignores the
    /// flag past the grace period is detached and logged. Shutdown latency
    /// for healthy workers is bounded by one tick.
    pub fn stop(&mut self) {
        for handle in self.workers.values() {
            handle.running.store(false, Ordering::SeqCst);
        }

        let deadline = Instant::now() + STOP_GRACE;
        for (_, handle) in self.workers.drain() {
            while !handle.thread.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.thread.is_finished() {
                let _ = handle.thread.join();
            } else {
                log::warn!(
                    "worker '{}' did not exit within the grace period, detaching",
                    handle.name
                );
            }
        }

        self.status_rx = None;
        self.bindings.clear();
        log::info!("all workers stopped");
    }

    /// Forward a command to one group's worker.
    ///
    /// A no-op when the group has no live channel, which covers hotkey
    /// events arriving after `stop`.
    pub fn route(&self, group_id: &str, command: WorkerCommand) {
        match self.workers.get(group_id) {
            Some(handle) => {
                // Fire and forget; a worker that already exited simply never
                // consumes the message.
                let _ = handle.commands.send(command);
            }
            None => log::debug!("dropped {command:?} for inactive group {group_id}"),
        }
    }

    /// Toggle one group's run state
    pub fn toggle(&self, group_id: &str) {
        self.route(group_id, WorkerCommand::Toggle);
    }

    /// Drain everything currently queued on the status channel without
    /// blocking. Callers dispatch the returned events by variant.
    pub fn poll_status(&self) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        if let Some(rx) = &self.status_rx {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        events
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Collect every startup violation across the group list
fn validate(groups: &[GroupConfig], images_dir: &std::path::Path) -> ValidationReport {
    let mut report = ValidationReport::new();

    let enabled: Vec<&GroupConfig> = groups.iter().filter(|g| g.enabled).collect();
    if enabled.is_empty() {
        report.push(ValidationIssue::NoEnabledGroups);
        return report;
    }

    // Toggle-key collisions, first-seen key order
    let mut keys: Vec<(String, Vec<String>)> = Vec::new();
    for group in &enabled {
        let key = group.toggle_key.to_lowercase();
        if key.is_empty() {
            continue;
        }
        match keys.iter_mut().find(|(k, _)| *k == key) {
            Some((_, names)) => names.push(group.name.clone()),
            None => keys.push((key, vec![group.name.clone()])),
        }
    }
    for (key, names) in keys {
        if names.len() > 1 {
            report.push(ValidationIssue::HotkeyCollision { key, groups: names });
        }
    }

    // Every enabled template of an enabled group needs its image on disk
    for group in &enabled {
        for template in group.templates.iter().filter(|t| t.enabled) {
            let missing =
                template.file.is_empty() || !images_dir.join(&template.file).exists();
            if missing {
                report.push(ValidationIssue::MissingTemplateImage {
                    group: group.name.clone(),
                    template: template.name.clone(),
                    file: template.file.clone(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ScriptedCapture;
    use crate::config::{Region, TemplateConfig};
    use crate::input::RecordingKeyboard;

    fn group(id: &str, name: &str, toggle_key: &str) -> GroupConfig {
        GroupConfig {
            id: id.to_string(),
            name: name.to_string(),
            enabled: true,
            toggle_key: toggle_key.to_string(),
            search_region: Region::new(0, 0, 32, 32).unwrap(),
            spam_enabled: false,
            spam_key: None,
            spam_timing: Default::default(),
            spam_key_interval: 0.025,
            notes: String::new(),
            templates: Vec::new(),
        }
    }

    fn template(name: &str, file: &str) -> TemplateConfig {
        TemplateConfig {
            name: name.to_string(),
            file: file.to_string(),
            enabled: true,
            threshold: 0.9,
            key_combo: "e".to_string(),
            color: "#ff0000".to_string(),
            timing: Default::default(),
            trigger_condition: Default::default(),
            use_macro: false,
            macro_actions: Vec::new(),
        }
    }

    fn coordinator(images_dir: PathBuf) -> Coordinator {
        Coordinator::new(
            Arc::new(ScriptedCapture::default()),
            Arc::new(RecordingKeyboard::new()),
            images_dir,
        )
    }

    #[test]
    fn test_hotkey_collision_reports_both_groups_and_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut coordinator = coordinator(dir.path().to_path_buf());

        let groups = vec![group("a", "Alpha", "f1"), group("b", "Beta", "F1")];
        let err = coordinator.start(&groups).unwrap_err();

        let text = err.to_string();
        assert!(text.contains("Alpha"), "missing first group: {text}");
        assert!(text.contains("Beta"), "missing second group: {text}");
        assert!(text.contains("f1"));
        assert!(!coordinator.is_running());
        assert!(coordinator.poll_status().is_empty());
    }

    #[test]
    fn test_missing_images_and_collisions_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let mut coordinator = coordinator(dir.path().to_path_buf());

        let mut a = group("a", "Alpha", "f1");
        a.templates.push(template("bite", "missing.png"));
        let b = group("b", "Beta", "f1");

        let err = coordinator.start(&[a, b]).unwrap_err();
        match err {
            EngineError::Validation(report) => {
                assert_eq!(report.len(), 2);
                let text = report.to_string();
                assert!(text.contains("missing.png"));
                assert!(text.contains("f1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_start_requires_an_enabled_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut coordinator = coordinator(dir.path().to_path_buf());

        let mut disabled = group("a", "Alpha", "f1");
        disabled.enabled = false;

        for groups in [Vec::new(), vec![disabled]] {
            let err = coordinator.start(&groups).unwrap_err();
            assert!(err.to_string().contains("no enabled groups"));
        }
    }

    #[test]
    fn test_disabled_groups_are_exempt_from_validation() {
        let dir = tempfile::tempdir().unwrap();

        // Beta shares the key and misses an image, but is disabled
        let a = group("a", "Alpha", "f1");
        let mut b = group("b", "Beta", "f1");
        b.enabled = false;
        b.templates.push(template("bite", "missing.png"));

        let report = validate(&[a, b], dir.path());
        assert!(report.is_empty());
    }

    #[test]
    fn test_route_without_workers_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path().to_path_buf());
        coordinator.route("ghost", WorkerCommand::Toggle);
        assert!(coordinator.poll_status().is_empty());
    }
}
