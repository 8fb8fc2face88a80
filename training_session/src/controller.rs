use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use error_printer::ErrorPrinter;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use trainer_client::{RemoteClient, TrainerApi};
use trainer_config::{TrainerConfig, UploadMode};
use trainer_types::{Machine, MachineRef, MachineSummary, NewMachine};

use crate::config::SessionConfig;
use crate::errors::{Result, TrainingSessionError};
use crate::inference::invoke_inference;
use crate::observer::StateObserver;
use crate::poller::{PollEvent, PollRegistry, PollTicket, run_poll_cycle};
use crate::source::SourceFile;
use crate::state::{MachineState, PollState, StateEvent};
use crate::strategy::{UploadOutcome, UploadStrategy, strategy_for};

const MIB: u64 = 1024 * 1024;

/// Owns the per-machine state and drives uploads, status polling and inference.
///
/// # Cloning
///
/// Cloning is cheap; all clones share the same state, poll cycles and observer.
///
/// # Shutdown
///
/// [`shutdown`](Self::shutdown) cancels every poll cycle and in-flight upload.  After it
/// returns no state change is reported anymore and every operation fails with
/// [`TrainingSessionError::ShutDown`].
#[derive(Clone)]
pub struct TrainingController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    api: Arc<dyn TrainerApi>,
    config: SessionConfig,
    strategy: Arc<dyn UploadStrategy>,
    observer: Arc<dyn StateObserver>,
    root: CancellationToken,
    shared: Mutex<Shared>,
    // Bumped whenever a poll cycle ends.
    poll_finished: watch::Sender<u64>,
}

struct Shared {
    machines: Vec<Machine>,
    states: HashMap<String, MachineState>,
    polls: PollRegistry,
}

impl ControllerInner {
    /// Applies `event` and notifies the observer.  Must be called with the lock held.
    fn apply_locked(&self, shared: &mut Shared, machine_id: &str, event: StateEvent) -> bool {
        if self.root.is_cancelled() {
            return false;
        }
        match shared.states.get_mut(machine_id) {
            Some(state) => {
                state.apply(event);
                self.observer.on_state_change(machine_id, state);
                true
            },
            None => false,
        }
    }

    fn update(&self, machine_id: &str, event: StateEvent) -> bool {
        let mut shared = self.shared.lock();
        self.apply_locked(&mut shared, machine_id, event)
    }

    fn apply_poll_event(&self, ticket: &PollTicket, event: PollEvent) -> bool {
        let mut shared = self.shared.lock();
        if !shared.polls.is_current(ticket) {
            return false;
        }
        let terminal = event.is_terminal();
        let applied = self.apply_locked(&mut shared, ticket.machine_id(), StateEvent::Poll(event));
        if terminal {
            shared.polls.finish(ticket);
        }
        applied
    }

    fn finish_poll(&self, ticket: &PollTicket) {
        self.shared.lock().polls.finish(ticket);
        self.poll_finished.send_modify(|n| *n += 1);
    }

    fn ensure_running(&self) -> Result<()> {
        if self.root.is_cancelled() {
            return Err(TrainingSessionError::ShutDown);
        }
        Ok(())
    }
}

impl TrainingController {
    pub fn new(api: Arc<dyn TrainerApi>, config: SessionConfig, observer: Arc<dyn StateObserver>) -> Self {
        let root = CancellationToken::new();
        let (poll_finished, _) = watch::channel(0);
        Self {
            inner: Arc::new(ControllerInner {
                api,
                strategy: strategy_for(&config),
                config,
                observer,
                shared: Mutex::new(Shared {
                    machines: Vec::new(),
                    states: HashMap::new(),
                    polls: PollRegistry::new(root.clone()),
                }),
                root,
                poll_finished,
            }),
        }
    }

    /// A controller talking to the backend configured in `config.client`.
    pub fn from_trainer_config(config: &TrainerConfig, observer: Arc<dyn StateObserver>) -> Result<Self> {
        let session_config = SessionConfig::from_config(config)?;
        let api = Arc::new(RemoteClient::new(&config.client)?);
        Ok(Self::new(api, session_config, observer))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn upload_mode(&self) -> UploadMode {
        self.inner.strategy.mode()
    }

    // ===== Machine registry =====

    /// Fetches the machine list and seeds each new machine's model from the registry.
    ///
    /// Machines that are still listed keep their state; state of machines that disappeared
    /// is dropped and their polling stopped.
    pub async fn load_machines(&self) -> Result<Vec<Machine>> {
        self.inner.ensure_running()?;
        let machines = self.inner.api.list_machines().await.log_error("failed to load machines")?;

        let mut shared = self.inner.shared.lock();
        self.inner.ensure_running()?;

        let mut states = HashMap::with_capacity(machines.len());
        for machine in &machines {
            let state = match shared.states.remove(&machine.id) {
                Some(mut existing) => {
                    if existing.model_id.is_none()
                        && let Some(model_id) = machine.latest_model_id.as_deref().filter(|m| !m.is_empty())
                    {
                        existing.apply(StateEvent::Seeded {
                            model_id: model_id.to_string(),
                            status: machine.latest_model_status.clone(),
                        });
                    }
                    existing
                },
                None => MachineState::seeded(machine.latest_model_id.as_deref(), machine.latest_model_status.as_deref()),
            };
            states.insert(machine.id.clone(), state);
        }

        let stale: Vec<String> = shared.states.keys().cloned().collect();
        for machine_id in &stale {
            shared.polls.cancel_machine(machine_id);
        }
        shared.states = states;
        shared.machines = machines.clone();

        for machine in &machines {
            if let Some(state) = shared.states.get(&machine.id) {
                self.inner.observer.on_state_change(&machine.id, state);
            }
        }
        info!(count = machines.len(), "loaded machines");
        Ok(machines)
    }

    pub fn machines(&self) -> Vec<Machine> {
        self.inner.shared.lock().machines.clone()
    }

    /// Looks a loaded machine up by id, then by name.
    pub fn find_machine(&self, key: &str) -> Option<Machine> {
        let key = key.trim();
        let shared = self.inner.shared.lock();
        shared
            .machines
            .iter()
            .find(|m| m.id == key)
            .or_else(|| shared.machines.iter().find(|m| m.name == key))
            .cloned()
    }

    pub async fn add_machine(&self, name: &str, image_url: Option<&str>) -> Result<Machine> {
        self.inner.ensure_running()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(TrainingSessionError::InvalidMachineName);
        }
        let request = NewMachine {
            name: name.to_string(),
            image_url: image_url.map(str::trim).filter(|u| !u.is_empty()).map(str::to_string),
        };

        let machine = self
            .inner
            .api
            .create_machine(&request)
            .await
            .log_error(format!("failed to add machine {name:?}"))?;

        let mut shared = self.inner.shared.lock();
        self.inner.ensure_running()?;
        shared.machines.push(machine.clone());
        shared.states.insert(machine.id.clone(), MachineState::default());
        if let Some(state) = shared.states.get(&machine.id) {
            self.inner.observer.on_state_change(&machine.id, state);
        }
        info!(id = %machine.id, name = %machine.name, "added machine");
        Ok(machine)
    }

    pub async fn delete_machine(&self, machine_id: &str) -> Result<()> {
        self.inner.ensure_running()?;
        if !self.inner.update(machine_id, StateEvent::DeleteStarted) {
            self.inner.ensure_running()?;
            return Err(TrainingSessionError::UnknownMachine(machine_id.to_string()));
        }

        let result = self
            .inner
            .api
            .delete_machine(machine_id)
            .await
            .log_error(format!("failed to delete machine {machine_id}"));

        let mut shared = self.inner.shared.lock();
        match result {
            Ok(()) => {
                shared.polls.cancel_machine(machine_id);
                shared.machines.retain(|m| m.id != machine_id);
                shared.states.remove(machine_id);
                drop(shared);
                self.inner.poll_finished.send_modify(|n| *n += 1);
                info!(machine_id, "deleted machine");
                Ok(())
            },
            Err(e) => {
                self.inner.apply_locked(&mut shared, machine_id, StateEvent::DeleteFinished);
                Err(e.into())
            },
        }
    }

    // ===== Upload =====

    /// Selects (or with `None` clears) the training file of a machine.
    ///
    /// Files over the size limit or without content are rejected and leave no file selected.
    pub fn select_file(&self, machine_id: &str, file: Option<SourceFile>) -> Result<()> {
        self.inner.ensure_running()?;
        let mut shared = self.inner.shared.lock();
        if !shared.states.contains_key(machine_id) {
            return Err(TrainingSessionError::UnknownMachine(machine_id.to_string()));
        }

        let Some(file) = file else {
            self.inner.apply_locked(&mut shared, machine_id, StateEvent::FileCleared);
            return Ok(());
        };

        match file.check_uploadable(self.inner.config.max_file_size) {
            Ok(()) => {
                debug!(machine_id, file = file.name(), size = file.size(), "file selected");
                self.inner.apply_locked(&mut shared, machine_id, StateEvent::FileSelected(file));
                Ok(())
            },
            Err(e) => {
                let message = match &e {
                    TrainingSessionError::FileTooLarge { limit, .. } => describe_size_limit(*limit),
                    other => other.to_string(),
                };
                self.inner.apply_locked(&mut shared, machine_id, StateEvent::FileRejected { message });
                Err(e)
            },
        }
    }

    pub async fn select_path(&self, machine_id: &str, path: impl AsRef<Path>) -> Result<()> {
        let file = SourceFile::from_path(path).await?;
        self.select_file(machine_id, Some(file))
    }

    /// Uploads the selected file with the configured strategy and starts polling the
    /// resulting training job.
    pub async fn start_upload(&self, machine_id: &str) -> Result<UploadOutcome> {
        self.inner.ensure_running()?;
        let file = {
            let mut shared = self.inner.shared.lock();
            let state = shared
                .states
                .get(machine_id)
                .ok_or_else(|| TrainingSessionError::UnknownMachine(machine_id.to_string()))?;
            if state.uploading {
                return Err(TrainingSessionError::UploadInProgress(machine_id.to_string()));
            }
            let Some(file) = state.file.clone() else {
                self.inner.apply_locked(&mut shared, machine_id, StateEvent::FileMissing);
                return Err(TrainingSessionError::NoFileSelected);
            };
            if let Err(e) = file.check_uploadable(self.inner.config.max_file_size) {
                self.inner
                    .apply_locked(&mut shared, machine_id, StateEvent::UploadFailed { message: e.to_string() });
                return Err(e);
            }
            self.inner.apply_locked(&mut shared, machine_id, StateEvent::UploadStarted);
            file
        };

        let target = MachineRef::Id(machine_id.to_string());
        let progress = |percent: u8| {
            self.inner.update(machine_id, StateEvent::UploadProgress(percent));
        };

        let result = tokio::select! {
            biased;
            _ = self.inner.root.cancelled() => Err(TrainingSessionError::ShutDown),
            result = self.inner.strategy.upload(self.inner.api.as_ref(), &target, &file, &progress) => result,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.inner
                    .update(machine_id, StateEvent::UploadFailed { message: e.to_string() });
                return Err(e).warn_error(format!("upload for machine {machine_id} failed"));
            },
        };

        info!(machine_id, tracking_id = %outcome.tracking_id, requests = outcome.requests, "upload complete");
        self.inner.update(
            machine_id,
            StateEvent::TrainingStarted {
                tracking_id: outcome.tracking_id.clone(),
                model_id: outcome.model_id.clone(),
            },
        );
        self.start_polling(machine_id, &outcome.tracking_id)?;
        self.inner.update(
            machine_id,
            StateEvent::UploadFinished {
                upload_id: outcome.upload_id.clone(),
            },
        );
        Ok(outcome)
    }

    // ===== Status polling =====

    /// Starts a poll cycle for `tracking_id`, replacing any cycle for the same tracking id
    /// or the same machine.
    pub fn start_polling(&self, machine_id: &str, tracking_id: &str) -> Result<()> {
        self.inner.ensure_running()?;
        let tracking_id = tracking_id.trim();
        if tracking_id.is_empty() {
            return Err(TrainingSessionError::MissingTrackingId);
        }

        let ticket = {
            let mut shared = self.inner.shared.lock();
            self.inner.ensure_running()?;
            if !shared.states.contains_key(machine_id) {
                return Err(TrainingSessionError::UnknownMachine(machine_id.to_string()));
            }
            let ticket = shared.polls.begin(machine_id, tracking_id);
            self.inner.apply_locked(
                &mut shared,
                machine_id,
                StateEvent::PollingStarted {
                    tracking_id: tracking_id.to_string(),
                },
            );
            ticket
        };
        debug!(machine_id, tracking_id, "poll cycle started");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let apply = |event: PollEvent| inner.apply_poll_event(&ticket, event);
            let outcome = run_poll_cycle(
                inner.api.as_ref(),
                ticket.tracking_id(),
                inner.config.poll_interval,
                ticket.token(),
                &apply,
            )
            .await;
            inner.finish_poll(&ticket);
            outcome
        });
        Ok(())
    }

    /// Stops the machine's poll cycle, if any.  Returns whether one was running.
    pub fn cancel_polling(&self, machine_id: &str) -> bool {
        let cancelled = {
            let mut shared = self.inner.shared.lock();
            let cancelled = shared.polls.cancel_machine(machine_id);
            if cancelled {
                self.inner.apply_locked(&mut shared, machine_id, StateEvent::PollingCancelled);
            }
            cancelled
        };
        if cancelled {
            self.inner.poll_finished.send_modify(|n| *n += 1);
        }
        cancelled
    }

    /// Waits until the machine has no active poll cycle and returns its final state.
    ///
    /// A failed training job or a halted poll cycle is returned as the matching error.
    pub async fn wait_for_polling(&self, machine_id: &str) -> Result<MachineState> {
        let mut finished = self.inner.poll_finished.subscribe();
        loop {
            {
                let shared = self.inner.shared.lock();
                let state = shared
                    .states
                    .get(machine_id)
                    .ok_or_else(|| TrainingSessionError::UnknownMachine(machine_id.to_string()))?;
                if !shared.polls.is_machine_active(machine_id) {
                    let error = state.error.clone().unwrap_or_default();
                    return match state.poll_state {
                        PollState::Failed => Err(TrainingSessionError::TrainingFailed(error)),
                        PollState::Halted => Err(TrainingSessionError::PollingFailed(error)),
                        _ => Ok(state.clone()),
                    };
                }
            }

            tokio::select! {
                _ = self.inner.root.cancelled() => return Err(TrainingSessionError::ShutDown),
                changed = finished.changed() => {
                    if changed.is_err() {
                        return Err(TrainingSessionError::ShutDown);
                    }
                },
            }
        }
    }

    // ===== Inference =====

    pub fn set_inference_input(&self, machine_id: &str, input: &str) -> Result<()> {
        self.inner.ensure_running()?;
        if !self.inner.update(machine_id, StateEvent::InferenceInputChanged(input.to_string())) {
            return Err(TrainingSessionError::UnknownMachine(machine_id.to_string()));
        }
        Ok(())
    }

    pub async fn run_inference(&self, machine_id: &str) -> Result<Value> {
        self.inner.ensure_running()?;
        let (model_id, payload) = {
            let mut shared = self.inner.shared.lock();
            let state = shared
                .states
                .get(machine_id)
                .ok_or_else(|| TrainingSessionError::UnknownMachine(machine_id.to_string()))?;
            let (model_id, payload) = (state.model_id.clone(), state.inference_input.clone());
            if model_id.is_none() {
                let message = TrainingSessionError::NoModelAvailable.to_string();
                self.inner
                    .apply_locked(&mut shared, machine_id, StateEvent::InferenceFailed(message));
                return Err(TrainingSessionError::NoModelAvailable);
            }
            self.inner.apply_locked(&mut shared, machine_id, StateEvent::InferenceStarted);
            (model_id, payload)
        };

        let target = MachineRef::Id(machine_id.to_string());
        let result = tokio::select! {
            biased;
            _ = self.inner.root.cancelled() => return Err(TrainingSessionError::ShutDown),
            result = invoke_inference(self.inner.api.as_ref(), &target, model_id.as_deref(), &payload) => result,
        };

        match result {
            Ok(value) => {
                self.inner.update(machine_id, StateEvent::InferenceSucceeded(value.clone()));
                Ok(value)
            },
            Err(e) => {
                self.inner.update(machine_id, StateEvent::InferenceFailed(e.to_string()));
                Err(e)
            },
        }
    }

    // ===== Dashboard =====

    pub async fn dashboard(&self) -> Result<Vec<MachineSummary>> {
        self.inner.ensure_running()?;
        Ok(self
            .inner
            .api
            .machines_data()
            .await
            .log_error("failed to load machines data")?)
    }

    /// Starts or stops the inference gateway of the machine with the given name.
    pub async fn toggle_inference(&self, name: &str, enable: bool) -> Result<()> {
        self.inner.ensure_running()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(TrainingSessionError::InvalidMachineName);
        }
        self.inner.api.set_inference_gateway(name, enable).await?;
        info!(name, enable, "toggled inference gateway");
        Ok(())
    }

    // ===== Snapshots and teardown =====

    pub fn snapshot(&self, machine_id: &str) -> Option<MachineState> {
        self.inner.shared.lock().states.get(machine_id).cloned()
    }

    pub fn snapshots(&self) -> Vec<(Machine, MachineState)> {
        let shared = self.inner.shared.lock();
        shared
            .machines
            .iter()
            .map(|m| (m.clone(), shared.states.get(&m.id).cloned().unwrap_or_default()))
            .collect()
    }

    pub fn is_polling(&self, machine_id: &str) -> bool {
        self.inner.shared.lock().polls.is_machine_active(machine_id)
    }

    pub fn shutdown(&self) {
        let cancelled = {
            let mut shared = self.inner.shared.lock();
            self.inner.root.cancel();
            shared.polls.cancel_all()
        };
        self.inner.poll_finished.send_modify(|n| *n += 1);
        info!(cancelled_polls = cancelled, "training controller shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.root.is_cancelled()
    }
}

fn describe_size_limit(limit: u64) -> String {
    if limit % MIB == 0 {
        format!("File exceeds {} MB limit.", limit / MIB)
    } else {
        format!("File exceeds {} limit.", utils::ByteSize::new(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_messages() {
        assert_eq!(describe_size_limit(25 * MIB), "File exceeds 25 MB limit.");
        assert_eq!(describe_size_limit(1536), "File exceeds 1536 bytes limit.");
    }
}
