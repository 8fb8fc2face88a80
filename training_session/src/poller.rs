use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trainer_client::TrainerApi;
use trainer_types::{TrainingStatus, TrainingStatusResponse};

/// What one status response means for the machine's state.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// The job is still in progress; another poll follows.
    Progress { status: TrainingStatus, progress: Option<u8> },
    Completed {
        result: Value,
        model_id: Option<String>,
        progress: Option<u8>,
    },
    Failed { error: String },
    /// The status could not be fetched; polling stops until restarted.
    Halted { error: String },
}

impl PollEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollEvent::Progress { .. })
    }
}

/// How a poll cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    Halted,
    /// Superseded by a newer cycle or torn down.  No final state was reported.
    Cancelled,
}

/// The transition function of the polling state machine.
pub fn next_event(response: &TrainingStatusResponse) -> PollEvent {
    let progress = response.progress_percent();
    match response.training_status() {
        TrainingStatus::Completed => PollEvent::Completed {
            result: response.result.clone().unwrap_or_else(|| Value::Object(Map::new())),
            model_id: response.resolved_model_id().map(str::to_string),
            progress,
        },
        TrainingStatus::Failed => PollEvent::Failed {
            error: response.error_message().unwrap_or_else(|| "Training failed".to_string()),
        },
        status => PollEvent::Progress { status, progress },
    }
}

/// Polls `tracking_id` every `interval` until the job reaches a terminal state.
///
/// Every event is handed to `apply`; when `apply` returns false the cycle has been
/// superseded and stops.  Cancelling `token` aborts the pending timer or the in-flight
/// request, and a cancelled cycle never calls `apply` again.
pub async fn run_poll_cycle(
    api: &dyn TrainerApi,
    tracking_id: &str,
    interval: Duration,
    token: &CancellationToken,
    apply: &(dyn Fn(PollEvent) -> bool + Send + Sync),
) -> PollOutcome {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(interval) => {},
        }

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return PollOutcome::Cancelled,
            response = api.training_status(tracking_id) => response,
        };
        if token.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        let event = match response {
            Ok(response) => next_event(&response),
            Err(e) => {
                warn!(tracking_id, error = %e, "training status request failed; polling halted");
                PollEvent::Halted { error: e.to_string() }
            },
        };
        debug!(tracking_id, ?event, "training status");

        let outcome = match &event {
            PollEvent::Progress { .. } => None,
            PollEvent::Completed { .. } => Some(PollOutcome::Completed),
            PollEvent::Failed { .. } => Some(PollOutcome::Failed),
            PollEvent::Halted { .. } => Some(PollOutcome::Halted),
        };

        if !apply(event) {
            return PollOutcome::Cancelled;
        }
        if let Some(outcome) = outcome {
            info!(tracking_id, ?outcome, "poll cycle finished");
            return outcome;
        }
    }
}

/// Identifies one poll cycle handed out by a [`PollRegistry`].
#[derive(Debug, Clone)]
pub struct PollTicket {
    tracking_id: String,
    machine_id: String,
    generation: u64,
    token: CancellationToken,
}

impl PollTicket {
    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug)]
struct ActivePoll {
    machine_id: String,
    generation: u64,
    token: CancellationToken,
}

/// Keeps at most one active poll cycle per tracking id and per machine.
///
/// Every cycle's token is a child of the registry's root token, so cancelling the root
/// tears down all cycles at once.
#[derive(Debug)]
pub struct PollRegistry {
    root: CancellationToken,
    next_generation: u64,
    active: HashMap<String, ActivePoll>,
}

impl PollRegistry {
    pub fn new(root: CancellationToken) -> Self {
        Self {
            root,
            next_generation: 0,
            active: HashMap::new(),
        }
    }

    /// Registers a new cycle, cancelling any cycle for the same tracking id or machine.
    pub fn begin(&mut self, machine_id: &str, tracking_id: &str) -> PollTicket {
        self.cancel_tracking(tracking_id);
        self.cancel_machine(machine_id);

        self.next_generation += 1;
        let token = self.root.child_token();
        self.active.insert(
            tracking_id.to_string(),
            ActivePoll {
                machine_id: machine_id.to_string(),
                generation: self.next_generation,
                token: token.clone(),
            },
        );

        PollTicket {
            tracking_id: tracking_id.to_string(),
            machine_id: machine_id.to_string(),
            generation: self.next_generation,
            token,
        }
    }

    pub fn is_current(&self, ticket: &PollTicket) -> bool {
        !ticket.token.is_cancelled()
            && self
                .active
                .get(&ticket.tracking_id)
                .is_some_and(|a| a.generation == ticket.generation)
    }

    /// Removes the cycle if it is still the registered one.
    pub fn finish(&mut self, ticket: &PollTicket) -> bool {
        let current = self
            .active
            .get(&ticket.tracking_id)
            .is_some_and(|a| a.generation == ticket.generation);
        if current {
            self.active.remove(&ticket.tracking_id);
        }
        current
    }

    pub fn cancel_tracking(&mut self, tracking_id: &str) -> bool {
        match self.active.remove(tracking_id) {
            Some(active) => {
                debug!(tracking_id, machine_id = %active.machine_id, "cancelling poll cycle");
                active.token.cancel();
                true
            },
            None => false,
        }
    }

    pub fn cancel_machine(&mut self, machine_id: &str) -> bool {
        let tracking_ids: Vec<String> = self
            .active
            .iter()
            .filter(|(_, a)| a.machine_id == machine_id)
            .map(|(t, _)| t.clone())
            .collect();
        for tracking_id in &tracking_ids {
            self.cancel_tracking(tracking_id);
        }
        !tracking_ids.is_empty()
    }

    pub fn cancel_all(&mut self) -> usize {
        let n = self.active.len();
        for (_, active) in self.active.drain() {
            active.token.cancel();
        }
        n
    }

    pub fn is_tracking(&self, tracking_id: &str) -> bool {
        self.active.contains_key(tracking_id)
    }

    pub fn is_machine_active(&self, machine_id: &str) -> bool {
        self.active.values().any(|a| a.machine_id == machine_id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
