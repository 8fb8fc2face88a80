use tokio::sync::mpsc;

use crate::state::MachineState;

/// Receives a full snapshot of a machine's state after every change.
///
/// Called while the controller's state lock is held, so snapshots arrive in order.
/// Implementations must not call back into the controller.
pub trait StateObserver: Send + Sync {
    fn on_state_change(&self, machine_id: &str, state: &MachineState);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

impl StateObserver for NoOpObserver {
    fn on_state_change(&self, _machine_id: &str, _state: &MachineState) {}
}

#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub machine_id: String,
    pub state: MachineState,
}

/// Forwards snapshots into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StateSnapshot>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StateSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StateObserver for ChannelObserver {
    fn on_state_change(&self, machine_id: &str, state: &MachineState) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.tx.send(StateSnapshot {
            machine_id: machine_id.to_string(),
            state: state.clone(),
        });
    }
}
