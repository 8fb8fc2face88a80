use std::collections::HashMap;

use parking_lot::Mutex;
use training_session::{MachineState, StateObserver};

/// Prints a line whenever a machine's status message, progress or error changes.
#[derive(Default)]
pub struct ConsoleObserver {
    names: Mutex<HashMap<String, String>>,
    last: Mutex<HashMap<String, String>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&self, machine_id: &str, name: &str) {
        self.names.lock().insert(machine_id.to_string(), name.to_string());
    }

    fn label(&self, machine_id: &str) -> String {
        self.names
            .lock()
            .get(machine_id)
            .cloned()
            .unwrap_or_else(|| machine_id.to_string())
    }
}

pub fn render(label: &str, state: &MachineState) -> Option<String> {
    let mut parts = Vec::new();
    if !state.status_message.is_empty() {
        parts.push(state.status_message.clone());
    }
    if state.uploading || state.progress > 0 {
        parts.push(format!("{}%", state.progress));
    }
    if let Some(e) = state.file_error.as_deref().or(state.error.as_deref()) {
        parts.push(format!("error: {e}"));
    }
    if let Some(e) = &state.inference_error {
        parts.push(format!("inference error: {e}"));
    }
    (!parts.is_empty()).then(|| format!("[{label}] {}", parts.join(" | ")))
}

impl StateObserver for ConsoleObserver {
    fn on_state_change(&self, machine_id: &str, state: &MachineState) {
        let Some(line) = render(&self.label(machine_id), state) else {
            return;
        };
        let mut last = self.last.lock();
        if last.get(machine_id) != Some(&line) {
            println!("{line}");
            last.insert(machine_id.to_string(), line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_only_meaningful_states() {
        assert_eq!(render("Atlas", &MachineState::default()), None);

        let state = MachineState {
            status_message: "Uploading...".into(),
            uploading: true,
            ..Default::default()
        };
        assert_eq!(render("Atlas", &state).as_deref(), Some("[Atlas] Uploading... | 0%"));

        let state = MachineState {
            status_message: "Training failed".into(),
            progress: 40,
            error: Some("bad csv".into()),
            ..Default::default()
        };
        assert_eq!(
            render("Atlas", &state).as_deref(),
            Some("[Atlas] Training failed | 40% | error: bad csv")
        );
    }

    #[test]
    fn labels_fall_back_to_id() {
        let observer = ConsoleObserver::new();
        assert_eq!(observer.label("m-1"), "m-1");
        observer.set_name("m-1", "Atlas-01");
        assert_eq!(observer.label("m-1"), "Atlas-01");
    }
}
