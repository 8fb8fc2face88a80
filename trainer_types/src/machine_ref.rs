use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identifies the machine a training file or an inference call belongs to.
///
/// Machines registered through `/api/models` are addressed by id; the dashboard and the
/// inference gateway address machines by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineRef {
    Id(String),
    Name(String),
}

impl MachineRef {
    /// The form field / query parameter name the backend expects for this kind of reference.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Id(_) => "machineId",
            Self::Name(_) => "name",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Id(v) | Self::Name(v) => v.as_str(),
        }
    }

    /// `(field_name, value)`, ready for a query string or a form.
    pub fn as_pair(&self) -> (&'static str, &str) {
        (self.field_name(), self.value().trim())
    }
}

impl Display for MachineRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "machine id {id}"),
            Self::Name(name) => write!(f, "machine {name:?}"),
        }
    }
}
