use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state reported by a model server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Running,
    Initializing,
    Stopped,
    Unknown,
}

impl<'de> Deserialize<'de> for AppStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.to_ascii_lowercase().as_str() {
            "running" => AppStatus::Running,
            "initializing" => AppStatus::Initializing,
            "stopped" => AppStatus::Stopped,
            _ => AppStatus::Unknown,
        })
    }
}

/// Body of a service's `state` route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub state: AppStatus,
    #[serde(default)]
    pub msg: String,
}

impl ServiceState {
    /// A state for a service that could not be probed.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self {
            state: AppStatus::Unknown,
            msg: msg.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == AppStatus::Running
    }
}
