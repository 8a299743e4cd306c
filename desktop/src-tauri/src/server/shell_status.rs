use serde::Serialize;

/// Snapshot handed to the loading page over IPC and with shell events.
#[derive(Debug, Clone, Serialize)]
pub struct ShellStatus {
    pub state: String,
    pub url: Option<String>,
    pub pid: Option<u32>,
    pub error: Option<String>,
    pub recovery_hint: Option<String>,
}
