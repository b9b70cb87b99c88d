use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Backend-reported system facts
// ---------------------------------------------------------------------------

/// Operating system family reported by `get_operating_system_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatingSystemType {
    Linux,
    MacOS,
    Windows,
}

impl OperatingSystemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::MacOS => "MacOS",
            Self::Windows => "Windows",
        }
    }
}

impl fmt::Display for OperatingSystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating system kind as seen by the status mirror: `Unknown` until the
/// first successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SystemKind {
    #[default]
    Unknown,
    Linux,
    MacOS,
    Windows,
}

impl From<OperatingSystemType> for SystemKind {
    fn from(value: OperatingSystemType) -> Self {
        match value {
            OperatingSystemType::Linux => SystemKind::Linux,
            OperatingSystemType::MacOS => SystemKind::MacOS,
            OperatingSystemType::Windows => SystemKind::Windows,
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SystemKind::Unknown => "Unknown",
            SystemKind::Linux => "Linux",
            SystemKind::MacOS => "MacOS",
            SystemKind::Windows => "Windows",
        };
        f.write_str(s)
    }
}

/// One precondition for running the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementState {
    Met,
    NotMet { message: String },
}

impl RequirementState {
    pub fn not_met(message: impl Into<String>) -> Self {
        RequirementState::NotMet {
            message: message.into(),
        }
    }

    pub fn is_met(&self) -> bool {
        matches!(self, RequirementState::Met)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RequirementState::Met => None,
            RequirementState::NotMet { message } => Some(message),
        }
    }
}

/// Snapshot returned by `get_requirements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub all_met: bool,
    pub operating_system: RequirementState,
    pub architecture: RequirementState,
    pub steam: RequirementState,
    pub mw3_path: Option<PathBuf>,
    pub bo2_path: Option<PathBuf>,
    pub bo2_mp_path: Option<PathBuf>,
    pub bo1_path: Option<PathBuf>,
    pub bo1_mp_path: Option<PathBuf>,
    pub waw_path: Option<PathBuf>,
}

/// Install locations of the supported games, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamePaths {
    pub mw3: Option<PathBuf>,
    pub bo2: Option<PathBuf>,
    pub bo2_mp: Option<PathBuf>,
    pub bo1: Option<PathBuf>,
    pub bo1_mp: Option<PathBuf>,
    pub waw: Option<PathBuf>,
}

impl Requirements {
    /// Build a snapshot; `all_met` holds exactly when the three checks pass.
    pub fn new(
        operating_system: RequirementState,
        architecture: RequirementState,
        steam: RequirementState,
        paths: GamePaths,
    ) -> Self {
        let all_met = [&operating_system, &architecture, &steam]
            .iter()
            .all(|state| state.is_met());

        Self {
            all_met,
            operating_system,
            architecture,
            steam,
            mw3_path: paths.mw3,
            bo2_path: paths.bo2,
            bo2_mp_path: paths.bo2_mp,
            bo1_path: paths.bo1,
            bo1_mp_path: paths.bo1_mp,
            waw_path: paths.waw,
        }
    }

    /// The named requirement checks, in display order.
    pub fn fields(&self) -> [(&'static str, &RequirementState); 3] {
        [
            ("operating_system", &self.operating_system),
            ("architecture", &self.architecture),
            ("steam", &self.steam),
        ]
    }

    pub fn display_rows(&self) -> Vec<RequirementDisplay> {
        self.fields()
            .iter()
            .map(|(key, state)| requirement_display(key, state))
            .collect()
    }
}

/// UI row derived from a single requirement field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDisplay {
    pub ok: bool,
    pub key: String,
    pub message: Option<String>,
}

/// Turn a snake_case requirement key and its state into a display row.
pub fn requirement_display(key: &str, state: &RequirementState) -> RequirementDisplay {
    let message = state.message().map(str::to_string);
    RequirementDisplay {
        ok: message.is_none(),
        key: capitalised(&key.replace('_', " ")),
        message,
    }
}

/// Upper-case the first character. Does not touch the rest of the string.
pub fn capitalised(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A connected input device, as reported by the UI's device events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gamepad {
    pub index: u32,
    pub id: String,
}

// ---------------------------------------------------------------------------
// Final result JSON – the stable output contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub run_id: String,
    pub command: String,
    pub target: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub timing_ms: TimingInfo,
    /// Command-specific payload returned on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Fail,
    Skip,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
            Status::Skip => "skip",
            Status::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    UnknownCommand,
    BackendRejected,
    SchemaMismatch,
    DecodeError,
    Unavailable,
    IoError,
    ProtocolError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        f.write_str(&s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimingInfo {
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Scenario types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioStep {
    Call {
        call: String,
        #[serde(default)]
        args: Option<serde_json::Value>,
        #[serde(default = "default_expect_status")]
        expect_status: Status,
    },
    Refresh {
        refresh: bool,
        #[serde(default)]
        expect_supported: Option<bool>,
    },
}

fn default_expect_status() -> Status {
    Status::Pass
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: Option<String>,
    pub overall_status: Status,
    pub step_results: Vec<CommandResult>,
}

// ---------------------------------------------------------------------------
// Serve / daemon protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate a new run ID (UUIDv4).
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Build a successful CommandResult shell (caller fills in data).
pub fn result_ok(command: &str, target: &str, run_id: &str, total_ms: u64) -> CommandResult {
    CommandResult {
        run_id: run_id.to_string(),
        command: command.to_string(),
        target: target.to_string(),
        status: Status::Pass,
        error: None,
        timing_ms: TimingInfo { total: total_ms },
        data: None,
    }
}

/// Build an error CommandResult.
pub fn result_err(
    command: &str,
    target: &str,
    run_id: &str,
    total_ms: u64,
    info: ErrorInfo,
) -> CommandResult {
    CommandResult {
        run_id: run_id.to_string(),
        command: command.to_string(),
        target: target.to_string(),
        status: Status::Error,
        error: Some(info),
        timing_ms: TimingInfo { total: total_ms },
        data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmet_requirement_display() {
        let row = requirement_display("mw3_path", &RequirementState::not_met("X"));
        assert_eq!(
            row,
            RequirementDisplay {
                ok: false,
                key: "Mw3 path".into(),
                message: Some("X".into()),
            }
        );
    }

    #[test]
    fn test_met_requirement_display() {
        let row = requirement_display("steam", &RequirementState::Met);
        assert_eq!(
            row,
            RequirementDisplay {
                ok: true,
                key: "Steam".into(),
                message: None,
            }
        );
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "ok": true, "key": "Steam", "message": null })
        );
    }

    #[test]
    fn test_capitalised() {
        assert_eq!(capitalised(""), "");
        assert_eq!(capitalised("operating system"), "Operating system");
        assert_eq!(capitalised("Already"), "Already");
    }

    #[test]
    fn test_requirement_state_wire_format() {
        assert_eq!(
            serde_json::to_value(RequirementState::Met).unwrap(),
            serde_json::json!("Met")
        );
        assert_eq!(
            serde_json::to_value(RequirementState::not_met("nope")).unwrap(),
            serde_json::json!({ "NotMet": { "message": "nope" } })
        );
    }

    #[test]
    fn test_all_met_needs_every_check() {
        let ok = Requirements::new(
            RequirementState::Met,
            RequirementState::Met,
            RequirementState::Met,
            GamePaths::default(),
        );
        assert!(ok.all_met);

        let missing_steam = Requirements::new(
            RequirementState::Met,
            RequirementState::Met,
            RequirementState::not_met("no steam"),
            GamePaths::default(),
        );
        assert!(!missing_steam.all_met);
        assert_eq!(missing_steam.display_rows()[2].key, "Steam");
        assert!(!missing_steam.display_rows()[2].ok);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::SchemaMismatch.to_string(), "SCHEMA_MISMATCH");
    }
}
