//! Status mirror – the frontend's cached view of system status.
//!
//! Every field starts unknown/absent and is only overwritten when its own
//! backend call succeeds. Derived views are computed on read.

use crate::bridge::{Bridge, BridgeError};
use crate::commands::{GetOperatingSystemType, GetRequirements, IsSetup};
use crate::types::{Gamepad, RequirementDisplay, Requirements, SystemKind};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The one operating system the launcher runs on.
pub const SUPPORTED_KIND: SystemKind = SystemKind::Linux;

#[derive(Debug, Default)]
struct State {
    kind: SystemKind,
    requirements: Option<Requirements>,
    gamepads: Vec<Gamepad>,
    is_setup: Option<bool>,
}

/// Serializable copy of the mirror, including derived views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub kind: SystemKind,
    pub supported: bool,
    pub requirements: Option<Requirements>,
    pub requirement_rows: Vec<RequirementDisplay>,
    pub gamepads: Vec<Gamepad>,
    pub gamepad_connected: bool,
    pub is_setup: Option<bool>,
}

pub struct SystemStatus {
    bridge: Bridge,
    state: RwLock<State>,
}

impl SystemStatus {
    /// Create a mirror without contacting the backend.
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            state: RwLock::new(State::default()),
        }
    }

    /// Create a mirror and start a refresh in the background.
    ///
    /// Must be called from within a tokio runtime. A failed initial refresh
    /// is logged and leaves the affected fields unknown.
    pub fn spawn(bridge: Bridge) -> Arc<Self> {
        let status = Arc::new(Self::new(bridge));
        status.spawn_refresh();
        status
    }

    /// Start a refresh in the background without waiting for it.
    pub fn spawn_refresh(self: &Arc<Self>) {
        let background = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = background.refresh().await {
                tracing::warn!(error = %e, "background status refresh failed");
            }
        });
    }

    /// Re-query operating system kind, requirements and setup flag, in that
    /// order. Each field is stored as soon as its call returns; the first
    /// failure stops the sequence and leaves the remaining fields untouched.
    pub async fn refresh(&self) -> Result<(), BridgeError> {
        let os = self.bridge.invoke::<GetOperatingSystemType>().await?;
        self.write().kind = os.into();
        tracing::debug!(kind = %os, "operating system kind resolved");

        let requirements = self.bridge.invoke::<GetRequirements>().await?;
        tracing::debug!(all_met = requirements.all_met, "requirements resolved");
        self.write().requirements = Some(requirements);

        let is_setup = self.bridge.invoke::<IsSetup>().await?;
        self.write().is_setup = Some(is_setup);
        tracing::debug!(is_setup, "setup flag resolved");

        Ok(())
    }

    pub fn kind(&self) -> SystemKind {
        self.read().kind
    }

    pub fn supported(&self) -> bool {
        self.kind() == SUPPORTED_KIND
    }

    pub fn requirements(&self) -> Option<Requirements> {
        self.read().requirements.clone()
    }

    /// Display rows for the requirement checks; empty until resolved.
    pub fn requirement_rows(&self) -> Vec<RequirementDisplay> {
        self.read()
            .requirements
            .as_ref()
            .map(Requirements::display_rows)
            .unwrap_or_default()
    }

    pub fn gamepads(&self) -> Vec<Gamepad> {
        self.read().gamepads.clone()
    }

    pub fn gamepad_connected(&self) -> bool {
        !self.read().gamepads.is_empty()
    }

    pub fn is_setup(&self) -> Option<bool> {
        self.read().is_setup
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.read();
        StatusSnapshot {
            kind: state.kind,
            supported: state.kind == SUPPORTED_KIND,
            requirements: state.requirements.clone(),
            requirement_rows: state
                .requirements
                .as_ref()
                .map(Requirements::display_rows)
                .unwrap_or_default(),
            gamepads: state.gamepads.clone(),
            gamepad_connected: !state.gamepads.is_empty(),
            is_setup: state.is_setup,
        }
    }

    // -- device events ------------------------------------------------------

    /// Replace the connected device list wholesale.
    pub fn set_gamepads(&self, gamepads: Vec<Gamepad>) {
        self.write().gamepads = gamepads;
    }

    pub fn gamepad_connected_event(&self, gamepad: Gamepad) {
        let mut state = self.write();
        state.gamepads.retain(|g| g.index != gamepad.index);
        state.gamepads.push(gamepad);
    }

    pub fn gamepad_disconnected_event(&self, index: u32) {
        self.write().gamepads.retain(|g| g.index != index);
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GatedTransport, MockTransport};
    use crate::transport::TransportError;
    use crate::types::{GamePaths, RequirementState};
    use serde_json::json;

    fn requirements(steam: RequirementState) -> Requirements {
        Requirements::new(
            RequirementState::Met,
            RequirementState::Met,
            steam,
            GamePaths::default(),
        )
    }

    fn answering(os: &str) -> Arc<MockTransport> {
        let mock = Arc::new(MockTransport::new());
        mock.respond("get_operating_system_type", json!(os));
        mock.respond(
            "get_requirements",
            serde_json::to_value(requirements(RequirementState::Met)).unwrap(),
        );
        mock.respond("is_setup", json!(true));
        mock
    }

    #[test]
    fn test_fresh_mirror_is_unknown() {
        let status = SystemStatus::new(Bridge::new(Arc::new(MockTransport::new())));
        assert_eq!(status.kind(), SystemKind::Unknown);
        assert_eq!(status.requirements(), None);
        assert_eq!(status.is_setup(), None);
        assert!(!status.supported());
        assert!(!status.gamepad_connected());
        assert!(status.requirement_rows().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_on_linux_is_supported() {
        let status = SystemStatus::new(Bridge::new(answering("Linux")));
        status.refresh().await.unwrap();

        assert_eq!(status.kind(), SystemKind::Linux);
        assert!(status.supported());
        assert_eq!(status.requirements(), Some(requirements(RequirementState::Met)));
        assert_eq!(status.is_setup(), Some(true));
        assert_eq!(status.requirement_rows().len(), 3);
    }

    #[tokio::test]
    async fn test_other_systems_are_not_supported() {
        for (os, kind) in [("Windows", SystemKind::Windows), ("MacOS", SystemKind::MacOS)] {
            let status = SystemStatus::new(Bridge::new(answering(os)));
            status.refresh().await.unwrap();
            assert_eq!(status.kind(), kind);
            assert!(!status.supported());
        }
    }

    #[tokio::test]
    async fn test_failure_stops_sequence_and_keeps_old_values() {
        let mock = answering("Linux");
        let status = SystemStatus::new(Bridge::new(mock.clone()));
        status.refresh().await.unwrap();

        mock.respond("get_operating_system_type", json!("Windows"));
        mock.respond(
            "get_requirements",
            serde_json::to_value(requirements(RequirementState::not_met("gone"))).unwrap(),
        );
        mock.respond("is_setup", json!(false));
        mock.fail(
            "get_requirements",
            TransportError::Unavailable("backend restarting".into()),
        );

        let err = status.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Transport(TransportError::Unavailable(_))
        ));

        // Kind was written before the failing step, the rest was not.
        assert_eq!(status.kind(), SystemKind::Windows);
        assert_eq!(status.requirements(), Some(requirements(RequirementState::Met)));
        assert_eq!(status.is_setup(), Some(true));

        let calls: Vec<String> = mock.calls().into_iter().map(|(name, _)| name).collect();
        assert_eq!(calls.iter().filter(|c| *c == "is_setup").count(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_last_resolution_wins() {
        let gated = Arc::new(GatedTransport::new("get_operating_system_type"));
        gated.inner.respond(
            "get_requirements",
            serde_json::to_value(requirements(RequirementState::Met)).unwrap(),
        );
        gated.inner.respond("is_setup", json!(false));

        let status = Arc::new(SystemStatus::new(Bridge::new(gated.clone())));

        let first = tokio::spawn({
            let status = Arc::clone(&status);
            async move { status.refresh().await }
        });
        while gated.issued() < 1 {
            tokio::task::yield_now().await;
        }
        let second = tokio::spawn({
            let status = Arc::clone(&status);
            async move { status.refresh().await }
        });
        while gated.issued() < 2 {
            tokio::task::yield_now().await;
        }

        // The second refresh's answer lands first...
        gated.release(1, json!("Windows"));
        while status.kind() != SystemKind::Windows {
            tokio::task::yield_now().await;
        }
        // ...and the first refresh's later answer overwrites it.
        gated.release(0, json!("Linux"));

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(status.kind(), SystemKind::Linux);
        assert!(status.supported());
    }

    #[tokio::test]
    async fn test_spawn_refreshes_in_background() {
        let status = SystemStatus::spawn(Bridge::new(answering("Linux")));
        while status.is_setup().is_none() {
            tokio::task::yield_now().await;
        }
        assert!(status.supported());
    }

    #[test]
    fn test_gamepad_events() {
        let status = SystemStatus::new(Bridge::new(Arc::new(MockTransport::new())));
        status.gamepad_connected_event(Gamepad {
            index: 0,
            id: "Xbox Wireless Controller".into(),
        });
        assert!(status.gamepad_connected());

        status.gamepad_connected_event(Gamepad {
            index: 0,
            id: "Xbox Wireless Controller (reconnected)".into(),
        });
        assert_eq!(status.gamepads().len(), 1);

        status.gamepad_disconnected_event(0);
        assert!(!status.gamepad_connected());

        status.set_gamepads(vec![Gamepad {
            index: 3,
            id: "DualSense".into(),
        }]);
        assert!(status.snapshot().gamepad_connected);
    }
}
