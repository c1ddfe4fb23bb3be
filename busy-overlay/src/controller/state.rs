//! Derived overlay states.

use std::fmt;

use serde::Serialize;

/// Logical overlay state.
///
/// Never stored: always derived from the pending request count and the
/// current visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayState {
    /// Nothing in flight, overlay hidden.
    Idle,
    /// Requests in flight, waiting out the show delay.
    PendingShow,
    /// Requests in flight, overlay shown.
    Visible,
    /// Nothing in flight, overlay still shown during the hide grace period.
    PendingHide,
}

impl OverlayState {
    /// Derive the state from the pending count and visibility.
    pub fn from_parts(pending: usize, visible: bool) -> Self {
        match (pending > 0, visible) {
            (false, false) => OverlayState::Idle,
            (true, false) => OverlayState::PendingShow,
            (true, true) => OverlayState::Visible,
            (false, true) => OverlayState::PendingHide,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayState::Idle => "idle",
            OverlayState::PendingShow => "pending-show",
            OverlayState::Visible => "visible",
            OverlayState::PendingHide => "pending-hide",
        }
    }
}

impl fmt::Display for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of the controller's internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControllerSnapshot {
    pub pending: usize,
    pub visible: bool,
    pub show_armed: bool,
    pub hide_armed: bool,
}

impl ControllerSnapshot {
    pub fn state(&self) -> OverlayState {
        OverlayState::from_parts(self.pending, self.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert_eq!(OverlayState::from_parts(0, false), OverlayState::Idle);
        assert_eq!(OverlayState::from_parts(3, false), OverlayState::PendingShow);
        assert_eq!(OverlayState::from_parts(1, true), OverlayState::Visible);
        assert_eq!(OverlayState::from_parts(0, true), OverlayState::PendingHide);
    }

    #[test]
    fn test_display() {
        assert_eq!(OverlayState::PendingShow.to_string(), "pending-show");
        assert_eq!(OverlayState::Idle.as_str(), "idle");
    }

    #[test]
    fn test_snapshot_state() {
        let snapshot = ControllerSnapshot {
            pending: 0,
            visible: true,
            show_armed: false,
            hide_armed: true,
        };
        assert_eq!(snapshot.state(), OverlayState::PendingHide);
    }
}
