//! Pin selection and main view resolution.

use crate::session::roster::Roster;

use common::types::ParticipantSid;

/// Which participant occupies the main view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PinSelection {
    #[default]
    Local,
    Remote(ParticipantSid),
}

/// What the main view renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MainView {
    Local,
    Remote(ParticipantSid),
    /// No session, or the pinned participant is not in the roster.
    #[default]
    Empty,
}

impl MainView {
    /// Resolve the pin against the current session.
    ///
    /// A stale remote pin renders nothing rather than falling back.
    #[must_use]
    pub fn resolve(pin: &PinSelection, connected: bool, roster: &Roster) -> Self {
        if !connected {
            return MainView::Empty;
        }
        match pin {
            PinSelection::Local => MainView::Local,
            PinSelection::Remote(sid) if roster.contains_sid(sid) => MainView::Remote(sid.clone()),
            PinSelection::Remote(_) => MainView::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pin_is_local() {
        assert_eq!(PinSelection::default(), PinSelection::Local);
    }

    #[test]
    fn test_local_pin_renders_local_when_connected() {
        let roster = Roster::new();
        assert_eq!(
            MainView::resolve(&PinSelection::Local, true, &roster),
            MainView::Local
        );
    }

    #[test]
    fn test_nothing_renders_without_session() {
        let roster = Roster::new();
        assert_eq!(
            MainView::resolve(&PinSelection::Local, false, &roster),
            MainView::Empty
        );
    }

    #[test]
    fn test_stale_remote_pin_renders_nothing() {
        let roster = Roster::new();
        let pin = PinSelection::Remote(ParticipantSid::from("PAgone"));
        assert_eq!(MainView::resolve(&pin, true, &roster), MainView::Empty);
    }
}
