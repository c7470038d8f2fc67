//! Card session state machine
//!
//! Watches the card-presence stream of an open connection. When a
//! card lands on the reader the session runs the whole exchange
//! synchronously: warm-reset the slot, select T=0/T=1, transmit the
//! GET DATA (UID) command and hand the hex identifier to the
//! notifier. A failure ends the attempt for this presentment; the
//! card has to be removed and presented again to retry.

use tracing::{debug, warn};

use crate::command::Command;
use crate::event::CardState;
use crate::notify::{DisplayValue, Notifier};
use crate::response::Response;
use crate::transport::{CardTransport, PowerMode, Protocols};

/// States of the card session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No card, or waiting for the next one
    Idle,
    /// A card was just reported present
    CardDetected,
    /// The UID exchange is in flight
    Reading,
    /// An identifier was produced and reported
    ResultReady,
}

/// Outcome of one card presentment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    /// The card identifier, lowercase hex (possibly empty)
    Identifier(String),
    /// The exchange failed; requires re-presenting the card
    Failed,
}

/// The card session state machine
#[derive(Debug)]
pub struct CardSession {
    state: SessionState,
    slot: u8,
}

impl Default for CardSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CardSession {
    /// Create a session watching slot 0
    pub const fn new() -> Self {
        Self::with_slot(0)
    }

    /// Create a session watching the given slot
    pub const fn with_slot(slot: u8) -> Self {
        Self {
            state: SessionState::Idle,
            slot,
        }
    }

    /// Current state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Forget any in-progress presentment
    ///
    /// Called when the connection closes; does not touch the display.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }

    /// React to a card state change reported by the transport
    ///
    /// Returns the outcome when a card presentment was handled,
    /// `None` when the event required no exchange.
    pub fn on_card_state<T, N>(
        &mut self,
        current: CardState,
        transport: &mut T,
        notifier: &mut N,
    ) -> Option<SessionResult>
    where
        T: CardTransport,
        N: Notifier,
    {
        match current {
            CardState::Present => {
                if self.state != SessionState::Idle {
                    debug!(state = ?self.state, "card reported present mid-session, ignoring");
                    return None;
                }
                self.state = SessionState::CardDetected;
                notifier.log("Found card");
                Some(self.read_identifier(transport, notifier))
            }
            CardState::Absent | CardState::Unknown => {
                self.state = SessionState::Idle;
                notifier.display(DisplayValue::Placeholder);
                None
            }
        }
    }

    fn read_identifier<T, N>(&mut self, transport: &mut T, notifier: &mut N) -> SessionResult
    where
        T: CardTransport,
        N: Notifier,
    {
        self.state = SessionState::Reading;
        notifier.log("Getting id...");

        match self.exchange(transport) {
            Ok(response) => {
                // The length gate already passed in Response parsing;
                // the status word is deliberately not checked here.
                let id = response.identifier();
                self.state = SessionState::ResultReady;
                notifier.log(&format!("Success getting id : {id}"));
                notifier.display(DisplayValue::Identifier(id.clone()));
                self.state = SessionState::Idle;
                SessionResult::Identifier(id)
            }
            Err(e) => {
                warn!(error = %e, "failed reading card identifier");
                notifier.log("Failed getting id");
                self.state = SessionState::Idle;
                SessionResult::Failed
            }
        }
    }

    fn exchange<T: CardTransport>(&mut self, transport: &mut T) -> crate::Result<Response> {
        transport.set_power(self.slot, PowerMode::WarmReset)?;
        transport.set_protocol(self.slot, Protocols::T0 | Protocols::T1)?;

        let raw = transport.transmit(self.slot, &Command::get_uid().to_bytes())?;
        Ok(Response::from_bytes(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::recording::RecordingNotifier;
    use crate::transport::mock::MockTransport;

    fn run_present(transport: &mut MockTransport) -> (Option<SessionResult>, RecordingNotifier) {
        let mut session = CardSession::new();
        let mut notifier = RecordingNotifier::default();
        let result = session.on_card_state(CardState::Present, transport, &mut notifier);
        assert_eq!(session.state(), SessionState::Idle);
        (result, notifier)
    }

    #[test]
    fn test_uid_read_reports_hex_identifier() {
        let mut transport =
            MockTransport::with_response(&[0x04, 0xA1, 0xB2, 0xC3, 0x90, 0x00]);
        let (result, notifier) = run_present(&mut transport);

        assert_eq!(
            result,
            Some(SessionResult::Identifier("04a1b2c3".to_string()))
        );
        assert_eq!(
            notifier.last_display(),
            Some(&DisplayValue::Identifier("04a1b2c3".to_string()))
        );
        assert_eq!(
            notifier.lines,
            vec!["Found card", "Getting id...", "Success getting id : 04a1b2c3"]
        );

        // Slot was warm-reset and both protocols selected before the exchange.
        assert_eq!(transport.power_modes, vec![(0, PowerMode::WarmReset)]);
        assert_eq!(transport.protocols, vec![(0, Protocols::T0 | Protocols::T1)]);
        assert_eq!(
            transport.commands[0].as_ref(),
            &[0xFF, 0xCA, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_trailer_only_response_yields_empty_identifier() {
        // Length == 2 passes the gate: success with an empty identifier.
        let mut transport = MockTransport::with_response(&[0x90, 0x00]);
        let (result, notifier) = run_present(&mut transport);

        assert_eq!(result, Some(SessionResult::Identifier(String::new())));
        assert_eq!(
            notifier.last_display(),
            Some(&DisplayValue::Identifier(String::new()))
        );
    }

    #[test]
    fn test_short_response_fails_without_display_update() {
        let mut transport = MockTransport::with_response(&[0x63]);
        let (result, notifier) = run_present(&mut transport);

        assert_eq!(result, Some(SessionResult::Failed));
        assert!(notifier.displays.is_empty());
        assert_eq!(notifier.lines.last().unwrap(), "Failed getting id");
    }

    #[test]
    fn test_transmit_failure_is_terminal_for_presentment() {
        let mut transport = MockTransport::failing();
        let (result, notifier) = run_present(&mut transport);

        assert_eq!(result, Some(SessionResult::Failed));
        assert!(notifier.displays.is_empty());
        // Exactly one attempt; no retries.
        assert_eq!(transport.commands.len(), 1);
    }

    #[test]
    fn test_non_success_status_still_produces_identifier() {
        // The observed behavior hex-encodes the payload regardless of
        // the status word; only the length gate matters.
        let mut transport = MockTransport::with_response(&[0x01, 0x02, 0x6A, 0x82]);
        let (result, _notifier) = run_present(&mut transport);
        assert_eq!(result, Some(SessionResult::Identifier("0102".to_string())));
    }

    #[test]
    fn test_card_removed_resets_display_without_transmit() {
        let mut transport = MockTransport::with_response(&[0x90, 0x00]);
        let mut session = CardSession::new();
        let mut notifier = RecordingNotifier::default();

        let result = session.on_card_state(CardState::Absent, &mut transport, &mut notifier);
        assert_eq!(result, None);
        assert_eq!(notifier.last_display(), Some(&DisplayValue::Placeholder));
        assert!(transport.commands.is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_unknown_state_treated_like_absent() {
        let mut transport = MockTransport::with_response(&[0x90, 0x00]);
        let mut session = CardSession::new();
        let mut notifier = RecordingNotifier::default();

        session.on_card_state(CardState::Unknown, &mut transport, &mut notifier);
        assert_eq!(notifier.last_display(), Some(&DisplayValue::Placeholder));
        assert!(transport.commands.is_empty());
    }
}
