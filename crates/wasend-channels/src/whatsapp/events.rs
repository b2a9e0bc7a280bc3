//! Library event translation: `whatsapp-rust` events to lifecycle events.

use wacore::types::events::{ConnectFailureReason, Event};
use wasend_core::event::{ClientEvent, DisconnectReason};

/// Map a library event onto the lifecycle vocabulary.
///
/// Message, receipt, presence and sync events are not lifecycle events
/// and yield `None`.
pub(super) fn translate(event: Event) -> Option<ClientEvent> {
    let translated = match event {
        Event::PairingQrCode { code, .. } => ClientEvent::Qr(code),
        // Pairing done; the session still has to log in before it is usable.
        Event::PairSuccess(_) => ClientEvent::Connecting,
        Event::Connected(_) => ClientEvent::Open,
        Event::PairError(e) => ClientEvent::Failed(format!("pairing failed: {e:?}")),
        Event::LoggedOut(_) => ClientEvent::Closed(DisconnectReason::LoggedOut),
        Event::StreamReplaced(_) => ClientEvent::Closed(DisconnectReason::Replaced),
        Event::TemporaryBan(_) => ClientEvent::Closed(DisconnectReason::Banned),
        Event::ClientOutdated(_) => ClientEvent::Closed(DisconnectReason::Outdated),
        Event::QrScannedWithoutMultidevice(_) => {
            ClientEvent::Closed(DisconnectReason::MultideviceMismatch)
        }
        Event::StreamError(e) => ClientEvent::Closed(match e.code.parse::<u16>() {
            Ok(code) => DisconnectReason::from_code(code),
            Err(_) => DisconnectReason::RestartRequired,
        }),
        Event::ConnectFailure(e) => ClientEvent::Closed(match e.reason {
            ConnectFailureReason::LoggedOut
            | ConnectFailureReason::MainDeviceGone
            | ConnectFailureReason::UnknownLogout => DisconnectReason::LoggedOut,
            ConnectFailureReason::TempBanned => DisconnectReason::Banned,
            ConnectFailureReason::ClientOutdated => DisconnectReason::Outdated,
            _ => DisconnectReason::ConnectionClosed,
        }),
        Event::Disconnected(_) => ClientEvent::Closed(DisconnectReason::ConnectionLost),
        _ => return None,
    };
    Some(translated)
}
