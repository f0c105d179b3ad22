//! Heartbeat-Handler – `ping` von Instanz-Clients

use crate::error::SignalingResult;
use crate::session::Session;
use relay_protocol::ServerNachricht;

/// Aktualisiert den Heartbeat und antwortet mit `pong`
pub fn handle_ping(session: &Session) -> SignalingResult<Option<ServerNachricht>> {
    session.heartbeat();
    tracing::trace!(verbindung = %session.id(), "Heartbeat");
    Ok(Some(ServerNachricht::pong()))
}
