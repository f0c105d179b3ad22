//! Auth-Handler – Operator-Anmeldung und Registrierung von Instanz-Clients
//!
//! Beide Wege sind nur aus dem Zustand `NichtAuthentifiziert` erreichbar;
//! der Dispatcher prueft das vorher.

use crate::error::{SignalingError, SignalingResult};
use crate::registry::RegistrierErgebnis;
use crate::server_state::SignalingState;
use crate::session::{Session, TrennGrund};
use relay_core::Identitaet;
use relay_protocol::ServerNachricht;
use std::sync::Arc;

/// Hebt die Verbindung nach gueltigem Admin-Schluessel zum Operator an
///
/// Der Schluessel wurde bereits vom Dispatcher geprueft.
pub fn handle_admin_anmeldung(
    session: &Session,
    state: &SignalingState,
) -> SignalingResult<Option<ServerNachricht>> {
    if !session.zum_operator_befoerdern() {
        return Err(SignalingError::nicht_autorisiert(format!(
            "Rolle bereits gesetzt: {}",
            session.rolle()
        )));
    }

    state.metriken.operatoren.inc();
    tracing::info!(
        verbindung = %session.id(),
        peer = ?session.peer(),
        "Operator angemeldet"
    );
    Ok(Some(ServerNachricht::admin_authentifiziert()))
}

/// Registriert die Verbindung als Instanz-Client
///
/// Ein belegter Schluessel wird ueberschrieben. Je nach Konfiguration wird
/// die verdraengte Verbindung zusaetzlich getrennt.
pub fn handle_registrierung(
    identitaet: Identitaet,
    session: &Arc<Session>,
    state: &SignalingState,
) -> SignalingResult<Option<ServerNachricht>> {
    if !session.als_instanz_registrieren(identitaet) {
        return Err(SignalingError::nicht_autorisiert(format!(
            "Rolle bereits gesetzt: {}",
            session.rolle()
        )));
    }

    match state.registry.registrieren(Arc::clone(session)) {
        RegistrierErgebnis::Neu => {}
        RegistrierErgebnis::Ersetzt(alt) => {
            if state.config.ersetzte_sitzung_trennen {
                state.trennen(&alt, TrennGrund::Ersetzt);
            } else {
                tracing::warn!(
                    verbindung = %session.id(),
                    alt = %alt.id(),
                    "Registrierung ersetzt bestehenden Eintrag, alte Verbindung bleibt offen"
                );
            }
        }
        RegistrierErgebnis::Abgelehnt => {
            tracing::debug!(
                verbindung = %session.id(),
                "Registrierung einer bereits beendeten Verbindung verworfen"
            );
            return Ok(None);
        }
    }

    state.gauges_aktualisieren();
    if let Some(identitaet) = session.identitaet() {
        tracing::info!(
            verbindung = %session.id(),
            client = %identitaet,
            "Instanz-Client registriert"
        );
    }
    Ok(Some(ServerNachricht::registriert()))
}
