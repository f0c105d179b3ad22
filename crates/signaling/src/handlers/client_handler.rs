//! Client-Handler – Operator-Befehle an Instanz-Clients
//!
//! `listClients` wird direkt beantwortet. Alle Zielbefehle werden als
//! `{command, args}` an die per Zielauswahl bestimmten Instanz-Clients
//! weitergeleitet; nur `kick` bekommt eine Rueckmeldung an den Operator.

use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;
use crate::session::Session;
use relay_protocol::{Befehl, BefehlsName, ServerNachricht};

/// Verarbeitet einen Befehl einer Operator-Verbindung
pub fn handle_operator_befehl(
    befehl: Befehl,
    session: &Session,
    state: &SignalingState,
) -> SignalingResult<Option<ServerNachricht>> {
    if befehl.name.ist_zielbefehl() {
        return handle_zielbefehl(befehl, session, state);
    }
    match &befehl.name {
        BefehlsName::ListClients => handle_client_list(session, state),
        BefehlsName::Unbekannt(name) => {
            tracing::debug!(
                verbindung = %session.id(),
                befehl = %name,
                "Unbekannter Befehl ignoriert"
            );
            Ok(None)
        }
        anderer => Err(SignalingError::nicht_autorisiert(format!(
            "'{anderer}' ist kein Operator-Befehl"
        ))),
    }
}

/// Antwortet mit allen registrierten Instanz-Clients
pub fn handle_client_list(
    session: &Session,
    state: &SignalingState,
) -> SignalingResult<Option<ServerNachricht>> {
    let clients = state.registry.zusammenfassungen();
    state.metriken.befehl_zaehlen(BefehlsName::ListClients.als_str());
    tracing::debug!(
        verbindung = %session.id(),
        anzahl = clients.len(),
        "Client-Liste angefordert"
    );
    Ok(Some(ServerNachricht::client_liste(clients)))
}

/// Leitet einen Zielbefehl an alle passenden Instanz-Clients weiter
pub fn handle_zielbefehl(
    befehl: Befehl,
    session: &Session,
    state: &SignalingState,
) -> SignalingResult<Option<ServerNachricht>> {
    let ziel = befehl.ziel()?;
    let umschlag = ServerNachricht::befehl(&befehl.name, befehl.daten);
    let zustellung = state.targeting.zustellen(&ziel, &umschlag);

    state.metriken.befehl_zaehlen(befehl.name.als_str());
    tracing::info!(
        verbindung = %session.id(),
        befehl = %befehl.name,
        ziel = %ziel.bezeichnung(),
        getroffen = zustellung.getroffen,
        zugestellt = zustellung.zugestellt,
        "Befehl weitergeleitet"
    );

    if befehl.name != BefehlsName::Kick {
        return Ok(None);
    }
    let bezeichnung = ziel.bezeichnung();
    if zustellung.getroffen == 0 {
        return Err(SignalingError::ZielNichtGefunden(bezeichnung));
    }
    Ok(Some(ServerNachricht::gekickt(&bezeichnung)))
}
