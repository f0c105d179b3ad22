//! Message-Dispatcher – Routet eingehende Frames an die richtigen Handler
//!
//! Der Dispatcher parst einen Textframe gegen das Schema, prueft ihn gegen
//! die Rolle der sendenden Session und gibt die Antwort zurueck.
//!
//! ## Zustandspruefung
//! - `NichtAuthentifiziert`: nur Admin-Schluessel oder Registrierung
//! - `Operator`: nur Operator-Befehle (Zielbefehle und `listClients`)
//! - `InstanzClient`: nur `ping`
//!
//! Alles andere wird still verworfen. Nur ungueltige Nutzlast und ein
//! `kick` ohne Treffer erzeugen eine Fehlerantwort.

use relay_protocol::{BefehlsName, ClientFrame, ProtokollFehler, Registrierung, ServerNachricht};
use std::sync::Arc;

use crate::error::{SignalingError, SignalingResult};
use crate::handlers::{auth_handler, client_handler, heartbeat_handler};
use crate::server_state::SignalingState;
use crate::session::{Rolle, Session};

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet einen eingehenden Textframe und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort gesendet werden soll.
    pub fn dispatch(&self, session: &Arc<Session>, rohtext: &str) -> Option<ServerNachricht> {
        if session.ist_geschlossen() {
            tracing::trace!(verbindung = %session.id(), "Frame nach dem Schliessen verworfen");
            return None;
        }

        match self.verarbeiten(session, rohtext) {
            Ok(antwort) => antwort,
            Err(fehler) => self.fehler_behandeln(session, fehler),
        }
    }

    fn verarbeiten(
        &self,
        session: &Arc<Session>,
        rohtext: &str,
    ) -> SignalingResult<Option<ServerNachricht>> {
        let limit = self.state.config.max_nachricht_bytes;
        if rohtext.len() > limit {
            return Err(ProtokollFehler::UngueltigesFeld {
                feld: "frame",
                grund: format!("{} Bytes ueberschreiten das Limit von {limit}", rohtext.len()),
            }
            .into());
        }

        let frame = ClientFrame::parsen(rohtext)?;

        match session.rolle() {
            Rolle::NichtAuthentifiziert => self.dispatch_nicht_authentifiziert(session, frame),
            Rolle::Operator => match frame.befehl() {
                Some(befehl) => client_handler::handle_operator_befehl(befehl, session, &self.state),
                None => Ok(None),
            },
            Rolle::InstanzClient => match frame.befehl() {
                Some(befehl) if befehl.name == BefehlsName::Ping => {
                    heartbeat_handler::handle_ping(session)
                }
                Some(befehl) => Err(SignalingError::nicht_autorisiert(format!(
                    "'{}' von Instanz-Client",
                    befehl.name
                ))),
                None => Ok(None),
            },
        }
    }

    fn dispatch_nicht_authentifiziert(
        &self,
        session: &Arc<Session>,
        frame: ClientFrame,
    ) -> SignalingResult<Option<ServerNachricht>> {
        if let Some(kandidat) = frame.admin_key.as_deref() {
            if self.state.config.admin_key.pruefen(kandidat) {
                return auth_handler::handle_admin_anmeldung(session, &self.state);
            }
            tracing::warn!(
                verbindung = %session.id(),
                peer = ?session.peer(),
                "Falscher Admin-Schluessel"
            );
        }

        match frame.registrierung() {
            Some(Registrierung::Vollstaendig(identitaet)) => {
                auth_handler::handle_registrierung(identitaet, session, &self.state)
            }
            Some(Registrierung::Unvollstaendig(grund)) => {
                Err(SignalingError::UnvollstaendigeRegistrierung(grund))
            }
            None => match frame.befehl() {
                Some(befehl) => Err(SignalingError::nicht_autorisiert(format!(
                    "'{}' vor der Anmeldung",
                    befehl.name
                ))),
                None => Ok(None),
            },
        }
    }

    fn fehler_behandeln(
        &self,
        session: &Session,
        fehler: SignalingError,
    ) -> Option<ServerNachricht> {
        match &fehler {
            SignalingError::UngueltigeNutzlast(_) => {
                self.state.metriken.ungueltige_nachrichten_total.inc();
                tracing::debug!(verbindung = %session.id(), fehler = %fehler, "Frame abgelehnt");
            }
            SignalingError::ZielNichtGefunden(_) => {
                tracing::info!(verbindung = %session.id(), fehler = %fehler, "Kein Ziel gefunden");
            }
            _ => {
                tracing::debug!(verbindung = %session.id(), fehler = %fehler, "Frame verworfen");
            }
        }
        fehler.antwort()
    }
}
