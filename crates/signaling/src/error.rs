//! Fehlertypen fuer den Signaling-Service
//!
//! Jeder Fehler betrifft genau eine Verbindung; keiner beendet den Prozess.
//! Welche Fehler der Absender zu sehen bekommt, entscheidet `antwort()`.

use relay_core::CoreError;
use relay_protocol::{ProtokollFehler, ServerNachricht};
use std::time::Duration;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Frame ist nicht parsebar oder verletzt das Schema
    #[error("Ungueltige Nutzlast: {0}")]
    UngueltigeNutzlast(#[from] ProtokollFehler),

    /// Registrierung mit fehlenden oder leeren Identitaetsfeldern
    #[error("Unvollstaendige Registrierung: {0}")]
    UnvollstaendigeRegistrierung(CoreError),

    /// Befehl passt nicht zur Rolle der Verbindung
    #[error("Nicht autorisiert: {0}")]
    NichtAutorisiert(String),

    /// Operator-Befehl ohne passende Instanz-Clients
    #[error("Ziel nicht gefunden: {0}")]
    ZielNichtGefunden(String),

    /// Heartbeat-Timeout ueberschritten
    #[error("Kein Heartbeat seit {0:?}")]
    VerbindungVeraltet(Duration),

    /// Ungueltige Konfiguration
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl SignalingError {
    /// Erstellt einen Autorisierungsfehler
    pub fn nicht_autorisiert(msg: impl Into<String>) -> Self {
        Self::NichtAutorisiert(msg.into())
    }

    /// Erstellt einen Konfigurationsfehler
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }

    /// Antwort an den Absender; `None` bedeutet stilles Verwerfen
    pub fn antwort(&self) -> Option<ServerNachricht> {
        match self {
            Self::UngueltigeNutzlast(_) => Some(ServerNachricht::ungueltige_nutzlast()),
            Self::ZielNichtGefunden(bezeichnung) => {
                Some(ServerNachricht::nicht_gefunden(bezeichnung))
            }
            Self::UnvollstaendigeRegistrierung(_)
            | Self::NichtAutorisiert(_)
            | Self::VerbindungVeraltet(_)
            | Self::Konfiguration(_) => None,
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ungueltige_nutzlast_wird_gemeldet() {
        let fehler = SignalingError::from(ProtokollFehler::KeinObjekt);
        assert_eq!(
            fehler.antwort(),
            Some(ServerNachricht::ungueltige_nutzlast())
        );
    }

    #[test]
    fn ziel_nicht_gefunden_wird_gemeldet() {
        let fehler = SignalingError::ZielNichtGefunden("Alice".into());
        assert_eq!(
            fehler.antwort(),
            Some(ServerNachricht::antwort("Client Alice not found"))
        );
    }

    #[test]
    fn stille_fehler_ohne_antwort() {
        assert!(SignalingError::nicht_autorisiert("x").antwort().is_none());
        assert!(
            SignalingError::UnvollstaendigeRegistrierung(CoreError::LeereKennung("JobId"))
                .antwort()
                .is_none()
        );
        assert!(SignalingError::VerbindungVeraltet(Duration::from_secs(11))
            .antwort()
            .is_none());
    }
}
