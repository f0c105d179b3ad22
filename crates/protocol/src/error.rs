//! Fehlertypen fuer das Nachrichtenformat

use thiserror::Error;

/// Fehler beim Parsen oder Serialisieren von Relay-Nachrichten
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtokollFehler {
    /// Frame ist kein gueltiges JSON
    #[error("Ungueltiges JSON: {0}")]
    UngueltigesJson(String),

    /// Frame ist gueltiges JSON, aber kein Objekt
    #[error("Frame ist kein JSON-Objekt")]
    KeinObjekt,

    /// Bekanntes Feld mit falschem Typ oder Wert
    #[error("Ungueltiges Feld '{feld}': {grund}")]
    UngueltigesFeld { feld: &'static str, grund: String },

    /// Antwort konnte nicht serialisiert werden
    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(String),
}

/// Result-Typ fuer das Nachrichtenformat
pub type ProtokollResult<T> = Result<T, ProtokollFehler>;
