//! Fehlertypen fuer relay-core
//!
//! Beschreibt ausschliesslich Validierungsfehler beim Aufbau von Kennungen.
//! Netzwerk- und Protokollfehler leben in den jeweiligen Crates.

use thiserror::Error;

/// Result-Alias fuer relay-core
pub type Result<T> = std::result::Result<T, CoreError>;

/// Fehler beim Erzeugen von Kennungen und Identitaeten
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Pflichtfeld fehlt oder ist leer
    #[error("Kennung fehlt oder ist leer: {0}")]
    LeereKennung(&'static str),

    /// Teilnehmer-ID ist keine gueltige Ganzzahl ungleich 0
    #[error("Ungueltige Teilnehmer-ID: {0}")]
    UngueltigeTeilnehmerId(String),
}
