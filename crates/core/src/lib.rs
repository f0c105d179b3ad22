//! relay-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die Kennungen bereit, ueber die das Relay
//! Instanz-Clients adressiert: Welt (`PlaceId`) -> Lauf (`JobId`) ->
//! Teilnehmer (`UserId`), dazu die Verbindungs-ID jeder offenen Sitzung.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{CoreError, Result};
pub use types::{Identitaet, LaufId, TeilnehmerId, VerbindungsId, WeltId};
