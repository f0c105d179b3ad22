//! relay-protocol – Nachrichtenformate des Relays
//!
//! Definiert das Schema eingehender Frames (`ClientFrame`), die bekannten
//! Befehlsnamen, die Zielauswahl fuer Operator-Befehle und alle Antworten,
//! die das Relay an Clients sendet.

pub mod control;
pub mod error;

pub use control::{
    Befehl, BefehlsName, ClientFrame, ClientZusammenfassung, Kennwert, Registrierung,
    ServerNachricht, Ziel,
};
pub use error::{ProtokollFehler, ProtokollResult};
