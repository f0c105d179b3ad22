//! Gemeinsamer Admin-Schluessel fuer Operator-Verbindungen
//!
//! Der Schluessel kommt ausschliesslich aus der Konfiguration und wird im
//! Konstantzeit-Vergleich geprueft. `Debug` gibt ihn nie aus.

use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{SignalingError, SignalingResult};

/// Admin-Schluessel (geteilt, unveraenderlich)
#[derive(Clone)]
pub struct AdminKey(Arc<str>);

impl AdminKey {
    /// Erstellt einen Schluessel; leere Werte sind ein Konfigurationsfehler
    pub fn neu(wert: impl AsRef<str>) -> SignalingResult<Self> {
        let wert = wert.as_ref();
        if wert.trim().is_empty() {
            return Err(SignalingError::konfiguration(
                "Admin-Schluessel darf nicht leer sein",
            ));
        }
        Ok(Self(Arc::from(wert)))
    }

    /// Vergleicht einen Kandidaten in konstanter Zeit
    pub fn pruefen(&self, kandidat: &str) -> bool {
        bool::from(self.0.as_bytes().ct_eq(kandidat.as_bytes()))
    }
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminKey(***)")
    }
}
