//! Gemeinsame Identifikationstypen fuer das Relay
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Welt-, Lauf- und Teilnehmer-Kennungen zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Welt-Kennung (`PlaceId`) – die ausgerollte Anwendungsinstanz
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeltId(String);

impl WeltId {
    /// Erstellt eine WeltId, leere Werte werden abgelehnt
    pub fn neu(wert: impl Into<String>) -> Result<Self> {
        let wert = wert.into();
        if wert.trim().is_empty() {
            return Err(CoreError::LeereKennung("PlaceId"));
        }
        Ok(Self(wert))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WeltId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lauf-Kennung (`JobId`) – ein laufender Server einer Welt
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaufId(String);

impl LaufId {
    /// Erstellt eine LaufId, leere Werte werden abgelehnt
    pub fn neu(wert: impl Into<String>) -> Result<Self> {
        let wert = wert.into();
        if wert.trim().is_empty() {
            return Err(CoreError::LeereKennung("JobId"));
        }
        Ok(Self(wert))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LaufId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Teilnehmer-Kennung (`UserId`), wird numerisch verglichen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeilnehmerId(i64);

impl TeilnehmerId {
    /// Erstellt eine TeilnehmerId; 0 gilt als "nicht gesetzt"
    pub fn neu(wert: i64) -> Result<Self> {
        if wert == 0 {
            return Err(CoreError::UngueltigeTeilnehmerId(wert.to_string()));
        }
        Ok(Self(wert))
    }

    /// Parst eine TeilnehmerId aus einer dezimalen Zeichenkette
    pub fn parsen(text: &str) -> Result<Self> {
        let wert: i64 = text
            .trim()
            .parse()
            .map_err(|_| CoreError::UngueltigeTeilnehmerId(text.to_string()))?;
        Self::neu(wert)
    }

    pub fn wert(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TeilnehmerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Eindeutige ID einer offenen Verbindung (unabhaengig von der Rolle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Vollstaendige Identitaet eines registrierten Instanz-Clients
///
/// Welt, Lauf und Teilnehmer bilden zusammen den Registry-Schluessel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identitaet {
    pub welt: WeltId,
    pub lauf: LaufId,
    pub teilnehmer: TeilnehmerId,
    pub anzeigename: String,
}

impl Identitaet {
    /// Erstellt eine Identitaet; der Anzeigename darf nicht leer sein
    pub fn neu(
        welt: WeltId,
        lauf: LaufId,
        teilnehmer: TeilnehmerId,
        anzeigename: impl Into<String>,
    ) -> Result<Self> {
        let anzeigename = anzeigename.into();
        if anzeigename.trim().is_empty() {
            return Err(CoreError::LeereKennung("Username"));
        }
        Ok(Self {
            welt,
            lauf,
            teilnehmer,
            anzeigename,
        })
    }
}

impl std::fmt::Display for Identitaet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{} ({})",
            self.welt, self.lauf, self.teilnehmer, self.anzeigename
        )
    }
}
