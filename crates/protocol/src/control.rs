//! Control-Protokoll (WebSocket-Textframes)
//!
//! Jeder eingehende Frame ist genau ein JSON-Objekt. Welche Bedeutung ein
//! Frame hat, haengt von der Rolle der sendenden Verbindung ab; dieses Modul
//! validiert deshalb nur das Schema und stellt typisierte Sichten bereit:
//!
//! - `{adminKey}`                          -> Operator-Anmeldung
//! - `{PlaceId, JobId, UserId, Username}`  -> Registrierung eines Instanz-Clients
//! - `{command, data?}`                    -> Befehl (Heartbeat oder Operator)
//!
//! Ausgehende Nachrichten sind ungetaggte Objekte (`ServerNachricht`).

use relay_core::{CoreError, Identitaet, LaufId, TeilnehmerId, WeltId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProtokollFehler, ProtokollResult};

// ---------------------------------------------------------------------------
// Antworttexte
// ---------------------------------------------------------------------------

pub const ANTWORT_ADMIN_AUTHENTIFIZIERT: &str = "Admin authenticated";
pub const ANTWORT_REGISTRIERT: &str = "Client registered successfully";
pub const ANTWORT_PONG: &str = "pong";
pub const FEHLER_UNGUELTIGE_NUTZLAST: &str = "Invalid payload";

// ---------------------------------------------------------------------------
// Kennwerte
// ---------------------------------------------------------------------------

/// Kennung, die als JSON-Zahl oder als Zeichenkette ankommen darf
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Kennwert {
    Zahl(serde_json::Number),
    Text(String),
}

impl Kennwert {
    /// Textdarstellung; `None` wenn leer
    pub fn als_text(&self) -> Option<String> {
        match self {
            Kennwert::Zahl(n) => Some(n.to_string()),
            Kennwert::Text(t) if t.trim().is_empty() => None,
            Kennwert::Text(t) => Some(t.clone()),
        }
    }

    /// Numerische Teilnehmer-ID (Ganzzahl oder dezimaler Text)
    pub fn als_teilnehmer(&self) -> Result<TeilnehmerId, CoreError> {
        match self {
            Kennwert::Zahl(n) => match n.as_i64() {
                Some(wert) => TeilnehmerId::neu(wert),
                None => Err(CoreError::UngueltigeTeilnehmerId(n.to_string())),
            },
            Kennwert::Text(t) => TeilnehmerId::parsen(t),
        }
    }
}

// ---------------------------------------------------------------------------
// Eingehende Frames
// ---------------------------------------------------------------------------

/// Schema eines eingehenden Frames
///
/// Alle Felder sind optional; ein bekanntes Feld mit falschem JSON-Typ
/// laesst das Parsen scheitern. Unbekannte Felder werden ignoriert.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "adminKey", default)]
    pub admin_key: Option<String>,
    #[serde(rename = "PlaceId", default)]
    pub place_id: Option<Kennwert>,
    #[serde(rename = "JobId", default)]
    pub job_id: Option<Kennwert>,
    #[serde(rename = "UserId", default)]
    pub user_id: Option<Kennwert>,
    #[serde(rename = "Username", default)]
    pub username: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// Ergebnis der Registrierungs-Sicht auf einen Frame
#[derive(Debug, Clone, PartialEq)]
pub enum Registrierung {
    /// Alle vier Identitaetsfelder vorhanden und nicht leer
    Vollstaendig(Identitaet),
    /// Mindestens ein Feld vorhanden, aber nicht alle gueltig
    Unvollstaendig(CoreError),
}

impl ClientFrame {
    /// Parst einen Textframe gegen das Schema
    pub fn parsen(text: &str) -> ProtokollResult<Self> {
        let wert: Value = serde_json::from_str(text)
            .map_err(|e| ProtokollFehler::UngueltigesJson(e.to_string()))?;
        if !wert.is_object() {
            return Err(ProtokollFehler::KeinObjekt);
        }
        serde_json::from_value(wert).map_err(|e| ProtokollFehler::UngueltigesFeld {
            feld: "frame",
            grund: e.to_string(),
        })
    }

    /// Sicht als Registrierung; `None` wenn kein Identitaetsfeld gesetzt ist
    pub fn registrierung(&self) -> Option<Registrierung> {
        if self.place_id.is_none()
            && self.job_id.is_none()
            && self.user_id.is_none()
            && self.username.is_none()
        {
            return None;
        }

        Some(match self.identitaet_bauen() {
            Ok(identitaet) => Registrierung::Vollstaendig(identitaet),
            Err(fehler) => Registrierung::Unvollstaendig(fehler),
        })
    }

    fn identitaet_bauen(&self) -> Result<Identitaet, CoreError> {
        let welt = self
            .place_id
            .as_ref()
            .and_then(Kennwert::als_text)
            .ok_or(CoreError::LeereKennung("PlaceId"))?;
        let lauf = self
            .job_id
            .as_ref()
            .and_then(Kennwert::als_text)
            .ok_or(CoreError::LeereKennung("JobId"))?;
        let teilnehmer = self
            .user_id
            .as_ref()
            .ok_or(CoreError::LeereKennung("UserId"))?
            .als_teilnehmer()?;
        let anzeigename = self
            .username
            .as_deref()
            .ok_or(CoreError::LeereKennung("Username"))?;

        Identitaet::neu(
            WeltId::neu(welt)?,
            LaufId::neu(lauf)?,
            teilnehmer,
            anzeigename,
        )
    }

    /// Sicht als Befehl; `None` ohne `command`-Feld
    pub fn befehl(&self) -> Option<Befehl> {
        let name = self.command.as_deref()?;
        Some(Befehl {
            name: BefehlsName::aus_name(name),
            daten: self.data.clone().unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Befehle
// ---------------------------------------------------------------------------

/// Bekannte Befehlsnamen (Gross-/Kleinschreibung wie auf der Leitung)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BefehlsName {
    Kick,
    Broadcast,
    Teleport,
    PlayEmote,
    Freeze,
    Unfreeze,
    Kill,
    ListClients,
    Ping,
    Unbekannt(String),
}

impl BefehlsName {
    pub fn aus_name(name: &str) -> Self {
        match name {
            "kick" => Self::Kick,
            "broadcast" => Self::Broadcast,
            "teleport" => Self::Teleport,
            "playEmote" => Self::PlayEmote,
            "freeze" => Self::Freeze,
            "unfreeze" => Self::Unfreeze,
            "kill" => Self::Kill,
            "listClients" => Self::ListClients,
            "ping" => Self::Ping,
            anderer => Self::Unbekannt(anderer.to_string()),
        }
    }

    pub fn als_str(&self) -> &str {
        match self {
            Self::Kick => "kick",
            Self::Broadcast => "broadcast",
            Self::Teleport => "teleport",
            Self::PlayEmote => "playEmote",
            Self::Freeze => "freeze",
            Self::Unfreeze => "unfreeze",
            Self::Kill => "kill",
            Self::ListClients => "listClients",
            Self::Ping => "ping",
            Self::Unbekannt(name) => name,
        }
    }

    /// Befehle, die ueber die Zielauswahl an Instanz-Clients gehen
    pub fn ist_zielbefehl(&self) -> bool {
        matches!(
            self,
            Self::Kick
                | Self::Broadcast
                | Self::Teleport
                | Self::PlayEmote
                | Self::Freeze
                | Self::Unfreeze
                | Self::Kill
        )
    }
}

impl std::fmt::Display for BefehlsName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

/// Ein geparster Befehl samt unveraenderter `data`-Nutzlast
#[derive(Debug, Clone, PartialEq)]
pub struct Befehl {
    pub name: BefehlsName,
    pub daten: Map<String, Value>,
}

impl Befehl {
    /// Zielauswahl aus `data.targetUserId` / `data.targetUsername`
    pub fn ziel(&self) -> ProtokollResult<Ziel> {
        Ziel::aus_daten(&self.daten)
    }
}

// ---------------------------------------------------------------------------
// Zielauswahl
// ---------------------------------------------------------------------------

/// Welche Instanz-Clients einen Operator-Befehl erhalten
///
/// Sind ID und Name gesetzt, muessen beide zutreffen (UND-Verknuepfung).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ziel {
    Alle,
    Teilnehmer(TeilnehmerId),
    Anzeigename(String),
    TeilnehmerUndName {
        teilnehmer: TeilnehmerId,
        anzeigename: String,
    },
}

impl Ziel {
    /// Liest die Zielfelder; nur `null` und `""` gelten als nicht gesetzt
    pub fn aus_daten(daten: &Map<String, Value>) -> ProtokollResult<Self> {
        let teilnehmer = match daten.get("targetUserId") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::Number(n)) => Some(Kennwert::Zahl(n.clone())),
            Some(Value::String(s)) => Some(Kennwert::Text(s.clone())),
            Some(anderer) => {
                return Err(ProtokollFehler::UngueltigesFeld {
                    feld: "targetUserId",
                    grund: format!("Zahl erwartet, erhalten: {anderer}"),
                })
            }
        };
        let teilnehmer = teilnehmer
            .map(|k| k.als_teilnehmer())
            .transpose()
            .map_err(|e| ProtokollFehler::UngueltigesFeld {
                feld: "targetUserId",
                grund: e.to_string(),
            })?;

        let anzeigename = match daten.get("targetUsername") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(anderer) => {
                return Err(ProtokollFehler::UngueltigesFeld {
                    feld: "targetUsername",
                    grund: format!("Zeichenkette erwartet, erhalten: {anderer}"),
                })
            }
        };

        Ok(match (teilnehmer, anzeigename) {
            (None, None) => Ziel::Alle,
            (Some(teilnehmer), None) => Ziel::Teilnehmer(teilnehmer),
            (None, Some(anzeigename)) => Ziel::Anzeigename(anzeigename),
            (Some(teilnehmer), Some(anzeigename)) => Ziel::TeilnehmerUndName {
                teilnehmer,
                anzeigename,
            },
        })
    }

    /// Bezeichnung fuer Antworttexte wie "Kicked <name>"
    pub fn bezeichnung(&self) -> String {
        match self {
            Ziel::Alle => "all".to_string(),
            Ziel::Teilnehmer(id) => id.to_string(),
            Ziel::Anzeigename(name) | Ziel::TeilnehmerUndName { anzeigename: name, .. } => {
                name.clone()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten
// ---------------------------------------------------------------------------

/// Eintrag der Client-Liste fuer `listClients`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientZusammenfassung {
    #[serde(rename = "Username")]
    pub anzeigename: String,
    #[serde(rename = "UserId")]
    pub teilnehmer: TeilnehmerId,
    #[serde(rename = "PlaceId")]
    pub welt: WeltId,
    #[serde(rename = "JobId")]
    pub lauf: LaufId,
}

impl From<&Identitaet> for ClientZusammenfassung {
    fn from(identitaet: &Identitaet) -> Self {
        Self {
            anzeigename: identitaet.anzeigename.clone(),
            teilnehmer: identitaet.teilnehmer,
            welt: identitaet.welt.clone(),
            lauf: identitaet.lauf.clone(),
        }
    }
}

/// Alle Nachrichten, die das Relay an Clients sendet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerNachricht {
    Antwort { response: String },
    Fehler { error: String },
    Befehl { command: String, args: Value },
    ClientListe { clients: Vec<ClientZusammenfassung> },
}

impl ServerNachricht {
    pub fn antwort(text: impl Into<String>) -> Self {
        Self::Antwort {
            response: text.into(),
        }
    }

    pub fn admin_authentifiziert() -> Self {
        Self::antwort(ANTWORT_ADMIN_AUTHENTIFIZIERT)
    }

    pub fn registriert() -> Self {
        Self::antwort(ANTWORT_REGISTRIERT)
    }

    pub fn pong() -> Self {
        Self::antwort(ANTWORT_PONG)
    }

    pub fn ungueltige_nutzlast() -> Self {
        Self::Fehler {
            error: FEHLER_UNGUELTIGE_NUTZLAST.to_string(),
        }
    }

    pub fn gekickt(bezeichnung: &str) -> Self {
        Self::antwort(format!("Kicked {bezeichnung}"))
    }

    pub fn nicht_gefunden(bezeichnung: &str) -> Self {
        Self::antwort(format!("Client {bezeichnung} not found"))
    }

    /// Weitergeleiteter Operator-Befehl `{command, args}`
    pub fn befehl(name: &BefehlsName, args: Map<String, Value>) -> Self {
        Self::Befehl {
            command: name.als_str().to_string(),
            args: Value::Object(args),
        }
    }

    pub fn client_liste(clients: Vec<ClientZusammenfassung>) -> Self {
        Self::ClientListe { clients }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> ProtokollResult<String> {
        serde_json::to_string(self).map_err(|e| ProtokollFehler::Serialisierung(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
