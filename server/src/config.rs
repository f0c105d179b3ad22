//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder ausser dem
//! Admin-Schluessel haben sinnvolle Standardwerte. Umgebungsvariablen
//! (`PORT`, `RELAY_ADMIN_KEY`, `RELAY_LOG_LEVEL`, `RELAY_LOG_FORMAT`) haben
//! Vorrang vor der Datei und werden wie diese validiert.

use anyhow::{bail, Context};
use relay_observability::logging::{
    log_format_gueltig, log_level_gueltig, ENV_LOG_FORMAT, ENV_LOG_LEVEL,
};
use relay_signaling::{AdminKey, SignalingConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_CONFIG: &str = "RELAY_CONFIG";
pub const ENV_PORT: &str = "PORT";
pub const ENV_ADMIN_KEY: &str = "RELAY_ADMIN_KEY";
pub const STANDARD_PFAD: &str = "relay.toml";

/// Vollstaendige Relay-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Relay-Kern (Admin-Schluessel, Heartbeat, Queues)
    pub relay: RelayEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken)
    pub observability: ObservabilityEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP und WebSocket
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Einstellungen des Relay-Kerns
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Gemeinsamer Schluessel fuer Operatoren (Pflicht)
    pub admin_key: Option<String>,
    pub heartbeat_intervall_sek: u64,
    pub heartbeat_timeout_sek: u64,
    pub send_queue_groesse: usize,
    pub max_nachricht_bytes: usize,
    /// Bei erneuter Registrierung die alte Verbindung trennen
    pub ersetzte_sitzung_trennen: bool,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        Self {
            admin_key: None,
            heartbeat_intervall_sek: 5,
            heartbeat_timeout_sek: 10,
            send_queue_groesse: 64,
            max_nachricht_bytes: 64 * 1024,
            ersetzte_sitzung_trennen: false,
        }
    }
}

impl std::fmt::Debug for RelayEinstellungen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayEinstellungen")
            .field("admin_key", &self.admin_key.as_ref().map(|_| "***"))
            .field("heartbeat_intervall_sek", &self.heartbeat_intervall_sek)
            .field("heartbeat_timeout_sek", &self.heartbeat_timeout_sek)
            .field("send_queue_groesse", &self.send_queue_groesse)
            .field("max_nachricht_bytes", &self.max_nachricht_bytes)
            .field("ersetzte_sitzung_trennen", &self.ersetzte_sitzung_trennen)
            .finish()
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder Filter-Ausdruck: "trace", "debug", "info", ...
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Stellt `/metrics` bereit
    pub metriken_aktiviert: bool,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            metriken_aktiviert: true,
        }
    }
}

impl RelayConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("Konfigurationsdatei '{pfad}' nicht lesbar"))
            }
        }
    }

    /// Uebernimmt `PORT` und `RELAY_ADMIN_KEY` aus der Prozessumgebung
    pub fn umgebung_anwenden(&mut self) -> anyhow::Result<()> {
        self.umgebung_anwenden_aus(|name| std::env::var(name).ok())
    }

    /// Wie `umgebung_anwenden`, aber mit beliebiger Quelle
    pub fn umgebung_anwenden_aus(
        &mut self,
        lesen: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(port) = lesen(ENV_PORT).filter(|w| !w.trim().is_empty()) {
            self.netzwerk.port = port
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PORT} ist kein gueltiger Port: '{port}'"))?;
        }
        if let Some(schluessel) = lesen(ENV_ADMIN_KEY).filter(|w| !w.trim().is_empty()) {
            self.relay.admin_key = Some(schluessel);
        }
        if let Some(level) = lesen(ENV_LOG_LEVEL).filter(|w| !w.trim().is_empty()) {
            self.logging.level = level;
        }
        if let Some(format) = lesen(ENV_LOG_FORMAT).filter(|w| !w.trim().is_empty()) {
            self.logging.format = format;
        }
        Ok(())
    }

    /// Prueft die Konfiguration vor dem Start
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_format_gueltig(&self.logging.format) {
            bail!(
                "Unbekanntes Log-Format '{}' (erlaubt: text, json)",
                self.logging.format
            );
        }
        if !log_level_gueltig(&self.logging.level) {
            // Filter-Ausdruecke wie "relay_signaling=debug" sind erlaubt
            tracing::debug!(level = %self.logging.level, "Log-Level ist ein Filter-Ausdruck");
        }
        self.signaling_config()?;
        Ok(())
    }

    /// Baut die Konfiguration des Signaling-Service
    pub fn signaling_config(&self) -> anyhow::Result<SignalingConfig> {
        let Some(schluessel) = self.relay.admin_key.as_deref() else {
            bail!("Kein Admin-Schluessel konfiguriert (relay.admin_key oder {ENV_ADMIN_KEY})");
        };
        let mut config = SignalingConfig::neu(AdminKey::neu(schluessel)?);
        config.heartbeat_intervall = Duration::from_secs(self.relay.heartbeat_intervall_sek);
        config.heartbeat_timeout = Duration::from_secs(self.relay.heartbeat_timeout_sek);
        config.send_queue_groesse = self.relay.send_queue_groesse;
        config.max_nachricht_bytes = self.relay.max_nachricht_bytes;
        config.ersetzte_sitzung_trennen = self.relay.ersetzte_sitzung_trennen;
        config.validieren()?;
        Ok(config)
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }
}
