//! Relay-Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use relay_observability::logging_initialisieren;
use relay_server::{
    config::{RelayConfig, ENV_CONFIG, STANDARD_PFAD},
    Server,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_PFAD.into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let mut config = RelayConfig::laden(&config_pfad)?;
    config.umgebung_anwenden()?;
    config.validieren()?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Relay wird initialisiert"
    );

    Server::neu(config).starten().await
}
