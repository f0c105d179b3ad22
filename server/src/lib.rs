//! relay-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod http;

use anyhow::{Context, Result};
use config::RelayConfig;
use relay_observability::{HealthState, RelayMetrics};
use relay_signaling::{HeartbeatMonitor, SignalingState, TrennGrund};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Alle geteilten Teile eines laufenden Relays
pub struct Relay {
    pub signaling: Arc<SignalingState>,
    pub health: HealthState,
    pub metriken: RelayMetrics,
}

impl Relay {
    /// Baut Zustand, Metriken und Health aus der Konfiguration
    pub fn aufbauen(config: &RelayConfig) -> Result<Self> {
        let signaling_config = config.signaling_config()?;
        let metriken = RelayMetrics::neu().context("Metriken konnten nicht registriert werden")?;
        Ok(Self {
            signaling: SignalingState::neu(signaling_config, metriken.clone()),
            health: HealthState::neu(metriken.clone()),
            metriken,
        })
    }

    /// Router fuer WebSocket, Health und (optional) Metriken
    pub fn router(&self, metriken_aktiviert: bool) -> axum::Router {
        http::router(
            Arc::clone(&self.signaling),
            self.health.clone(),
            metriken_aktiviert.then(|| self.metriken.clone()),
        )
    }
}

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: RelayConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Konfiguration pruefen, Zustand aufbauen
    /// 2. Heartbeat-Monitor starten
    /// 3. HTTP/WebSocket-Listener binden
    /// 4. Auf Ctrl-C warten, dann alle Verbindungen schliessen
    pub async fn starten(self) -> Result<()> {
        self.config.validieren()?;
        let relay = Relay::aufbauen(&self.config)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let monitor = HeartbeatMonitor::neu(Arc::clone(&relay.signaling)).starten(shutdown_rx);

        let adresse = self.config.bind_adresse();
        let listener = TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Adresse '{adresse}' konnte nicht gebunden werden"))?;

        tracing::info!(
            adresse = %adresse,
            metriken = self.config.observability.metriken_aktiviert,
            ersetzte_sitzung_trennen = self.config.relay.ersetzte_sitzung_trennen,
            "Relay bereit"
        );

        let app = relay.router(self.config.observability.metriken_aktiviert);
        let signaling = Arc::clone(&relay.signaling);
        let health = relay.health.clone();

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            }
            tracing::info!("Shutdown-Signal empfangen, Relay wird beendet");
            health.herunterfahren();
            let _ = shutdown_tx.send(true);
            let getrennt = signaling.alle_trennen(TrennGrund::Shutdown);
            tracing::info!(getrennt, "Alle Verbindungen geschlossen");
        })
        .await
        .context("HTTP-Server abgebrochen")?;

        if let Err(e) = monitor.await {
            tracing::warn!(fehler = %e, "Heartbeat-Monitor unsauber beendet");
        }

        tracing::info!("Relay beendet");
        Ok(())
    }
}
