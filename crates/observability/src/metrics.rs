//! Prometheus-kompatible Metriken fuer das Relay
//!
//! Registrierte Metriken:
//! - `relay_verbindungen_aktiv` – Gauge: Offene Verbindungen (alle Rollen)
//! - `relay_instanz_clients` – Gauge: Registrierte Instanz-Clients
//! - `relay_operatoren` – Gauge: Angemeldete Operator-Verbindungen
//! - `relay_evictions_total` – Counter: Per Heartbeat-Timeout getrennte Verbindungen
//! - `relay_befehle_total` – Counter: Operator-Befehle (Label `befehl`)
//! - `relay_ungueltige_nachrichten_total` – Counter: Mit "Invalid payload" beantwortete Frames
//! - `process_*` – Prozessmetriken (CPU, Speicher, Datei-Deskriptoren), nur unter Linux

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Relay-Prometheus-Metriken
///
/// Clone teilt die zugrundeliegenden Zaehler; jede Instanz besitzt eine
/// eigene Registry, sodass Tests sich nicht gegenseitig beeinflussen.
#[derive(Clone)]
pub struct RelayMetrics {
    pub registry: Arc<Registry>,

    pub verbindungen_aktiv: IntGauge,
    pub instanz_clients: IntGauge,
    pub operatoren: IntGauge,
    pub evictions_total: IntCounter,
    pub befehle_total: IntCounterVec,
    pub ungueltige_nachrichten_total: IntCounter,
}

impl RelayMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let verbindungen_aktiv = IntGauge::with_opts(Opts::new(
            "relay_verbindungen_aktiv",
            "Anzahl offener Verbindungen (alle Rollen)",
        ))?;
        registry.register(Box::new(verbindungen_aktiv.clone()))?;

        let instanz_clients = IntGauge::with_opts(Opts::new(
            "relay_instanz_clients",
            "Anzahl registrierter Instanz-Clients",
        ))?;
        registry.register(Box::new(instanz_clients.clone()))?;

        let operatoren = IntGauge::with_opts(Opts::new(
            "relay_operatoren",
            "Anzahl angemeldeter Operator-Verbindungen",
        ))?;
        registry.register(Box::new(operatoren.clone()))?;

        let evictions_total = IntCounter::with_opts(Opts::new(
            "relay_evictions_total",
            "Per Heartbeat-Timeout getrennte Verbindungen",
        ))?;
        registry.register(Box::new(evictions_total.clone()))?;

        let befehle_total = IntCounterVec::new(
            Opts::new("relay_befehle_total", "Verarbeitete Operator-Befehle"),
            &["befehl"],
        )?;
        registry.register(Box::new(befehle_total.clone()))?;

        let ungueltige_nachrichten_total = IntCounter::with_opts(Opts::new(
            "relay_ungueltige_nachrichten_total",
            "Mit 'Invalid payload' beantwortete Frames",
        ))?;
        registry.register(Box::new(ungueltige_nachrichten_total.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            verbindungen_aktiv,
            instanz_clients,
            operatoren,
            evictions_total,
            befehle_total,
            ungueltige_nachrichten_total,
        })
    }

    /// Zaehlt einen Operator-Befehl
    pub fn befehl_zaehlen(&self, befehl: &str) {
        self.befehle_total.with_label_values(&[befehl]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RelayMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RelayMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
