//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Konfiguration, Registry, Zielauswahl, Metriken und die Tabelle
//! aller offenen Verbindungen. Wird als `Arc<SignalingState>` zwischen den
//! Verbindungs-Tasks und dem Heartbeat-Monitor geteilt.

use dashmap::DashMap;
use relay_core::VerbindungsId;
use relay_observability::RelayMetrics;
use relay_protocol::ServerNachricht;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::admin_key::AdminKey;
use crate::error::{SignalingError, SignalingResult};
use crate::registry::ConnectionRegistry;
use crate::session::{Rolle, Session, TrennGrund};
use crate::targeting::TargetingResolver;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Gemeinsamer Schluessel fuer Operator-Verbindungen
    pub admin_key: AdminKey,
    /// Abstand zwischen zwei Heartbeat-Pruefungen
    pub heartbeat_intervall: Duration,
    /// Instanz-Clients ohne Heartbeat laenger als dieser Wert werden getrennt
    pub heartbeat_timeout: Duration,
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Groessere Frames werden ohne Parsen als ungueltig beantwortet
    pub max_nachricht_bytes: usize,
    /// Verdraengte Sessions bei erneuter Registrierung sofort trennen
    pub ersetzte_sitzung_trennen: bool,
}

impl SignalingConfig {
    /// Konfiguration mit Standardwerten (Intervall 5s, Timeout 10s)
    pub fn neu(admin_key: AdminKey) -> Self {
        Self {
            admin_key,
            heartbeat_intervall: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(10),
            send_queue_groesse: 64,
            max_nachricht_bytes: 64 * 1024,
            ersetzte_sitzung_trennen: false,
        }
    }

    /// Prueft die Werte auf Plausibilitaet
    pub fn validieren(&self) -> SignalingResult<()> {
        if self.heartbeat_intervall.is_zero() {
            return Err(SignalingError::konfiguration(
                "heartbeat_intervall muss groesser als 0 sein",
            ));
        }
        if self.heartbeat_timeout < self.heartbeat_intervall {
            return Err(SignalingError::konfiguration(
                "heartbeat_timeout darf nicht kleiner als heartbeat_intervall sein",
            ));
        }
        if self.send_queue_groesse == 0 {
            return Err(SignalingError::konfiguration(
                "send_queue_groesse muss groesser als 0 sein",
            ));
        }
        if self.max_nachricht_bytes == 0 {
            return Err(SignalingError::konfiguration(
                "max_nachricht_bytes muss groesser als 0 sein",
            ));
        }
        Ok(())
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Registrierte Instanz-Clients
    pub registry: ConnectionRegistry,
    /// Zielauswahl ueber derselben Registry
    pub targeting: TargetingResolver,
    /// Prometheus-Metriken
    pub metriken: RelayMetrics,
    /// Alle offenen Verbindungen, unabhaengig von der Rolle
    verbindungen: DashMap<VerbindungsId, Arc<Session>>,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, metriken: RelayMetrics) -> Arc<Self> {
        let registry = ConnectionRegistry::neu();
        Arc::new(Self {
            config: Arc::new(config),
            targeting: TargetingResolver::neu(registry.clone()),
            registry,
            metriken,
            verbindungen: DashMap::new(),
        })
    }

    /// Legt eine Session fuer eine neue Verbindung an
    ///
    /// Der Aufrufer liest aus dem zurueckgegebenen Empfaenger und schreibt
    /// auf den Transport.
    pub fn verbindung_oeffnen(
        &self,
        peer: Option<SocketAddr>,
    ) -> (Arc<Session>, mpsc::Receiver<ServerNachricht>) {
        let (tx, rx) = mpsc::channel(self.config.send_queue_groesse);
        let session = Arc::new(Session::neu(tx, peer));
        self.verbindungen.insert(session.id(), Arc::clone(&session));
        self.gauges_aktualisieren();
        tracing::debug!(verbindung = %session.id(), peer = ?peer, "Session angelegt");
        (session, rx)
    }

    /// Beendet eine Session: schliessen, abmelden, aus der Tabelle entfernen
    ///
    /// Mehrfache Aufrufe sind harmlos; nur der erste hat eine Wirkung und
    /// liefert `true`.
    pub fn trennen(&self, session: &Session, grund: TrennGrund) -> bool {
        if !session.schliessen() {
            return false;
        }

        let abgemeldet = self.registry.abmelden(session);
        self.verbindungen.remove(&session.id());

        let rolle = session.rolle();
        if rolle == Rolle::Operator {
            self.metriken.operatoren.dec();
        }
        if grund == TrennGrund::HeartbeatTimeout {
            self.metriken.evictions_total.inc();
        }
        self.gauges_aktualisieren();

        match session.identitaet() {
            Some(identitaet) => tracing::info!(
                verbindung = %session.id(),
                client = %identitaet,
                grund = %grund,
                abgemeldet,
                "Instanz-Client getrennt"
            ),
            None => tracing::info!(
                verbindung = %session.id(),
                rolle = %rolle,
                grund = %grund,
                "Verbindung getrennt"
            ),
        }
        true
    }

    /// Trennt alle offenen Verbindungen (z.B. beim Herunterfahren)
    pub fn alle_trennen(&self, grund: TrennGrund) -> usize {
        self.verbindungen_schnappschuss()
            .iter()
            .filter(|session| self.trennen(session, grund))
            .count()
    }

    /// Momentaufnahme aller offenen Verbindungen
    pub fn verbindungen_schnappschuss(&self) -> Vec<Arc<Session>> {
        self.verbindungen
            .iter()
            .map(|eintrag| Arc::clone(eintrag.value()))
            .collect()
    }

    pub fn verbindung_anzahl(&self) -> usize {
        self.verbindungen.len()
    }

    /// Setzt Verbindungs- und Client-Gauges auf den aktuellen Stand
    pub fn gauges_aktualisieren(&self) {
        self.metriken
            .verbindungen_aktiv
            .set(self.verbindungen.len() as i64);
        self.metriken
            .instanz_clients
            .set(self.registry.anzahl() as i64);
    }
}
