//! Heartbeat-Monitor – Trennt Instanz-Clients ohne Lebenszeichen
//!
//! Prueft periodisch alle offenen Verbindungen. Operatoren sind
//! ausgenommen; Instanz-Clients und nie registrierte Verbindungen, deren
//! letzter Heartbeat laenger als der Timeout zurueckliegt, werden getrennt.
//! Das Trennen laeuft ueber `SignalingState::trennen` und ist damit auch
//! bei gleichzeitigem Client-Disconnect hoechstens einmal wirksam.

use relay_core::VerbindungsId;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::SignalingError;
use crate::server_state::SignalingState;
use crate::session::{Rolle, TrennGrund};

/// Periodische Heartbeat-Pruefung
#[derive(Clone)]
pub struct HeartbeatMonitor {
    state: Arc<SignalingState>,
}

impl HeartbeatMonitor {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Fuehrt eine Pruefung zum Zeitpunkt `jetzt` durch
    ///
    /// Gibt die IDs der getrennten Verbindungen zurueck.
    pub fn pruefen(&self, jetzt: Instant) -> Vec<VerbindungsId> {
        let timeout = self.state.config.heartbeat_timeout;
        let mut getrennt = Vec::new();

        for session in self.state.verbindungen_schnappschuss() {
            if session.rolle() == Rolle::Operator {
                continue;
            }
            let alter = session.heartbeat_alter(jetzt);
            if alter <= timeout {
                continue;
            }
            if self.state.trennen(&session, TrennGrund::HeartbeatTimeout) {
                tracing::warn!(
                    verbindung = %session.id(),
                    rolle = %session.rolle(),
                    fehler = %SignalingError::VerbindungVeraltet(alter),
                    "Verbindung wegen Heartbeat-Timeout getrennt"
                );
                getrennt.push(session.id());
            }
        }

        getrennt
    }

    /// Startet den periodischen Pruef-Task
    ///
    /// Der Task endet, sobald `shutdown_rx` auf `true` wechselt.
    pub fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.state.config.heartbeat_intervall);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // Ersten Tick ueberspringen

            tracing::info!(
                intervall = ?self.state.config.heartbeat_intervall,
                timeout = ?self.state.config.heartbeat_timeout,
                "Heartbeat-Monitor gestartet"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let getrennt = self.pruefen(Instant::now());
                        if !getrennt.is_empty() {
                            tracing::info!(anzahl = getrennt.len(), "Veraltete Verbindungen getrennt");
                        }
                    }
                    Ok(()) = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Heartbeat-Monitor beendet");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin_key::AdminKey;
    use crate::server_state::SignalingConfig;
    use relay_core::{Identitaet, LaufId, TeilnehmerId, WeltId};
    use relay_observability::RelayMetrics;
    use std::time::Duration;

    fn state_mit(intervall: Duration, timeout: Duration) -> Arc<SignalingState> {
        let mut config = SignalingConfig::neu(AdminKey::neu("k").unwrap());
        config.heartbeat_intervall = intervall;
        config.heartbeat_timeout = timeout;
        SignalingState::neu(config, RelayMetrics::neu().unwrap())
    }

    fn state() -> Arc<SignalingState> {
        state_mit(Duration::from_secs(5), Duration::from_secs(10))
    }

    fn registrieren(state: &SignalingState, session: &Arc<crate::session::Session>, teilnehmer: i64) {
        session.als_instanz_registrieren(
            Identitaet::neu(
                WeltId::neu("w").unwrap(),
                LaufId::neu("j").unwrap(),
                TeilnehmerId::neu(teilnehmer).unwrap(),
                format!("spieler-{teilnehmer}"),
            )
            .unwrap(),
        );
        state.registry.registrieren(Arc::clone(session));
    }

    #[test]
    fn veraltete_instanz_wird_getrennt() {
        let state = state();
        let (veraltet, _r1) = state.verbindung_oeffnen(None);
        let (frisch, _r2) = state.verbindung_oeffnen(None);
        registrieren(&state, &veraltet, 1);
        registrieren(&state, &frisch, 2);

        let basis = Instant::now();
        veraltet.heartbeat_setzen(basis);
        frisch.heartbeat_setzen(basis + Duration::from_secs(5));

        let monitor = HeartbeatMonitor::neu(Arc::clone(&state));
        let getrennt = monitor.pruefen(basis + Duration::from_secs(11));

        assert_eq!(getrennt, vec![veraltet.id()]);
        assert!(veraltet.ist_geschlossen());
        assert!(!frisch.ist_geschlossen());
        assert_eq!(state.registry.anzahl(), 1);
        assert_eq!(state.metriken.evictions_total.get(), 1);
    }

    #[test]
    fn genau_am_timeout_bleibt_verbunden() {
        let state = state();
        let (session, _rx) = state.verbindung_oeffnen(None);
        registrieren(&state, &session, 1);
        let basis = Instant::now();
        session.heartbeat_setzen(basis);

        let monitor = HeartbeatMonitor::neu(Arc::clone(&state));
        assert!(monitor.pruefen(basis + Duration::from_secs(10)).is_empty());
        assert!(!session.ist_geschlossen());
    }

    #[test]
    fn operatoren_sind_ausgenommen() {
        let state = state();
        let (operator, _rx) = state.verbindung_oeffnen(None);
        operator.zum_operator_befoerdern();
        let basis = Instant::now();
        operator.heartbeat_setzen(basis);

        let monitor = HeartbeatMonitor::neu(Arc::clone(&state));
        assert!(monitor.pruefen(basis + Duration::from_secs(60)).is_empty());
        assert!(!operator.ist_geschlossen());
    }

    #[test]
    fn nie_registrierte_verbindung_wird_getrennt() {
        let state = state();
        let (session, _rx) = state.verbindung_oeffnen(None);
        let basis = Instant::now();
        session.heartbeat_setzen(basis);

        let monitor = HeartbeatMonitor::neu(Arc::clone(&state));
        assert_eq!(
            monitor.pruefen(basis + Duration::from_secs(11)),
            vec![session.id()]
        );
        assert_eq!(state.verbindung_anzahl(), 0);
    }

    #[test]
    fn bereits_getrennte_session_zaehlt_nicht() {
        let state = state();
        let (session, _rx) = state.verbindung_oeffnen(None);
        registrieren(&state, &session, 1);
        let basis = Instant::now();
        session.heartbeat_setzen(basis);

        // Client trennt vor dem Sweep; der Sweep darf nicht erneut abmelden
        state.trennen(&session, TrennGrund::ClientGetrennt);
        let monitor = HeartbeatMonitor::neu(Arc::clone(&state));
        assert!(monitor.pruefen(basis + Duration::from_secs(30)).is_empty());
        assert_eq!(state.metriken.evictions_total.get(), 0);
    }

    #[tokio::test]
    async fn task_trennt_und_endet_beim_shutdown() {
        let state = state_mit(Duration::from_millis(20), Duration::from_millis(50));
        let (session, _rx) = state.verbindung_oeffnen(None);
        registrieren(&state, &session, 1);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = HeartbeatMonitor::neu(Arc::clone(&state)).starten(shutdown_rx);

        tokio::time::timeout(Duration::from_secs(2), session.geschlossen())
            .await
            .expect("Session haette getrennt werden muessen");
        assert!(state.registry.ist_leer());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Monitor haette enden muessen")
            .unwrap();
    }
}
