//! Session – Zustand einer einzelnen offenen Verbindung
//!
//! Jede Verbindung bekommt beim Oeffnen eine `Session`. Sie haelt die Rolle,
//! die Identitaet (nur Instanz-Clients), den letzten Heartbeat und die
//! Send-Queue, ueber die Registry, Zielauswahl und Heartbeat-Monitor
//! Nachrichten an die Verbindung schicken.
//!
//! ## Rollen
//! ```text
//! NichtAuthentifiziert --adminKey--> Operator
//!          |
//!          +--Registrierung--> InstanzClient
//! ```
//! Ein einmal gesetzte Rolle aendert sich nicht mehr.

use parking_lot::Mutex;
use relay_core::{Identitaet, VerbindungsId};
use relay_protocol::ServerNachricht;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

// ---------------------------------------------------------------------------
// Rolle und Trenngrund
// ---------------------------------------------------------------------------

/// Rolle einer Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rolle {
    /// Verbunden, weder Admin-Schluessel noch Registrierung gesehen
    NichtAuthentifiziert,
    /// Registrierter Instanz-Client (Empfaenger von Befehlen)
    InstanzClient,
    /// Per Admin-Schluessel angemeldeter Operator
    Operator,
}

impl Rolle {
    pub fn als_str(&self) -> &'static str {
        match self {
            Rolle::NichtAuthentifiziert => "nicht_authentifiziert",
            Rolle::InstanzClient => "instanz_client",
            Rolle::Operator => "operator",
        }
    }
}

impl std::fmt::Display for Rolle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

/// Warum eine Verbindung beendet wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrennGrund {
    /// Client hat die Verbindung geschlossen
    ClientGetrennt,
    /// Lesefehler auf dem Transport
    LeseFehler,
    /// Schreibfehler auf dem Transport
    SendeFehler,
    /// Kein Heartbeat innerhalb des Timeouts
    HeartbeatTimeout,
    /// Durch eine neuere Registrierung mit gleichem Schluessel ersetzt
    Ersetzt,
    /// Server faehrt herunter
    Shutdown,
}

impl TrennGrund {
    pub fn als_str(&self) -> &'static str {
        match self {
            TrennGrund::ClientGetrennt => "client_getrennt",
            TrennGrund::LeseFehler => "lesefehler",
            TrennGrund::SendeFehler => "sendefehler",
            TrennGrund::HeartbeatTimeout => "heartbeat_timeout",
            TrennGrund::Ersetzt => "ersetzt",
            TrennGrund::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for TrennGrund {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Zustand einer offenen Verbindung (Arc-geteilt)
///
/// Die Registry haelt nur `Arc<Session>`; das Beenden laeuft immer ueber
/// `schliessen()`, das genau einmal `true` liefert.
#[derive(Debug)]
pub struct Session {
    id: VerbindungsId,
    peer: Option<SocketAddr>,
    rolle: Mutex<Rolle>,
    /// Nur bei Instanz-Clients gesetzt, danach unveraenderlich
    identitaet: OnceLock<Identitaet>,
    letzter_heartbeat: Mutex<Instant>,
    ausgang: mpsc::Sender<ServerNachricht>,
    geschlossen: AtomicBool,
    schliessen_tx: watch::Sender<bool>,
}

impl Session {
    /// Erstellt eine neue, nicht authentifizierte Session
    pub fn neu(ausgang: mpsc::Sender<ServerNachricht>, peer: Option<SocketAddr>) -> Self {
        let (schliessen_tx, _) = watch::channel(false);
        Self {
            id: VerbindungsId::new(),
            peer,
            rolle: Mutex::new(Rolle::NichtAuthentifiziert),
            identitaet: OnceLock::new(),
            letzter_heartbeat: Mutex::new(Instant::now()),
            ausgang,
            geschlossen: AtomicBool::new(false),
            schliessen_tx,
        }
    }

    pub fn id(&self) -> VerbindungsId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn rolle(&self) -> Rolle {
        *self.rolle.lock()
    }

    /// Identitaet des Instanz-Clients (None fuer alle anderen Rollen)
    pub fn identitaet(&self) -> Option<&Identitaet> {
        self.identitaet.get()
    }

    /// Hebt die Verbindung zum Operator an
    ///
    /// Gelingt nur aus `NichtAuthentifiziert`.
    pub fn zum_operator_befoerdern(&self) -> bool {
        let mut rolle = self.rolle.lock();
        if *rolle != Rolle::NichtAuthentifiziert {
            return false;
        }
        *rolle = Rolle::Operator;
        true
    }

    /// Setzt Identitaet und Rolle eines Instanz-Clients
    ///
    /// Gelingt nur aus `NichtAuthentifiziert`. Der Heartbeat startet neu.
    pub fn als_instanz_registrieren(&self, identitaet: Identitaet) -> bool {
        let mut rolle = self.rolle.lock();
        if *rolle != Rolle::NichtAuthentifiziert || self.identitaet.set(identitaet).is_err() {
            return false;
        }
        *rolle = Rolle::InstanzClient;
        drop(rolle);
        self.heartbeat();
        true
    }

    /// Setzt den Heartbeat-Zeitpunkt auf jetzt
    pub fn heartbeat(&self) {
        self.heartbeat_setzen(Instant::now());
    }

    /// Setzt den Heartbeat-Zeitpunkt explizit
    pub fn heartbeat_setzen(&self, zeitpunkt: Instant) {
        *self.letzter_heartbeat.lock() = zeitpunkt;
    }

    pub fn letzter_heartbeat(&self) -> Instant {
        *self.letzter_heartbeat.lock()
    }

    /// Zeit seit dem letzten Heartbeat, gemessen an `jetzt`
    pub fn heartbeat_alter(&self, jetzt: Instant) -> Duration {
        jetzt.saturating_duration_since(self.letzter_heartbeat())
    }

    /// Sendet eine Nachricht nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll, geschlossen oder die
    /// Session bereits beendet ist.
    pub fn senden(&self, nachricht: ServerNachricht) -> bool {
        if self.ist_geschlossen() {
            return false;
        }
        match self.ausgang.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(verbindung = %self.id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.id, "Send-Queue geschlossen (Verbindung beendet)");
                false
            }
        }
    }

    /// Markiert die Session als beendet und weckt den Verbindungs-Task
    ///
    /// Liefert nur beim ersten Aufruf `true`.
    pub fn schliessen(&self) -> bool {
        if self.geschlossen.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.schliessen_tx.send_replace(true);
        true
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.geschlossen.load(Ordering::Acquire)
    }

    /// Wartet, bis die Session geschlossen ist
    ///
    /// Kehrt sofort zurueck, wenn sie schon vor dem Aufruf geschlossen wurde.
    pub async fn geschlossen(&self) {
        // Erst abonnieren, dann pruefen: ein spaeteres schliessen() erhoeht die Version
        let mut signal = self.schliessen_tx.subscribe();
        if self.ist_geschlossen() {
            return;
        }
        // Der Sender lebt so lange wie die Session, changed() scheitert hier nicht
        let _ = signal.changed().await;
    }
}
