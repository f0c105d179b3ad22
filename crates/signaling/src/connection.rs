//! Client-Connection – Verwaltet eine einzelne Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Der Task ist unabhaengig vom Transport: er liest `Frame`s
//! aus einem Stream und schreibt `Frame`s in einen Sink. Der HTTP-Server
//! bildet WebSocket-Nachrichten darauf ab.
//!
//! ## Ablauf
//! ```text
//! Frame vom Client ----> MessageDispatcher ----> Antwort an den Client
//! Send-Queue (Befehle) ------------------------> an den Client
//! Session geschlossen (Timeout, Ersetzt, Shutdown) -> Close-Frame, Ende
//! ```
//!
//! Frames einer Verbindung werden strikt nacheinander verarbeitet.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use relay_protocol::ServerNachricht;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::dispatcher::MessageDispatcher;
use crate::server_state::SignalingState;
use crate::session::TrennGrund;

/// Transportunabhaengige Einheit einer Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Textnachricht (JSON)
    Text(String),
    /// Verbindung wird geschlossen
    Schliessen,
}

/// Verarbeitet eine einzelne Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer: Option<SocketAddr>,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer: Option<SocketAddr>) -> Self {
        Self { state, peer }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, ein Transportfehler auftritt oder die
    /// Session serverseitig geschlossen wird. Beim Ende ist die Session in
    /// jedem Fall abgemeldet.
    pub async fn verarbeiten<Rx, Tx, E>(self, mut eingang: Rx, mut ausgang: Tx)
    where
        Rx: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
        Tx: Sink<Frame> + Unpin,
        Tx::Error: Display,
    {
        let (session, mut sende_rx) = self.state.verbindung_oeffnen(self.peer);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));
        let verbindung = session.id();

        tracing::info!(verbindung = %verbindung, peer = ?self.peer, "Neue Verbindung");

        let grund = loop {
            tokio::select! {
                biased;

                // Serverseitig geschlossen (Heartbeat-Timeout, Ersetzt, Shutdown)
                () = session.geschlossen() => {
                    break None;
                }

                // Weitergeleitete Befehle aus der Send-Queue
                Some(nachricht) = sende_rx.recv() => {
                    if let Err(e) = Self::senden(&mut ausgang, &nachricht).await {
                        tracing::warn!(verbindung = %verbindung, fehler = %e, "Senden fehlgeschlagen");
                        break Some(TrennGrund::SendeFehler);
                    }
                }

                // Eingehende Frames vom Client
                frame = eingang.next() => {
                    match frame {
                        Some(Ok(Frame::Text(text))) => {
                            if let Some(antwort) = dispatcher.dispatch(&session, &text) {
                                if let Err(e) = Self::senden(&mut ausgang, &antwort).await {
                                    tracing::warn!(verbindung = %verbindung, fehler = %e, "Senden fehlgeschlagen");
                                    break Some(TrennGrund::SendeFehler);
                                }
                            }
                        }
                        Some(Ok(Frame::Schliessen)) | None => {
                            tracing::debug!(verbindung = %verbindung, "Verbindung vom Client getrennt");
                            break Some(TrennGrund::ClientGetrennt);
                        }
                        Some(Err(e)) => {
                            tracing::warn!(verbindung = %verbindung, fehler = %e, "Frame-Lesefehler");
                            break Some(TrennGrund::LeseFehler);
                        }
                    }
                }
            }
        };

        match grund {
            Some(grund) => {
                self.state.trennen(&session, grund);
            }
            None => {
                // Bereits von der schliessenden Stelle abgemeldet
                if let Err(e) = ausgang.send(Frame::Schliessen).await {
                    tracing::debug!(verbindung = %verbindung, fehler = %e, "Close-Frame nicht zustellbar");
                }
            }
        }

        tracing::info!(verbindung = %verbindung, "Verbindungs-Task beendet");
    }

    async fn senden<Tx>(ausgang: &mut Tx, nachricht: &ServerNachricht) -> Result<(), String>
    where
        Tx: Sink<Frame> + Unpin,
        Tx::Error: Display,
    {
        let json = nachricht.to_json().map_err(|e| e.to_string())?;
        ausgang
            .send(Frame::Text(json))
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin_key::AdminKey;
    use crate::server_state::SignalingConfig;
    use crate::session::Rolle;
    use futures_util::{sink, stream};
    use relay_observability::RelayMetrics;
    use serde_json::{json, Value};
    use std::convert::Infallible;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Gegenstelle einer Test-Verbindung
    struct TestClient {
        zum_server: mpsc::Sender<Frame>,
        vom_server: mpsc::Receiver<Frame>,
        task: tokio::task::JoinHandle<()>,
    }

    impl TestClient {
        async fn senden(&self, wert: Value) {
            self.zum_server
                .send(Frame::Text(wert.to_string()))
                .await
                .unwrap();
        }

        async fn empfangen(&mut self) -> Frame {
            tokio::time::timeout(Duration::from_secs(2), self.vom_server.recv())
                .await
                .expect("Timeout beim Empfangen")
                .expect("Verbindung geschlossen")
        }

        async fn empfangen_json(&mut self) -> Value {
            match self.empfangen().await {
                Frame::Text(text) => serde_json::from_str(&text).unwrap(),
                Frame::Schliessen => panic!("Textframe erwartet"),
            }
        }
    }

    fn state() -> Arc<SignalingState> {
        SignalingState::neu(
            SignalingConfig::neu(AdminKey::neu("geheim").unwrap()),
            RelayMetrics::neu().unwrap(),
        )
    }

    fn verbinden(state: &Arc<SignalingState>) -> TestClient {
        let (zum_server, server_rx) = mpsc::channel::<Frame>(16);
        let (server_tx, vom_server) = mpsc::channel::<Frame>(16);

        let eingang = Box::pin(stream::unfold(server_rx, |mut rx| async move {
            rx.recv().await.map(|frame| (Ok::<_, Infallible>(frame), rx))
        }));
        let ausgang = Box::pin(sink::unfold(server_tx, |tx, frame: Frame| async move {
            tx.send(frame).await.map_err(|_| "Gegenstelle weg")?;
            Ok::<_, &'static str>(tx)
        }));

        let connection = ClientConnection::neu(Arc::clone(state), None);
        let task = tokio::spawn(connection.verarbeiten(eingang, ausgang));
        TestClient {
            zum_server,
            vom_server,
            task,
        }
    }

    #[tokio::test]
    async fn operator_kick_erreicht_instanz() {
        let state = state();
        let mut alice = verbinden(&state);
        let mut operator = verbinden(&state);

        alice
            .senden(json!({ "PlaceId": "1", "JobId": "j", "UserId": 7, "Username": "Alice" }))
            .await;
        assert_eq!(
            alice.empfangen_json().await,
            json!({ "response": "Client registered successfully" })
        );

        operator.senden(json!({ "adminKey": "geheim" })).await;
        assert_eq!(
            operator.empfangen_json().await,
            json!({ "response": "Admin authenticated" })
        );

        operator
            .senden(json!({ "command": "kick", "data": { "targetUserId": 7 } }))
            .await;
        assert_eq!(
            operator.empfangen_json().await,
            json!({ "response": "Kicked 7" })
        );
        assert_eq!(
            alice.empfangen_json().await,
            json!({ "command": "kick", "args": { "targetUserId": 7 } })
        );
    }

    #[tokio::test]
    async fn client_trennung_meldet_ab() {
        let state = state();
        let mut alice = verbinden(&state);
        alice
            .senden(json!({ "PlaceId": "1", "JobId": "j", "UserId": 7, "Username": "Alice" }))
            .await;
        alice.empfangen_json().await;
        assert_eq!(state.registry.anzahl(), 1);

        let TestClient {
            zum_server, task, ..
        } = alice;
        drop(zum_server);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();

        assert!(state.registry.ist_leer());
        assert_eq!(state.verbindung_anzahl(), 0);
    }

    #[tokio::test]
    async fn serverseitiges_schliessen_sendet_close_frame() {
        let state = state();
        let mut client = verbinden(&state);
        client.senden(json!({ "command": "ping" })).await;

        // Warten bis die Session angelegt ist
        tokio::time::timeout(Duration::from_secs(2), async {
            while state.verbindung_anzahl() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let session = state.verbindungen_schnappschuss().remove(0);
        assert_eq!(session.rolle(), Rolle::NichtAuthentifiziert);
        assert!(state.trennen(&session, TrennGrund::HeartbeatTimeout));

        assert_eq!(client.empfangen().await, Frame::Schliessen);
        tokio::time::timeout(Duration::from_secs(2), client.task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn ungueltige_nutzlast_haelt_verbindung_offen() {
        let state = state();
        let mut client = verbinden(&state);
        client
            .zum_server
            .send(Frame::Text("kein json".into()))
            .await
            .unwrap();
        assert_eq!(
            client.empfangen_json().await,
            json!({ "error": "Invalid payload" })
        );

        client.senden(json!({ "adminKey": "geheim" })).await;
        assert_eq!(
            client.empfangen_json().await,
            json!({ "response": "Admin authenticated" })
        );
    }
}
