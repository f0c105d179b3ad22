//! HTTP-Oberflaeche des Relays
//!
//! - `GET /ws` – WebSocket-Upgrade, eine JSON-Nachricht pro Textframe
//! - `GET /health` – Health-Check (503 beim Herunterfahren)
//! - `GET /metrics` – Prometheus-Metriken (abschaltbar)

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{future, StreamExt};
use relay_observability::{
    health_router, metrics_router, request_timing_layer, HealthState, RelayMetrics,
};
use relay_signaling::{ClientConnection, Frame, SignalingState};
use std::net::SocketAddr;
use std::sync::Arc;

/// Baut den vollstaendigen Router
///
/// Der Router muss mit `into_make_service_with_connect_info::<SocketAddr>()`
/// bedient werden, damit Peer-Adressen in den Logs erscheinen; ohne
/// ConnectInfo bleibt der Peer leer.
pub fn router(
    signaling: Arc<SignalingState>,
    health: HealthState,
    metriken: Option<RelayMetrics>,
) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(signaling)
        .merge(health_router(health));

    if let Some(metriken) = metriken {
        app = app.merge(metrics_router(metriken));
    }

    app.layer(request_timing_layer())
}

/// `GET /ws` – WebSocket-Upgrade und Uebergabe an `ClientConnection`
async fn ws_handler(
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(signaling): State<Arc<SignalingState>>,
) -> impl IntoResponse {
    let peer = connect_info.map(|ConnectInfo(adresse)| adresse);
    ws.on_upgrade(move |socket| verbindung_bedienen(socket, signaling, peer))
}

async fn verbindung_bedienen(
    socket: WebSocket,
    signaling: Arc<SignalingState>,
    peer: Option<SocketAddr>,
) {
    let (sink, stream) = socket.split();

    let eingang = stream.filter_map(|nachricht| future::ready(frame_aus_nachricht(nachricht)));
    let ausgang = futures_util::SinkExt::with(sink, |frame: Frame| {
        future::ready(Ok::<_, axum::Error>(nachricht_aus_frame(frame)))
    });

    ClientConnection::neu(signaling, peer)
        .verarbeiten(Box::pin(eingang), Box::pin(ausgang))
        .await;
}

/// WebSocket-Nachricht -> Frame; Ping/Pong beantwortet der Transport selbst
fn frame_aus_nachricht(
    nachricht: Result<Message, axum::Error>,
) -> Option<Result<Frame, axum::Error>> {
    match nachricht {
        Ok(Message::Text(text)) => Some(Ok(Frame::Text(text))),
        Ok(Message::Binary(daten)) => Some(Ok(Frame::Text(
            String::from_utf8_lossy(&daten).into_owned(),
        ))),
        Ok(Message::Close(_)) => Some(Ok(Frame::Schliessen)),
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
        Err(e) => Some(Err(e)),
    }
}

fn nachricht_aus_frame(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Schliessen => Message::Close(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binaerframe_wird_als_text_gelesen() {
        let frame = frame_aus_nachricht(Ok(Message::Binary(b"{\"command\":\"ping\"}".to_vec())));
        assert!(matches!(
            frame,
            Some(Ok(Frame::Text(text))) if text == "{\"command\":\"ping\"}"
        ));
    }

    #[test]
    fn ping_pong_werden_uebersprungen() {
        assert!(frame_aus_nachricht(Ok(Message::Ping(vec![1]))).is_none());
        assert!(frame_aus_nachricht(Ok(Message::Pong(vec![1]))).is_none());
    }

    #[test]
    fn close_beendet() {
        assert!(matches!(
            frame_aus_nachricht(Ok(Message::Close(None))),
            Some(Ok(Frame::Schliessen))
        ));
        assert!(matches!(
            nachricht_aus_frame(Frame::Schliessen),
            Message::Close(None)
        ));
    }
}
