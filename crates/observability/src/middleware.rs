//! Request-Tracing fuer den HTTP-Listener
//!
//! Jede HTTP-Anfrage (auch der WebSocket-Upgrade auf `/ws`) bekommt einen
//! eigenen Span mit Methode und Pfad.

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Erstellt den Tracing-Layer fuer den Axum-Router
pub fn request_timing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG))
}
