//! relay-signaling – Verbindungsverwaltung und Befehlsrouting des Relays
//!
//! Dieser Crate implementiert den Kern des Relays: welche Verbindungen
//! offen sind, welche Rolle sie haben, welche Instanz-Clients unter welcher
//! Welt/Lauf/Teilnehmer-Kennung registriert sind und an wen ein
//! Operator-Befehl geht.
//!
//! ## Architektur
//!
//! ```text
//! Transport (WebSocket im relay-server)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Rolle: NichtAuthentifiziert -> Operator | InstanzClient
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- AuthHandler       (Admin-Schluessel, Registrierung)
//!     +-- HeartbeatHandler  (ping)
//!     +-- ClientHandler     (Zielbefehle, listClients)
//!
//! ConnectionRegistry – Welt -> Lauf -> Teilnehmer -> Session
//! TargetingResolver  – Welche Instanz-Clients ein Befehl erreicht
//! HeartbeatMonitor   – Trennt Instanz-Clients ohne Heartbeat
//! ```

pub mod admin_key;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod heartbeat;
pub mod registry;
pub mod server_state;
pub mod session;
pub mod targeting;

// Bequeme Re-Exporte
pub use admin_key::AdminKey;
pub use connection::{ClientConnection, Frame};
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use heartbeat::HeartbeatMonitor;
pub use registry::{ConnectionRegistry, RegistrierErgebnis};
pub use server_state::{SignalingConfig, SignalingState};
pub use session::{Rolle, Session, TrennGrund};
pub use targeting::{TargetingResolver, Zustellung};
