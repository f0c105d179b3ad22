//! Handler fuer alle eingehenden Frames
//!
//! Jeder Handler ist fuer eine Rolle bzw. einen Befehlstyp zustaendig
//! und hat Zugriff auf den gemeinsamen SignalingState.

pub mod auth_handler;
pub mod client_handler;
pub mod heartbeat_handler;
