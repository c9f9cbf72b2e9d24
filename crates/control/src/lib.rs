//! framecrypt-control – Control-Plane fuer Frame-Cryptoren
//!
//! Geschlossene Menge von Befehlen (`Command`), ein einziger Ausfuehrer
//! ([`commands::CommandExecutor`]) und serialisierbare Antworten bzw. Fehler.
//! Die JSON-Form entspricht dem Methoden-Kanal der UI:
//! `{"method": "keyManagerSetKey", "params": {...}}`.

pub mod commands;
pub mod error;

pub use commands::{Command, CommandExecutor, Response};
pub use error::{ControlError, ControlResult};
