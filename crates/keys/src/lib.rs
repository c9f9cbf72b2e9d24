//! # framecrypt-keys
//!
//! Schluessel-Material fuer die Frame-Verschluesselung.
//!
//! ## Module
//! - `secret` - Schluessel-Container (wird beim Drop genullt)
//! - `key_ring` - Geordnete, indizierte Schluessel-Slots eines Teilnehmers
//! - `key_manager` - Teilnehmer -> Key-Ring, geteilt von mehreren Sessions

pub mod key_manager;
pub mod key_ring;
pub mod secret;

pub use key_manager::{KeyManager, STANDARD_MAX_RING_LAENGE};
pub use key_ring::KeyRing;
pub use secret::SecretBytes;
