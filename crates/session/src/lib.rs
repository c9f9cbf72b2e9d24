//! framecrypt-session – Cryptor-Sessions und Session-Registry
//!
//! Verbindet die Control-Plane mit der Verschluesselungs-Engine.
//!
//! ## Module
//! - [`engine`] – Schnittstellen zu Engine, Transport und Ereignis-Senke
//! - [`bridge`] – Nicht-blockierende Weiterleitung von Zustandsereignissen
//! - [`session`] – Eine Cryptor-Session pro Sender bzw. Receiver
//! - [`registry`] – Prozessweite Tabelle aller Sessions und Key-Manager
//! - [`hub`] – In-Process Ereignis-Senke mit Kanaelen pro Session

pub mod bridge;
pub mod engine;
pub mod hub;
pub mod registry;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::NotificationBridge;
pub use engine::{
    EndpointHandle, EngineCryptor, EventSink, FrameCryptorEngine, FrameCryptorObserver, SinkError,
    TransportResolver,
};
pub use hub::{EventHub, EventHubConfig};
pub use registry::{CreateCryptorParams, RegistryConfig, SessionRegistry, STANDARD_KANAL_PRAEFIX};
pub use session::CryptorSession;
