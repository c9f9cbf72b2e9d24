//! Schnittstellen zu den externen Kollaborateuren
//!
//! Die eigentliche Frame-Verschluesselung, der Media-Transport und die
//! Auslieferung von Ereignissen an die UI liegen ausserhalb dieses Crates.
//! Die Registry spricht mit ihnen nur ueber diese Traits.

use std::sync::Arc;

use framecrypt_core::{Algorithm, CryptorKind, FrameCryptionState, FrameCryptorResult, StateEvent};
use framecrypt_keys::KeyManager;
use thiserror::Error;

/// Aufgeloester Sender- oder Receiver-Endpunkt einer Peer-Connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointHandle {
    pub kind: CryptorKind,
    pub peer_connection_id: String,
    /// ID des RTP-Senders bzw. -Receivers
    pub endpoint_id: String,
}

/// Loest Transport-IDs in Endpunkte auf
pub trait TransportResolver: Send + Sync + 'static {
    fn peer_connection_exists(&self, peer_connection_id: &str) -> bool;

    fn resolve_sender(&self, peer_connection_id: &str, sender_id: &str) -> Option<EndpointHandle>;

    fn resolve_receiver(&self, peer_connection_id: &str, receiver_id: &str)
        -> Option<EndpointHandle>;
}

/// Empfaenger von Zustandswechseln der Engine
///
/// Wird auf dem Frame-Thread der Engine aufgerufen und darf nicht blockieren.
pub trait FrameCryptorObserver: Send + Sync + 'static {
    fn on_state_changed(&self, participant_id: &str, state: FrameCryptionState);
}

/// Engine-seitiger Cryptor eines Endpunkts
pub trait EngineCryptor: Send + Sync + 'static {
    /// Gibt `false` zurueck wenn die Engine den Index nicht akzeptiert
    fn set_key_index(&self, index: u32) -> bool;

    fn key_index(&self) -> u32;

    fn set_enabled(&self, enabled: bool);

    fn enabled(&self) -> bool;

    fn register_observer(&self, observer: Arc<dyn FrameCryptorObserver>);

    /// Entfernt den Observer.
    ///
    /// Muss blockieren, bis ein laufender Callback beendet ist. Danach darf
    /// die Engine den Observer nicht mehr aufrufen.
    fn deregister_observer(&self);
}

/// Fabrik fuer Engine-Cryptoren
pub trait FrameCryptorEngine: Send + Sync + 'static {
    fn create_cryptor(
        &self,
        endpoint: &EndpointHandle,
        participant_id: &str,
        algorithm: Algorithm,
        key_manager: Arc<KeyManager>,
    ) -> FrameCryptorResult<Arc<dyn EngineCryptor>>;
}

/// Grund, warum eine Senke ein Ereignis nicht annehmen konnte
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("Kein Abonnent fuer Kanal {0}")]
    KeinAbonnent(String),

    #[error("Kanal {0} ist voll")]
    Voll(String),

    #[error("Kanal {0} ist geschlossen")]
    Geschlossen(String),
}

/// Externe Ereignis-Senke, adressiert ueber den Kanal-Namen einer Session
///
/// `zustellen` darf nicht blockieren. Ein nicht annehmbares Ereignis wird
/// verworfen (Best-Effort, reines Monitoring-Signal).
pub trait EventSink: Send + Sync + 'static {
    fn zustellen(&self, kanal: &str, event: StateEvent) -> Result<(), SinkError>;

    /// Eine Session mit diesem Kanal wurde angelegt
    fn kanal_eroeffnet(&self, _kanal: &str) {}

    /// Die Session des Kanals wurde entsorgt
    fn kanal_geschlossen(&self, _kanal: &str) {}
}
