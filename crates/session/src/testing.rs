//! In-Memory Engine und Transport fuer Tests
//!
//! Nur mit `cfg(test)` oder Feature `testing` verfuegbar. Die Engine
//! verschluesselt nichts, bildet aber das Observer-Protokoll nach: Callbacks
//! laufen unter dem Observer-Lock, `deregister_observer` wartet also auf einen
//! laufenden Callback.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use framecrypt_core::{Algorithm, CryptorKind, FrameCryptionState, FrameCryptorError, FrameCryptorResult};
use framecrypt_keys::KeyManager;
use parking_lot::{Mutex, RwLock};

use crate::engine::{
    EndpointHandle, EngineCryptor, FrameCryptorEngine, FrameCryptorObserver, TransportResolver,
};

// ---------------------------------------------------------------------------
// StaticResolver
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PeerConnection {
    sender: HashSet<String>,
    receiver: HashSet<String>,
}

/// Transport mit fest eingetragenen Peer-Connections
#[derive(Debug, Default)]
pub struct StaticResolver {
    verbindungen: RwLock<HashMap<String, PeerConnection>>,
}

impl StaticResolver {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn mit_peer_connection(self, pc: &str) -> Self {
        self.peer_connection_hinzufuegen(pc);
        self
    }

    pub fn mit_sender(self, pc: &str, sender: &str) -> Self {
        self.sender_hinzufuegen(pc, sender);
        self
    }

    pub fn mit_receiver(self, pc: &str, receiver: &str) -> Self {
        self.receiver_hinzufuegen(pc, receiver);
        self
    }

    pub fn peer_connection_hinzufuegen(&self, pc: &str) {
        self.verbindungen.write().entry(pc.to_string()).or_default();
    }

    pub fn sender_hinzufuegen(&self, pc: &str, sender: &str) {
        self.verbindungen
            .write()
            .entry(pc.to_string())
            .or_default()
            .sender
            .insert(sender.to_string());
    }

    pub fn receiver_hinzufuegen(&self, pc: &str, receiver: &str) {
        self.verbindungen
            .write()
            .entry(pc.to_string())
            .or_default()
            .receiver
            .insert(receiver.to_string());
    }

    /// Entfernt eine Peer-Connection samt Endpunkten
    pub fn peer_connection_entfernen(&self, pc: &str) -> bool {
        self.verbindungen.write().remove(pc).is_some()
    }

    fn aufloesen(&self, kind: CryptorKind, pc: &str, id: &str) -> Option<EndpointHandle> {
        let verbindungen = self.verbindungen.read();
        let verbindung = verbindungen.get(pc)?;
        let bekannt = match kind {
            CryptorKind::Sender => verbindung.sender.contains(id),
            CryptorKind::Receiver => verbindung.receiver.contains(id),
        };
        bekannt.then(|| EndpointHandle {
            kind,
            peer_connection_id: pc.to_string(),
            endpoint_id: id.to_string(),
        })
    }
}

impl TransportResolver for StaticResolver {
    fn peer_connection_exists(&self, peer_connection_id: &str) -> bool {
        self.verbindungen.read().contains_key(peer_connection_id)
    }

    fn resolve_sender(&self, peer_connection_id: &str, sender_id: &str) -> Option<EndpointHandle> {
        self.aufloesen(CryptorKind::Sender, peer_connection_id, sender_id)
    }

    fn resolve_receiver(
        &self,
        peer_connection_id: &str,
        receiver_id: &str,
    ) -> Option<EndpointHandle> {
        self.aufloesen(CryptorKind::Receiver, peer_connection_id, receiver_id)
    }
}

// ---------------------------------------------------------------------------
// MemoryEngine
// ---------------------------------------------------------------------------

/// Engine, die jeden erzeugten Cryptor zur Inspektion aufbewahrt
pub struct MemoryEngine {
    max_key_index: u32,
    cryptoren: Mutex<Vec<Arc<MemoryCryptor>>>,
    ablehnung: Mutex<Option<FrameCryptorError>>,
    abmelde_verzoegerung: Mutex<Duration>,
}

impl MemoryEngine {
    /// Engine mit hoechstem akzeptierten Schluessel-Index 15
    pub fn neu() -> Self {
        Self::mit_max_key_index(15)
    }

    /// Indizes groesser als `max` werden von `set_key_index` abgelehnt
    pub fn mit_max_key_index(max: u32) -> Self {
        Self {
            max_key_index: max,
            cryptoren: Mutex::new(Vec::new()),
            ablehnung: Mutex::new(None),
            abmelde_verzoegerung: Mutex::new(Duration::ZERO),
        }
    }

    /// Alle bisher erzeugten Cryptoren in Erstellungs-Reihenfolge
    pub fn cryptoren(&self) -> Vec<Arc<MemoryCryptor>> {
        self.cryptoren.lock().clone()
    }

    /// Die naechste `create_cryptor`-Anfrage schlaegt mit `fehler` fehl
    pub fn naechste_erstellung_ablehnen(&self, fehler: FrameCryptorError) {
        *self.ablehnung.lock() = Some(fehler);
    }

    /// Ab jetzt erzeugte Cryptoren brauchen fuer `deregister_observer` so lange
    pub fn abmeldung_verzoegern(&self, dauer: Duration) {
        *self.abmelde_verzoegerung.lock() = dauer;
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::neu()
    }
}

impl FrameCryptorEngine for MemoryEngine {
    fn create_cryptor(
        &self,
        endpoint: &EndpointHandle,
        participant_id: &str,
        algorithm: Algorithm,
        key_manager: Arc<KeyManager>,
    ) -> FrameCryptorResult<Arc<dyn EngineCryptor>> {
        if let Some(fehler) = self.ablehnung.lock().take() {
            return Err(fehler);
        }
        let cryptor = Arc::new(MemoryCryptor {
            endpoint: endpoint.clone(),
            participant_id: participant_id.to_string(),
            algorithm,
            key_manager,
            max_key_index: self.max_key_index,
            key_index: AtomicU32::new(0),
            enabled: AtomicBool::new(false),
            enabled_aufrufe: AtomicUsize::new(0),
            observer: Mutex::new(None),
            abmelde_verzoegerung: *self.abmelde_verzoegerung.lock(),
            abmeldung_begonnen: AtomicBool::new(false),
        });
        self.cryptoren.lock().push(Arc::clone(&cryptor));
        Ok(cryptor)
    }
}

// ---------------------------------------------------------------------------
// MemoryCryptor
// ---------------------------------------------------------------------------

/// Cryptor der In-Memory Engine
pub struct MemoryCryptor {
    endpoint: EndpointHandle,
    participant_id: String,
    algorithm: Algorithm,
    key_manager: Arc<KeyManager>,
    max_key_index: u32,
    key_index: AtomicU32,
    enabled: AtomicBool,
    enabled_aufrufe: AtomicUsize,
    observer: Mutex<Option<Arc<dyn FrameCryptorObserver>>>,
    abmelde_verzoegerung: Duration,
    abmeldung_begonnen: AtomicBool,
}

impl MemoryCryptor {
    pub fn endpoint(&self) -> &EndpointHandle {
        &self.endpoint
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn key_manager(&self) -> &Arc<KeyManager> {
        &self.key_manager
    }

    pub fn hat_observer(&self) -> bool {
        self.observer.lock().is_some()
    }

    /// Wie oft `set_enabled` aufgerufen wurde
    pub fn enabled_aufrufe(&self) -> usize {
        self.enabled_aufrufe.load(Ordering::SeqCst)
    }

    /// Ob `deregister_observer` bereits aufgerufen wurde (auch wenn noch laufend)
    pub fn abmeldung_begonnen(&self) -> bool {
        self.abmeldung_begonnen.load(Ordering::SeqCst)
    }

    /// Meldet einen Zustandswechsel wie vom Frame-Thread der Engine
    ///
    /// Gibt `false` zurueck wenn kein Observer registriert ist.
    pub fn zustand_melden(&self, state: FrameCryptionState) -> bool {
        let observer = self.observer.lock();
        match observer.as_ref() {
            Some(o) => {
                o.on_state_changed(&self.participant_id, state);
                true
            }
            None => false,
        }
    }

    /// Simuliert einen Frame: `Ok` wenn ein Schluessel am aktiven Index
    /// liegt, sonst `MissingKey`
    pub fn frame_verarbeiten(&self) -> FrameCryptionState {
        let index = self.key_index.load(Ordering::SeqCst);
        let state = match self.key_manager.get_key(&self.participant_id, index) {
            Some(_) => FrameCryptionState::Ok,
            None => FrameCryptionState::MissingKey,
        };
        self.zustand_melden(state);
        state
    }
}

impl EngineCryptor for MemoryCryptor {
    fn set_key_index(&self, index: u32) -> bool {
        if index > self.max_key_index {
            return false;
        }
        self.key_index.store(index, Ordering::SeqCst);
        true
    }

    fn key_index(&self) -> u32 {
        self.key_index.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled_aufrufe.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn register_observer(&self, observer: Arc<dyn FrameCryptorObserver>) {
        *self.observer.lock() = Some(observer);
    }

    fn deregister_observer(&self) {
        self.abmeldung_begonnen.store(true, Ordering::SeqCst);
        if !self.abmelde_verzoegerung.is_zero() {
            std::thread::sleep(self.abmelde_verzoegerung);
        }
        self.observer.lock().take();
    }
}
