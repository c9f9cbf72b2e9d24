//! Cryptor-Session – Bindung eines Senders/Receivers an die Frame-Verschluesselung
//!
//! Haelt pro Session:
//! - Art (Sender/Receiver), Teilnehmer und Algorithmus (unveraenderlich)
//! - Geteilte Referenz auf den Key-Manager (unveraenderlich)
//! - Enabled-Flag und aktiven Schluessel-Index
//! - Genau eine Benachrichtigungs-Bruecke
//!
//! Veraenderliche Felder liegen hinter einem Mutex, damit Engine-Aufruf und
//! gecachter Wert gemeinsam wechseln.

use std::sync::Arc;

use framecrypt_core::{Algorithm, CryptorKind, FrameCryptorError, FrameCryptorResult, SessionId};
use framecrypt_keys::KeyManager;
use parking_lot::Mutex;

use crate::bridge::NotificationBridge;
use crate::engine::{EngineCryptor, EventSink, FrameCryptorObserver};

#[derive(Debug)]
struct SessionZustand {
    enabled: bool,
    key_index: u32,
    entsorgt: bool,
}

/// Eine aktive Cryptor-Session
pub struct CryptorSession {
    id: SessionId,
    kind: CryptorKind,
    participant_id: String,
    algorithm: Algorithm,
    key_manager: Arc<KeyManager>,
    cryptor: Arc<dyn EngineCryptor>,
    bridge: Arc<NotificationBridge>,
    sink: Arc<dyn EventSink>,
    zustand: Mutex<SessionZustand>,
}

impl CryptorSession {
    /// Bindet einen Engine-Cryptor an eine neue Session
    ///
    /// Eroeffnet den Kanal bei der Senke, registriert die Bruecke als
    /// Observer und setzt die Startwerte (enabled, Index 0) auch in der Engine.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn neu(
        id: SessionId,
        kind: CryptorKind,
        participant_id: String,
        algorithm: Algorithm,
        key_manager: Arc<KeyManager>,
        cryptor: Arc<dyn EngineCryptor>,
        bridge: Arc<NotificationBridge>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        sink.kanal_eroeffnet(bridge.kanal());
        cryptor.set_enabled(true);
        if !cryptor.set_key_index(0) {
            tracing::warn!(session_id = %id, "Engine lehnt Start-Index 0 ab");
        }
        let observer: Arc<dyn FrameCryptorObserver> = bridge.clone();
        cryptor.register_observer(observer);

        Self {
            id,
            kind,
            participant_id,
            algorithm,
            key_manager,
            cryptor,
            bridge,
            sink,
            zustand: Mutex::new(SessionZustand {
                enabled: true,
                key_index: 0,
                entsorgt: false,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> CryptorKind {
        self.kind
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Geteilter Key-Manager (bleibt auch nach Entfernen aus der Registry gueltig)
    pub fn key_manager(&self) -> &Arc<KeyManager> {
        &self.key_manager
    }

    /// Name des Ereignis-Kanals
    pub fn kanal(&self) -> &str {
        self.bridge.kanal()
    }

    /// Setzt den aktiven Schluessel-Index
    ///
    /// Gibt zurueck, ob die Engine den Index akzeptiert hat. Ein abgelehnter
    /// Index laesst den bisherigen Wert stehen. Auf einer entsorgten Session
    /// `NichtGefunden`.
    pub fn set_key_index(&self, index: u32) -> FrameCryptorResult<bool> {
        let mut zustand = self.zustand.lock();
        if zustand.entsorgt {
            return Err(self.entsorgt_fehler());
        }
        let akzeptiert = self.cryptor.set_key_index(index);
        if akzeptiert {
            zustand.key_index = index;
        }
        tracing::debug!(session_id = %self.id, index, akzeptiert, "Schluessel-Index gesetzt");
        Ok(akzeptiert)
    }

    pub fn key_index(&self) -> u32 {
        self.zustand.lock().key_index
    }

    /// Aktiviert bzw. deaktiviert die Verschluesselung
    ///
    /// Der Wert ist sofort ueber `enabled` sichtbar. Auf einer entsorgten
    /// Session erreicht der Aufruf die Engine nicht und meldet `NichtGefunden`.
    pub fn set_enabled(&self, enabled: bool) -> FrameCryptorResult<()> {
        let mut zustand = self.zustand.lock();
        if zustand.entsorgt {
            return Err(self.entsorgt_fehler());
        }
        self.cryptor.set_enabled(enabled);
        zustand.enabled = enabled;
        tracing::debug!(session_id = %self.id, enabled, "Verschluesselung umgeschaltet");
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.zustand.lock().enabled
    }

    pub fn ist_entsorgt(&self) -> bool {
        self.zustand.lock().entsorgt
    }

    /// Meldet die Session bei der Engine ab und schliesst die Bruecke
    ///
    /// Reihenfolge: Engine-Observer entfernen (blockiert bis kein Callback
    /// mehr laeuft), Bruecke schliessen, Kanal bei der Senke freigeben.
    /// Gibt `false` zurueck wenn die Session bereits entsorgt war.
    pub fn dispose(&self) -> bool {
        if !self.abbauen(true) {
            return false;
        }
        tracing::info!(
            session_id = %self.id,
            participant_id = %self.participant_id,
            verworfen = self.bridge.verworfen(),
            "Cryptor-Session entsorgt"
        );
        true
    }

    /// Baut eine nie eingetragene Session ab, ohne den Kanal freizugeben
    ///
    /// Der Kanal gehoert dann der bereits eingetragenen Session gleicher ID.
    pub(crate) fn verwerfen(&self) {
        self.abbauen(false);
    }

    fn abbauen(&self, kanal_freigeben: bool) -> bool {
        let mut zustand = self.zustand.lock();
        if zustand.entsorgt {
            return false;
        }
        zustand.entsorgt = true;

        self.cryptor.deregister_observer();
        self.bridge.schliessen();
        if kanal_freigeben {
            self.sink.kanal_geschlossen(self.bridge.kanal());
        }
        true
    }

    fn entsorgt_fehler(&self) -> FrameCryptorError {
        FrameCryptorError::nicht_gefunden(format!("frameCryptor {} wurde entsorgt", self.id))
    }
}

impl std::fmt::Debug for CryptorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptorSession")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("participant_id", &self.participant_id)
            .field("algorithm", &self.algorithm)
            .field("key_manager", &self.key_manager.id())
            .field("kanal", &self.bridge.kanal())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EndpointHandle, FrameCryptorEngine};
    use crate::hub::{EventHub, EventHubConfig};
    use crate::testing::MemoryEngine;
    use framecrypt_core::{ErrorKind, FrameCryptionState, KeyManagerId};
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn session(engine: &MemoryEngine) -> (CryptorSession, Arc<EventHub>) {
        let id = SessionId::new();
        let km = Arc::new(KeyManager::new(KeyManagerId::new()));
        let endpoint = EndpointHandle {
            kind: CryptorKind::Sender,
            peer_connection_id: "pc-1".into(),
            endpoint_id: "sender-1".into(),
        };
        let cryptor = engine
            .create_cryptor(&endpoint, "alice", Algorithm::AesGcm, Arc::clone(&km))
            .unwrap();
        let hub = Arc::new(EventHub::neu(EventHubConfig::default()));
        let kanal = id.kanal_name("test/");
        let bridge = NotificationBridge::starten(id, kanal, hub.clone(), 8, &Handle::current());
        let s = CryptorSession::neu(
            id,
            CryptorKind::Sender,
            "alice".into(),
            Algorithm::AesGcm,
            km,
            cryptor,
            bridge,
            hub.clone(),
        );
        (s, hub)
    }

    #[tokio::test]
    async fn startwerte() {
        let engine = MemoryEngine::neu();
        let (s, _) = session(&engine);
        assert!(s.enabled());
        assert_eq!(s.key_index(), 0);
        let cryptor = &engine.cryptoren()[0];
        assert!(cryptor.enabled());
        assert!(cryptor.hat_observer());
    }

    #[tokio::test]
    async fn abgelehnter_index_bleibt_beim_alten_wert() {
        let engine = MemoryEngine::mit_max_key_index(4);
        let (s, _) = session(&engine);
        assert!(s.set_key_index(3).unwrap());
        assert!(!s.set_key_index(9).unwrap());
        assert_eq!(s.key_index(), 3);
    }

    #[tokio::test]
    async fn enabled_sofort_sichtbar() {
        let engine = MemoryEngine::neu();
        let (s, _) = session(&engine);
        s.set_enabled(false).unwrap();
        assert!(!s.enabled());
        assert!(!engine.cryptoren()[0].enabled());
    }

    #[tokio::test]
    async fn enabled_erreicht_engine_genau_einmal() {
        let engine = MemoryEngine::neu();
        let (s, _) = session(&engine);
        let cryptor = &engine.cryptoren()[0];
        // Startwert beim Erstellen
        assert_eq!(cryptor.enabled_aufrufe(), 1);

        s.set_enabled(false).unwrap();
        assert_eq!(cryptor.enabled_aufrufe(), 2);
        s.set_enabled(false).unwrap();
        assert_eq!(cryptor.enabled_aufrufe(), 3);

        s.dispose();
        assert!(s.set_enabled(true).is_err());
        assert_eq!(cryptor.enabled_aufrufe(), 3);
    }

    #[tokio::test]
    async fn dispose_meldet_observer_ab() {
        let engine = MemoryEngine::neu();
        let (s, hub) = session(&engine);
        let mut rx = hub.abonnieren(s.kanal()).unwrap();

        assert!(s.dispose());
        assert!(!s.dispose());
        assert!(s.ist_entsorgt());
        assert!(!engine.cryptoren()[0].hat_observer());

        // Meldungen nach dem Entsorgen gehen ins Leere
        engine.cryptoren()[0].zustand_melden(FrameCryptionState::Ok);
        assert!(rx.recv().await.is_none());
        assert_eq!(s.set_key_index(1).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(s.set_enabled(false).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(engine.cryptoren()[0].enabled_aufrufe(), 1);
    }

    #[tokio::test]
    async fn kanal_lebt_mit_der_session() {
        let engine = MemoryEngine::neu();
        let (s, hub) = session(&engine);
        assert_eq!(hub.kanal_anzahl(), 1);

        s.dispose();
        assert_eq!(hub.kanal_anzahl(), 0);
        assert!(hub.abonnieren(s.kanal()).is_none());
    }

    #[tokio::test]
    async fn set_enabled_waehrend_dispose_meldet_nicht_gefunden() {
        let engine = MemoryEngine::neu();
        engine.abmeldung_verzoegern(Duration::from_millis(200));
        let (s, _) = session(&engine);
        let s = Arc::new(s);
        let cryptor = Arc::clone(&engine.cryptoren()[0]);

        let entsorger = {
            let s = Arc::clone(&s);
            std::thread::spawn(move || s.dispose())
        };
        while !cryptor.abmeldung_begonnen() {
            std::thread::yield_now();
        }

        let err = s.set_enabled(false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(entsorger.join().unwrap());
        assert!(s.enabled());
        assert_eq!(cryptor.enabled_aufrufe(), 1);
    }
}
