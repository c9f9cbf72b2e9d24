//! Session-Registry – Prozessweite Tabelle aller Sessions und Key-Manager
//!
//! Einzige Instanz fuer Erstellen, Nachschlagen und Entsorgen. Die Registry
//! wird explizit konstruiert und an alle Aufrufer weitergereicht; Clone teilt
//! den inneren Zustand.
//!
//! Thread-safe durch DashMap. IDs sind UUIDs und werden nie wiederverwendet.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use framecrypt_core::{
    Algorithm, CryptorKind, FrameCryptorError, FrameCryptorResult, KeyManagerId, SessionId,
};
use framecrypt_keys::{KeyManager, STANDARD_MAX_RING_LAENGE};
use tokio::runtime::Handle;

use crate::bridge::NotificationBridge;
use crate::engine::{EndpointHandle, EventSink, FrameCryptorEngine, TransportResolver};
use crate::session::CryptorSession;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Praefix fuer Ereignis-Kanaele
pub const STANDARD_KANAL_PRAEFIX: &str = "frameCryptorEvent/";

/// Konfiguration der Registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Groesse der Ereignis-Queue pro Session
    pub ereignis_queue_groesse: usize,
    /// Praefix des Ereignis-Kanals (Kanal = Praefix + Session-ID)
    pub kanal_praefix: String,
    /// Maximale Key-Ring-Laenge neuer Key-Manager
    pub max_ring_laenge: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ereignis_queue_groesse: 64,
            kanal_praefix: STANDARD_KANAL_PRAEFIX.into(),
            max_ring_laenge: STANDARD_MAX_RING_LAENGE,
        }
    }
}

/// Parameter fuer das Erstellen einer Cryptor-Session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCryptorParams {
    pub kind: CryptorKind,
    pub peer_connection_id: String,
    /// Leere Strings zaehlen als nicht angegeben
    pub rtp_sender_id: Option<String>,
    pub rtp_receiver_id: Option<String>,
    pub participant_id: String,
    pub algorithm: Algorithm,
    pub key_manager_id: KeyManagerId,
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Prozessweite Registry aller Cryptor-Sessions und Key-Manager
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    sessions: DashMap<SessionId, Arc<CryptorSession>>,
    key_managers: DashMap<KeyManagerId, Arc<KeyManager>>,
    engine: Arc<dyn FrameCryptorEngine>,
    resolver: Arc<dyn TransportResolver>,
    sink: Arc<dyn EventSink>,
    config: RegistryConfig,
    /// Runtime fuer die Weiterleitungs-Tasks der Bruecken
    runtime: Handle,
}

impl SessionRegistry {
    /// Erstellt eine neue leere Registry
    ///
    /// Muss innerhalb einer Tokio-Runtime aufgerufen werden; deren Handle
    /// treibt die Ereignis-Weiterleitung aller Sessions.
    pub fn neu(
        engine: Arc<dyn FrameCryptorEngine>,
        resolver: Arc<dyn TransportResolver>,
        sink: Arc<dyn EventSink>,
        config: RegistryConfig,
    ) -> FrameCryptorResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| FrameCryptorError::intern(format!("keine Tokio-Runtime: {e}")))?;
        Ok(Self::mit_runtime(engine, resolver, sink, config, runtime))
    }

    /// Wie `neu`, aber mit explizit uebergebener Runtime
    pub fn mit_runtime(
        engine: Arc<dyn FrameCryptorEngine>,
        resolver: Arc<dyn TransportResolver>,
        sink: Arc<dyn EventSink>,
        config: RegistryConfig,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: DashMap::new(),
                key_managers: DashMap::new(),
                engine,
                resolver,
                sink,
                config,
                runtime,
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    // -----------------------------------------------------------------------
    // Key-Manager
    // -----------------------------------------------------------------------

    /// Legt einen neuen Key-Manager an und gibt seine ID zurueck
    pub fn create_key_manager(&self) -> KeyManagerId {
        loop {
            let id = KeyManagerId::new();
            if let Entry::Vacant(frei) = self.inner.key_managers.entry(id) {
                frei.insert(Arc::new(KeyManager::mit_max_ring_laenge(
                    id,
                    self.inner.config.max_ring_laenge,
                )));
                tracing::info!(key_manager_id = %id, "Key-Manager erstellt");
                return id;
            }
        }
    }

    pub fn get_key_manager(&self, id: KeyManagerId) -> FrameCryptorResult<Arc<KeyManager>> {
        self.inner
            .key_managers
            .get(&id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| FrameCryptorError::nicht_gefunden(format!("keyManager {id} nicht gefunden")))
    }

    /// Entfernt einen Key-Manager aus der Registry
    ///
    /// Sessions, die ihn referenzieren, behalten ihre Referenz und
    /// funktionieren weiter.
    pub fn dispose_key_manager(&self, id: KeyManagerId) -> FrameCryptorResult<()> {
        let (_, km) = self
            .inner
            .key_managers
            .remove(&id)
            .ok_or_else(|| FrameCryptorError::nicht_gefunden(format!("keyManager {id} nicht gefunden")))?;
        tracing::info!(
            key_manager_id = %id,
            verbleibende_referenzen = Arc::strong_count(&km) - 1,
            "Key-Manager entsorgt"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cryptor-Sessions
    // -----------------------------------------------------------------------

    /// Erstellt eine Cryptor-Session fuer einen Sender bzw. Receiver
    ///
    /// Ein fehlgeschlagenes Erstellen hinterlaesst keinen Eintrag.
    pub fn create_cryptor_session(&self, params: CreateCryptorParams) -> FrameCryptorResult<SessionId> {
        if params.participant_id.is_empty() {
            return Err(FrameCryptorError::ungueltig("participantId fehlt"));
        }
        let endpunkt_id = endpunkt_id_waehlen(&params)?;
        let key_manager = self.get_key_manager(params.key_manager_id)?;
        let endpoint = self.endpunkt_aufloesen(&params, endpunkt_id)?;

        let cryptor = self.inner.engine.create_cryptor(
            &endpoint,
            &params.participant_id,
            params.algorithm,
            Arc::clone(&key_manager),
        )?;

        // ID vorab ziehen; Bruecke und Session entstehen ohne Tabellen-Lock
        let id = loop {
            let id = SessionId::new();
            if !self.inner.sessions.contains_key(&id) {
                break id;
            }
        };
        let kanal = id.kanal_name(&self.inner.config.kanal_praefix);
        let bridge = NotificationBridge::starten(
            id,
            kanal,
            Arc::clone(&self.inner.sink),
            self.inner.config.ereignis_queue_groesse,
            &self.inner.runtime,
        );
        let session = Arc::new(CryptorSession::neu(
            id,
            params.kind,
            params.participant_id.clone(),
            params.algorithm,
            key_manager,
            cryptor,
            bridge,
            Arc::clone(&self.inner.sink),
        ));

        let eingetragen = match self.inner.sessions.entry(id) {
            Entry::Vacant(frei) => {
                frei.insert(Arc::clone(&session));
                true
            }
            Entry::Occupied(_) => false,
        };
        if !eingetragen {
            session.verwerfen();
            return Err(FrameCryptorError::intern(format!(
                "Session-ID {id} gleichzeitig doppelt vergeben"
            )));
        }

        tracing::info!(
            session_id = %id,
            kind = %params.kind,
            participant_id = %params.participant_id,
            algorithm = ?params.algorithm,
            key_manager_id = %params.key_manager_id,
            "Cryptor-Session erstellt"
        );
        Ok(id)
    }

    /// Sucht eine Session; eine gerade entsorgte gilt als nicht vorhanden
    pub fn get_session(&self, id: SessionId) -> FrameCryptorResult<Arc<CryptorSession>> {
        self.inner
            .sessions
            .get(&id)
            .map(|e| Arc::clone(e.value()))
            .filter(|session| !session.ist_entsorgt())
            .ok_or_else(|| FrameCryptorError::nicht_gefunden(format!("frameCryptor {id} nicht gefunden")))
    }

    /// Entsorgt eine Session
    ///
    /// Erst Engine-Observer und Bruecke abmelden, dann aus der Tabelle
    /// entfernen. Nach Rueckkehr wird kein Ereignis mehr zugestellt. Ab Beginn
    /// des Entsorgens findet `get_session` die Session nicht mehr, und ihre
    /// Setter melden `NichtGefunden`.
    pub fn dispose_session(&self, id: SessionId) -> FrameCryptorResult<()> {
        let session = self.get_session(id)?;
        // Nur wer tatsaechlich entsorgt, meldet Erfolg
        if !session.dispose() {
            return Err(FrameCryptorError::nicht_gefunden(format!(
                "frameCryptor {id} nicht gefunden"
            )));
        }
        self.inner.sessions.remove(&id);
        Ok(())
    }

    /// Name des Ereignis-Kanals einer Session
    pub fn event_channel(&self, id: SessionId) -> FrameCryptorResult<String> {
        Ok(self.get_session(id)?.kanal().to_string())
    }

    /// Entsorgt alle Sessions und Key-Manager (Prozess-Ende)
    ///
    /// Gibt die Anzahl entsorgter Sessions zurueck.
    pub fn dispose_all(&self) -> usize {
        let ids = self.session_ids();
        let entsorgt = ids
            .into_iter()
            .filter(|id| self.dispose_session(*id).is_ok())
            .count();
        let key_manager = self.inner.key_managers.len();
        self.inner.key_managers.clear();
        tracing::info!(sessions = entsorgt, key_manager, "Registry geleert");
        entsorgt
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.inner.sessions.iter().map(|e| *e.key()).collect()
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn key_manager_count(&self) -> usize {
        self.inner.key_managers.len()
    }

    fn endpunkt_aufloesen(
        &self,
        params: &CreateCryptorParams,
        endpunkt_id: &str,
    ) -> FrameCryptorResult<EndpointHandle> {
        let pc = params.peer_connection_id.as_str();
        if pc.is_empty() || !self.inner.resolver.peer_connection_exists(pc) {
            return Err(FrameCryptorError::nicht_gefunden(format!(
                "peerConnection {pc} nicht gefunden"
            )));
        }
        let endpoint = match params.kind {
            CryptorKind::Sender => self.inner.resolver.resolve_sender(pc, endpunkt_id),
            CryptorKind::Receiver => self.inner.resolver.resolve_receiver(pc, endpunkt_id),
        };
        endpoint.ok_or_else(|| {
            FrameCryptorError::EndpunktNichtGefunden(format!(
                "{} {endpunkt_id} nicht gefunden",
                params.kind
            ))
        })
    }
}

/// Angegebene, nicht leere ID
fn angegeben(id: &Option<String>) -> Option<&str> {
    id.as_deref().filter(|s| !s.is_empty())
}

/// Waehlt die Endpunkt-ID passend zur Art der Session
///
/// Genau eine der beiden IDs muss angegeben sein, und sie muss zur Art passen.
fn endpunkt_id_waehlen(params: &CreateCryptorParams) -> FrameCryptorResult<&str> {
    match (
        params.kind,
        angegeben(&params.rtp_sender_id),
        angegeben(&params.rtp_receiver_id),
    ) {
        (_, None, None) => Err(FrameCryptorError::EndpunktNichtGefunden(
            "rtpSenderId oder rtpReceiverId fehlt".into(),
        )),
        (_, Some(_), Some(_)) => Err(FrameCryptorError::EndpunktNichtGefunden(
            "nur eine von rtpSenderId und rtpReceiverId erlaubt".into(),
        )),
        (CryptorKind::Sender, Some(id), None) => Ok(id),
        (CryptorKind::Receiver, None, Some(id)) => Ok(id),
        (CryptorKind::Sender, None, Some(_)) => Err(FrameCryptorError::EndpunktNichtGefunden(
            "sender verlangt rtpSenderId".into(),
        )),
        (CryptorKind::Receiver, Some(_), None) => Err(FrameCryptorError::EndpunktNichtGefunden(
            "receiver verlangt rtpReceiverId".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::EventHub;
    use crate::testing::{MemoryEngine, StaticResolver};

    fn registry() -> (SessionRegistry, Arc<MemoryEngine>) {
        let engine = Arc::new(MemoryEngine::neu());
        let resolver = StaticResolver::neu()
            .mit_sender("pc-1", "s-1")
            .mit_receiver("pc-1", "r-1");
        let registry = SessionRegistry::neu(
            engine.clone(),
            Arc::new(resolver),
            Arc::new(EventHub::default()),
            RegistryConfig::default(),
        )
        .unwrap();
        (registry, engine)
    }

    fn sender_params(km: KeyManagerId) -> CreateCryptorParams {
        CreateCryptorParams {
            kind: CryptorKind::Sender,
            peer_connection_id: "pc-1".into(),
            rtp_sender_id: Some("s-1".into()),
            rtp_receiver_id: None,
            participant_id: "alice".into(),
            algorithm: Algorithm::AesGcm,
            key_manager_id: km,
        }
    }

    #[test]
    fn ohne_runtime_schlaegt_neu_fehl() {
        let ergebnis = SessionRegistry::neu(
            Arc::new(MemoryEngine::neu()),
            Arc::new(StaticResolver::neu()),
            Arc::new(EventHub::default()),
            RegistryConfig::default(),
        );
        assert!(matches!(ergebnis, Err(FrameCryptorError::Intern(_))));
    }

    #[tokio::test]
    async fn key_manager_erstellen_und_entsorgen() {
        let (r, _) = registry();
        let km = r.create_key_manager();
        assert!(r.get_key_manager(km).is_ok());
        assert_eq!(r.key_manager_count(), 1);

        r.dispose_key_manager(km).unwrap();
        assert!(matches!(
            r.get_key_manager(km),
            Err(FrameCryptorError::NichtGefunden(_))
        ));
        assert!(r.dispose_key_manager(km).is_err());
    }

    #[tokio::test]
    async fn key_manager_uebernimmt_ring_grenze() {
        let engine = Arc::new(MemoryEngine::neu());
        let r = SessionRegistry::neu(
            engine,
            Arc::new(StaticResolver::neu()),
            Arc::new(EventHub::default()),
            RegistryConfig {
                max_ring_laenge: 2,
                ..RegistryConfig::default()
            },
        )
        .unwrap();
        let km = r.get_key_manager(r.create_key_manager()).unwrap();
        assert_eq!(km.max_ring_laenge(), 2);
    }

    #[tokio::test]
    async fn receiver_session_erstellen() {
        let (r, engine) = registry();
        let km = r.create_key_manager();
        let params = CreateCryptorParams {
            kind: CryptorKind::Receiver,
            rtp_sender_id: None,
            rtp_receiver_id: Some("r-1".into()),
            algorithm: Algorithm::AesCbc,
            ..sender_params(km)
        };
        let id = r.create_cryptor_session(params).unwrap();
        let s = r.get_session(id).unwrap();
        assert_eq!(s.kind(), CryptorKind::Receiver);
        assert_eq!(s.algorithm(), Algorithm::AesCbc);
        assert_eq!(engine.cryptoren()[0].endpoint().endpoint_id, "r-1");
    }

    #[tokio::test]
    async fn leere_endpunkt_ids_zaehlen_als_fehlend() {
        let (r, _) = registry();
        let km = r.create_key_manager();
        let params = CreateCryptorParams {
            rtp_sender_id: Some(String::new()),
            rtp_receiver_id: Some(String::new()),
            ..sender_params(km)
        };
        assert!(matches!(
            r.create_cryptor_session(params),
            Err(FrameCryptorError::EndpunktNichtGefunden(_))
        ));
    }

    #[tokio::test]
    async fn beide_endpunkte_angegeben_schlaegt_fehl() {
        let (r, _) = registry();
        let km = r.create_key_manager();
        let params = CreateCryptorParams {
            rtp_receiver_id: Some("r-1".into()),
            ..sender_params(km)
        };
        assert!(matches!(
            r.create_cryptor_session(params),
            Err(FrameCryptorError::EndpunktNichtGefunden(_))
        ));
        assert_eq!(r.session_count(), 0);
    }

    #[tokio::test]
    async fn art_und_endpunkt_muessen_passen() {
        let (r, _) = registry();
        let km = r.create_key_manager();
        let params = CreateCryptorParams {
            kind: CryptorKind::Receiver,
            ..sender_params(km)
        };
        assert!(matches!(
            r.create_cryptor_session(params),
            Err(FrameCryptorError::EndpunktNichtGefunden(_))
        ));
    }

    #[tokio::test]
    async fn unbekannte_peer_connection() {
        let (r, _) = registry();
        let km = r.create_key_manager();
        let params = CreateCryptorParams {
            peer_connection_id: "pc-x".into(),
            ..sender_params(km)
        };
        assert!(matches!(
            r.create_cryptor_session(params),
            Err(FrameCryptorError::NichtGefunden(_))
        ));
    }

    #[tokio::test]
    async fn unbekannter_sender() {
        let (r, _) = registry();
        let km = r.create_key_manager();
        let params = CreateCryptorParams {
            rtp_sender_id: Some("s-x".into()),
            ..sender_params(km)
        };
        assert!(matches!(
            r.create_cryptor_session(params),
            Err(FrameCryptorError::EndpunktNichtGefunden(_))
        ));
    }

    #[tokio::test]
    async fn leerer_teilnehmer_ist_ungueltig() {
        let (r, _) = registry();
        let km = r.create_key_manager();
        let params = CreateCryptorParams {
            participant_id: String::new(),
            ..sender_params(km)
        };
        assert!(matches!(
            r.create_cryptor_session(params),
            Err(FrameCryptorError::UngueltigesArgument(_))
        ));
    }

    #[tokio::test]
    async fn engine_fehler_hinterlaesst_keinen_eintrag() {
        let (r, engine) = registry();
        let km = r.create_key_manager();
        engine.naechste_erstellung_ablehnen(FrameCryptorError::EngineAbgelehnt("kaputt".into()));
        assert!(matches!(
            r.create_cryptor_session(sender_params(km)),
            Err(FrameCryptorError::EngineAbgelehnt(_))
        ));
        assert_eq!(r.session_count(), 0);
        // Naechster Versuch klappt wieder
        assert!(r.create_cryptor_session(sender_params(km)).is_ok());
    }

    #[tokio::test]
    async fn kanal_name_aus_praefix_und_id() {
        let (r, _) = registry();
        let km = r.create_key_manager();
        let id = r.create_cryptor_session(sender_params(km)).unwrap();
        assert_eq!(
            r.event_channel(id).unwrap(),
            format!("{STANDARD_KANAL_PRAEFIX}{id}")
        );
    }

    #[tokio::test]
    async fn dispose_all_leert_registry() {
        let (r, engine) = registry();
        let km = r.create_key_manager();
        r.create_cryptor_session(sender_params(km)).unwrap();
        r.create_cryptor_session(sender_params(km)).unwrap();

        assert_eq!(r.dispose_all(), 2);
        assert_eq!(r.session_count(), 0);
        assert_eq!(r.key_manager_count(), 0);
        assert!(engine.cryptoren().iter().all(|c| !c.hat_observer()));
    }

    #[test]
    fn endpunkt_id_nach_art() {
        let km = KeyManagerId::new();
        assert_eq!(endpunkt_id_waehlen(&sender_params(km)).unwrap(), "s-1");

        let receiver = CreateCryptorParams {
            kind: CryptorKind::Receiver,
            rtp_sender_id: Some(String::new()),
            rtp_receiver_id: Some("r-1".into()),
            ..sender_params(km)
        };
        assert_eq!(endpunkt_id_waehlen(&receiver).unwrap(), "r-1");
    }

    #[tokio::test]
    async fn lookup_waehrend_dispose_findet_nichts() {
        let (r, engine) = registry();
        engine.abmeldung_verzoegern(std::time::Duration::from_millis(200));
        let km = r.create_key_manager();
        let id = r.create_cryptor_session(sender_params(km)).unwrap();
        let cryptor = Arc::clone(&engine.cryptoren()[0]);

        let entsorger = {
            let r = r.clone();
            std::thread::spawn(move || r.dispose_session(id))
        };
        while !cryptor.abmeldung_begonnen() {
            std::thread::yield_now();
        }

        assert!(matches!(
            r.get_session(id),
            Err(FrameCryptorError::NichtGefunden(_))
        ));
        entsorger.join().unwrap().unwrap();
        assert!(r.dispose_session(id).is_err());
        assert_eq!(cryptor.enabled_aufrufe(), 1);
    }

    #[tokio::test]
    async fn clone_teilt_inneren_zustand() {
        let (r1, _) = registry();
        let r2 = r1.clone();
        let km = r1.create_key_manager();
        assert!(r2.get_key_manager(km).is_ok());
    }
}
