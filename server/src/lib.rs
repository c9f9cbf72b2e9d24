//! framecrypt-host – Einstiegspunkt fuer den Einbau in eine Anwendung
//!
//! Besitzt die einzige Registry des Prozesses. Die Anwendung liefert Engine
//! und Transport-Resolver, der Host baut daraus Ereignis-Hub, Registry und
//! Befehlsausfuehrer und raeumt beim Herunterfahren alles ab.

pub mod config;

use std::sync::Arc;

use anyhow::Result;
use config::HostConfig;
use framecrypt_control::{CommandExecutor, ControlResult};
use framecrypt_core::SessionId;
use framecrypt_session::{
    EventHub, FrameCryptorEngine, SessionRegistry, TransportResolver,
};
use tokio::sync::mpsc;

pub use framecrypt_core::StateEvent;

/// Haelt Registry, Ereignis-Hub und Befehlsausfuehrer zusammen
pub struct Host {
    config: HostConfig,
    hub: Arc<EventHub>,
    registry: SessionRegistry,
    executor: Arc<CommandExecutor>,
}

impl Host {
    /// Erstellt den Host innerhalb der laufenden Tokio-Runtime
    ///
    /// Initialisiert das Logging, sofern aktiviert und noch kein Subscriber
    /// installiert ist.
    pub fn neu(
        config: HostConfig,
        engine: Arc<dyn FrameCryptorEngine>,
        resolver: Arc<dyn TransportResolver>,
    ) -> Result<Self> {
        config.validieren()?;
        if config.logging.aktiviert {
            framecrypt_observability::logging_initialisieren(
                &config.logging.level,
                config.logging.format,
            );
        }

        let hub = Arc::new(EventHub::neu(config.hub_config()));
        let registry =
            SessionRegistry::neu(engine, resolver, hub.clone(), config.registry_config())?;
        let executor = CommandExecutor::neu(registry.clone());

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            kanal_praefix = %config.registry.kanal_praefix,
            max_ring_laenge = config.schluessel.max_ring_laenge,
            "framecrypt Host initialisiert"
        );

        Ok(Self {
            config,
            hub,
            registry,
            executor,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    /// Fuehrt einen Befehl in JSON-Form aus
    pub fn ausfuehren(&self, eingabe: &str) -> ControlResult<serde_json::Value> {
        self.executor.execute_json(eingabe)
    }

    /// Abonniert die Zustandsereignisse einer Session
    ///
    /// Die Queue endet, wenn die Session entsorgt wird.
    pub fn ereignisse_abonnieren(&self, session_id: SessionId) -> Result<mpsc::Receiver<StateEvent>> {
        let kanal = self.registry.event_channel(session_id)?;
        self.hub
            .abonnieren(&kanal)
            .ok_or_else(|| anyhow::anyhow!("frameCryptor {session_id} wurde entsorgt"))
    }

    /// Entsorgt alle Sessions und Key-Manager
    ///
    /// Gibt die Anzahl entsorgter Sessions zurueck.
    pub fn herunterfahren(self) -> usize {
        let entsorgt = self.registry.dispose_all();
        tracing::info!(sessions = entsorgt, "framecrypt Host heruntergefahren");
        entsorgt
    }

    /// Laeuft bis Ctrl-C und faehrt dann herunter
    pub async fn laufen_bis_signal(self) -> Result<usize> {
        tracing::info!("Host laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen");
        Ok(self.herunterfahren())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use config::LoggingEinstellungen;
    use framecrypt_core::FrameCryptionState;
    use framecrypt_session::testing::{MemoryEngine, StaticResolver};
    use serde_json::json;

    fn host(engine: Arc<MemoryEngine>) -> Host {
        let config = HostConfig {
            logging: LoggingEinstellungen {
                aktiviert: false,
                ..Default::default()
            },
            ..Default::default()
        };
        Host::neu(
            config,
            engine,
            Arc::new(StaticResolver::neu().mit_sender("pc-1", "s-1")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn ereignisse_ueber_host_abonnieren() {
        let engine = Arc::new(MemoryEngine::neu());
        let h = host(engine.clone());

        let km = h
            .ausfuehren(r#"{"method": "frameCryptorFactoryCreateKeyManager", "params": {}}"#)
            .unwrap();
        let fc = h
            .ausfuehren(
                &json!({
                    "method": "frameCryptorFactoryCreateFrameCryptor",
                    "params": {
                        "peerConnectionId": "pc-1",
                        "rtpSenderId": "s-1",
                        "participantId": "alice",
                        "type": "sender",
                        "keyManagerId": km["keyManagerId"]
                    }
                })
                .to_string(),
            )
            .unwrap();
        let id: SessionId = fc["frameCryptorId"].as_str().unwrap().parse().unwrap();

        let mut rx = h.ereignisse_abonnieren(id).unwrap();
        engine.cryptoren()[0].zustand_melden(FrameCryptionState::EncryptionFailed);
        assert_eq!(
            rx.recv().await.unwrap(),
            StateEvent::neu("alice", FrameCryptionState::EncryptionFailed)
        );

        assert_eq!(h.herunterfahren(), 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn unbekannte_session_abonnieren_schlaegt_fehl() {
        let h = host(Arc::new(MemoryEngine::neu()));
        assert!(h.ereignisse_abonnieren(SessionId::new()).is_err());
    }

    #[tokio::test]
    async fn ungueltige_config_wird_abgelehnt() {
        let mut config = HostConfig::default();
        config.schluessel.max_ring_laenge = 0;
        let ergebnis = Host::neu(
            config,
            Arc::new(MemoryEngine::neu()),
            Arc::new(StaticResolver::neu()),
        );
        assert!(ergebnis.is_err());

        let mut config = HostConfig::default();
        config.logging.level = "gespraechig".into();
        let ergebnis = Host::neu(
            config,
            Arc::new(MemoryEngine::neu()),
            Arc::new(StaticResolver::neu()),
        );
        assert!(ergebnis.is_err());
    }
}
