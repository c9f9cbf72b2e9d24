//! Host-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Host ohne Konfigurationsdatei
//! lauffaehig ist.

use framecrypt_observability::{log_level_gueltig, LogFormat};
use framecrypt_session::{EventHubConfig, RegistryConfig, STANDARD_KANAL_PRAEFIX};
use serde::{Deserialize, Serialize};

/// Vollstaendige Host-Konfiguration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Sessions und Ereignis-Kanaele
    pub registry: RegistryEinstellungen,
    /// Key-Ringe
    pub schluessel: SchluesselEinstellungen,
    /// Ereignis-Hub
    pub ereignisse: EreignisEinstellungen,
    pub logging: LoggingEinstellungen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryEinstellungen {
    /// Queue-Groesse zwischen Engine-Thread und Weiterleitung pro Session
    pub ereignis_queue_groesse: usize,
    /// Praefix der Ereignis-Kanaele (Kanal = Praefix + Session-ID)
    pub kanal_praefix: String,
}

impl Default for RegistryEinstellungen {
    fn default() -> Self {
        Self {
            ereignis_queue_groesse: 64,
            kanal_praefix: STANDARD_KANAL_PRAEFIX.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchluesselEinstellungen {
    /// Maximale Laenge eines Key-Rings
    pub max_ring_laenge: usize,
}

impl Default for SchluesselEinstellungen {
    fn default() -> Self {
        Self { max_ring_laenge: 256 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EreignisEinstellungen {
    /// Gepufferte Ereignisse pro Kanal solange niemand zuhoert (0 = verwerfen)
    pub puffer_ohne_abonnent: usize,
    /// Queue-Groesse eines Abonnenten
    pub abonnent_queue_groesse: usize,
}

impl Default for EreignisEinstellungen {
    fn default() -> Self {
        let hub = EventHubConfig::default();
        Self {
            puffer_ohne_abonnent: hub.puffer_ohne_abonnent,
            abonnent_queue_groesse: hub.abonnent_queue_groesse,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder Direktiven wie `warn,framecrypt_session=debug`
    pub level: String,
    pub format: LogFormat,
    /// Deaktiviert = der Host installiert keinen Subscriber
    pub aktiviert: bool,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
            aktiviert: true,
        }
    }
}

impl HostConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.validieren()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die der Typ allein nicht ausschliesst
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.registry.ereignis_queue_groesse == 0 {
            anyhow::bail!("registry.ereignis_queue_groesse muss groesser 0 sein");
        }
        if self.registry.kanal_praefix.is_empty() {
            anyhow::bail!("registry.kanal_praefix darf nicht leer sein");
        }
        if self.schluessel.max_ring_laenge == 0 {
            anyhow::bail!("schluessel.max_ring_laenge muss groesser 0 sein");
        }
        if self.ereignisse.abonnent_queue_groesse == 0 {
            anyhow::bail!("ereignisse.abonnent_queue_groesse muss groesser 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("logging.level '{}' ist ungueltig", self.logging.level);
        }
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            ereignis_queue_groesse: self.registry.ereignis_queue_groesse,
            kanal_praefix: self.registry.kanal_praefix.clone(),
            max_ring_laenge: self.schluessel.max_ring_laenge,
        }
    }

    pub fn hub_config(&self) -> EventHubConfig {
        EventHubConfig {
            puffer_ohne_abonnent: self.ereignisse.puffer_ohne_abonnent,
            abonnent_queue_groesse: self.ereignisse.abonnent_queue_groesse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = HostConfig::default();
        assert!(cfg.validieren().is_ok());
        assert_eq!(cfg.registry.ereignis_queue_groesse, 64);
        assert_eq!(cfg.registry.kanal_praefix, "frameCryptorEvent/");
        assert_eq!(cfg.schluessel.max_ring_laenge, 256);
        assert_eq!(cfg.ereignisse.puffer_ohne_abonnent, 16);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.registry_config(), RegistryConfig::default());
        assert_eq!(cfg.hub_config(), EventHubConfig::default());
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [registry]
            kanal_praefix = "fc/"

            [schluessel]
            max_ring_laenge = 16

            [logging]
            format = "json"
        "#;
        let cfg: HostConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.registry.kanal_praefix, "fc/");
        assert_eq!(cfg.registry_config().max_ring_laenge, 16);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.registry.ereignis_queue_groesse, 64);
        assert!(cfg.logging.aktiviert);
    }

    #[test]
    fn null_queue_ist_ungueltig() {
        let cfg: HostConfig = toml::from_str("[registry]\nereignis_queue_groesse = 0").unwrap();
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn unbekanntes_log_level_ist_ungueltig() {
        let cfg: HostConfig = toml::from_str("[logging]\nlevel = \"gespraechig\"").unwrap();
        let fehler = cfg.validieren().unwrap_err();
        assert!(fehler.to_string().contains("logging.level"));

        let cfg: HostConfig =
            toml::from_str("[logging]\nlevel = \"warn,framecrypt_session=debug\"").unwrap();
        assert!(cfg.validieren().is_ok());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = HostConfig::laden("/nicht/vorhanden/framecrypt.toml").unwrap();
        assert_eq!(cfg, HostConfig::default());
    }

    #[test]
    fn ungueltige_datei_meldet_fehler() {
        let pfad = std::env::temp_dir().join(format!("framecrypt-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[schluessel]\nmax_ring_laenge = \"viel\"").unwrap();
        let ergebnis = HostConfig::laden(pfad.to_str().unwrap());
        std::fs::remove_file(&pfad).unwrap();
        assert!(ergebnis.is_err());
    }
}
