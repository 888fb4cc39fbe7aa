use anyhow::{anyhow, Result};
use geocache_core::{entities::FingerprintScope, retry::RetryPolicy};
use geocache_db_tantivy::WriteMode;
use geocache_gateways::{nominatim, wikidata, DEFAULT_USER_AGENT};
use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

mod raw;

const DEFAULT_CONFIG_FILE_NAME: &str = "geocache.toml";

const ENV_NAME_INDEX_DIR: &str = "INDEX_DIR";
const ENV_NAME_OPENCAGE_API_KEY: &str = "OPENCAGE_API_KEY";

const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Config {
    pub db: Db,
    pub cache: Cache,
    pub retry: RetryPolicy,
    pub geocoding: Geocoding,
    pub dead_letters: DeadLetters,
}

impl Config {
    pub fn try_load_from_file_or_default<P: AsRef<Path>>(file_path: Option<P>) -> Result<Self> {
        let file_path: &Path = file_path.as_ref().map(|p| p.as_ref()).unwrap_or_else(|| {
            log::info!("No configuration file specified. load {DEFAULT_CONFIG_FILE_NAME}");
            Path::new(DEFAULT_CONFIG_FILE_NAME)
        });

        let mut raw_config = match fs::read_to_string(file_path) {
            Ok(cfg_string) => toml::from_str(&cfg_string)?,
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    log::info!(
                        "{} not found => load default configuration.",
                        file_path.display()
                    );
                    Ok(raw::Config::default())
                }
                _ => Err(err),
            }?,
        };
        if let Ok(api_key) = env::var(ENV_NAME_OPENCAGE_API_KEY) {
            let gateway = raw_config.gateway.get_or_insert_with(Default::default);
            gateway.opencage = Some(raw::OpenCage {
                api_key: Some(api_key),
            });
        }
        let mut cfg = Self::try_from(raw_config)?;
        if let Ok(index_dir) = env::var(ENV_NAME_INDEX_DIR) {
            cfg.db.index_dir = Some(index_dir.into());
        }
        Ok(cfg)
    }
}

pub struct Db {
    /// File system directory of the cache index.
    pub index_dir: Option<PathBuf>,
}

pub struct Cache {
    pub fingerprint_scope: FingerprintScope,
    pub write_mode: WriteMode,
}

pub struct Geocoding {
    pub term_gateway: Option<GeocodingGateway>,
    pub address_gateway: Option<GeocodingGateway>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeocodingGateway {
    Nominatim {
        base_url: String,
        user_agent: String,
        timeout: Duration,
    },
    Wikidata {
        base_url: String,
        language: String,
        user_agent: String,
        timeout: Duration,
    },
    OpenCage {
        api_key: String,
    },
}

pub struct DeadLetters {
    /// File system directory for writing records into JSON files.
    pub dir: Option<PathBuf>,
}

fn geocoding_gateway(
    gw_name: raw::GeocodingGateway,
    gateway: &raw::Gateway,
) -> Result<GeocodingGateway> {
    let gw = match gw_name {
        raw::GeocodingGateway::Nominatim => {
            let raw::Nominatim {
                base_url,
                user_agent,
                timeout,
            } = gateway.nominatim.clone().unwrap_or_default();
            GeocodingGateway::Nominatim {
                base_url: base_url.unwrap_or_else(|| nominatim::DEFAULT_BASE_URL.to_owned()),
                user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
                timeout: timeout.unwrap_or(DEFAULT_GATEWAY_TIMEOUT),
            }
        }
        raw::GeocodingGateway::Wikidata => {
            let raw::Wikidata {
                base_url,
                language,
                user_agent,
                timeout,
            } = gateway.wikidata.clone().unwrap_or_default();
            GeocodingGateway::Wikidata {
                base_url: base_url.unwrap_or_else(|| wikidata::DEFAULT_BASE_URL.to_owned()),
                language: language.unwrap_or_else(|| wikidata::DEFAULT_LANGUAGE.to_owned()),
                user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
                timeout: timeout.unwrap_or(DEFAULT_GATEWAY_TIMEOUT),
            }
        }
        raw::GeocodingGateway::Opencage => {
            let api_key = gateway
                .opencage
                .as_ref()
                .and_then(|oc| oc.api_key.clone())
                .ok_or_else(|| anyhow!("Missing 'opencage' gateway configuration (api-key)"))?;
            GeocodingGateway::OpenCage { api_key }
        }
    };
    Ok(gw)
}

impl TryFrom<raw::Config> for Config {
    type Error = anyhow::Error;
    fn try_from(from: raw::Config) -> Result<Self> {
        let raw::Config {
            db,
            cache,
            retry,
            geocoding,
            gateway,
            dead_letters,
        } = from;

        let raw::Db { index_dir } = db.unwrap_or_default();
        let db = Db { index_dir };

        let raw::Cache {
            fingerprint,
            write_mode,
        } = cache.unwrap_or_default();
        let fingerprint_scope = fingerprint
            .map(|s| s.parse::<FingerprintScope>())
            .transpose()?
            .unwrap_or_default();
        let write_mode = write_mode
            .map(|s| s.parse::<WriteMode>())
            .transpose()?
            .unwrap_or_default();
        let cache = Cache {
            fingerprint_scope,
            write_mode,
        };

        let (max_attempts, delay) = {
            let raw::Retry {
                max_attempts,
                delay,
            } = retry.unwrap_or_default();
            let default = raw::Retry::default();
            let fallback = RetryPolicy::default();
            (
                max_attempts
                    .or(default.max_attempts)
                    .unwrap_or(fallback.max_attempts()),
                delay.or(default.delay).unwrap_or(fallback.delay()),
            )
        };
        if max_attempts == 0 {
            return Err(anyhow!("At least one write attempt is required"));
        }
        let retry = RetryPolicy::new(max_attempts, delay);

        let gateway = gateway.unwrap_or_default();
        let raw::Geocoding {
            term_gateway,
            address_gateway,
        } = geocoding.unwrap_or_default();
        let term_gateway = term_gateway
            .map(|gw_name| geocoding_gateway(gw_name, &gateway))
            .transpose()?;
        let address_gateway = match address_gateway {
            Some(raw::GeocodingGateway::Wikidata) => {
                return Err(anyhow!("The wikidata gateway cannot resolve addresses"));
            }
            Some(gw_name) => Some(geocoding_gateway(gw_name, &gateway)?),
            None => None,
        };
        let geocoding = Geocoding {
            term_gateway,
            address_gateway,
        };

        let raw::DeadLetters { dir } = dead_letters.unwrap_or_default();
        if let Some(dir) = &dir {
            log::info!("Use JSON file dead letter gateway ({})", dir.display());
        }
        let dead_letters = DeadLetters { dir };

        Ok(Self {
            db,
            cache,
            retry,
            geocoding,
            dead_letters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Config> {
        let raw_config: raw::Config = toml::from_str(toml)?;
        Config::try_from(raw_config)
    }

    #[test]
    fn default_config() {
        let cfg = Config::try_from(raw::Config::default()).unwrap();
        assert!(cfg.db.index_dir.is_none());
        assert_eq!(
            FingerprintScope::StreetCityCountry,
            cfg.cache.fingerprint_scope
        );
        assert_eq!(WriteMode::Append, cfg.cache.write_mode);
        assert_eq!(RetryPolicy::default(), cfg.retry);
        assert_eq!(
            Some(GeocodingGateway::Nominatim {
                base_url: nominatim::DEFAULT_BASE_URL.to_owned(),
                user_agent: DEFAULT_USER_AGENT.to_owned(),
                timeout: Duration::from_secs(10),
            }),
            cfg.geocoding.address_gateway
        );
        assert!(cfg.dead_letters.dir.is_none());
    }

    #[test]
    fn empty_config() {
        let cfg = parse("").unwrap();
        assert_eq!(RetryPolicy::default(), cfg.retry);
        assert!(cfg.geocoding.term_gateway.is_some());
        assert!(cfg.geocoding.address_gateway.is_some());
    }

    #[test]
    fn index_dir_only_config_keeps_the_default_gateways() {
        let cfg = parse("[db]\nindex-dir = \"/var/lib/geocache\"").unwrap();
        assert_eq!(
            Some(Path::new("/var/lib/geocache")),
            cfg.db.index_dir.as_deref()
        );
        assert!(matches!(
            cfg.geocoding.term_gateway,
            Some(GeocodingGateway::Nominatim { .. })
        ));
        assert!(matches!(
            cfg.geocoding.address_gateway,
            Some(GeocodingGateway::Nominatim { .. })
        ));
    }

    #[test]
    fn explicitly_disabled_gateways() {
        let cfg = parse("[geocoding]").unwrap();
        assert!(cfg.geocoding.term_gateway.is_none());
        assert!(cfg.geocoding.address_gateway.is_none());
    }

    #[test]
    fn partial_retry_config() {
        let cfg = parse("[retry]\nmax-attempts = 3").unwrap();
        assert_eq!(3, cfg.retry.max_attempts());
        assert_eq!(Duration::from_secs(10), cfg.retry.delay());

        let cfg = parse("[retry]\ndelay = \"1s\"").unwrap();
        assert_eq!(40, cfg.retry.max_attempts());
        assert_eq!(Duration::from_secs(1), cfg.retry.delay());
    }

    #[test]
    fn custom_config() {
        let cfg = parse(
            r#"
            [db]
            index-dir = "/var/lib/geocache"

            [cache]
            fingerprint = "street-city"
            write-mode = "upsert"

            [retry]
            max-attempts = 3
            delay = "500ms"

            [geocoding]
            term-gateway = "wikidata"
            address-gateway = "opencage"

            [gateway.wikidata]
            language = "de"

            [gateway.opencage]
            api-key = "secret"

            [dead-letters]
            dir = "/tmp/dead-letters"
            "#,
        )
        .unwrap();
        assert_eq!(
            Some(Path::new("/var/lib/geocache")),
            cfg.db.index_dir.as_deref()
        );
        assert_eq!(FingerprintScope::StreetCity, cfg.cache.fingerprint_scope);
        assert_eq!(WriteMode::Upsert, cfg.cache.write_mode);
        assert_eq!(3, cfg.retry.max_attempts());
        assert_eq!(Duration::from_millis(500), cfg.retry.delay());
        assert_eq!(
            Some(GeocodingGateway::Wikidata {
                base_url: wikidata::DEFAULT_BASE_URL.to_owned(),
                language: "de".to_owned(),
                user_agent: DEFAULT_USER_AGENT.to_owned(),
                timeout: Duration::from_secs(10),
            }),
            cfg.geocoding.term_gateway
        );
        assert_eq!(
            Some(GeocodingGateway::OpenCage {
                api_key: "secret".to_owned()
            }),
            cfg.geocoding.address_gateway
        );
        assert_eq!(
            Some(Path::new("/tmp/dead-letters")),
            cfg.dead_letters.dir.as_deref()
        );
    }

    #[test]
    fn opencage_requires_an_api_key() {
        let err = parse(
            r#"
            [geocoding]
            term-gateway = "opencage"
            "#,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("opencage"));
    }

    #[test]
    fn wikidata_cannot_resolve_addresses() {
        assert!(parse(
            r#"
            [geocoding]
            address-gateway = "wikidata"
            "#,
        )
        .is_err());
    }

    #[test]
    fn reject_invalid_values() {
        assert!(parse("[cache]\nfingerprint = \"city\"").is_err());
        assert!(parse("[cache]\nwrite-mode = \"overwrite\"").is_err());
        assert!(parse("[retry]\nmax-attempts = 0\ndelay = \"1s\"").is_err());
    }
}
