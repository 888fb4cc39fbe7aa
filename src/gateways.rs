use crate::config::{self, GeocodingGateway};
use anyhow::Result;
use async_trait::async_trait;
use geocache_core::{
    entities::{Address, GeoCode},
    gateways::geocode::{AddressGeoCodingGateway, AddressHit, TermGeoCodingGateway},
};
use geocache_gateways::{nominatim::Nominatim, opencage::OpenCage, wikidata::Wikidata};

pub type TermGeoCodingGw = Box<dyn TermGeoCodingGateway>;
pub type AddressGeoCodingGw = Box<dyn AddressGeoCodingGateway>;

pub fn term_geocoding_gateway(cfg: &config::Geocoding) -> Result<TermGeoCodingGw> {
    let Some(gw) = &cfg.term_gateway else {
        log::warn!("No term geocoding gateway was configured");
        return Ok(Box::new(DummyGeoCodingGw));
    };
    let gw: TermGeoCodingGw = match gw {
        GeocodingGateway::Nominatim {
            base_url,
            user_agent,
            timeout,
        } => {
            log::info!("Use Nominatim gateway for terms ({base_url})");
            Box::new(Nominatim::try_new(base_url, user_agent, *timeout)?)
        }
        GeocodingGateway::Wikidata {
            base_url,
            language,
            user_agent,
            timeout,
        } => {
            log::info!("Use Wikidata gateway for terms ({base_url})");
            Box::new(Wikidata::try_new(base_url, language, user_agent, *timeout)?)
        }
        GeocodingGateway::OpenCage { api_key } => {
            log::info!("Use OpenCage gateway for terms");
            Box::new(OpenCage::new(api_key.clone()))
        }
    };
    Ok(gw)
}

pub fn address_geocoding_gateway(cfg: &config::Geocoding) -> Result<AddressGeoCodingGw> {
    let Some(gw) = &cfg.address_gateway else {
        log::warn!("No address geocoding gateway was configured");
        return Ok(Box::new(DummyGeoCodingGw));
    };
    let gw: AddressGeoCodingGw = match gw {
        GeocodingGateway::Nominatim {
            base_url,
            user_agent,
            timeout,
        } => {
            log::info!("Use Nominatim gateway for addresses ({base_url})");
            Box::new(Nominatim::try_new(base_url, user_agent, *timeout)?)
        }
        GeocodingGateway::OpenCage { api_key } => {
            log::info!("Use OpenCage gateway for addresses");
            Box::new(OpenCage::new(api_key.clone()))
        }
        GeocodingGateway::Wikidata { .. } => {
            anyhow::bail!("The wikidata gateway cannot resolve addresses");
        }
    };
    Ok(gw)
}

struct DummyGeoCodingGw;

#[async_trait]
impl TermGeoCodingGateway for DummyGeoCodingGw {
    async fn resolve_term(&self, term: &str) -> Option<GeoCode> {
        log::debug!("Cannot resolve '{term}' because no geocoding gateway was configured");
        None
    }
}

#[async_trait]
impl AddressGeoCodingGateway for DummyGeoCodingGw {
    async fn resolve_address(&self, addr: &Address) -> Option<AddressHit> {
        log::debug!("Cannot resolve '{addr}' because no geocoding gateway was configured");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fall_back_to_dummy_gateways() {
        let cfg = config::Geocoding {
            term_gateway: None,
            address_gateway: None,
        };
        let term_gw = term_geocoding_gateway(&cfg).unwrap();
        assert!(term_gw.resolve_term("Eiffel Tower").await.is_none());
        let address_gw = address_geocoding_gateway(&cfg).unwrap();
        let addr = Address::new("10 Downing Street", "London", "UK");
        assert!(address_gw.resolve_address(&addr).await.is_none());
    }

    #[test]
    fn reject_wikidata_for_addresses() {
        let cfg = config::Geocoding {
            term_gateway: None,
            address_gateway: Some(GeocodingGateway::Wikidata {
                base_url: "http://localhost".into(),
                language: "en".into(),
                user_agent: "test".into(),
                timeout: Duration::from_secs(1),
            }),
        };
        assert!(address_geocoding_gateway(&cfg).is_err());
    }
}
