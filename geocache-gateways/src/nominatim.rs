use anyhow::Result;
use async_trait::async_trait;
use geocache_core::{
    entities::{Address, GeoCode},
    gateways::geocode::{AddressGeoCodingGateway, AddressHit, TermGeoCodingGateway},
};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Geocoding based on the OpenStreetMap search API.
#[derive(Debug, Clone)]
pub struct Nominatim {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    address: Option<PlaceAddress>,
}

#[derive(Debug, Deserialize)]
struct PlaceAddress {
    postcode: Option<String>,
}

impl Place {
    fn geocode(&self) -> Result<GeoCode> {
        Ok(GeoCode::parse_lat_lng_deg(&self.lat, &self.lon)?)
    }
}

impl Nominatim {
    pub fn try_new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = crate::http_client(user_agent, timeout)?;
        let base_url = base_url.trim_end_matches('/').to_owned();
        Ok(Self { client, base_url })
    }

    async fn search(&self, params: &[(&str, &str)]) -> Result<Option<Place>> {
        let url = format!("{}/search", self.base_url);
        let places: Vec<Place> = self
            .client
            .get(url)
            .query(&[("format", "jsonv2"), ("limit", "1")])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(places.into_iter().next())
    }

    async fn search_address(&self, addr: &Address) -> Result<Option<(GeoCode, Option<String>)>> {
        let mut params = vec![
            ("street", addr.street.as_str()),
            ("city", addr.city.as_str()),
        ];
        if !addr.country.trim().is_empty() {
            params.push(("country", addr.country.as_str()));
        }
        params.push(("addressdetails", "1"));
        let Some(place) = self.search(&params).await? else {
            return Ok(None);
        };
        let geocode = place.geocode()?;
        let postal_code = place
            .address
            .and_then(|addr| addr.postcode)
            .filter(|postcode| !postcode.trim().is_empty());
        Ok(Some((geocode, postal_code)))
    }
}

#[async_trait]
impl TermGeoCodingGateway for Nominatim {
    async fn resolve_term(&self, term: &str) -> Option<GeoCode> {
        match self.search(&[("q", term)]).await {
            Ok(Some(place)) => match place.geocode() {
                Ok(geocode) => {
                    log::debug!("Resolved location of '{term}': {geocode}");
                    Some(geocode)
                }
                Err(err) => {
                    log::warn!("Invalid location of '{term}': {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                log::warn!("Failed to resolve location of '{term}': {err}");
                None
            }
        }
    }
}

#[async_trait]
impl AddressGeoCodingGateway for Nominatim {
    async fn resolve_address(&self, addr: &Address) -> Option<AddressHit> {
        match self.search_address(addr).await {
            Ok(hit) => hit.map(|(geocode, postal_code)| {
                log::debug!("Resolved address location '{addr}': {geocode}");
                AddressHit {
                    geocode,
                    postal_code,
                }
            }),
            Err(err) => {
                log::warn!("Failed to resolve address location '{addr}': {err}");
                None
            }
        }
    }
}
