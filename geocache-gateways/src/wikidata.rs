use anyhow::{anyhow, Result};
use async_trait::async_trait;
use geocache_core::{entities::GeoCode, gateways::geocode::TermGeoCodingGateway};
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

pub const DEFAULT_BASE_URL: &str = "https://www.wikidata.org";
pub const DEFAULT_LANGUAGE: &str = "en";

/// Resolves place names by searching for a Wikidata
/// entity and reading its coordinate location.
#[derive(Debug, Clone)]
pub struct Wikidata {
    client: reqwest::Client,
    api_url: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    claims: Claims,
}

#[derive(Debug, Default, Deserialize)]
struct Claims {
    // Coordinate location
    #[serde(rename = "P625", default)]
    coordinate_location: Vec<Claim>,
}

#[derive(Debug, Deserialize)]
struct Claim {
    mainsnak: Snak,
}

#[derive(Debug, Deserialize)]
struct Snak {
    datavalue: Option<DataValue>,
}

#[derive(Debug, Deserialize)]
struct DataValue {
    value: Coordinate,
}

#[derive(Debug, Deserialize)]
struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Wikidata {
    pub fn try_new(
        base_url: &str,
        language: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = crate::http_client(user_agent, timeout)?;
        let api_url = format!("{}/w/api.php", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            api_url,
            language: language.to_owned(),
        })
    }

    async fn search_entity(&self, term: &str) -> Result<Option<String>> {
        let res: SearchResponse = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "wbsearchentities"),
                ("format", "json"),
                ("limit", "1"),
                ("language", self.language.as_str()),
                ("search", term),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(res.search.into_iter().next().map(|hit| hit.id))
    }

    async fn entity_coordinate(&self, id: &str) -> Result<Option<GeoCode>> {
        let res: EntitiesResponse = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "wbgetentities"),
                ("format", "json"),
                ("props", "claims"),
                ("ids", id),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let entity = res
            .entities
            .get(id)
            .ok_or_else(|| anyhow!("Missing entity {id}"))?;
        let Some(coordinate) = entity
            .claims
            .coordinate_location
            .iter()
            .find_map(|claim| claim.mainsnak.datavalue.as_ref())
            .map(|data| &data.value)
        else {
            return Ok(None);
        };
        let geocode = GeoCode::try_from_lat_lng_deg(coordinate.latitude, coordinate.longitude)?;
        Ok(Some(geocode))
    }

    async fn search(&self, term: &str) -> Result<Option<GeoCode>> {
        let Some(id) = self.search_entity(term).await? else {
            return Ok(None);
        };
        log::debug!("Found entity {id} for '{term}'");
        self.entity_coordinate(&id).await
    }
}

#[async_trait]
impl TermGeoCodingGateway for Wikidata {
    async fn resolve_term(&self, term: &str) -> Option<GeoCode> {
        match self.search(term).await {
            Ok(geocode) => geocode,
            Err(err) => {
                log::warn!("Failed to resolve location of '{term}': {err}");
                None
            }
        }
    }
}
