use async_trait::async_trait;
use geocache_core::{
    entities::{Address, GeoCode},
    gateways::geocode::{AddressGeoCodingGateway, AddressHit, TermGeoCodingGateway},
};
use geocoding::{Forward, Opencage as Client, Point};
use itertools::Itertools;

/// Forward geocoding with the OpenCage API.
///
/// OpenCage does not report postal codes.
#[derive(Debug, Clone)]
pub struct OpenCage {
    api_key: String,
}

fn address_to_forward_query_string(addr: &Address) -> String {
    let addr_parts = [&addr.street, &addr.city, &addr.country];
    addr_parts
        .into_iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .join(",")
}

impl OpenCage {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    async fn forward(&self, query: String) -> Option<GeoCode> {
        let api_key = self.api_key.clone();
        // The client is blocking
        let res = tokio::task::spawn_blocking(move || {
            let points: Result<Vec<Point<f64>>, _> = Client::new(api_key).forward(&query);
            (query, points)
        })
        .await;
        let (query, points) = match res {
            Ok(res) => res,
            Err(err) => {
                log::warn!("Failed to run OpenCage request: {err}");
                return None;
            }
        };
        let point = match points {
            Ok(points) => points.into_iter().next()?,
            Err(err) => {
                log::warn!("Failed to resolve location '{query}': {err}");
                return None;
            }
        };
        log::debug!("Resolved location '{query}': {point:?}");
        match GeoCode::try_from_lat_lng_deg(point.y(), point.x()) {
            Ok(geocode) => Some(geocode),
            Err(err) => {
                log::warn!("Invalid location of '{query}': {err}");
                None
            }
        }
    }
}

#[async_trait]
impl TermGeoCodingGateway for OpenCage {
    async fn resolve_term(&self, term: &str) -> Option<GeoCode> {
        self.forward(term.to_owned()).await
    }
}

#[async_trait]
impl AddressGeoCodingGateway for OpenCage {
    async fn resolve_address(&self, addr: &Address) -> Option<AddressHit> {
        if addr.is_empty() {
            return None;
        }
        let geocode = self.forward(address_to_forward_query_string(addr)).await?;
        Some(AddressHit {
            geocode,
            postal_code: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_to_forward_query_string_partial() {
        let mut addr = Address {
            street: "A street".into(),
            city: "A city".into(),
            ..Default::default()
        };
        assert_eq!("A street,A city", address_to_forward_query_string(&addr));
        addr.country = "A country".into();
        assert_eq!(
            "A street,A city,A country",
            address_to_forward_query_string(&addr)
        );
        addr.street = " ".into();
        assert_eq!("A city,A country", address_to_forward_query_string(&addr));
    }

    #[tokio::test]
    async fn skip_empty_addresses() {
        let gw = OpenCage::new("invalid".into());
        assert!(gw.resolve_address(&Address::default()).await.is_none());
    }
}
