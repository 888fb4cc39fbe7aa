use crate::entities::{Address, GeoCode};
use async_trait::async_trait;

/// The first hit of an address search.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressHit {
    pub geocode: GeoCode,
    pub postal_code: Option<String>,
}

// Implementations must not distinguish between "nothing found"
// and a failing provider: both are reported as `None`.

#[async_trait]
pub trait TermGeoCodingGateway: Send + Sync {
    async fn resolve_term(&self, term: &str) -> Option<GeoCode>;
}

#[async_trait]
pub trait AddressGeoCodingGateway: Send + Sync {
    async fn resolve_address(&self, addr: &Address) -> Option<AddressHit>;
}

#[async_trait]
impl<T> TermGeoCodingGateway for Box<T>
where
    T: TermGeoCodingGateway + ?Sized,
{
    async fn resolve_term(&self, term: &str) -> Option<GeoCode> {
        (**self).resolve_term(term).await
    }
}

#[async_trait]
impl<T> AddressGeoCodingGateway for Box<T>
where
    T: AddressGeoCodingGateway + ?Sized,
{
    async fn resolve_address(&self, addr: &Address) -> Option<AddressHit> {
        (**self).resolve_address(addr).await
    }
}
