use crate::{fingerprint::*, geo::GeoCode, id::Id, query::GeoQuery, time::Timestamp};

/// The cached result of resolving a query.
///
/// Records are never updated: a record without a
/// [`GeoCode`] is a cached negative result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub id: Id,
    pub fingerprint: Fingerprint,
    pub query: GeoQuery,
    pub geocode: Option<GeoCode>,
    pub postal_code: Option<String>,
    pub created_at: Timestamp,
}

impl GeoRecord {
    /// A new record without any enrichment data.
    pub fn new(query: GeoQuery, scope: FingerprintScope) -> Self {
        let fingerprint = Fingerprint::from_query(&query, scope);
        Self {
            id: Id::new(),
            fingerprint,
            query,
            geocode: None,
            postal_code: None,
            created_at: Timestamp::now(),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.geocode.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_negative() {
        let record = GeoRecord::new(GeoQuery::term("Atlantis"), FingerprintScope::default());
        assert!(record.is_negative());
        assert!(record.postal_code.is_none());
        assert!(record.id.is_valid());
        assert_eq!(
            Fingerprint::Term {
                term: "Atlantis".into()
            },
            record.fingerprint
        );
    }
}
