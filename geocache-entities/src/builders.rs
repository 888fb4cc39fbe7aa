pub trait Builder {
    type Build;
    fn build() -> Self::Build;
}

pub use self::record_builder::*;

pub mod record_builder {

    use super::*;
    use crate::{fingerprint::*, geo::*, query::*, record::*, time::*};

    #[derive(Debug)]
    pub struct GeoRecordBuild {
        record: GeoRecord,
        scope: FingerprintScope,
    }

    impl GeoRecordBuild {
        pub fn term(mut self, term: &str) -> Self {
            self.record.query = GeoQuery::term(term);
            self.record.fingerprint = Fingerprint::from_query(&self.record.query, self.scope);
            self
        }
        pub fn address(mut self, street: &str, city: &str, country: &str) -> Self {
            self.record.query = GeoQuery::address(street, city, country);
            self.record.fingerprint = Fingerprint::from_query(&self.record.query, self.scope);
            self
        }
        pub fn scope(mut self, scope: FingerprintScope) -> Self {
            self.scope = scope;
            self.record.fingerprint = Fingerprint::from_query(&self.record.query, scope);
            self
        }
        pub fn lat_lng(mut self, lat: f64, lng: f64) -> Self {
            self.record.geocode = Some(GeoCode::try_from_lat_lng_deg(lat, lng).unwrap());
            self
        }
        pub fn postal_code(mut self, postal_code: &str) -> Self {
            self.record.postal_code = Some(postal_code.into());
            self
        }
        pub fn created_at(mut self, secs: i64) -> Self {
            self.record.created_at = Timestamp::from_secs(secs);
            self
        }
        pub fn finish(self) -> GeoRecord {
            self.record
        }
    }

    impl Builder for GeoRecord {
        type Build = GeoRecordBuild;
        fn build() -> GeoRecordBuild {
            let scope = FingerprintScope::default();
            GeoRecordBuild {
                record: GeoRecord::new(GeoQuery::term(""), scope),
                scope,
            }
        }
    }
}
