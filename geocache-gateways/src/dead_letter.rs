use geocache_core::{
    entities::{GeoQuery, GeoRecord},
    gateways::dead_letter::DeadLetterGateway,
};
use jfs::Store;
use serde::{Deserialize, Serialize};
use std::{io, path::Path};

/// Keeps records that could not be cached as JSON files,
/// one file per record named by the record id.
pub struct DeadLettersToJsonFile {
    json_store: Store,
}

impl DeadLettersToJsonFile {
    pub fn try_new<P: AsRef<Path>>(directory: P) -> io::Result<Self> {
        let json_store = Store::new(directory)?;
        Ok(Self { json_store })
    }
    pub fn path(&self) -> &Path {
        self.json_store.path()
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct JsonRecord {
    id: String,
    fingerprint: String,
    term: Option<String>,
    street: Option<String>,
    city: Option<String>,
    country: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    postal_code: Option<String>,
    created_at: i64,
}

impl From<&GeoRecord> for JsonRecord {
    fn from(from: &GeoRecord) -> Self {
        let (term, street, city, country) = match &from.query {
            GeoQuery::Term(term) => (Some(term.clone()), None, None, None),
            GeoQuery::Address(addr) => (
                None,
                Some(addr.street.clone()),
                Some(addr.city.clone()),
                Some(addr.country.clone()),
            ),
        };
        let (lat, lng) = from.geocode.map(|g| g.to_lat_lng_deg()).unzip();
        Self {
            id: from.id.to_string(),
            fingerprint: from.fingerprint.to_string(),
            term,
            street,
            city,
            country,
            lat,
            lng,
            postal_code: from.postal_code.clone(),
            created_at: from.created_at.as_secs(),
        }
    }
}

impl DeadLetterGateway for DeadLettersToJsonFile {
    fn dead_letter(&self, record: &GeoRecord) {
        let json_record = JsonRecord::from(record);
        match self.json_store.save_with_id(&json_record, &json_record.id) {
            Ok(_) => log::info!(
                "Saved record {} in {}",
                json_record.id,
                self.path().display()
            ),
            Err(err) => log::warn!("Unable to save record {} in JSON file: {err}", record.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocache_entities::builders::*;

    #[test]
    fn save_records_as_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let gw = DeadLettersToJsonFile::try_new(dir.path().join("dead-letters")).unwrap();
        let record = GeoRecord::build()
            .address("10 Downing Street", "London", "UK")
            .lat_lng(51.5034, -0.1276)
            .postal_code("SW1A 2AA")
            .created_at(1_700_000_000)
            .finish();
        gw.dead_letter(&record);

        let saved: JsonRecord = gw.json_store.get(record.id.as_str()).unwrap();
        assert_eq!(JsonRecord::from(&record), saved);
        assert_eq!(Some("London"), saved.city.as_deref());
        assert_eq!(Some(51.5034), saved.lat);
        assert!(saved.term.is_none());
        assert!(gw.path().join(format!("{}.json", record.id)).exists());
    }
}
