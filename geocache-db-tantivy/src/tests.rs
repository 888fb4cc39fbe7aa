use super::*;
use geocache_entities::builders::*;

fn fingerprint(query: &GeoQuery, scope: FingerprintScope) -> Fingerprint {
    Fingerprint::from_query(query, scope)
}

fn term_fingerprint(term: &str) -> Fingerprint {
    fingerprint(&GeoQuery::term(term), FingerprintScope::default())
}

#[test]
fn lookup_inserted_records() {
    let index = TantivyGeoRecordIndex::create_in_ram().unwrap();
    let record = GeoRecord::build()
        .term("Eiffel Tower")
        .lat_lng(48.8584, 2.2945)
        .created_at(1_700_000_000)
        .finish();
    assert!(index.lookup(&record.fingerprint).unwrap().is_none());

    index.insert(&record).unwrap();
    for _ in 0..3 {
        assert_eq!(Some(&record), index.lookup(&record.fingerprint).unwrap().as_ref());
    }
}

#[test]
fn match_case_insensitive_and_trimmed() {
    let index = TantivyGeoRecordIndex::create_in_ram().unwrap();
    let record = GeoRecord::build()
        .term(" Eiffel Tower")
        .lat_lng(48.8584, 2.2945)
        .finish();
    index.insert(&record).unwrap();
    let found = index
        .lookup(&term_fingerprint("EIFFEL TOWER "))
        .unwrap()
        .unwrap();
    assert_eq!(record, found);
    assert!(index.lookup(&term_fingerprint("Eiffel")).unwrap().is_none());
}

#[test]
fn store_address_records() {
    let index = TantivyGeoRecordIndex::create_in_ram().unwrap();
    let found_record = GeoRecord::build()
        .address("10 Downing Street", "London", "UK")
        .lat_lng(51.5034, -0.1276)
        .postal_code("SW1A 2AA")
        .finish();
    let negative_record = GeoRecord::build()
        .address("Unknown Lane", "Nowhere", "XX")
        .finish();
    index.insert(&found_record).unwrap();
    index.insert(&negative_record).unwrap();

    let found = index.lookup(&found_record.fingerprint).unwrap().unwrap();
    assert_eq!(found_record, found);
    assert_eq!(Some("SW1A 2AA"), found.postal_code.as_deref());

    let negative = index.lookup(&negative_record.fingerprint).unwrap().unwrap();
    assert_eq!(negative_record, negative);
    assert!(negative.is_negative());
}

#[test]
fn terms_and_addresses_do_not_match_each_other() {
    let index = TantivyGeoRecordIndex::create_in_ram().unwrap();
    let record = GeoRecord::build()
        .address("London", "London", "")
        .lat_lng(51.5074, -0.1278)
        .finish();
    index.insert(&record).unwrap();
    assert!(index.lookup(&term_fingerprint("London")).unwrap().is_none());
}

#[test]
fn append_duplicates() {
    let index = TantivyGeoRecordIndex::create_in_ram().unwrap();
    assert_eq!(WriteMode::Append, index.write_mode());
    let first = GeoRecord::build()
        .term("Eiffel Tower")
        .lat_lng(48.8584, 2.2945)
        .finish();
    let second = GeoRecord::build()
        .term("eiffel tower")
        .lat_lng(48.8584, 2.2945)
        .finish();
    index.insert(&first).unwrap();
    index.insert(&second).unwrap();

    let fp = term_fingerprint("Eiffel Tower");
    assert_eq!(2, index.count(&fp).unwrap());
    let found = index.lookup(&fp).unwrap().unwrap();
    assert!(found == first || found == second);
}

#[test]
fn upsert_replaces_records_with_the_same_fingerprint() {
    let index = TantivyGeoRecordIndex::create_in_ram()
        .unwrap()
        .with_write_mode(WriteMode::Upsert);
    let first = GeoRecord::build().term("Eiffel Tower").finish();
    let second = GeoRecord::build()
        .term("eiffel tower ")
        .lat_lng(48.8584, 2.2945)
        .finish();
    index.insert(&first).unwrap();
    index.insert(&second).unwrap();

    let fp = term_fingerprint("Eiffel Tower");
    assert_eq!(1, index.count(&fp).unwrap());
    assert_eq!(second, index.lookup(&fp).unwrap().unwrap());
}

#[test]
fn street_city_scope_ignores_the_country() {
    let index = TantivyGeoRecordIndex::create_in_ram().unwrap();
    let record = GeoRecord::build()
        .scope(FingerprintScope::StreetCity)
        .address("High Street", "Newport", "UK")
        .lat_lng(51.5842, -2.9977)
        .finish();
    index.insert(&record).unwrap();

    let us = GeoQuery::address("High Street", "Newport", "US");
    let found = index
        .lookup(&fingerprint(&us, FingerprintScope::StreetCity))
        .unwrap()
        .unwrap();
    assert_eq!(record, found);
    assert!(index
        .lookup(&fingerprint(&us, FingerprintScope::StreetCityCountry))
        .unwrap()
        .is_none());
}

#[test]
fn street_city_country_scope_distinguishes_countries() {
    let index = TantivyGeoRecordIndex::create_in_ram().unwrap();
    let record = GeoRecord::build()
        .scope(FingerprintScope::StreetCityCountry)
        .address("High Street", "Newport", "UK")
        .lat_lng(51.5842, -2.9977)
        .finish();
    index.insert(&record).unwrap();

    let uk = GeoQuery::address("high street", "newport", "uk");
    let us = GeoQuery::address("High Street", "Newport", "US");
    assert_eq!(
        Some(record),
        index
            .lookup(&fingerprint(&uk, FingerprintScope::StreetCityCountry))
            .unwrap()
    );
    assert!(index
        .lookup(&fingerprint(&us, FingerprintScope::StreetCityCountry))
        .unwrap()
        .is_none());
}

#[test]
fn parse_write_mode() {
    assert_eq!(WriteMode::Append, "append".parse().unwrap());
    assert_eq!(WriteMode::Upsert, " Upsert".parse().unwrap());
    assert!("overwrite".parse::<WriteMode>().is_err());
}

#[test]
fn keep_records_after_reopening_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let record = GeoRecord::build()
        .address("10 Downing Street", "London", "UK")
        .lat_lng(51.5034, -0.1276)
        .postal_code("SW1A 2AA")
        .finish();
    {
        let engine = SearchEngine::init_with_path(Some(dir.path()), WriteMode::Append).unwrap();
        engine.insert(&record).unwrap();
    }
    let engine = SearchEngine::init_with_path(Some(dir.path()), WriteMode::Append).unwrap();
    assert_eq!(1, engine.count(&record.fingerprint).unwrap());
    assert_eq!(Some(record.clone()), engine.lookup(&record.fingerprint).unwrap());
}

#[test]
fn locked_index_is_temporarily_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let first = SearchEngine::init_with_path(Some(dir.path()), WriteMode::Append).unwrap();
    let second = SearchEngine::init_with_path(Some(dir.path()), WriteMode::Append).unwrap();
    let record = GeoRecord::build().term("Eiffel Tower").finish();

    // The first engine keeps its writer
    first.insert(&record).unwrap();
    let err = second.insert(&record).unwrap_err();
    assert!(err.is_transient());

    drop(first);
    second.insert(&record).unwrap();
    assert_eq!(2, second.count(&record.fingerprint).unwrap());
}

#[test]
fn share_the_search_engine() {
    let engine = SearchEngine::init_in_ram(WriteMode::Append).unwrap();
    let clone = engine.clone();
    let record = GeoRecord::build().term("Eiffel Tower").finish();
    clone.insert(&record).unwrap();
    assert_eq!(Some(record), engine.lookup(&term_fingerprint("Eiffel Tower")).unwrap());
}

#[test]
fn lookup_records_with_fields_of_maximum_length() {
    let index = TantivyGeoRecordIndex::create_in_ram()
        .unwrap()
        .with_write_mode(WriteMode::Upsert);
    let field = "Ä".repeat(MAX_FIELD_LEN / 2);
    let record = GeoRecord::build()
        .address(&field, &field, &field)
        .lat_lng(51.5034, -0.1276)
        .finish();
    assert!(record.query.is_valid());
    index.insert(&record).unwrap();
    index.insert(&record).unwrap();
    assert_eq!(1, index.count(&record.fingerprint).unwrap());
    assert_eq!(Some(record.clone()), index.lookup(&record.fingerprint).unwrap());
}
