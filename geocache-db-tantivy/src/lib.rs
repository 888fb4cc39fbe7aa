use anyhow::anyhow;
use geocache_core::{
    db::{Error, GeoRecordIndex, GeoRecordIndexer, Result},
    entities::*,
};
use parking_lot::Mutex;
use std::{fmt, path::Path, str::FromStr, sync::Arc};
use tantivy::{
    collector::{Count, TopDocs},
    directory::MmapDirectory,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::{
        Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
    },
    tokenizer::{LowerCaser, RawTokenizer, TextAnalyzer},
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term,
};

const WRITER_HEAP_SIZE_IN_BYTES: usize = 50_000_000;

const KEY_TOKENIZER: &str = "key";

/// How new records are added to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Records are only ever added. Concurrent misses
    /// on the same fingerprint result in duplicates.
    #[default]
    Append,
    /// Records with the same fingerprint key are
    /// replaced by the new record.
    Upsert,
}

impl WriteMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Upsert => "upsert",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim().to_lowercase();
        [Self::Append, Self::Upsert]
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown write mode: {s}"))
    }
}

struct GeoRecordFields {
    id: Field,
    key: Field,
    term: Field,
    street: Field,
    city: Field,
    country: Field,
    scope: Field,
    query_term: Field,
    query_street: Field,
    query_city: Field,
    query_country: Field,
    lat: Field,
    lng: Field,
    postal_code: Field,
    created_at: Field,
}

impl GeoRecordFields {
    fn fingerprint_field(&self, field: FingerprintField) -> Field {
        match field {
            FingerprintField::Term => self.term,
            FingerprintField::Street => self.street,
            FingerprintField::City => self.city,
            FingerprintField::Country => self.country,
        }
    }
}

fn build_schema() -> (Schema, GeoRecordFields) {
    let fingerprint_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(KEY_TOKENIZER)
            .set_index_option(IndexRecordOption::Basic),
    );
    let mut schema_builder = Schema::builder();
    let id = schema_builder.add_text_field("id", STRING | STORED);
    let key = schema_builder.add_text_field("key", STRING);
    let term = schema_builder.add_text_field("term", fingerprint_options.clone());
    let street = schema_builder.add_text_field("street", fingerprint_options.clone());
    let city = schema_builder.add_text_field("city", fingerprint_options.clone());
    let country = schema_builder.add_text_field("country", fingerprint_options);
    let scope = schema_builder.add_text_field("scope", STORED);
    let query_term = schema_builder.add_text_field("query_term", STORED);
    let query_street = schema_builder.add_text_field("query_street", STORED);
    let query_city = schema_builder.add_text_field("query_city", STORED);
    let query_country = schema_builder.add_text_field("query_country", STORED);
    let lat = schema_builder.add_f64_field("lat", STORED);
    let lng = schema_builder.add_f64_field("lng", STORED);
    let postal_code = schema_builder.add_text_field("postal_code", STORED);
    let created_at = schema_builder.add_i64_field("created_at", STORED);
    let schema = schema_builder.build();
    let fields = GeoRecordFields {
        id,
        key,
        term,
        street,
        city,
        country,
        scope,
        query_term,
        query_street,
        query_city,
        query_country,
        lat,
        lng,
        postal_code,
        created_at,
    };
    (schema, fields)
}

fn register_tokenizers(index: &Index) {
    debug_assert!(index.tokenizers().get(KEY_TOKENIZER).is_none());
    index.tokenizers().register(
        KEY_TOKENIZER,
        TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .build(),
    );
}

fn store_error(err: TantivyError) -> Error {
    let unavailable = matches!(
        err,
        TantivyError::LockFailure(..) | TantivyError::IoError(_) | TantivyError::Poisoned
    );
    if unavailable {
        Error::Unavailable(err.into())
    } else {
        Error::Other(err.into())
    }
}

// The fingerprint scope is not part of the record itself.
// It is derived from the fingerprint and stored to be able
// to restore the exact fingerprint from the query.
fn fingerprint_scope(fingerprint: &Fingerprint) -> FingerprintScope {
    match fingerprint {
        Fingerprint::Address {
            country: Some(_), ..
        } => FingerprintScope::StreetCityCountry,
        _ => FingerprintScope::StreetCity,
    }
}

pub struct TantivyGeoRecordIndex {
    fields: GeoRecordFields,
    index: Index,
    reader: IndexReader,
    // Acquired on first use and released on failure
    writer: Mutex<Option<IndexWriter>>,
    write_mode: WriteMode,
}

impl TantivyGeoRecordIndex {
    pub fn create_in_ram() -> anyhow::Result<Self> {
        let no_path: Option<&Path> = None;
        Self::create(no_path)
    }

    pub fn create<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<Self> {
        let (schema, fields) = build_schema();
        let index = if let Some(path) = path {
            let path = path.as_ref();
            log::info!(
                "Opening geo record index in directory: {}",
                path.to_string_lossy()
            );
            std::fs::create_dir_all(path)?;
            let dir = MmapDirectory::open(path)?;
            Index::open_or_create(dir, schema)?
        } else {
            log::warn!("Creating geo record index in RAM");
            Index::create_in_ram(schema)
        };
        register_tokenizers(&index);
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;
        Ok(Self {
            fields,
            index,
            reader,
            writer: Mutex::new(None),
            write_mode: WriteMode::default(),
        })
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    fn fingerprint_query(&self, fingerprint: &Fingerprint) -> BooleanQuery {
        let sub_queries: Vec<(Occur, Box<dyn Query>)> = fingerprint
            .fields()
            .into_iter()
            .map(|(field, value)| {
                let term =
                    Term::from_field_text(self.fields.fingerprint_field(field), &normalize(value));
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                (Occur::Must, query)
            })
            .collect();
        BooleanQuery::new(sub_queries)
    }

    /// Number of stored records that match the fingerprint.
    pub fn count(&self, fingerprint: &Fingerprint) -> Result<usize> {
        let searcher = self.reader.searcher();
        searcher
            .search(&self.fingerprint_query(fingerprint), &Count)
            .map_err(store_error)
    }

    fn open_writer(&self) -> Result<IndexWriter> {
        log::debug!("Acquiring index writer");
        self.index
            .writer_with_num_threads(1, WRITER_HEAP_SIZE_IN_BYTES)
            .map_err(store_error)
    }

    fn record_to_doc(&self, record: &GeoRecord) -> TantivyDocument {
        let fields = &self.fields;
        let mut doc = TantivyDocument::default();
        doc.add_text(fields.id, record.id.as_str());
        doc.add_text(fields.key, record.fingerprint.key());
        for (field, value) in record.fingerprint.fields() {
            doc.add_text(fields.fingerprint_field(field), normalize(value));
        }
        doc.add_text(
            fields.scope,
            fingerprint_scope(&record.fingerprint).as_str(),
        );
        match &record.query {
            GeoQuery::Term(term) => {
                doc.add_text(fields.query_term, term);
            }
            GeoQuery::Address(addr) => {
                doc.add_text(fields.query_street, &addr.street);
                doc.add_text(fields.query_city, &addr.city);
                doc.add_text(fields.query_country, &addr.country);
            }
        }
        if let Some(geocode) = record.geocode {
            doc.add_f64(fields.lat, geocode.latitude());
            doc.add_f64(fields.lng, geocode.longitude());
        }
        if let Some(postal_code) = &record.postal_code {
            doc.add_text(fields.postal_code, postal_code);
        }
        doc.add_i64(fields.created_at, record.created_at.as_secs());
        doc
    }

    fn doc_to_record(&self, doc: &TantivyDocument) -> anyhow::Result<GeoRecord> {
        let fields = &self.fields;
        let text = move |field| doc.get_first(field).and_then(|v| v.as_str());
        let id = text(fields.id).ok_or_else(|| anyhow!("Missing record id"))?;
        let query = match text(fields.query_term) {
            Some(term) => GeoQuery::term(term),
            None => GeoQuery::address(
                text(fields.query_street).unwrap_or_default(),
                text(fields.query_city).unwrap_or_default(),
                text(fields.query_country).unwrap_or_default(),
            ),
        };
        let scope = text(fields.scope)
            .ok_or_else(|| anyhow!("Missing fingerprint scope of record {id}"))?
            .parse::<FingerprintScope>()?;
        let lat = doc.get_first(fields.lat).and_then(|v| v.as_f64());
        let lng = doc.get_first(fields.lng).and_then(|v| v.as_f64());
        let geocode = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoCode::try_from_lat_lng_deg(lat, lng)?),
            _ => None,
        };
        let created_at = doc
            .get_first(fields.created_at)
            .and_then(|v| v.as_i64())
            .map(Timestamp::from_secs)
            .ok_or_else(|| anyhow!("Missing creation time of record {id}"))?;
        Ok(GeoRecord {
            id: id.into(),
            fingerprint: Fingerprint::from_query(&query, scope),
            query,
            geocode,
            postal_code: text(fields.postal_code).map(ToOwned::to_owned),
            created_at,
        })
    }

    fn write(&self, writer: &mut IndexWriter, record: &GeoRecord) -> tantivy::Result<()> {
        if self.write_mode == WriteMode::Upsert {
            let key = Term::from_field_text(self.fields.key, &record.fingerprint.key());
            writer.delete_term(key);
        }
        writer.add_document(self.record_to_doc(record))?;
        writer.commit()?;
        self.reader.reload()
    }
}

impl GeoRecordIndex for TantivyGeoRecordIndex {
    fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<GeoRecord>> {
        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&self.fingerprint_query(fingerprint), &TopDocs::with_limit(1))
            .map_err(store_error)?;
        let Some((_score, doc_addr)) = top_docs.into_iter().next() else {
            return Ok(None);
        };
        let doc = searcher
            .doc::<TantivyDocument>(doc_addr)
            .map_err(store_error)?;
        let record = self.doc_to_record(&doc)?;
        Ok(Some(record))
    }
}

impl GeoRecordIndexer for TantivyGeoRecordIndex {
    fn insert(&self, record: &GeoRecord) -> Result<()> {
        let mut guard = self.writer.lock();
        let writer = match guard.take() {
            Some(writer) => writer,
            None => self.open_writer()?,
        };
        let writer = guard.insert(writer);
        if let Err(err) = self.write(writer, record) {
            log::warn!("Failed to write record {}: {err}", record.id);
            // Release the writer lock
            *guard = None;
            return Err(store_error(err));
        }
        Ok(())
    }
}

/// Shareable handle of the index.
#[derive(Clone)]
pub struct SearchEngine(Arc<TantivyGeoRecordIndex>);

impl SearchEngine {
    pub fn init_in_ram(write_mode: WriteMode) -> anyhow::Result<SearchEngine> {
        let index = TantivyGeoRecordIndex::create_in_ram()?.with_write_mode(write_mode);
        Ok(SearchEngine(Arc::new(index)))
    }

    pub fn init_with_path<P: AsRef<Path>>(
        path: Option<P>,
        write_mode: WriteMode,
    ) -> anyhow::Result<SearchEngine> {
        let index = TantivyGeoRecordIndex::create(path)?.with_write_mode(write_mode);
        Ok(SearchEngine(Arc::new(index)))
    }

    pub fn count(&self, fingerprint: &Fingerprint) -> Result<usize> {
        self.0.count(fingerprint)
    }
}

impl GeoRecordIndex for SearchEngine {
    fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<GeoRecord>> {
        self.0.lookup(fingerprint)
    }
}

impl GeoRecordIndexer for SearchEngine {
    fn insert(&self, record: &GeoRecord) -> Result<()> {
        self.0.insert(record)
    }
}

#[cfg(test)]
mod tests;
