use super::prelude::*;
use crate::{
    gateways::{
        dead_letter::DeadLetterGateway,
        geocode::{AddressGeoCodingGateway, TermGeoCodingGateway},
    },
    retry::{RetryError, RetryPolicy},
};
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    task,
};

/// Resolves geo codes and postal codes of queries.
///
/// Every query is first looked up in the cache. Only if
/// no record has been found the matching geocoding gateway
/// is asked and its answer (even an empty one) is written
/// back into the cache before it is returned.
pub struct Resolver<I, T, A> {
    index: I,
    term_gw: T,
    address_gw: A,
    scope: FingerprintScope,
    retry: RetryPolicy,
    dead_letters: Option<Box<dyn DeadLetterGateway + Send + Sync>>,
}

impl<I, T, A> Resolver<I, T, A>
where
    I: GeoRecordIndexer,
    T: TermGeoCodingGateway,
    A: AddressGeoCodingGateway,
{
    pub fn new(index: I, term_gw: T, address_gw: A) -> Self {
        Self {
            index,
            term_gw,
            address_gw,
            scope: FingerprintScope::default(),
            retry: RetryPolicy::default(),
            dead_letters: None,
        }
    }

    pub fn with_fingerprint_scope(mut self, scope: FingerprintScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Records that could not be written are passed to this gateway.
    pub fn with_dead_letters<D>(mut self, gateway: D) -> Self
    where
        D: DeadLetterGateway + Send + Sync + 'static,
    {
        self.dead_letters = Some(Box::new(gateway));
        self
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub async fn resolve_lat_lng(&self, query: &GeoQuery, cancel: &Cancellation) -> Result<GeoCode> {
        let record = self.resolve_record(query, cancel).await?;
        record
            .geocode
            .ok_or_else(|| Error::NotFound(query.to_string()))
    }

    pub async fn resolve_lat(&self, query: &GeoQuery, cancel: &Cancellation) -> Result<f64> {
        self.resolve_lat_lng(query, cancel)
            .await
            .map(GeoCode::latitude)
    }

    pub async fn resolve_lng(&self, query: &GeoQuery, cancel: &Cancellation) -> Result<f64> {
        self.resolve_lat_lng(query, cancel)
            .await
            .map(GeoCode::longitude)
    }

    pub async fn resolve_postal_code(
        &self,
        query: &GeoQuery,
        cancel: &Cancellation,
    ) -> Result<String> {
        let record = self.resolve_record(query, cancel).await?;
        record
            .postal_code
            .ok_or_else(|| Error::NotFound(query.to_string()))
    }

    /// Returns the cached record of the query or creates it.
    pub async fn resolve_record(
        &self,
        query: &GeoQuery,
        cancel: &Cancellation,
    ) -> Result<GeoRecord> {
        if !query.is_valid() {
            return Err(Error::InvalidQuery);
        }
        cancel.check()?;
        let fingerprint = Fingerprint::from_query(query, self.scope);
        if let Some(record) = blocking(|| self.index.lookup(&fingerprint))? {
            log::debug!("Found cached record {} for {fingerprint}", record.id);
            return Ok(record);
        }
        log::debug!("No cached record found for {fingerprint}");
        let record = tokio::select! {
            reason = cancel.interrupted() => {
                log::info!("Stopped resolving '{query}': {reason}");
                return Err(reason.into());
            }
            record = self.enrich(query, fingerprint) => record,
        };
        self.write_back(&record, cancel).await?;
        Ok(record)
    }

    async fn enrich(&self, query: &GeoQuery, fingerprint: Fingerprint) -> GeoRecord {
        let (geocode, postal_code) = match query {
            GeoQuery::Term(term) => (self.term_gw.resolve_term(term).await, None),
            GeoQuery::Address(addr) => match self.address_gw.resolve_address(addr).await {
                Some(hit) => (Some(hit.geocode), hit.postal_code),
                None => (None, None),
            },
        };
        if geocode.is_none() {
            log::debug!("No geo code available for '{query}'");
        }
        GeoRecord {
            id: Id::new(),
            fingerprint,
            query: query.clone(),
            geocode,
            postal_code,
            created_at: Timestamp::now(),
        }
    }

    async fn write_back(&self, record: &GeoRecord, cancel: &Cancellation) -> Result<()> {
        let err = match self
            .retry
            .run(cancel, || blocking(|| self.index.insert(record)))
            .await {
            Ok(()) => {
                log::debug!("Stored record {} for {}", record.id, record.fingerprint);
                return Ok(());
            }
            Err(err) => err,
        };
        log::error!(
            "Failed to store record {} for {}: {err}",
            record.id,
            record.fingerprint
        );
        if let Some(dead_letters) = &self.dead_letters {
            dead_letters.dead_letter(record);
        }
        let query = record.query.to_string();
        Err(match err {
            RetryError::Exhausted {
                attempts,
                last_error,
            } => Error::WriteFailed {
                query,
                attempts,
                source: last_error,
            },
            RetryError::Permanent { attempts, error } => Error::WriteFailed {
                query,
                attempts,
                source: error,
            },
            RetryError::Interrupted { reason, .. } => reason.into(),
        })
    }
}

// Store access blocks on disk I/O. Other tasks of a
// multi-threaded runtime keep running meanwhile.
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) => {
            task::block_in_place(f)
        }
        _ => f(),
    }
}
