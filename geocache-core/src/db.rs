// Access traits of the record cache.
// The store is a shared append target: records are
// only ever added and never updated in place.

use crate::entities::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The store could not be reached at all.
    /// Trying again later might succeed.
    #[error("The store is temporarily unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait GeoRecordIndex {
    /// Returns the first stored record that matches all
    /// fields of the fingerprint.
    fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<GeoRecord>>;
}

pub trait GeoRecordIndexer: GeoRecordIndex {
    /// Stores the record.
    ///
    /// The record is visible for all subsequent
    /// lookups when this function returns.
    fn insert(&self, record: &GeoRecord) -> Result<()>;
}

impl<T> GeoRecordIndex for &T
where
    T: GeoRecordIndex + ?Sized,
{
    fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<GeoRecord>> {
        (**self).lookup(fingerprint)
    }
}

impl<T> GeoRecordIndexer for &T
where
    T: GeoRecordIndexer + ?Sized,
{
    fn insert(&self, record: &GeoRecord) -> Result<()> {
        (**self).insert(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_transient() {
        assert!(Error::Unavailable(anyhow::anyhow!("no connection")).is_transient());
        assert!(!Error::Other(anyhow::anyhow!("corrupt document")).is_transient());
    }
}
