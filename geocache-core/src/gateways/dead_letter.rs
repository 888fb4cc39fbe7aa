use crate::entities::GeoRecord;

/// Keeps records that could not be written into the
/// cache for a later reconciliation.
pub trait DeadLetterGateway {
    fn dead_letter(&self, record: &GeoRecord);
}
