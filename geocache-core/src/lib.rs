pub mod cancel;
pub mod db;
pub mod gateways;
pub mod retry;
pub mod usecases;

pub mod entities {
    pub use geocache_entities::{
        address::*, fingerprint::*, geo::*, id::*, query::*, record::*, time::*,
    };
}
