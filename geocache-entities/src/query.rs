use crate::address::Address;
use std::fmt;

/// Maximum length of a single query field in bytes.
///
/// The search index cannot match terms beyond a fixed length,
/// records of longer queries could never be found again.
pub const MAX_FIELD_LEN: usize = 1024;

/// What the caller asked for: either a free-text
/// place name or a structured address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoQuery {
    Term(String),
    Address(Address),
}

impl GeoQuery {
    pub fn term(term: impl Into<String>) -> Self {
        Self::Term(term.into())
    }

    pub fn address(
        street: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self::Address(Address::new(street, city, country))
    }

    /// A term must not be blank and an address needs
    /// at least a street and a city. No field may exceed
    /// [`MAX_FIELD_LEN`].
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Term(term) => !term.trim().is_empty() && fits(term),
            Self::Address(addr) => {
                !addr.street.trim().is_empty()
                    && !addr.city.trim().is_empty()
                    && [&addr.street, &addr.city, &addr.country]
                        .into_iter()
                        .all(|field| fits(field))
            }
        }
    }
}

fn fits(field: &str) -> bool {
    field.trim().len() <= MAX_FIELD_LEN
}

impl From<Address> for GeoQuery {
    fn from(from: Address) -> Self {
        Self::Address(from)
    }
}

impl fmt::Display for GeoQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Term(term) => f.write_str(term),
            Self::Address(addr) => addr.fmt(f),
        }
    }
}
