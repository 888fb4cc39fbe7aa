//! Lookup keys of cached records.
//!
//! A fingerprint contains only the fields of a query that
//! are used for matching stored records. Field values are
//! kept as given; matching is case-insensitive and ignores
//! surrounding whitespace.

use crate::query::GeoQuery;
use std::{fmt, str::FromStr};
use thiserror::Error;

const KEY_SEPARATOR: char = '\u{1f}';

/// Which address fields take part in the lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintScope {
    /// Only street and city, the country is ignored.
    /// Addresses that only differ by country share
    /// the same cached record.
    StreetCity,
    /// Street, city and (if not blank) country.
    #[default]
    StreetCityCountry,
}

impl FingerprintScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StreetCity => "street-city",
            Self::StreetCityCountry => "street-city-country",
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown fingerprint scope: {0}")]
pub struct FingerprintScopeParseError(String);

impl FromStr for FingerprintScope {
    type Err = FingerprintScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        [Self::StreetCity, Self::StreetCityCountry]
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or(FingerprintScopeParseError(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Term {
        term: String,
    },
    Address {
        street: String,
        city: String,
        country: Option<String>,
    },
}

impl Fingerprint {
    pub fn from_query(query: &GeoQuery, scope: FingerprintScope) -> Self {
        match query {
            GeoQuery::Term(term) => Self::Term { term: term.clone() },
            GeoQuery::Address(addr) => {
                let country = match scope {
                    FingerprintScope::StreetCity => None,
                    FingerprintScope::StreetCityCountry => Some(addr.country.clone())
                        .filter(|country| !country.trim().is_empty()),
                };
                Self::Address {
                    street: addr.street.clone(),
                    city: addr.city.clone(),
                    country,
                }
            }
        }
    }

    /// All (name, value) pairs that must match.
    pub fn fields(&self) -> Vec<(FingerprintField, &str)> {
        match self {
            Self::Term { term } => vec![(FingerprintField::Term, term.as_str())],
            Self::Address {
                street,
                city,
                country,
            } => {
                let mut fields = vec![
                    (FingerprintField::Street, street.as_str()),
                    (FingerprintField::City, city.as_str()),
                ];
                if let Some(country) = country {
                    fields.push((FingerprintField::Country, country.as_str()));
                }
                fields
            }
        }
    }

    /// Canonical, normalized string representation.
    ///
    /// Two fingerprints that match each other
    /// have the same key.
    pub fn key(&self) -> String {
        let mut key = match self {
            Self::Term { .. } => String::from("term"),
            Self::Address { .. } => String::from("address"),
        };
        for (_, value) in self.fields() {
            key.push(KEY_SEPARATOR);
            key.push_str(&normalize(value));
        }
        key
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        f.write_str("{")?;
        for (field, value) in self.fields() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}: {value}", field.as_str())?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintField {
    Term,
    Street,
    City,
    Country,
}

impl FingerprintField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Term => "term",
            Self::Street => "street",
            Self::City => "city",
            Self::Country => "country",
        }
    }
}

/// Normalization applied to field values before comparing them.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
