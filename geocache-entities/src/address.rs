use std::fmt;

/// A structured address as given by the caller.
#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    pub street  : String,
    pub city    : String,
    pub country : String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            country: country.into(),
        }
    }

    /// Address with a separately given house number that
    /// is appended to the street name.
    pub fn with_house_number(
        street: impl AsRef<str>,
        number: impl AsRef<str>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        let street = format!("{} {}", street.as_ref(), number.as_ref());
        Self::new(street, city, country)
    }

    pub fn is_empty(&self) -> bool {
        self.street.trim().is_empty()
            && self.city.trim().is_empty()
            && self.country.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}+{}+{}", self.street, self.city, self.country)
    }
}
