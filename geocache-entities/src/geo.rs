use std::fmt;
use thiserror::Error;

const LAT_DEG_MIN: f64 = -90.0;
const LAT_DEG_MAX: f64 = 90.0;
const LNG_DEG_MIN: f64 = -180.0;
const LNG_DEG_MAX: f64 = 180.0;

/// Geographical position in decimal degrees (WGS 84).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoCode {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum GeoCodeError {
    #[error("Invalid latitude degrees: {0}")]
    Latitude(f64),
    #[error("Invalid longitude degrees: {0}")]
    Longitude(f64),
    #[error("Failed to parse geo code: {0}")]
    Parse(String),
}

impl GeoCode {
    pub fn try_from_lat_lng_deg<LAT: Into<f64>, LNG: Into<f64>>(
        lat: LAT,
        lng: LNG,
    ) -> Result<Self, GeoCodeError> {
        let latitude = lat.into();
        let longitude = lng.into();
        // NaN fails both comparisons
        if !(LAT_DEG_MIN..=LAT_DEG_MAX).contains(&latitude) {
            return Err(GeoCodeError::Latitude(latitude));
        }
        if !(LNG_DEG_MIN..=LNG_DEG_MAX).contains(&longitude) {
            return Err(GeoCodeError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    pub const fn longitude(self) -> f64 {
        self.longitude
    }

    pub const fn to_lat_lng_deg(self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Parses decimal degrees given as strings.
    pub fn parse_lat_lng_deg(lat_deg_str: &str, lng_deg_str: &str) -> Result<Self, GeoCodeError> {
        match (
            lat_deg_str.trim().parse::<f64>(),
            lng_deg_str.trim().parse::<f64>(),
        ) {
            (Ok(lat), Ok(lng)) => Self::try_from_lat_lng_deg(lat, lng),
            (Err(err), _) => Err(GeoCodeError::Parse(format!(
                "Invalid latitude '{lat_deg_str}': {err}"
            ))),
            (_, Err(err)) => Err(GeoCodeError::Parse(format!(
                "Invalid longitude '{lng_deg_str}': {err}"
            ))),
        }
    }
}

impl fmt::Display for GeoCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}
