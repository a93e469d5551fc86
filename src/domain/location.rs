//! Service location types
//!
//! Requests carry a structured `{address, lat, lng}` location. Older clients
//! still send a single free-text string that may embed coordinates as
//! `Latitude: <float>, Longitude: <float>`; that text is resolved here,
//! before the payload reaches the lifecycle manager.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Placeholder stored when no address was given
pub const UNSPECIFIED: &str = "Not specified";

lazy_static! {
    static ref COORDINATES: Regex = Regex::new(
        r"Latitude:\s*(-?\d+(?:\.\d+)?),\s*Longitude:\s*(-?\d+(?:\.\d+)?)"
    )
    .expect("coordinate pattern is valid");
}

/// Resolved location of a service request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

/// Location as accepted on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationInput {
    Structured {
        #[serde(default)]
        address: Option<String>,
        #[serde(default, alias = "latitude")]
        lat: Option<f64>,
        #[serde(default, alias = "longitude")]
        lng: Option<f64>,
    },
    Text(String),
}

/// Extract `(lat, lng)` from text of the form `Latitude: X, Longitude: Y`.
pub fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let caps = COORDINATES.captures(text)?;
    let lat = caps.get(1)?.as_str().parse().ok()?;
    let lng = caps.get(2)?.as_str().parse().ok()?;
    Some((lat, lng))
}

impl Location {
    /// Resolve an optional wire location. Missing or unparseable coordinates become `(0, 0)`.
    pub fn resolve(input: Option<LocationInput>) -> Self {
        match input {
            None => Self::unspecified(),
            Some(LocationInput::Text(text)) => {
                let (lat, lng) = parse_coordinates(&text).unwrap_or((0.0, 0.0));
                Self {
                    address: non_blank(Some(text)).unwrap_or_else(|| UNSPECIFIED.to_string()),
                    lat,
                    lng,
                }
            }
            Some(LocationInput::Structured { address, lat, lng }) => {
                let address = non_blank(address);
                // Structured clients sometimes still embed coordinates in the address
                let embedded = address.as_deref().and_then(parse_coordinates);
                let (lat, lng) = match (lat, lng, embedded) {
                    (Some(lat), Some(lng), _) => (lat, lng),
                    (_, _, Some(coords)) => coords,
                    _ => (0.0, 0.0),
                };
                Self {
                    address: address.unwrap_or_else(|| UNSPECIFIED.to_string()),
                    lat,
                    lng,
                }
            }
        }
    }

    pub fn unspecified() -> Self {
        Self {
            address: UNSPECIFIED.to_string(),
            lat: 0.0,
            lng: 0.0,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
