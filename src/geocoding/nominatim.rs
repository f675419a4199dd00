//! Nominatim / OpenStreetMap reverse geocoder.
//!
//! The public instance allows **1 request per second**; spacing is enforced
//! by the [`RateLimiter`](super::RateLimiter), not here.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use async_trait::async_trait;
use serde_json::Value;

use super::{GeocodeError, ReverseGeocoder};
use crate::models::AddressComponents;
use crate::settings::GeocoderSettings;

pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    language: Option<String>,
}

impl NominatimGeocoder {
    /// Builds an HTTP client with the configured User-Agent and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP client cannot be constructed.
    pub fn new(settings: &GeocoderSettings) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            language: settings.language.clone(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, coordinate: &str) -> Result<Option<AddressComponents>, GeocodeError> {
        let (lat, lon) = coordinate
            .split_once(',')
            .map(|(lat, lon)| (lat.trim(), lon.trim()))
            .ok_or_else(|| GeocodeError::Parse {
                message: format!("Coordinate '{coordinate}' is not 'lat,lon'"),
            })?;

        let mut request = self.client.get(&self.base_url).query(&[
            ("format", "jsonv2"),
            ("lat", lat),
            ("lon", lon),
            ("addressdetails", "1"),
        ]);
        if let Some(language) = &self.language {
            request = request.query(&[("accept-language", language.as_str())]);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(GeocodeError::Status(resp.status()));
        }

        let body: Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Nominatim `/reverse` JSON response.
///
/// An `error` member (e.g. "Unable to geocode" over open ocean), a missing
/// `address` object, or an address without any of the tracked levels is an
/// empty answer, not a failure.
pub fn parse_response(body: &Value) -> Result<Option<AddressComponents>, GeocodeError> {
    let object = body.as_object().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an object".to_string(),
    })?;

    if object.contains_key("error") {
        return Ok(None);
    }

    let Some(address) = object.get("address").and_then(Value::as_object) else {
        return Ok(None);
    };

    let field = |key: &str| {
        address
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let components = AddressComponents {
        country: field("country"),
        county: field("county"),
        neighbourhood: field("neighbourhood"),
        state: field("state"),
        suburb: field("suburb"),
        town: field("town"),
    };

    Ok((!components.is_empty()).then_some(components))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_nominatim_address() {
        let body = serde_json::json!({
            "place_id": 123,
            "lat": "-10.0",
            "lon": "-50.0",
            "display_name": "Pium, Tocantins, Região Norte, Brasil",
            "address": {
                "town": "Pium",
                "county": "Pium",
                "state": "Tocantins",
                "region": "Região Norte",
                "country": "Brasil",
                "country_code": "br"
            }
        });
        let address = parse_response(&body).unwrap().unwrap();
        assert_eq!(address.country.as_deref(), Some("Brasil"));
        assert_eq!(address.state.as_deref(), Some("Tocantins"));
        assert_eq!(address.town.as_deref(), Some("Pium"));
        assert_eq!(address.suburb, None);
    }

    #[test]
    fn test_parses_nominatim_error_as_empty() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn test_parses_address_without_tracked_levels_as_empty() {
        let body = serde_json::json!({"address": {"country_code": "br", "region": "Norte"}});
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn test_rejects_non_object_body() {
        let body = serde_json::json!([]);
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
