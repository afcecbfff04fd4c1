//! Nominatim / OpenStreetMap reverse geocoder.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use std::cell::Cell;
use std::time::Duration;

use async_trait::async_trait;
use crime_scope_config::GeocoderConfig;
use crime_scope_crime_models::GeoPoint;
use tokio::time::Instant;

use crate::{GeocodeError, ReverseGeocoder};

/// Address components joined, in order, to build a short address.
const ADDRESS_PARTS: &[&[&str]] = &[
    &["road"],
    &["suburb"],
    &["village", "town", "city"],
    &["state"],
    &["country"],
];

/// Hands out request slots at least `gap` apart.
#[derive(Debug, Clone)]
struct Throttle {
    gap: Duration,
    next_slot: Cell<Option<Instant>>,
}

impl Throttle {
    const fn new(gap: Duration) -> Self {
        Self {
            gap,
            next_slot: Cell::new(None),
        }
    }

    /// Waits for the next free slot. The slot is reserved before sleeping,
    /// so overlapping callers queue up behind each other.
    async fn wait(&self) {
        if self.gap.is_zero() {
            return;
        }
        let now = Instant::now();
        let slot = self.next_slot.get().map_or(now, |next| next.max(now));
        self.next_slot.set(Some(slot + self.gap));

        if slot > now {
            log::debug!("Nominatim: waiting {:?} for the rate limit", slot - now);
            tokio::time::sleep_until(slot).await;
        }
    }
}

/// Reverse geocoder backed by a Nominatim `reverse` endpoint.
///
/// Lookups are spaced at least `rate_limit_ms` apart.
#[derive(Debug, Clone)]
pub struct NominatimReverse {
    client: reqwest::Client,
    base_url: String,
    throttle: Throttle,
}

impl NominatimReverse {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            throttle: Throttle::new(config.rate_limit()),
        })
    }
}

#[async_trait(?Send)]
impl ReverseGeocoder for NominatimReverse {
    async fn reverse(&self, point: GeoPoint) -> Result<Option<String>, GeocodeError> {
        let lat = point.latitude.to_string();
        let lon = point.longitude.to_string();

        self.throttle.wait().await;
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("addressdetails", "1"),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(GeocodeError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Nominatim reverse response.
///
/// An `error` field ("Unable to geocode") means nothing was found.
fn parse_response(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    if !body.is_object() {
        return Err(GeocodeError::Parse {
            message: "Nominatim response is not an object".to_string(),
        });
    }

    if let Some(error) = body["error"].as_str() {
        log::debug!("Nominatim: {error}");
        return Ok(None);
    }

    Ok(format_address(body))
}

/// Short address from `address` components, or `display_name` when none
/// of the components are present.
#[must_use]
pub fn format_address(body: &serde_json::Value) -> Option<String> {
    let address = &body["address"];
    let parts: Vec<&str> = ADDRESS_PARTS
        .iter()
        .filter_map(|keys| {
            keys.iter()
                .find_map(|key| address[*key].as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .collect();

    if parts.is_empty() {
        body["display_name"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    } else {
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_address_components() {
        let body = serde_json::json!({
            "display_name": "12, Market Street, SoMa, San Francisco, California, 94103, United States",
            "address": {
                "house_number": "12",
                "road": "Market Street",
                "suburb": "SoMa",
                "city": "San Francisco",
                "state": "California",
                "postcode": "94103",
                "country": "United States"
            }
        });
        assert_eq!(
            parse_response(&body).unwrap().as_deref(),
            Some("Market Street, SoMa, San Francisco, California, United States")
        );
    }

    #[test]
    fn prefers_village_over_town_and_city() {
        let body = serde_json::json!({
            "address": {"village": "Aldeia", "city": "Lisboa", "country": "Portugal"}
        });
        assert_eq!(format_address(&body).as_deref(), Some("Aldeia, Portugal"));
    }

    #[test]
    fn falls_back_to_display_name() {
        let body = serde_json::json!({
            "display_name": "North Atlantic Ocean",
            "address": {"postcode": "00000"}
        });
        assert_eq!(
            parse_response(&body).unwrap().as_deref(),
            Some("North Atlantic Ocean")
        );
    }

    #[test]
    fn unable_to_geocode_is_none() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_spaces_out_lookups() {
        let throttle = Throttle::new(Duration::from_secs(1));
        let start = Instant::now();

        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        tokio::join!(throttle.wait(), throttle.wait());
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        tokio::time::sleep(Duration::from_secs(10)).await;
        let idle = Instant::now();
        throttle.wait().await;
        assert_eq!(idle.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_gap_never_waits() {
        let throttle = Throttle::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..3 {
            throttle.wait().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn array_body_is_parse_error() {
        let body = serde_json::json!([]);
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
