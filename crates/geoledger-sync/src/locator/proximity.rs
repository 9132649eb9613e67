//! # Proximity Locator
//!
//! Asks the geolocation-by-proximity service where a set of access points is.
//!
//! ## Request
//! ```text
//! POST {proximity_geolocation_url}?key=<api key>
//! {
//!   "wifiAccessPoints": [
//!     { "macAddress": "00:11:22:33:44:55", "signalStrength": -61, "signalToNoiseRatio": 40 }
//!   ]
//! }
//! ```
//!
//! ## Response
//! A 2xx body is an estimate when it carries numeric `location.lat` and
//! `location.lng`. Anything else is treated as "no estimate" and the
//! resolver falls back to the address lookup.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use geoledger_core::{AccessPoint, LocationRecord, SIGNAL_TO_NOISE_RATIO};

use crate::credentials::CredentialProvider;
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WifiAccessPoint<'a> {
    mac_address: &'a str,
    signal_strength: i32,
    signal_to_noise_ratio: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeolocateRequest<'a> {
    wifi_access_points: Vec<WifiAccessPoint<'a>>,
}

impl<'a> GeolocateRequest<'a> {
    fn new(access_points: &'a [AccessPoint]) -> Self {
        GeolocateRequest {
            wifi_access_points: access_points
                .iter()
                .map(|ap| WifiAccessPoint {
                    mac_address: &ap.identifier,
                    signal_strength: ap.signal_strength,
                    signal_to_noise_ratio: SIGNAL_TO_NOISE_RATIO,
                })
                .collect(),
        }
    }
}

/// Client for the geolocation-by-proximity service.
#[derive(Clone)]
pub struct ProximityLocator {
    client: reqwest::Client,
    url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ProximityLocator {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        ProximityLocator {
            client,
            url: url.into(),
            credentials,
        }
    }

    /// Looks up the estimate for `access_points`.
    ///
    /// ## Errors
    /// - `CredentialUnavailable` - no API key anywhere in the chain
    /// - `Network` - transport failure or non-2xx status
    /// - `NoLocationAvailable` - 2xx body without a usable `location`
    pub async fn locate(&self, access_points: &[AccessPoint]) -> SyncResult<LocationRecord> {
        let key = self.credentials.api_key()?;

        debug!(access_points = access_points.len(), "Requesting proximity estimate");

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", key.as_str())])
            .json(&GeolocateRequest::new(access_points))
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SyncError::NoLocationAvailable(format!("unreadable estimate: {}", e)))?;

        let (lat, lng) = coordinates(&body).ok_or_else(|| {
            SyncError::NoLocationAvailable("estimate has no numeric location.lat/lng".to_string())
        })?;

        let accuracy = body.get("accuracy").and_then(Value::as_f64);
        info!(lat, lng, accuracy = ?accuracy, "Proximity estimate received");

        let fields = body.as_object().cloned().unwrap_or_default();
        Ok(LocationRecord::from_upstream(&fields, Utc::now()))
    }
}

fn coordinates(body: &Value) -> Option<(f64, f64)> {
    let location = body.get("location")?;
    Some((
        location.get("lat")?.as_f64()?,
        location.get("lng")?.as_f64()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedKey(Option<&'static str>);

    impl CredentialProvider for FixedKey {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn api_key(&self) -> SyncResult<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| SyncError::CredentialUnavailable("none".into()))
        }
    }

    fn locator(server: &MockServer, key: Option<&'static str>) -> ProximityLocator {
        ProximityLocator::new(
            reqwest::Client::new(),
            format!("{}/geolocate", server.uri()),
            Arc::new(FixedKey(key)),
        )
    }

    fn access_points() -> Vec<AccessPoint> {
        vec![
            AccessPoint::new("00:11:22:33:44:55", -61),
            AccessPoint::new("66:77:88:99:aa:bb", -74),
        ]
    }

    #[tokio::test]
    async fn test_request_contract_and_estimate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/geolocate"))
            .and(query_param("key", "secret"))
            .and(body_json(json!({
                "wifiAccessPoints": [
                    { "macAddress": "00:11:22:33:44:55", "signalStrength": -61, "signalToNoiseRatio": 40 },
                    { "macAddress": "66:77:88:99:aa:bb", "signalStrength": -74, "signalToNoiseRatio": 40 }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location": { "lat": 59.91, "lng": 10.75 },
                "accuracy": 25.0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = locator(&server, Some("secret")).locate(&access_points()).await.unwrap();

        assert_eq!(record.source_address, None);
        assert_eq!(record.city, "Unknown");
        assert_eq!(record.country, "Unknown");
    }

    #[tokio::test]
    async fn test_missing_coordinates_is_no_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "location": { "lat": "north" } })))
            .mount(&server)
            .await;

        let err = locator(&server, Some("secret")).locate(&access_points()).await.unwrap_err();
        assert!(matches!(err, SyncError::NoLocationAvailable(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = locator(&server, Some("secret")).locate(&access_points()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_no_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = locator(&server, None).locate(&access_points()).await.unwrap_err();
        assert!(matches!(err, SyncError::CredentialUnavailable(_)));
    }
}
