//! # Remote Sink
//!
//! Delivers one record to the remote collector.
//!
//! ## Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      HttpRemoteSink::deliver                            │
//! │                                                                         │
//! │  1. GET public_ip_url            → "203.0.113.7"  (every call, no cache)│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. {scheme}://203.0.113.7:{port}{path}                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. POST { timestamp, ip, city, region, country,                       │
//! │            public_ip, remote_timestamp }                               │
//! │       │                                                                 │
//! │       ├── 2xx      → Ok                                                │
//! │       └── anything → Network (no retry, no buffering here)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Buffering on failure is the engine's job.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, info};

use geoledger_core::{format_timestamp, LocationRecord};

use crate::config::EndpointSettings;
use crate::error::{SyncError, SyncResult};

/// Destination for resolved records.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    /// Delivers one record. A returned `Ok` means the sink confirmed it.
    async fn deliver(&self, record: &LocationRecord) -> SyncResult<()>;
}

/// Wire payload.
#[derive(Debug, Serialize)]
struct SinkPayload<'a> {
    timestamp: String,
    ip: Option<&'a str>,
    city: &'a str,
    region: &'a str,
    country: &'a str,
    public_ip: String,
    remote_timestamp: String,
}

impl<'a> SinkPayload<'a> {
    fn new(record: &'a LocationRecord, public_ip: IpAddr) -> Self {
        SinkPayload {
            timestamp: record.timestamp(),
            ip: record.source_address.as_deref(),
            city: &record.city,
            region: &record.region,
            country: &record.country,
            public_ip: public_ip.to_string(),
            remote_timestamp: format_timestamp(&Utc::now()),
        }
    }
}

/// HTTP sink whose host is re-discovered on every delivery.
#[derive(Debug, Clone)]
pub struct HttpRemoteSink {
    client: reqwest::Client,
    public_ip_url: String,
    scheme: String,
    port: u16,
    path: String,
}

impl HttpRemoteSink {
    pub fn new(
        client: reqwest::Client,
        public_ip_url: impl Into<String>,
        scheme: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Self {
        HttpRemoteSink {
            client,
            public_ip_url: public_ip_url.into(),
            scheme: scheme.into(),
            port,
            path: path.into(),
        }
    }

    /// Builds a sink from the `[endpoints]` config section.
    pub fn from_settings(client: reqwest::Client, endpoints: &EndpointSettings) -> Self {
        HttpRemoteSink::new(
            client,
            &endpoints.public_ip_url,
            &endpoints.sink_scheme,
            endpoints.sink_port,
            &endpoints.sink_path,
        )
    }

    /// Asks the echo service for our public address.
    async fn discover_public_ip(&self) -> SyncResult<IpAddr> {
        let body = self
            .client
            .get(&self.public_ip_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let trimmed = body.trim();
        trimmed.parse::<IpAddr>().map_err(|_| {
            SyncError::Network(format!("public-IP echo returned '{}', not an address", trimmed))
        })
    }

    fn endpoint(&self, public_ip: IpAddr) -> String {
        format!(
            "{}://{}{}",
            self.scheme,
            SocketAddr::new(public_ip, self.port),
            self.path
        )
    }
}

#[async_trait]
impl RemoteSink for HttpRemoteSink {
    async fn deliver(&self, record: &LocationRecord) -> SyncResult<()> {
        let public_ip = self.discover_public_ip().await?;
        let endpoint = self.endpoint(public_ip);

        debug!(endpoint = %endpoint, "Delivering record");

        self.client
            .post(&endpoint)
            .json(&SinkPayload::new(record, public_ip))
            .send()
            .await?
            .error_for_status()?;

        info!(place = %record.place(), timestamp = %record.timestamp(), "Record delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> LocationRecord {
        LocationRecord::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            Some("198.51.100.4".to_string()),
            "Seattle",
            "WA",
            "US",
        )
    }

    /// The echo service and the collector share one mock server, so the
    /// echoed address plus the server's port loops back to it.
    fn sink(server: &MockServer) -> HttpRemoteSink {
        HttpRemoteSink::new(
            reqwest::Client::new(),
            format!("{}/ip", server.uri()),
            "http",
            server.address().port(),
            "/v1/location",
        )
    }

    async fn mount_echo(server: &MockServer, body: &str) {
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_delivers_payload_to_discovered_endpoint() {
        let server = MockServer::start().await;
        mount_echo(&server, "127.0.0.1\n").await;
        Mock::given(method("POST"))
            .and(path("/v1/location"))
            .and(body_partial_json(json!({
                "timestamp": "2023-11-14 22:13:20",
                "ip": "198.51.100.4",
                "city": "Seattle",
                "region": "WA",
                "country": "US",
                "public_ip": "127.0.0.1"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        sink(&server).deliver(&record()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
        let body: serde_json::Value = serde_json::from_slice(&post.body).unwrap();
        assert!(body["remote_timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_public_ip_resolved_every_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("127.0.0.1"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let sink = sink(&server);
        sink.deliver(&record()).await.unwrap();
        sink.deliver(&record()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_delivery_is_network_error_without_retry() {
        let server = MockServer::start().await;
        mount_echo(&server, "127.0.0.1").await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = sink(&server).deliver(&record()).await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
    }

    #[tokio::test]
    async fn test_garbage_echo_is_network_error() {
        let server = MockServer::start().await;
        mount_echo(&server, "").await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = sink(&server).deliver(&record()).await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
    }

    #[test]
    fn test_endpoint_format() {
        let sink = HttpRemoteSink::new(reqwest::Client::new(), "http://echo", "http", 80, "/v1/location");
        assert_eq!(
            sink.endpoint("203.0.113.7".parse().unwrap()),
            "http://203.0.113.7:80/v1/location"
        );
        assert_eq!(
            sink.endpoint("2001:db8::1".parse().unwrap()),
            "http://[2001:db8::1]:80/v1/location"
        );
    }
}
