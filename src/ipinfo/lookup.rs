//! Collaborator lookups for `GET /api/ip-info`.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::config::ServerConfig;

/// Placeholder for fields whose lookup failed.
pub const UNAVAILABLE: &str = "unavailable";

/// Fixed timeout for each collaborator call.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Address used only to pick the outbound interface.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpInfo {
    pub local_ip: String,
    pub public_ip: String,
    pub location: String,
    pub isp: String,
    /// Messages from failed lookups, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Error, Debug)]
enum LookupError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("empty response")]
    Empty,
}

#[derive(Debug, Default, Deserialize)]
struct GeoRecord {
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    org: Option<String>,
}

impl GeoRecord {
    fn location(&self) -> String {
        format!(
            "{}, {}, {}",
            self.city.as_deref().unwrap_or_default(),
            self.region.as_deref().unwrap_or_default(),
            self.country_name.as_deref().unwrap_or_default(),
        )
    }

    fn isp(&self) -> String {
        self.org.clone().unwrap_or_default()
    }
}

/// Queries the IP-echo and geolocation services.
pub struct IpInfoService {
    client: Client,
    ip_echo_url: String,
    geo_lookup_url: String,
}

impl IpInfoService {
    pub fn new(config: &ServerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            client,
            ip_echo_url: config.ip_echo_url.clone(),
            geo_lookup_url: config.geo_lookup_url.clone(),
        })
    }

    pub async fn lookup(&self) -> IpInfo {
        let mut errors = Vec::new();

        let local_ip = match local_ip().await {
            Ok(ip) => ip.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Local IP lookup failed");
                errors.push(format!("local ip: {}", e));
                UNAVAILABLE.to_string()
            }
        };

        let (public_ip, location, isp) = match self.public_ip().await {
            Ok(ip) => match self.geolocate(&ip).await {
                Ok(geo) => (ip, geo.location(), geo.isp()),
                Err(e) => {
                    tracing::warn!(ip = %ip, error = %e, "Geolocation lookup failed");
                    errors.push(format!("geolocation: {}", e));
                    (ip, UNAVAILABLE.to_string(), UNAVAILABLE.to_string())
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Public IP lookup failed");
                errors.push(format!("public ip: {}", e));
                (
                    UNAVAILABLE.to_string(),
                    UNAVAILABLE.to_string(),
                    UNAVAILABLE.to_string(),
                )
            }
        };

        IpInfo {
            local_ip,
            public_ip,
            location,
            isp,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        }
    }

    async fn public_ip(&self) -> Result<String, LookupError> {
        let text = self
            .client
            .get(&self.ip_echo_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let ip = text.trim();
        if ip.is_empty() {
            return Err(LookupError::Empty);
        }
        Ok(ip.to_string())
    }

    async fn geolocate(&self, ip: &str) -> Result<GeoRecord, LookupError> {
        let url = self.geo_lookup_url.replace("{ip}", ip);
        let record = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(record)
    }
}

/// Address of the interface that would route to the public internet.
async fn local_ip() -> Result<IpAddr, LookupError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(ROUTE_PROBE_ADDR).await?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_tolerates_missing_parts() {
        let geo = GeoRecord {
            city: Some("Lyon".into()),
            region: None,
            country_name: Some("France".into()),
            org: None,
        };
        assert_eq!(geo.location(), "Lyon, , France");
        assert_eq!(geo.isp(), "");
    }

    #[test]
    fn test_error_field_omitted_when_clean() {
        let info = IpInfo {
            local_ip: "10.0.0.2".into(),
            public_ip: "203.0.113.7".into(),
            location: "a, b, c".into(),
            isp: "Example".into(),
            error: None,
        };
        let value = serde_json::to_value(&info).unwrap();
        assert!(value.get("error").is_none());
    }
}
