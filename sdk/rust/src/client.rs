//! Relay client.
//!
//! Every call returns a [`RelayResult`]; transport failures are retried
//! according to the configured [`RetryPolicy`] and then reported as
//! [`RelayResult::Failed`] instead of an `Err`. HTTP error statuses from the
//! relay are final results and are never retried.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};

use crate::config::{ClientConfig, Settings, ENV_PREFIX};
use crate::error::{error_chain, ClientError};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

const TIME_API_URL: &str = "http://worldtimeapi.org/api/ip";
const WEATHER_API_URL: &str = "https://api.weatherapi.com/v1/current.json";

/// Parsed body of a completed call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

/// Outcome of a call to the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayResult {
    /// The relay answered; `status` may be any HTTP status.
    Completed { status: u16, body: ResponseBody },
    /// Every attempt failed at the transport level.
    Failed { message: String, attempts: u32 },
}

impl RelayResult {
    pub fn is_error(&self) -> bool {
        matches!(self, RelayResult::Failed { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RelayResult::Completed { status, .. } => Some(*status),
            RelayResult::Failed { .. } => None,
        }
    }

    /// Render the result as the JSON envelope callers inspect.
    pub fn into_json(self) -> Value {
        match self {
            RelayResult::Completed {
                body: ResponseBody::Json(value),
                ..
            } => value,
            RelayResult::Completed {
                body: ResponseBody::Text(text),
                ..
            } => json!({ "status": "success", "data": text }),
            RelayResult::Failed { message, .. } => json!({ "status": "error", "message": message }),
        }
    }
}

/// Per-call options for [`RelayClient::send_request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Body to relay to the target.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardData {
    Json(Value),
    Raw(String),
}

/// Options for [`RelayClient::forward_request`].
#[derive(Debug, Clone)]
pub struct ForwardOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub data: Option<ForwardData>,
    pub params: Vec<(String, String)>,
}

impl Default for ForwardOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            data: None,
            params: Vec::new(),
        }
    }
}

impl ForwardData {
    /// Serialize to a request body. Empty or falsy payloads (`null`,
    /// `false`, `0`, `""`, `[]`, `{}`) yield `None`.
    fn into_body(self) -> Option<String> {
        let body = match self {
            ForwardData::Json(value) if is_falsy(&value) => return None,
            ForwardData::Json(value) => value.to_string(),
            ForwardData::Raw(raw) => raw,
        };
        (!body.is_empty()).then_some(body)
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Client for the relay's routes.
pub struct RelayClient<S = TokioSleeper> {
    http: Client,
    settings: Settings,
    config: ClientConfig,
    sleeper: S,
}

impl RelayClient<TokioSleeper> {
    /// Load settings from `path` (defaults → file → `RELAY_*` env).
    pub fn from_file(path: &Path) -> Result<Self, ClientError> {
        let settings = Settings::load(&ClientConfig::default(), Some(path), ENV_PREFIX)?;
        Self::from_settings(settings)
    }

    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::from_settings(Settings::from_defaults(&config, ENV_PREFIX)?)
    }

    pub fn from_settings(settings: Settings) -> Result<Self, ClientError> {
        let config: ClientConfig = settings.parse()?;
        Ok(Self {
            http: build_http_client(&config)?,
            settings,
            config,
            sleeper: TokioSleeper,
        })
    }
}

impl<S: Sleeper> RelayClient<S> {
    /// Replace the delay source used between attempts.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> RelayClient<T> {
        RelayClient {
            http: self.http,
            settings: self.settings,
            config: self.config,
            sleeper,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn server_url(&self) -> &str {
        &self.config.server_url
    }

    /// Merge `changes` into the settings and apply them immediately.
    ///
    /// Nothing changes if the merged settings do not form a valid config.
    pub fn update_config(&mut self, changes: Map<String, Value>) -> Result<&ClientConfig, ClientError> {
        let mut settings = self.settings.clone();
        settings.update(changes);
        let config: ClientConfig = settings.parse()?;
        self.http = build_http_client(&config)?;
        self.settings = settings;
        self.config = config;
        tracing::info!(server_url = %self.config.server_url, "Client config updated");
        Ok(&self.config)
    }

    pub fn save_config(&self, path: &Path) -> Result<(), ClientError> {
        self.settings.save(path)?;
        Ok(())
    }

    /// Send one logical request to `endpoint` on the relay server.
    pub async fn send_request(&self, endpoint: &str, method: Method, options: RequestOptions) -> RelayResult {
        let target = format!("{}{}", self.config.server_url.trim_end_matches('/'), endpoint);
        let url = target.as_str();
        let method = &method;

        let mut headers = options.headers;
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let policy = RetryPolicy::from_config(&self.config);
        let outcome = policy
            .run(&self.sleeper, |attempt| {
                let mut request = self
                    .http
                    .request(method.clone(), url)
                    .headers(headers.clone())
                    .query(&options.params);
                if let Some(body) = &options.body {
                    request = request.body(body.clone());
                }

                async move {
                    tracing::info!(method = %method, url = %url, attempt, "Sending request");
                    let response = request.send().await?;
                    let status = response.status().as_u16();
                    let text = response.text().await?;
                    Ok::<_, reqwest::Error>((status, text))
                }
            })
            .await;

        match outcome {
            Ok((status, text)) => RelayResult::Completed {
                status,
                body: parse_body(text),
            },
            Err(exhausted) => RelayResult::Failed {
                message: error_chain(&exhausted.last_error),
                attempts: exhausted.attempts,
            },
        }
    }

    /// `GET /`
    pub async fn get_server_status(&self) -> RelayResult {
        self.send_request("/", Method::GET, RequestOptions::default()).await
    }

    /// `GET /api/ip-info`
    pub async fn get_ip_info(&self) -> RelayResult {
        self.send_request("/api/ip-info", Method::GET, RequestOptions::default())
            .await
    }

    /// Ask the relay to forward a request to `target_url`.
    pub async fn forward_request(&self, target_url: &str, options: ForwardOptions) -> RelayResult {
        let mut params = Vec::with_capacity(options.params.len() + 1);
        params.push(("url".to_string(), target_url.to_string()));
        params.extend(options.params);

        let request = RequestOptions {
            headers: options.headers,
            params,
            body: options.data.and_then(ForwardData::into_body),
        };
        self.send_request("/api/forward", options.method, request).await
    }

    /// Current time for the relay's public IP.
    pub async fn get_time_info(&self) -> RelayResult {
        self.forward_request(TIME_API_URL, ForwardOptions::default()).await
    }

    /// Current weather at `location`.
    pub async fn get_weather_info(&self, location: &str) -> RelayResult {
        match weather_url(&self.config.weather_api_key, location) {
            Ok(url) => self.forward_request(url.as_str(), ForwardOptions::default()).await,
            Err(e) => RelayResult::Failed {
                message: e.to_string(),
                attempts: 0,
            },
        }
    }
}

fn build_http_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .danger_accept_invalid_certs(!config.verify_ssl)
        .build()
}

fn parse_body(text: String) -> ResponseBody {
    match serde_json::from_str(&text) {
        Ok(value) => ResponseBody::Json(value),
        Err(_) => ResponseBody::Text(text),
    }
}

fn weather_url(api_key: &str, location: &str) -> Result<url::Url, url::ParseError> {
    url::Url::parse_with_params(
        WEATHER_API_URL,
        &[("key", api_key), ("q", location), ("aqi", "no")],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        let text = RelayResult::Completed {
            status: 200,
            body: ResponseBody::Text("pong".into()),
        };
        assert_eq!(text.into_json(), json!({"status": "success", "data": "pong"}));

        let failed = RelayResult::Failed {
            message: "connection refused".into(),
            attempts: 3,
        };
        assert!(failed.is_error());
        assert_eq!(
            failed.into_json(),
            json!({"status": "error", "message": "connection refused"})
        );

        let body = json!({"status_code": 404});
        let completed = RelayResult::Completed {
            status: 404,
            body: ResponseBody::Json(body.clone()),
        };
        assert_eq!(completed.status(), Some(404));
        assert_eq!(completed.into_json(), body);
    }

    #[test]
    fn test_forward_data_body() {
        assert_eq!(
            ForwardData::Json(json!({"a": 1})).into_body().as_deref(),
            Some(r#"{"a":1}"#)
        );
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert_eq!(ForwardData::Json(falsy).into_body(), None);
        }
        assert_eq!(ForwardData::Json(json!([0])).into_body().as_deref(), Some("[0]"));
        assert_eq!(ForwardData::Json(json!(true)).into_body().as_deref(), Some("true"));
        assert_eq!(ForwardData::Raw(String::new()).into_body(), None);
        assert_eq!(ForwardData::Raw("x=1".into()).into_body().as_deref(), Some("x=1"));
    }

    #[test]
    fn test_weather_url_encodes_location() {
        let url = weather_url("k", "New York").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.weatherapi.com/v1/current.json?key=k&q=New+York&aqi=no"
        );
    }

    #[test]
    fn test_parse_body_falls_back_to_text() {
        assert_eq!(parse_body("[1]".into()), ResponseBody::Json(json!([1])));
        assert_eq!(parse_body("<html>".into()), ResponseBody::Text("<html>".into()));
    }
}
