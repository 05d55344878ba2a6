//! Access to the AEMET OpenData API.
//!
//! Every dataset is served through a two-step redirect: the endpoint answers
//! with a small JSON envelope whose `datos` field points at a transient URL,
//! and that URL returns the actual JSON array.

use crate::config::ExtractionSettings;
use crate::extraction::error::FetchError;
use crate::extraction::planner::DateWindow;
use crate::extraction::throttle::Throttle;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const INVENTORY_ENDPOINT: &str =
    "/api/valores/climatologicos/inventarioestaciones/todasestaciones";

const DAILY_ENDPOINT_PREFIX: &str = "/api/valores/climatologicos/diarios/datos";
const API_DATE_FORMAT: &str = "%Y-%m-%dT00:00:00UTC";

/// Endpoint of the daily climatological values of one station over `window`.
pub fn daily_endpoint(station_code: &str, window: &DateWindow) -> String {
    format!(
        "{}/fechaini/{}/fechafin/{}/estacion/{}",
        DAILY_ENDPOINT_PREFIX,
        window.start.format(API_DATE_FORMAT),
        window.end.format(API_DATE_FORMAT),
        station_code
    )
}

/// A source of provider datasets.
///
/// `fetch_dataset` performs the complete two-step fetch for an endpoint path
/// and returns the payload body (a JSON array as text).
#[allow(async_fn_in_trait)]
pub trait OpenDataApi {
    async fn fetch_dataset(&self, endpoint: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    descripcion: Option<String>,
    #[serde(default)]
    estado: Option<u16>,
    #[serde(default)]
    datos: Option<String>,
}

/// HTTP client for the provider. All requests go through one [`Throttle`].
#[derive(Debug)]
pub struct AemetClient {
    http: Client,
    base_url: String,
    api_key: String,
    throttle: Throttle,
}

impl AemetClient {
    pub fn new(api_key: impl Into<String>, settings: &ExtractionSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            throttle: Throttle::new(settings.request_delay()),
        })
    }

    /// Overrides the minimum delay between requests.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.throttle = Throttle::new(delay);
        self
    }

    async fn get_text(&self, url: &str, with_key: bool) -> Result<String, FetchError> {
        self.throttle.wait().await;

        let mut request = self.http.get(url);
        if with_key {
            request = request.query(&[("api_key", self.api_key.as_str())]);
        }
        // Strip the URL from transport errors, it carries the api key.
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e.without_url()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NoData(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        // Decodes according to the declared charset (ISO-8859-15 for payloads).
        response
            .text()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e.without_url()))
    }

    async fn resolve(&self, endpoint: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let body = self.get_text(&url, true).await?;
        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|e| FetchError::MalformedPayload {
                url: url.clone(),
                message: e.to_string(),
            })?;

        match envelope.estado {
            None | Some(200) => {}
            Some(404) => return Err(FetchError::NoData(url)),
            Some(estado) => {
                return Err(FetchError::Upstream {
                    url,
                    estado,
                    description: envelope.descripcion.unwrap_or_default(),
                })
            }
        }

        envelope.datos.ok_or_else(|| FetchError::MalformedPayload {
            url,
            message: "envelope has no 'datos' URL".to_string(),
        })
    }
}

impl OpenDataApi for AemetClient {
    async fn fetch_dataset(&self, endpoint: &str) -> Result<String, FetchError> {
        let data_url = self.resolve(endpoint).await?;
        debug!("Fetching payload for {}", endpoint);
        self.get_text(&data_url, false).await
    }
}
