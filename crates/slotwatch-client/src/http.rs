//! HTTP Monitor Service API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use slotwatch_app::{ApiError, MonitorApi};
use slotwatch_proto::{
    ApiErrorBody, BookingRequest, MonitorRecord, MonitorStatusResponse, MonitorSummary,
    StartMonitorRequest, StopMonitorResponse,
};
use tracing::debug;
use url::Url;

use crate::{EndpointError, Endpoints};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`MonitorApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMonitorApi {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpMonitorApi {
    /// Client for `endpoints` with a per-request `timeout`.
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Request(err.to_string()))?;
        Ok(Self { http, endpoints })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Result<Url, EndpointError>,
    ) -> Result<T, ApiError> {
        let url = url.map_err(|err| ApiError::Request(err.to_string()))?;
        debug!(%url, "GET");
        let response =
            self.http.get(url).send().await.map_err(|err| ApiError::Request(err.to_string()))?;
        decode(response).await
    }

    async fn post<B, T>(
        &self,
        url: Result<Url, EndpointError>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = url.map_err(|err| ApiError::Request(err.to_string()))?;
        debug!(%url, "POST");
        let mut request = self.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|err| ApiError::Request(err.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, response).await);
    }
    response.json::<T>().await.map_err(|err| ApiError::Decode(err.to_string()))
}

async fn status_error(status: StatusCode, response: Response) -> ApiError {
    let detail = match response.json::<ApiErrorBody>().await {
        Ok(body) => body.detail_text(),
        Err(_) => None,
    };
    ApiError::Status { status: status.as_u16(), detail }
}

#[async_trait]
impl MonitorApi for HttpMonitorApi {
    async fn list_monitors(&self) -> Result<Vec<MonitorSummary>, ApiError> {
        self.get(self.endpoints.monitors()).await
    }

    async fn monitor_status(&self) -> Result<MonitorStatusResponse, ApiError> {
        self.get(self.endpoints.monitor_status()).await
    }

    async fn start_monitor(
        &self,
        request: &StartMonitorRequest,
    ) -> Result<MonitorRecord, ApiError> {
        self.post(self.endpoints.monitors(), Some(request)).await
    }

    async fn stop_monitor(&self, monitor_id: i64) -> Result<StopMonitorResponse, ApiError> {
        self.post::<(), _>(self.endpoints.stop_monitor(monitor_id), None).await
    }

    async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post(self.endpoints.bookings(), Some(request)).await
    }
}
