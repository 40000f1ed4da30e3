use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::{
    api::{HealthAPI, RouteAPI, SignalAPI, API},
    config::Config,
    entities::{Coordinates, Health, NearbySignals, RouteCreated, RouteRequest, RouteResult},
    error::{poll_transport_error, submission_error, upstream_error, Error},
};

/// HTTP client for the route analysis backend.
#[derive(Clone, Debug)]
pub struct RouteBackend {
    client: Client,
    api_base: String,
}

impl RouteBackend {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, Error> {
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl RouteAPI for RouteBackend {
    #[tracing::instrument(skip(self))]
    async fn create_route(&self, request: &RouteRequest) -> Result<RouteCreated, Error> {
        request.validate()?;

        let res = self
            .client
            .post(self.url("/routes"))
            .json(request)
            .send()
            .await
            .map_err(|err| submission_error(format!("POST /routes failed: {}", err)))?;

        let status_code = res.status().as_u16();

        if (400..500).contains(&status_code) {
            return Err(submission_error(format!(
                "POST /routes rejected with {}",
                status_code
            )));
        } else if !res.status().is_success() {
            return Err(submission_error(format!(
                "POST /routes failed upstream with {}",
                status_code
            )));
        }

        let created: RouteCreated = decode(res).await.map_err(Error::into_submission_error)?;

        tracing::info!("route analysis accepted as {}", created.route_id);

        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    async fn find_route(&self, route_id: &str) -> Result<RouteResult, Error> {
        let res = self
            .client
            .get(self.url(&format!("/routes/{}", route_id)))
            .send()
            .await
            .map_err(|err| poll_transport_error(format!("GET /routes failed: {}", err)))?;

        let status_code = res.status().as_u16();

        if status_code == 404 {
            return Err(poll_transport_error(format!("route {} not found", route_id)));
        } else if !res.status().is_success() {
            return Err(poll_transport_error(format!(
                "GET /routes/{} failed with {}",
                route_id, status_code
            )));
        }

        decode(res).await.map_err(Error::into_poll_transport_error)
    }
}

#[async_trait]
impl SignalAPI for RouteBackend {
    #[tracing::instrument(skip(self))]
    async fn nearby_signals(
        &self,
        location: Coordinates,
        radius_m: u32,
    ) -> Result<NearbySignals, Error> {
        let res = self
            .client
            .get(self.url("/nearby-signals"))
            .query(&[("lat", location.lat), ("lon", location.lon)])
            .query(&[("radius_m", radius_m)])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(upstream_error());
        }

        decode(res).await
    }
}

#[async_trait]
impl HealthAPI for RouteBackend {
    #[tracing::instrument(skip(self))]
    async fn health(&self) -> Result<Health, Error> {
        let res = self.client.get(self.url("/health")).send().await?;

        if !res.status().is_success() {
            return Err(upstream_error());
        }

        decode(res).await
    }
}

impl API for RouteBackend {}
