#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::{Coordinates, Health, NearbySignals, RouteCreated, RouteRequest, RouteResult};
use crate::error::Error;

#[async_trait]
pub trait RouteAPI {
    async fn create_route(&self, request: &RouteRequest) -> Result<RouteCreated, Error>;
    async fn find_route(&self, route_id: &str) -> Result<RouteResult, Error>;
}

#[async_trait]
pub trait SignalAPI {
    async fn nearby_signals(
        &self,
        location: Coordinates,
        radius_m: u32,
    ) -> Result<NearbySignals, Error>;
}

#[async_trait]
pub trait HealthAPI {
    async fn health(&self) -> Result<Health, Error>;
}

pub trait API: RouteAPI + SignalAPI + HealthAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;

#[test]
fn scripted_backend_behind_dyn_api() {
    use crate::entities::{RouteRequest, RouteStatus};
    use tokio_test::block_on;

    let api: DynAPI = Arc::new(scripted::ScriptedBackend::new("abc"));
    let origin = Coordinates::new(-23.55, -46.63);

    let created = block_on(api.create_route(&RouteRequest::new(
        origin,
        Coordinates::new(-22.90, -43.17),
    )))
    .unwrap();
    assert_eq!(created.route_id, "abc");

    let result = block_on(api.find_route("abc")).unwrap();
    assert_eq!(result.status, RouteStatus::Processing);

    assert!(block_on(api.health()).unwrap().is_healthy());
    assert_eq!(block_on(api.nearby_signals(origin, 200)).unwrap().count, 0);
}
