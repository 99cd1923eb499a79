//! GeoJSON over HTTP (WFS, ArcGIS `f=geojson`, Overpass-to-GeoJSON proxies).

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{adapt_collection, FeatureProvider, SourceError};
use crate::models::{FeatureCollection, FeatureKind, GeoPoint, UtilityFeature};

/// Meters per degree of latitude
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Fetches one feature kind from a templated URL.
///
/// Placeholders: `{lat}`, `{lon}`, and the search box corners `{min_lon}`,
/// `{min_lat}`, `{max_lon}`, `{max_lat}`.
#[derive(Debug, Clone)]
pub struct GeoJsonHttpProvider {
    name: String,
    kind: FeatureKind,
    url_template: String,
    search_radius_m: f64,
    client: reqwest::Client,
}

impl GeoJsonHttpProvider {
    pub fn new(
        name: impl Into<String>,
        kind: FeatureKind,
        url_template: impl Into<String>,
        timeout: Duration,
        search_radius_m: f64,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            name: name.into(),
            kind,
            url_template: url_template.into(),
            search_radius_m,
            client,
        })
    }

    /// `[min_lon, min_lat, max_lon, max_lat]` around the property
    pub fn search_bbox(&self, property: GeoPoint) -> [f64; 4] {
        let dlat = self.search_radius_m / METERS_PER_DEGREE;
        let cos_lat = property.lat.to_radians().cos().abs().max(1e-6);
        let dlon = self.search_radius_m / (METERS_PER_DEGREE * cos_lat);
        [
            property.lon - dlon,
            property.lat - dlat,
            property.lon + dlon,
            property.lat + dlat,
        ]
    }

    pub fn render_url(&self, property: GeoPoint) -> String {
        let [min_lon, min_lat, max_lon, max_lat] = self.search_bbox(property);
        [
            ("{lat}", property.lat),
            ("{lon}", property.lon),
            ("{min_lon}", min_lon),
            ("{min_lat}", min_lat),
            ("{max_lon}", max_lon),
            ("{max_lat}", max_lat),
        ]
        .iter()
        .fold(self.url_template.clone(), |url, (placeholder, value)| {
            url.replace(placeholder, &format!("{:.6}", value))
        })
    }
}

#[async_trait]
impl FeatureProvider for GeoJsonHttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, kind: FeatureKind) -> bool {
        kind == self.kind
    }

    async fn fetch(
        &self,
        kind: FeatureKind,
        property: GeoPoint,
    ) -> Result<Vec<UtilityFeature>, SourceError> {
        if kind != self.kind {
            return Err(SourceError::Unsupported(kind));
        }

        let url = self.render_url(property);
        debug!("{}: GET {}", self.name, url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("{}: request failed: {}", self.name, e);
            SourceError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{}: {} returned {}", self.name, url, status);
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let collection: FeatureCollection = serde_json::from_str(&body).map_err(|e| {
            warn!("{}: response is not a FeatureCollection: {}", self.name, e);
            SourceError::from(e)
        })?;

        let features = adapt_collection(&collection, kind, property);
        debug!(
            "{}: {} of {} features usable",
            self.name,
            features.len(),
            collection.features.len()
        );
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    const MAINS: &str = r#"{"type":"FeatureCollection","features":[
        {"geometry":{"type":"LineString","coordinates":[[144.99,-37.8002],[145.01,-37.8002]]},
         "properties":{"ASSET_ID":"M7","PIPE_DIAMETER":"150mm"}},
        {"geometry":null,"properties":{"ASSET_ID":"no-geometry"}}
    ]}"#;

    /// Serve `router` on an ephemeral local port and return its base URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn upstream() -> Router {
        Router::new()
            .route(
                "/down",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
            )
            .route("/garbage", get(|| async { "<html>not json</html>" }))
            .route("/mains", get(|| async { MAINS }))
    }

    fn provider(template: &str) -> GeoJsonHttpProvider {
        GeoJsonHttpProvider::new(
            "wfs",
            FeatureKind::WaterMain,
            template,
            Duration::from_secs(25),
            1000.0,
        )
        .unwrap()
    }

    #[test]
    fn test_render_url_placeholders() {
        let p = provider("http://host/q?lat={lat}&lon={lon}");
        let url = p.render_url(GeoPoint::new(-37.8, 145.0));
        assert_eq!(url, "http://host/q?lat=-37.800000&lon=145.000000");
    }

    #[test]
    fn test_search_bbox_covers_radius() {
        let p = provider("http://host/wfs?bbox={min_lon},{min_lat},{max_lon},{max_lat}");
        let property = GeoPoint::new(-37.8, 145.0);
        let [min_lon, min_lat, max_lon, max_lat] = p.search_bbox(property);

        assert!((max_lat - min_lat - 2.0 * 1000.0 / METERS_PER_DEGREE).abs() < 1e-9);
        // Longitude degrees shrink away from the equator
        assert!(max_lon - min_lon > max_lat - min_lat);
        assert!(min_lon < 145.0 && max_lon > 145.0);

        let url = p.render_url(property);
        assert!(!url.contains('{'));
    }

    #[tokio::test]
    async fn test_other_kinds_are_unsupported() {
        let p = provider("http://127.0.0.1:9/none");
        assert!(!p.supports(FeatureKind::Hydrant));
        let result = p.fetch(FeatureKind::Hydrant, GeoPoint::new(-37.8, 145.0)).await;
        assert!(matches!(result, Err(SourceError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_fetch_adapts_upstream_collection() {
        let base = serve(upstream()).await;
        let p = provider(&format!("{}/mains?lat={{lat}}&lon={{lon}}", base));

        let features = p
            .fetch(FeatureKind::WaterMain, GeoPoint::new(-37.8, 145.0))
            .await
            .unwrap();
        assert_eq!(features.len(), 1);
        match &features[0] {
            UtilityFeature::WaterMain(main) => assert_eq!(main.asset_id.as_deref(), Some("M7")),
            other => panic!("unexpected feature {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let base = serve(upstream()).await;
        let p = provider(&format!("{}/down", base));

        let result = p
            .fetch(FeatureKind::WaterMain, GeoPoint::new(-37.8, 145.0))
            .await;
        match result {
            Err(SourceError::Status { url, status }) => {
                assert_eq!(status, 503);
                assert!(url.ends_with("/down"));
            }
            other => panic!("expected a status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparseable_body_is_an_error() {
        let base = serve(upstream()).await;
        let p = provider(&format!("{}/garbage", base));

        let result = p
            .fetch(FeatureKind::WaterMain, GeoPoint::new(-37.8, 145.0))
            .await;
        assert!(matches!(result, Err(SourceError::Json(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let p = provider(&format!("http://{}/mains", addr));

        let result = p
            .fetch(FeatureKind::WaterMain, GeoPoint::new(-37.8, 145.0))
            .await;
        assert!(matches!(result, Err(SourceError::Http(_))));
    }

    #[tokio::test]
    async fn test_failed_upstream_falls_back_in_orchestrator() {
        use crate::sources::{MemoryCache, ProviderOutcome, SourceOrchestrator, StaticProvider};
        use std::sync::Arc;

        let base = serve(upstream()).await;
        let down = provider(&format!("{}/down", base));
        let backup = StaticProvider::new("backup")
            .with_collection(FeatureKind::WaterMain, serde_json::from_str(MAINS).unwrap());

        let orchestrator = SourceOrchestrator::new(
            vec![Arc::new(down) as Arc<dyn FeatureProvider>, Arc::new(backup)],
            Arc::new(MemoryCache::new()),
            Duration::from_secs(60),
        );
        let (features, provenance) = orchestrator
            .acquire(FeatureKind::WaterMain, GeoPoint::new(-37.8, 145.0))
            .await;

        assert_eq!(features.len(), 1);
        assert_eq!(provenance.attempts[0].provider, "wfs");
        assert!(matches!(
            provenance.attempts[0].outcome,
            ProviderOutcome::Failed(_)
        ));
        assert_eq!(provenance.provider.as_deref(), Some("backup"));
        assert_eq!(provenance.rank, Some(1));
    }
}
