//! Incident and statistics queries.

use async_trait::async_trait;
use crime_scope_api_models::{
    CrimeStats, CrimesResponse, NearbyQuery, NearbyResponse, StatsEnvelope, decode_incidents,
};
use crime_scope_crime_models::IncidentReport;

use crate::{ApiClient, ApiError, IncidentSource, StatsSource, read_json};

/// `GET /api/alerts/nearby`
pub const NEARBY_PATH: &str = "/api/alerts/nearby";
/// `GET /api/crimes`
pub const CRIMES_PATH: &str = "/api/crimes";
/// `GET /api/crime-stats`
pub const STATS_PATH: &str = "/api/crime-stats";

#[async_trait(?Send)]
impl IncidentSource for ApiClient {
    async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<IncidentReport>, ApiError> {
        let url = self.url(NEARBY_PATH);
        log::debug!(
            "Fetching nearby incidents: lat={} lng={} radius={}km limit={}",
            query.lat,
            query.lng,
            query.radius,
            query.limit
        );

        let response = self.client.get(&url).query(query).send().await?;
        let body: NearbyResponse = read_json(response).await?;
        let reports = decode_incidents(body.data);

        log::info!("Loaded {} nearby incidents", reports.len());
        Ok(reports)
    }

    async fn all_incidents(&self) -> Result<Vec<IncidentReport>, ApiError> {
        let url = self.url(CRIMES_PATH);
        log::debug!("Fetching incidents from {url}");

        let response = self.client.get(&url).send().await?;
        let body: CrimesResponse = read_json(response).await?;
        let reports = decode_incidents(body.into_records());

        log::info!("Loaded {} incidents", reports.len());
        Ok(reports)
    }
}

#[async_trait(?Send)]
impl StatsSource for ApiClient {
    async fn stats(&self) -> Result<CrimeStats, ApiError> {
        let url = self.url(STATS_PATH);
        log::debug!("Fetching statistics from {url}");

        let response = self.client.get(&url).send().await?;
        let envelope: StatsEnvelope = read_json(response).await?;
        Ok(envelope.into())
    }
}
