//! Report submission.

use async_trait::async_trait;
use crime_scope_api_models::{ReportAck, ReportPayload};
use crime_scope_config::ReportEncoding;
use crime_scope_crime_models::NewReport;

use crate::{ApiClient, ApiError, ReportSink, parse_json, read_body};

#[async_trait(?Send)]
impl ReportSink for ApiClient {
    async fn submit(&self, report: &NewReport) -> Result<ReportAck, ApiError> {
        let url = self.url(&self.report_path);
        let payload = ReportPayload::from(report);
        log::info!(
            "Submitting {} report (severity {}) at ({:.5}, {:.5})",
            payload.incident_type,
            payload.severity,
            payload.latitude,
            payload.longitude
        );

        let request = self.client.post(&url);
        let request = match self.encoding {
            ReportEncoding::Json => request.json(&payload),
            ReportEncoding::Form => request.form(&payload),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = read_body(response).await?;

        // Some handlers answer 201/204 with an empty body.
        let ack: ReportAck = if body.trim().is_empty() {
            ReportAck::default()
        } else {
            parse_json(&url, &body)?
        };

        log::info!(
            "Report accepted ({status}){}",
            ack.id.as_ref().map(|id| format!(" as {id}")).unwrap_or_default()
        );
        Ok(ack)
    }
}
