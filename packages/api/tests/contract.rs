//! Contract tests for [`ApiClient`] against an in-process backend.

use std::collections::HashMap;
use std::sync::Mutex;

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use chrono::Utc;
use crime_scope_api::{
    API_KEY_HEADER, ApiClient, ApiError, IncidentSource, ReportSink, StatsSource,
};
use crime_scope_api_models::NearbyQuery;
use crime_scope_config::{ApiConfig, AppConfig, ReportEncoding};
use crime_scope_crime_models::{
    GeoPoint, IncidentId, IncidentType, NewReport, ReportFormValues, Severity,
};
use serde_json::{Value, json};

#[derive(Default)]
struct Backend {
    reports: Mutex<Vec<Value>>,
    last_query: Mutex<HashMap<String, String>>,
    last_api_key: Mutex<Option<String>>,
}

async fn nearby(
    state: web::Data<Backend>,
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    *state.last_query.lock().unwrap() = query.into_inner();
    *state.last_api_key.lock().unwrap() = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let data = state.reports.lock().unwrap().clone();
    HttpResponse::Ok().json(json!({ "status": "success", "data": data }))
}

async fn crimes() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "crimes": [
            {"id": 1, "type": "theft", "latitude": 17.38, "longitude": 78.48, "severity": 2},
            {"id": 2, "type": "assault", "severity": 4},
            {"id": 3, "type": "graffiti", "location": {"latitude": 17.4, "longitude": 78.5}}
        ]
    }))
}

async fn stats() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "totalCrimes": 1234,
        "todayCrimes": 7,
        "byType": [{"type": "theft", "count": 700}, {"type": "fraud", "count": 534}],
        "bySeverity": [{"severity": 1, "count": 1000}, {"severity": 5, "count": 234}],
        "lastUpdated": "2026-10-17T09:30:00Z"
    }))
}

async fn stats_error() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "error", "message": "boom"}))
}

async fn report_json(state: web::Data<Backend>, body: web::Json<Value>) -> HttpResponse {
    let mut body = body.into_inner();
    let mut reports = state.reports.lock().unwrap();
    let id = format!("r{}", reports.len() + 1);
    body["id"] = json!(id);
    reports.push(body);

    HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Crime reported and alert created successfully",
        "crime_id": id
    }))
}

async fn report_form(
    state: web::Data<Backend>,
    form: web::Form<HashMap<String, String>>,
) -> HttpResponse {
    let form = form.into_inner();
    state.reports.lock().unwrap().push(json!(form));
    HttpResponse::NoContent().finish()
}

async fn reject() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "status": "error",
        "message": "Missing required fields"
    }))
}

async fn broken() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html")
        .body("<html>maintenance</html>")
}

fn spawn_backend(state: web::Data<Backend>) -> String {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/alerts/nearby", web::get().to(nearby))
                    .route("/crimes", web::get().to(crimes))
                    .route("/crime-stats", web::get().to(stats))
                    .route("/report", web::post().to(report_json))
                    .route("/report-crime", web::post().to(report_form))
                    .route("/rejecting", web::post().to(reject))
                    .route("/broken", web::post().to(broken)),
            )
            .route("/degraded/api/crime-stats", web::get().to(stats_error))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

fn client_for(base_url: String, configure: impl FnOnce(&mut ApiConfig)) -> ApiClient {
    let mut config = AppConfig::default().api;
    config.base_url = base_url;
    configure(&mut config);
    ApiClient::new(&config).unwrap()
}

fn theft_report() -> NewReport {
    ReportFormValues::with_location(IncidentType::Theft, 3, 12.34, 56.78)
        .validate(Utc::now())
        .unwrap()
}

#[actix_web::test]
async fn nearby_sends_query_parameters() {
    let state = web::Data::new(Backend::default());
    let client = client_for(spawn_backend(state.clone()), |_| {});

    let reports = client
        .nearby(&NearbyQuery {
            lat: 37.7749,
            lng: -122.4194,
            radius: 5.0,
            limit: 50,
        })
        .await
        .unwrap();
    assert!(reports.is_empty());

    let query = state.last_query.lock().unwrap().clone();
    let number = |key: &str| query.get(key).and_then(|v| v.parse::<f64>().ok());
    assert_eq!(number("lat"), Some(37.7749));
    assert_eq!(number("lng"), Some(-122.4194));
    assert_eq!(number("radius"), Some(5.0));
    assert_eq!(number("limit"), Some(50.0));
    assert!(state.last_api_key.lock().unwrap().is_none());
}

#[actix_web::test]
async fn api_key_is_sent_when_configured() {
    let state = web::Data::new(Backend::default());
    let client = client_for(spawn_backend(state.clone()), |c| {
        c.api_key = Some("local-dev-key".to_string());
    });

    client
        .nearby(&NearbyQuery {
            lat: 1.0,
            lng: 1.0,
            radius: 1.0,
            limit: 1,
        })
        .await
        .unwrap();
    assert_eq!(
        state.last_api_key.lock().unwrap().as_deref(),
        Some("local-dev-key")
    );
}

#[actix_web::test]
async fn all_incidents_skips_records_without_coordinates() {
    let state = web::Data::new(Backend::default());
    let client = client_for(spawn_backend(state), |_| {});

    let reports = client.all_incidents().await.unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].id, IncidentId::from(1));
    assert_eq!(reports[1].incident_type, IncidentType::Other);
    assert_eq!(reports[1].location, GeoPoint::new(17.4, 78.5));
}

#[actix_web::test]
async fn stats_decode() {
    let state = web::Data::new(Backend::default());
    let client = client_for(spawn_backend(state), |_| {});

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.total_crimes, 1234);
    assert_eq!(stats.today_crimes, 7);
    assert_eq!(stats.by_type.len(), 2);
    assert_eq!(stats.by_severity[1].severity, 5);
}

#[actix_web::test]
async fn stats_error_body_is_a_parse_error() {
    let state = web::Data::new(Backend::default());
    let base = spawn_backend(state);
    let client = client_for(format!("{base}/degraded"), |_| {});

    let err = client.stats().await.unwrap_err();
    assert!(matches!(err, ApiError::Parse { .. }));
}

#[actix_web::test]
async fn submitted_report_appears_in_next_nearby_fetch() {
    let state = web::Data::new(Backend::default());
    let client = client_for(spawn_backend(state.clone()), |_| {});

    let ack = client.submit(&theft_report()).await.unwrap();
    assert_eq!(ack.id, Some(IncidentId::from("r1")));
    assert_eq!(ack.status.as_deref(), Some("success"));

    let stored = state.reports.lock().unwrap()[0].clone();
    assert_eq!(stored["type"], "theft");
    assert_eq!(stored["severity"], 3);
    assert_eq!(stored["status"], "reported");
    assert_eq!(stored["location"], "Selected location");

    let reports = client
        .nearby(&NearbyQuery {
            lat: 12.34,
            lng: 56.78,
            radius: 5.0,
            limit: 50,
        })
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.id, IncidentId::from("r1"));
    assert_eq!(report.incident_type, IncidentType::Theft);
    assert_eq!(report.severity, Severity::High);
    assert_eq!(report.location, GeoPoint::new(12.34, 56.78));
}

#[actix_web::test]
async fn form_encoded_submission_accepts_empty_body() {
    let state = web::Data::new(Backend::default());
    let client = client_for(spawn_backend(state.clone()), |c| {
        c.report_path = "/api/report-crime".to_string();
        c.report_encoding = ReportEncoding::Form;
    });

    let ack = client.submit(&theft_report()).await.unwrap();
    assert!(ack.id.is_none());

    let stored = state.reports.lock().unwrap()[0].clone();
    assert_eq!(stored["type"], "theft");
    assert_eq!(stored["latitude"].as_str().and_then(|v| v.parse::<f64>().ok()), Some(12.34));
}

#[actix_web::test]
async fn rejected_submission_carries_server_message() {
    let state = web::Data::new(Backend::default());
    let client = client_for(spawn_backend(state), |c| {
        c.report_path = "/api/rejecting".to_string();
    });

    let err = client.submit(&theft_report()).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
    assert_eq!(err.server_message(), Some("Missing required fields"));
}

#[actix_web::test]
async fn non_json_success_is_a_parse_error() {
    let state = web::Data::new(Backend::default());
    let client = client_for(spawn_backend(state), |c| {
        c.report_path = "/api/broken".to_string();
    });

    let err = client.submit(&theft_report()).await.unwrap_err();
    assert!(matches!(err, ApiError::Parse { .. }));
}

#[actix_web::test]
async fn unreachable_backend_is_an_http_error() {
    let client = client_for("http://127.0.0.1:9".to_string(), |_| {});
    let err = client.stats().await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
}
