use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use gardensim::{
    driver::SimulationHandle,
    events::MemorySink,
    scenario::Scenario,
    web::{router, AppState},
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Router, SimulationHandle) {
    let journal = Arc::new(MemorySink::default());
    let engine = Scenario::standard().build_engine(journal.clone()).unwrap();
    let simulation = SimulationHandle::new(engine, 1.0);
    (router(AppState::new(simulation.clone(), journal)), simulation)
}

async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn state_exposes_snapshot_and_clock() {
    let (app, simulation) = app();
    simulation.step();
    let (status, body) = call(app, Method::GET, "/api/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["tick"], 1);
    assert_eq!(body["snapshot"]["garden"], "Smart Garden");
    assert_eq!(body["snapshot"]["plants"].as_array().unwrap().len(), 37);
    assert_eq!(body["snapshot"]["modules"][0]["module"], "watering");
    assert_eq!(body["paused"], false);
    assert_eq!(body["speed"], 1.0);
}

#[tokio::test]
async fn manual_actions_run_against_the_engine() {
    let (app, simulation) = app();
    let (status, body) = call(app.clone(), Method::POST, "/api/actions/pest-control", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 2);

    let (status, body) = call(app.clone(), Method::POST, "/api/actions/fertilize", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 37);

    let (status, _) = call(app, Method::POST, "/api/actions/prune", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let pests = simulation.latest().unwrap().stats.alive_pests;
    assert_eq!(pests, 0);
}

#[tokio::test]
async fn control_endpoints_drive_the_clock() {
    let (app, simulation) = app();
    let (status, body) = call(app.clone(), Method::POST, "/api/control/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paused"], true);
    assert!(simulation.is_paused());

    let (_, body) = call(
        app.clone(),
        Method::POST,
        "/api/control/speed",
        Some(json!({ "speed": 25.0 })),
    )
    .await;
    assert_eq!(body["speed"], 10.0);

    let (_, body) = call(app, Method::POST, "/api/control/resume", None).await;
    assert_eq!(body["paused"], false);
}

#[tokio::test]
async fn module_settings_are_validated() {
    let (app, _) = app();
    let (status, body) = call(
        app.clone(),
        Method::POST,
        "/api/modules/heating",
        Some(json!({ "mode": "COOLING", "target_temperature": 60.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["module"], "heating");
    assert_eq!(body["mode"], "COOLING");
    assert_eq!(body["target_temperature"], 60.0);

    let (status, _) = call(
        app.clone(),
        Method::POST,
        "/api/modules/watering",
        Some(json!({ "low_threshold": 80.0, "high_threshold": 20.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        app,
        Method::POST,
        "/api/modules/pest-control",
        Some(json!({ "enabled": false, "method": "CHEMICAL" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["method"], "CHEMICAL");
}

#[tokio::test]
async fn log_filters_by_category_and_limit() {
    let (app, simulation) = app();
    simulation.with_engine(|engine| engine.run(5));

    let (status, body) = call(app.clone(), Method::GET, "/api/log?category=SENSOR&limit=3", None).await;
    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e["category"] == "SENSOR"));

    let (status, body) = call(app.clone(), Method::GET, "/api/log?level=ERROR", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = call(app, Method::GET, "/api/log?category=WEATHER", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
