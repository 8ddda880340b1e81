//! JSON and server-sent-event surface over a running garden.

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::watch};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::{
    driver::SimulationHandle,
    engine::Engine,
    error::GardenError,
    events::{Category, GardenEvent, Level, MemorySink, DEFAULT_JOURNAL_CAPACITY},
    modules::{
        ControlModule, HeatingMode, HeatingSystem, LightingSystem, ModuleState, PestControl,
        PestControlMethod, WateringSystem,
    },
    snapshot::GardenSnapshot,
};

const DEFAULT_LOG_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    simulation: SimulationHandle,
    journal: Arc<MemorySink>,
}

impl AppState {
    pub fn new(simulation: SimulationHandle, journal: Arc<MemorySink>) -> Self {
        Self {
            simulation,
            journal,
        }
    }

    pub fn simulation(&self) -> &SimulationHandle {
        &self.simulation
    }
}

pub struct WebServerConfig {
    pub engine: Engine,
    pub journal: Arc<MemorySink>,
    pub host: String,
    pub port: u16,
    pub speed: f64,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<GardenError> for ApiError {
    fn from(err: GardenError) -> Self {
        let status = match err {
            GardenError::MissingModule(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::bad_request(format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            error: String,
        }
        (self.status, Json(Body { error: self.message })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/stream", get(stream_snapshots))
        .route("/api/log", get(event_log))
        .route("/api/actions/:action", post(run_action))
        .route("/api/control/pause", post(pause))
        .route("/api/control/resume", post(resume))
        .route("/api/control/speed", post(set_speed))
        .route("/api/modules/watering", post(configure_watering))
        .route("/api/modules/heating", post(configure_heating))
        .route("/api/modules/lighting", post(configure_lighting))
        .route("/api/modules/pest-control", post(configure_pest_control))
        .with_state(Arc::new(state))
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        engine,
        journal,
        host,
        port,
        speed,
    } = config;

    let garden = engine.world().name().to_string();
    let simulation = SimulationHandle::new(engine, speed);
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let driver = tokio::spawn(simulation.clone().run(async move {
        let _ = stop_rx.changed().await;
    }));

    let app = router(AppState::new(simulation, journal));
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(garden = %garden, "garden API live at http://{addr} (Ctrl+C to stop)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_tx.send(true);
    if let Err(err) = driver.await {
        tracing::error!(error = %err, "simulation driver task failed");
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down garden API");
}

#[derive(Serialize)]
struct StateEnvelope {
    snapshot: Option<Arc<GardenSnapshot>>,
    tick_progress: f64,
    paused: bool,
    speed: f64,
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let sim = &state.simulation;
    Json(StateEnvelope {
        snapshot: sim.latest(),
        tick_progress: sim.tick_progress(),
        paused: sim.is_paused(),
        speed: sim.speed(),
    })
}

async fn stream_snapshots(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.simulation.subscribe();
    // Lagged receivers skip ahead; the next snapshot is complete anyway.
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let snapshot = msg.ok()?;
        let payload = serde_json::to_string(&*snapshot).ok()?;
        Some(Ok(Event::default().event("snapshot").data(payload)))
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    category: Option<Category>,
    level: Option<Level>,
    limit: Option<usize>,
}

async fn event_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Json<Vec<GardenEvent>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .min(DEFAULT_JOURNAL_CAPACITY);
    let mut events = state.journal.filtered(|event| {
        query.category.map_or(true, |c| event.category == c)
            && query.level.map_or(true, |l| event.level == l)
    });
    let skip = events.len().saturating_sub(limit);
    Json(events.split_off(skip))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: String,
    pub tick: u64,
    /// Plants watered, insects eliminated or plants fertilized.
    pub affected: usize,
}

async fn run_action(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> ApiResult<ActionOutcome> {
    let outcome = state.simulation.with_engine(|engine| -> std::result::Result<_, ApiError> {
        let affected = match action.as_str() {
            "water" => engine.manual_water()?,
            "pest-control" => engine.manual_pest_control()?,
            "fertilize" => engine.fertilize_all(),
            other => return Err(ApiError::bad_request(format!("unknown action '{other}'"))),
        };
        Ok(ActionOutcome {
            action: action.clone(),
            tick: engine.current_tick(),
            affected,
        })
    })?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlState {
    pub paused: bool,
    pub speed: f64,
}

fn control_state(sim: &SimulationHandle) -> Json<ControlState> {
    Json(ControlState {
        paused: sim.is_paused(),
        speed: sim.speed(),
    })
}

async fn pause(State(state): State<Arc<AppState>>) -> Json<ControlState> {
    state.simulation.pause();
    state
        .simulation
        .with_engine(|engine| engine.record_user_action("Simulation paused"));
    control_state(&state.simulation)
}

async fn resume(State(state): State<Arc<AppState>>) -> Json<ControlState> {
    state.simulation.resume();
    state
        .simulation
        .with_engine(|engine| engine.record_user_action("Simulation resumed"));
    control_state(&state.simulation)
}

#[derive(Debug, Deserialize)]
struct SpeedRequest {
    speed: f64,
}

async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpeedRequest>,
) -> ApiResult<ControlState> {
    if !request.speed.is_finite() {
        return Err(ApiError::bad_request("speed must be a finite number"));
    }
    let speed = state.simulation.set_speed(request.speed);
    state
        .simulation
        .with_engine(|engine| engine.record_user_action(format!("Speed set to {speed:.1}x")));
    Ok(control_state(&state.simulation))
}

#[derive(Debug, Default, Deserialize)]
struct WateringUpdate {
    enabled: Option<bool>,
    low_threshold: Option<f64>,
    high_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct HeatingUpdate {
    enabled: Option<bool>,
    mode: Option<HeatingMode>,
    target_temperature: Option<f64>,
    adjust_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LightingUpdate {
    enabled: Option<bool>,
    target_light: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PestControlUpdate {
    enabled: Option<bool>,
    method: Option<PestControlMethod>,
    threshold: Option<usize>,
    check_interval: Option<u32>,
}

/// Applies `apply` to the registered module of type `T` and returns its new
/// state.
fn configure<T, F>(state: &AppState, key: &'static str, apply: F) -> ApiResult<ModuleState>
where
    T: ControlModule + 'static,
    F: FnOnce(&mut T) -> Result<()>,
{
    let module_state = state.simulation.with_engine(|engine| {
        let module = engine
            .module_mut::<T>()
            .ok_or(GardenError::MissingModule(key))?;
        apply(module)?;
        let module_state = module.state();
        engine.record_user_action(format!("{key} settings updated"));
        Ok::<_, ApiError>(module_state)
    })?;
    Ok(Json(module_state))
}

async fn configure_watering(
    State(state): State<Arc<AppState>>,
    Json(update): Json<WateringUpdate>,
) -> ApiResult<ModuleState> {
    configure::<WateringSystem, _>(&state, "watering", |m| {
        if update.low_threshold.is_some() || update.high_threshold.is_some() {
            let (low, high) = m.thresholds();
            m.set_thresholds(
                update.low_threshold.unwrap_or(low),
                update.high_threshold.unwrap_or(high),
            )?;
        }
        if let Some(enabled) = update.enabled {
            m.set_enabled(enabled);
        }
        Ok(())
    })
}

async fn configure_heating(
    State(state): State<Arc<AppState>>,
    Json(update): Json<HeatingUpdate>,
) -> ApiResult<ModuleState> {
    configure::<HeatingSystem, _>(&state, "heating", |m| {
        if let Some(target) = update.target_temperature {
            m.set_target_temperature(target)?;
        }
        if let Some(rate) = update.adjust_rate {
            m.set_adjust_rate(rate)?;
        }
        if let Some(mode) = update.mode {
            m.set_mode(mode);
        }
        if let Some(enabled) = update.enabled {
            m.set_enabled(enabled);
        }
        Ok(())
    })
}

async fn configure_lighting(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LightingUpdate>,
) -> ApiResult<ModuleState> {
    configure::<LightingSystem, _>(&state, "lighting", |m| {
        if let Some(target) = update.target_light {
            m.set_target_light(target)?;
        }
        if let Some(enabled) = update.enabled {
            m.set_enabled(enabled);
        }
        Ok(())
    })
}

async fn configure_pest_control(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PestControlUpdate>,
) -> ApiResult<ModuleState> {
    configure::<PestControl, _>(&state, "pest_control", |m| {
        if let Some(interval) = update.check_interval {
            m.set_check_interval(interval)?;
        }
        if let Some(method) = update.method {
            m.set_method(method);
        }
        if let Some(threshold) = update.threshold {
            m.set_threshold(threshold);
        }
        if let Some(enabled) = update.enabled {
            m.set_enabled(enabled);
        }
        Ok(())
    })
}
