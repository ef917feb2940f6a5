use crate::check::verify_timetable;
use crate::data::{
    Class, ClassPriorityConfig, Lesson, ScenarioState, SchoolConfig, Teacher, TeacherView,
    Timetable,
};
use crate::demo;
use crate::repair::{RepairOutcome, RepairStatus, repair_with_rollback};
use crate::rotation::generate_rotations;
use crate::scenario::apply_scenarios;
use crate::solver::{SolveError, invert_to_teacher_view, solve_timetable};
use crate::storage::{HistoryEntry, Storage};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// The single active session: domain data, the base timetable it owns, and
/// the what-if state. Solving happens with the session lock held, so at most
/// one solve runs at a time.
struct Session {
    storage: Storage,
    config: SchoolConfig,
    teachers: Vec<Teacher>,
    classes: Vec<Class>,
    priority_configs: Vec<ClassPriorityConfig>,
    base_timetable: Option<Timetable>,
    scenario_state: ScenarioState,
}

impl Session {
    fn load(storage: Storage) -> Self {
        let config = storage
            .load_config()
            .unwrap_or_else(|e| {
                warn!("Could not load config: {e}");
                None
            })
            .unwrap_or_default();
        let teachers = storage.load_teachers().unwrap_or_else(|e| {
            warn!("Could not load teachers: {e}");
            Vec::new()
        });
        let classes = storage.load_classes().unwrap_or_else(|e| {
            warn!("Could not load classes: {e}");
            Vec::new()
        });
        let priority_configs = storage.load_priority_configs().unwrap_or_else(|e| {
            warn!("Could not load priority configs: {e}");
            Vec::new()
        });
        let base_timetable = storage.load_base_timetable().unwrap_or_else(|e| {
            warn!("Could not load base timetable: {e}");
            None
        });
        let scenario_state = storage
            .load_scenario_state()
            .unwrap_or_else(|e| {
                warn!("Could not load scenario state: {e}");
                None
            })
            .unwrap_or_default();
        info!(
            "Session loaded: {} teachers, {} classes, base timetable {}.",
            teachers.len(),
            classes.len(),
            if base_timetable.is_some() { "present" } else { "absent" }
        );
        Self {
            storage,
            config,
            teachers,
            classes,
            priority_configs,
            base_timetable,
            scenario_state,
        }
    }

    /// Best-effort activity log; the engine never depends on it.
    fn record(&self, action: &str, target: &str, summary: &str, details: &str) {
        let entry = HistoryEntry::new(action, target, summary, details);
        if let Err(e) = self.storage.append_history(&entry) {
            warn!("Could not append history entry: {e}");
        }
    }
}

#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session>>,
}

type ApiError = (StatusCode, String);

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct DomainPayload {
    config: SchoolConfig,
    teachers: Vec<Teacher>,
    classes: Vec<Class>,
    #[serde(default)]
    priority_configs: Vec<ClassPriorityConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimetableResponse {
    class_timetable: Timetable,
    teacher_view: TeacherView,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RotationsRequest {
    count: usize,
}

async fn put_domain(
    State(state): State<AppState>,
    Json(payload): Json<DomainPayload>,
) -> Result<StatusCode, ApiError> {
    let mut session = state.session.lock().unwrap();
    session.storage.save_config(&payload.config).map_err(internal)?;
    session.storage.save_teachers(&payload.teachers).map_err(internal)?;
    session.storage.save_classes(&payload.classes).map_err(internal)?;
    session
        .storage
        .save_priority_configs(&payload.priority_configs)
        .map_err(internal)?;
    session.config = payload.config;
    session.teachers = payload.teachers;
    session.classes = payload.classes;
    session.priority_configs = payload.priority_configs;
    session.record(
        "edit",
        "Domain",
        &format!(
            "Domain replaced: {} teachers, {} classes",
            session.teachers.len(),
            session.classes.len()
        ),
        "",
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn get_domain(State(state): State<AppState>) -> Json<DomainPayload> {
    let session = state.session.lock().unwrap();
    Json(DomainPayload {
        config: session.config.clone(),
        teachers: session.teachers.clone(),
        classes: session.classes.clone(),
        priority_configs: session.priority_configs.clone(),
    })
}

async fn load_demo(State(state): State<AppState>) -> Result<Json<DomainPayload>, ApiError> {
    let mut session = state.session.lock().unwrap();
    session.config = demo::demo_config();
    session.teachers = demo::demo_teachers();
    session.classes = demo::demo_classes();
    session.priority_configs = demo::demo_priority_configs();
    session.base_timetable = None;
    session.storage.save_config(&session.config).map_err(internal)?;
    session.storage.save_teachers(&session.teachers).map_err(internal)?;
    session.storage.save_classes(&session.classes).map_err(internal)?;
    session
        .storage
        .save_priority_configs(&session.priority_configs)
        .map_err(internal)?;
    session.storage.clear_base_timetable().map_err(internal)?;
    session.record("demo", "Demo Data", "Loaded demo teachers and classes", "");
    Ok(Json(DomainPayload {
        config: session.config.clone(),
        teachers: session.teachers.clone(),
        classes: session.classes.clone(),
        priority_configs: session.priority_configs.clone(),
    }))
}

async fn solve_handler(
    State(state): State<AppState>,
) -> Result<Json<TimetableResponse>, ApiError> {
    let mut session = state.session.lock().unwrap();
    if session.teachers.is_empty() {
        return Err((StatusCode::CONFLICT, "Add at least one teacher first".into()));
    }
    if session.classes.is_empty() {
        return Err((StatusCode::CONFLICT, "Add at least one class first".into()));
    }

    match solve_timetable(
        &session.config,
        &session.teachers,
        &session.classes,
        &session.priority_configs,
    ) {
        Ok(timetable) => {
            if let Err(e) = session.storage.save_base_timetable(&timetable) {
                warn!("Could not persist base timetable: {e}");
            }
            session.record("generate", "Timetable", "Generated clash-free timetable", "");
            let teacher_view = invert_to_teacher_view(&timetable);
            session.base_timetable = Some(timetable.clone());
            Ok(Json(TimetableResponse {
                class_timetable: timetable,
                teacher_view,
            }))
        }
        Err(e @ SolveError::NoSolution) => {
            session.record("generate", "Timetable", "Solve returned no solution", "");
            Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
        Err(e @ SolveError::InvalidDomain(_)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

async fn get_timetable(
    State(state): State<AppState>,
) -> Result<Json<TimetableResponse>, ApiError> {
    let session = state.session.lock().unwrap();
    match &session.base_timetable {
        Some(timetable) => Ok(Json(TimetableResponse {
            class_timetable: timetable.clone(),
            teacher_view: invert_to_teacher_view(timetable),
        })),
        None => Err((StatusCode::NOT_FOUND, "No timetable generated yet".into())),
    }
}

async fn rotations_handler(
    State(state): State<AppState>,
    Json(request): Json<RotationsRequest>,
) -> Result<Json<Vec<Timetable>>, ApiError> {
    let session = state.session.lock().unwrap();
    let Some(base) = &session.base_timetable else {
        return Err((StatusCode::CONFLICT, "Generate a timetable first".into()));
    };
    let rotations = generate_rotations(
        base,
        &session.config,
        &session.teachers,
        &session.classes,
        request.count,
    );
    Ok(Json(rotations))
}

/// Manual edit of one slot, followed by the bounded repair loop. The edited
/// schedule is kept (violations included, reported) unless a repair pass
/// fails outright, in which case the previous schedule stays in place.
async fn put_slot(
    State(state): State<AppState>,
    Json(lesson): Json<Lesson>,
) -> Result<Json<RepairOutcome>, ApiError> {
    let mut session = state.session.lock().unwrap();
    if lesson.day >= session.config.days.len()
        || lesson.period >= session.config.periods_per_day
        || session.config.is_break(lesson.period)
    {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("day {} period {} is not assignable", lesson.day, lesson.period),
        ));
    }
    let Some(base) = session.base_timetable.clone() else {
        return Err((StatusCode::CONFLICT, "Generate a timetable first".into()));
    };

    let summary = format!("Manual edit: {lesson}");
    let candidate = base.with_lesson(lesson);
    let outcome = repair_with_rollback(
        candidate,
        &base,
        &session.config,
        &session.teachers,
        &session.classes,
    );
    if outcome.status != RepairStatus::RolledBack {
        if let Err(e) = session.storage.save_base_timetable(&outcome.timetable) {
            warn!("Could not persist edited timetable: {e}");
        }
        session.base_timetable = Some(outcome.timetable.clone());
    }
    session.record(
        "edit",
        "Slot",
        &summary,
        &format!("{:?}, {} violations remain", outcome.status, outcome.remaining.len()),
    );
    Ok(Json(outcome))
}

async fn put_scenarios(
    State(state): State<AppState>,
    Json(scenario_state): Json<ScenarioState>,
) -> Result<StatusCode, ApiError> {
    let mut session = state.session.lock().unwrap();
    session
        .storage
        .save_scenario_state(&scenario_state)
        .map_err(internal)?;
    session.scenario_state = scenario_state;
    session.record("scenario", "What-If", "Scenario state updated", "");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_scenarios(State(state): State<AppState>) -> Json<ScenarioState> {
    let session = state.session.lock().unwrap();
    Json(session.scenario_state.clone())
}

/// The base timetable with all active scenarios applied. Reads only; the base
/// is never modified here.
async fn get_resolved(State(state): State<AppState>) -> Result<Json<Timetable>, ApiError> {
    let session = state.session.lock().unwrap();
    let Some(base) = &session.base_timetable else {
        return Err((StatusCode::CONFLICT, "Generate a timetable first".into()));
    };
    let resolved = apply_scenarios(
        base,
        &session.config,
        &session.teachers,
        &session.classes,
        &session.scenario_state,
    );
    Ok(Json(resolved))
}

async fn get_violations(State(state): State<AppState>) -> Result<Json<Vec<crate::check::Violation>>, ApiError> {
    let session = state.session.lock().unwrap();
    let Some(base) = &session.base_timetable else {
        return Err((StatusCode::CONFLICT, "Generate a timetable first".into()));
    };
    Ok(Json(verify_timetable(
        base,
        &session.config,
        &session.teachers,
        &session.classes,
    )))
}

async fn get_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let session = state.session.lock().unwrap();
    session.storage.load_history().map(Json).map_err(internal)
}

pub async fn run_server() {
    let data_dir =
        std::env::var("TIMETABLE_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let storage = Storage::new(&data_dir).unwrap();
    let session = Session::load(storage);
    let state = AppState {
        session: Arc::new(Mutex::new(session)),
    };

    let app = Router::new()
        .route("/v1/domain", put(put_domain).get(get_domain))
        .route("/v1/domain/demo", post(load_demo))
        .route("/v1/timetable/solve", post(solve_handler))
        .route("/v1/timetable", get(get_timetable))
        .route("/v1/timetable/rotations", post(rotations_handler))
        .route("/v1/timetable/slot", put(put_slot))
        .route("/v1/timetable/resolved", get(get_resolved))
        .route("/v1/timetable/violations", get(get_violations))
        .route("/v1/scenarios", put(put_scenarios).get(get_scenarios))
        .route("/v1/history", get(get_history))
        .with_state(state);

    let addr =
        std::env::var("TIMETABLE_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    println!("Server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
