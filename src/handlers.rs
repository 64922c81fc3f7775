use crate::errors::{AppError, Toast};
use crate::gesture::apply_tick;
use crate::models::{
    FrameRequest, GesturePhase, GestureRequest, GoalRequest, IntakeRequest, NewProfileRequest,
    NewReminderRequest, NotificationView, Parameters, ProfileId, ReminderCheckResponse, ReminderId,
    SettingsResponse, StatsResponse, TodayResponse, ViewportRequest, WaveResponse,
};
use crate::gauge::{frame_delta_from_millis, Dimensions};
use crate::state::{AppData, AppState};
use crate::storage::persist_data;
use crate::tracker::Tracker;
use crate::ui::render_index;
use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
    Json,
};
use chrono::Local;
use tracing::{debug, error, info};

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    tracker.check_rollover(Local::now());
    save(&state, tracker).await?;
    Ok(Html(render_index(
        &tracker.today(),
        &tracker.profiles_by_use(),
        tracker.parameters(),
    )))
}

pub async fn gauge_svg(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let svg = state.lock_gauge()?.surface.document();
    Ok(svg_response(svg))
}

/// Advances the gauge by one display refresh of the page and returns the new
/// frame.
pub async fn gauge_frame(
    State(state): State<AppState>,
    payload: Option<Json<FrameRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    let delta = frame_delta_from_millis(payload.delta_ms);
    let invoked = state.lock_frames()?.advance(1, delta);
    if invoked == 0 {
        return Err(AppError::internal_message("gauge frame loop stopped"));
    }
    let svg = state.lock_gauge()?.surface.document();
    Ok(svg_response(svg))
}

pub async fn gauge_viewport(
    State(state): State<AppState>,
    Json(payload): Json<ViewportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let dims = Dimensions::from_viewport(payload.width, payload.height, payload.dpr);
    let mut gauge = state.lock_gauge()?;
    gauge.resize(dims);
    debug!(width = dims.width, height = dims.height, "gauge resized");
    Ok(svg_response(gauge.surface.document()))
}

pub async fn gauge_gesture(
    State(state): State<AppState>,
    Json(payload): Json<GestureRequest>,
) -> Result<Json<WaveResponse>, AppError> {
    let tick = {
        let mut slide = state.slide.lock().await;
        match payload.phase {
            GesturePhase::Start => {
                slide.start(payload.x, payload.y);
                None
            }
            GesturePhase::Move => slide.movement(payload.x, payload.y),
            GesturePhase::End => {
                slide.end();
                None
            }
        }
    };

    let mut gauge = state.lock_gauge()?;
    if let Some(tick) = tick {
        apply_tick(gauge.engine.wave_mut(), tick);
    }
    let wave = gauge.engine.wave();
    Ok(Json(WaveResponse {
        amplitude: wave.amplitude,
        speed: wave.speed,
    }))
}

pub async fn get_today(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    tracker.check_rollover(Local::now());
    save(&state, tracker).await?;
    Ok(Json(tracker.today()))
}

pub async fn add_intake(
    State(state): State<AppState>,
    Json(payload): Json<IntakeRequest>,
) -> Result<Json<TodayResponse>, AppError> {
    let now = Local::now();
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    let event = match payload.profile_id {
        Some(profile_id) => tracker.quick_add(profile_id, now)?,
        None => {
            let raw = payload.amount.map(|amount| amount.to_text());
            tracker.add_custom(raw.as_deref(), now)?
        }
    };
    info!(amount = event.amount, total = tracker.ledger().cumulative_intake, "intake recorded");

    save(&state, tracker).await?;
    Ok(Json(tracker.today()))
}

pub async fn undo(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    if let Some(event) = tracker.undo_last(Local::now()) {
        info!(amount = event.amount, "intake undone");
    }
    save(&state, tracker).await?;
    Ok(Json(tracker.today()))
}

pub async fn undo_all(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    let removed = tracker.undo_all(Local::now());
    info!(removed, "all intake for today undone");
    save(&state, tracker).await?;
    Ok(Json(tracker.today()))
}

pub async fn get_parameters(State(state): State<AppState>) -> Json<Parameters> {
    let data = state.data.lock().await;
    Json(data.tracker.parameters().clone())
}

pub async fn set_goal(
    State(state): State<AppState>,
    Json(payload): Json<GoalRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    let raw = payload.goal.map(|goal| goal.to_text());
    let goal = tracker.set_goal(raw.as_deref())?;
    info!(goal, "goal updated");
    settings_saved(&state, tracker).await
}

pub async fn add_profile(
    State(state): State<AppState>,
    Json(payload): Json<NewProfileRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    let raw_amount = payload.amount.map(|amount| amount.to_text());
    let profile = tracker.add_profile(
        payload.label.as_deref(),
        payload.icon,
        raw_amount.as_deref(),
    )?;
    info!(id = %profile.id, label = %profile.label, "profile added");
    settings_saved(&state, tracker).await
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<SettingsResponse>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    let removed = tracker.delete_profile(ProfileId(id))?;
    info!(id = %removed.id, "profile deleted");
    settings_saved(&state, tracker).await
}

pub async fn add_reminder(
    State(state): State<AppState>,
    Json(payload): Json<NewReminderRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    let raw_amount = payload.amount.map(|amount| amount.to_text());
    let rule = tracker.add_reminder(raw_amount.as_deref(), payload.time.as_deref())?;
    info!(id = %rule.id, amount = rule.threshold_amount, "reminder added");
    settings_saved(&state, tracker).await
}

pub async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<SettingsResponse>, AppError> {
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    let removed = tracker.delete_reminder(ReminderId(id))?;
    info!(id = %removed.id, "reminder deleted");
    settings_saved(&state, tracker).await
}

/// Called by the page on load and whenever it regains focus.
pub async fn evaluate_reminders(
    State(state): State<AppState>,
) -> Result<Json<ReminderCheckResponse>, AppError> {
    let mut data = state.data.lock().await;
    let AppData { tracker, reminders } = &mut *data;
    tracker.evaluate_reminders(reminders, Local::now());
    save(&state, tracker).await?;

    let notification = reminders
        .notifier()
        .current()
        .map(|(id, notification)| NotificationView {
            id,
            notification: notification.clone(),
        });
    let closed = reminders.notifier_mut().take_closed();
    Ok(Json(ReminderCheckResponse {
        notification,
        closed,
    }))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let now = Local::now();
    let mut data = state.data.lock().await;
    let tracker = &mut data.tracker;
    tracker.check_rollover(now);
    save(&state, tracker).await?;
    Ok(Json(tracker.stats_summary(now)))
}

async fn settings_saved(
    state: &AppState,
    tracker: &mut Tracker,
) -> Result<Json<SettingsResponse>, AppError> {
    save(state, tracker).await?;
    Ok(Json(SettingsResponse {
        toast: Toast::updated(),
        parameters: tracker.parameters().clone(),
    }))
}

/// Flushes the store to disk if the last operation changed it.
async fn save(state: &AppState, tracker: &mut Tracker) -> Result<(), AppError> {
    if tracker.take_dirty() {
        if let Err(err) = persist_data(&state.data_path, tracker.store()).await {
            error!("failed to persist state: {}", err.message);
            return Err(err);
        }
    }
    Ok(())
}

fn svg_response(svg: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        svg,
    )
}
