use crate::bookmark::{Bookmark, BookmarkView, load_bookmark, save_bookmark};
use crate::errors::AppError;
use crate::ledger::Ledger;
use crate::models::{
    EventKind, FastingRequest, HeatmapCell, HeatmapQuery, SessionRequest, SessionResponse,
    StatsResponse, ToggleRequest, TodayResponse,
};
use crate::prayer::{PrayerSummary, minute_of_day};
use crate::state::{AppState, Session};
use crate::stats::{
    HEATMAP_DAYS, MAX_HEATMAP_DAYS, build_heatmap, build_stats_at, completion_percent, date_key,
    default_heatmap_start, local_today, parse_date,
};
use crate::sync::{SyncError, merge_remote};
use crate::ui::render_index;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{
        Html, Redirect,
        sse::{Event, KeepAlive, Sse},
    },
};
use chrono::{Local, NaiveDate};
use futures::Stream;
use futures::stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let ledger = state.ledger.lock().await;
    Html(render_index(&today_view(local_today(), &ledger)))
}

pub async fn get_today(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let ledger = state.ledger.lock().await;
    Ok(Json(today_view(local_today(), &ledger)))
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<TodayResponse>, AppError> {
    let task_id = payload.task_id.trim();
    if task_id.is_empty() {
        return Err(AppError::bad_request("task_id must not be empty"));
    }

    let response = apply_toggle(&state, task_id).await?;
    Ok(Json(response))
}

pub async fn toggle_task_form(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Redirect, AppError> {
    apply_toggle(&state, task_id.trim()).await?;
    Ok(Redirect::to("/"))
}

pub async fn set_fasting(
    State(state): State<AppState>,
    Json(payload): Json<FastingRequest>,
) -> Result<Json<TodayResponse>, AppError> {
    let today = local_today();
    let date = match payload.date.as_deref() {
        Some(value) => require_date(value)?,
        None => today,
    };
    if payload.fasted && date > today {
        return Err(AppError::bad_request("cannot mark a future date as fasted"));
    }

    let mut ledger = state.ledger.lock().await;
    ledger.set_fasting(today, date, payload.fasted);
    state.commit(&ledger, EventKind::FastingChanged).await?;
    Ok(Json(today_view(today, &ledger)))
}

pub async fn get_heatmap(
    State(state): State<AppState>,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<Vec<HeatmapCell>>, AppError> {
    let today = local_today();
    let days = query.days.unwrap_or(HEATMAP_DAYS);
    if days == 0 || days > MAX_HEATMAP_DAYS {
        return Err(AppError::bad_request(format!(
            "days must be between 1 and {MAX_HEATMAP_DAYS}"
        )));
    }
    let start = match query.start.as_deref() {
        Some(value) => require_date(value)?,
        None => default_heatmap_start(today),
    };

    let ledger = state.ledger.lock().await;
    Ok(Json(build_heatmap(today, &ledger, start, days)))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let ledger = state.ledger.lock().await;
    Ok(Json(build_stats_at(local_today(), &ledger)))
}

pub async fn get_prayer_times(
    State(state): State<AppState>,
) -> Result<Json<PrayerSummary>, AppError> {
    let now = Local::now();
    let data = state
        .prayer
        .timings(now)
        .await
        .map_err(AppError::bad_gateway)?;
    Ok(Json(PrayerSummary::at(data, minute_of_day(now))))
}

pub async fn get_bookmark(
    State(state): State<AppState>,
) -> Result<Json<BookmarkView>, AppError> {
    let ledger = state.ledger.lock().await;
    load_bookmark(ledger.store())
        .map(|bookmark| Json(bookmark.into()))
        .ok_or_else(|| AppError::not_found("no bookmark saved"))
}

pub async fn put_bookmark(
    State(state): State<AppState>,
    Json(bookmark): Json<Bookmark>,
) -> Result<Json<BookmarkView>, AppError> {
    bookmark.validate().map_err(AppError::bad_request)?;

    let mut ledger = state.ledger.lock().await;
    save_bookmark(ledger.store_mut(), &bookmark);
    state.commit(&ledger, EventKind::Bookmark).await?;
    Ok(Json(bookmark.into()))
}

/// Signs a user in and merges their remote ledger once per session.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user_id = payload.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::bad_request("user_id must not be empty"));
    }
    let Some(remote) = state.remote.clone() else {
        return Err(AppError::unavailable("remote sync is not configured"));
    };

    if let Some(session) = state.session().await {
        if session.user_id == user_id && session.synced {
            return Ok(Json(SessionResponse {
                user_id: Some(user_id),
                synced: true,
            }));
        }
    }

    let merged = match merge_remote(&state, remote.as_ref(), &user_id, local_today()).await {
        Ok(document) => Some(document),
        Err(SyncError::Storage(err)) => return Err(err.into()),
        Err(err) => {
            warn!(user_id = %user_id, "remote merge failed, continuing with local data: {err}");
            None
        }
    };
    let synced = merged.is_some();
    info!(user_id = %user_id, synced, "session started");
    state
        .begin_session(
            Session {
                user_id: user_id.clone(),
                synced,
            },
            merged.as_ref(),
        )
        .await;

    Ok(Json(SessionResponse {
        user_id: Some(user_id),
        synced,
    }))
}

pub async fn logout(State(state): State<AppState>) -> Json<SessionResponse> {
    state.set_session(None).await;
    Json(SessionResponse {
        user_id: None,
        synced: false,
    })
}

pub async fn reset(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let today = local_today();
    let mut ledger = state.ledger.lock().await;
    ledger.reset();
    state.commit(&ledger, EventKind::Reset).await?;
    info!("ledger reset");
    Ok(Json(today_view(today, &ledger)))
}

/// Server-sent stream of committed ledger changes.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let receiver = state.subscribe();
    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let sse = Event::default().event("ledger").json_data(&event);
                    return Some((sse, receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn apply_toggle(state: &AppState, task_id: &str) -> Result<TodayResponse, AppError> {
    let today = local_today();
    let mut ledger = state.ledger.lock().await;
    if ledger.toggle_task(today, task_id) {
        state.commit(&ledger, EventKind::TaskToggled).await?;
    }
    Ok(today_view(today, &ledger))
}

fn today_view(today: NaiveDate, ledger: &Ledger) -> TodayResponse {
    let tasks = ledger.today_tasks(today);
    TodayResponse {
        date: date_key(today),
        completion_percent: completion_percent(&tasks),
        tasks,
        fasting_today: ledger.fasting_today(today),
        streak: ledger.streak(today),
    }
}

fn require_date(value: &str) -> Result<NaiveDate, AppError> {
    parse_date(value).ok_or_else(|| AppError::bad_request("date must be formatted YYYY-MM-DD"))
}
