use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};

use habify_types::api::{
    Claims, DayLogData, DayLogEntry, DayLogRequest, DayLogResponse, ProfileSummary,
    SubmissionEntry, SubmissionsResponse,
};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

const MAX_NOTES_LEN: usize = 250;

/// POST /api/daylog/: record today's activity and apply the streak rules.
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<DayLogRequest>, JsonRejection>,
) -> Result<Json<DayLogResponse>, ApiError> {
    let Json(req) = payload?;
    let activity = req
        .activity
        .ok_or_else(|| ApiError::validation("Activity value is required"))?;
    if req.notes.chars().count() > MAX_NOTES_LEN {
        return Err(ApiError::validation(format!(
            "Notes must be at most {MAX_NOTES_LEN} characters"
        )));
    }

    let today = state.clock.today();
    let policy = state.resubmit_policy;
    let user_id = claims.sub.to_string();
    let notes = req.notes;
    let receipt = blocking(&state, move |db| {
        db.submit_day(&user_id, activity, &notes, today, policy)
    })
    .await?;

    let standing = receipt.outcome.standing;
    Ok(Json(DayLogResponse {
        success: true,
        message: "Day log saved successfully".into(),
        data: DayLogData {
            day: receipt.day,
            activity: receipt.activity,
            notes: receipt.notes,
            coins_earned: receipt.outcome.coins_earned(),
            current_coins: standing.coins,
            current_streak: standing.streak,
            multiplier: standing.badge.multiplier,
            color: standing.badge.color,
            weeks: standing.badge.weeks,
        },
    }))
}

/// GET /api/log/: the caller's day logs, newest first.
pub async fn list_log(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<DayLogEntry>>, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.list_days(&user_id)).await?;

    let entries = rows
        .into_iter()
        .map(|row| DayLogEntry {
            user: row.username,
            day: row.day,
            activity: row.activity,
            notes: row.notes,
        })
        .collect();
    Ok(Json(entries))
}

/// GET /api/submissions/: calendar view plus a summary of the caller's profile.
pub async fn submissions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SubmissionsResponse>, ApiError> {
    let user_id = claims.sub.to_string();
    let (rows, profile, badge) = blocking(&state, move |db| {
        Ok((
            db.list_days(&user_id)?,
            db.get_profile(&user_id)?,
            db.get_badge(&user_id)?,
        ))
    })
    .await?;

    let submissions = rows
        .into_iter()
        .map(|row| SubmissionEntry {
            timestamp: format!("{}T00:00:00.000Z", row.day),
            day: row.day,
            activity: row.activity,
            notes: row.notes,
            user: claims.username.clone(),
        })
        .collect();

    let profile = profile.map(|p| ProfileSummary {
        coins: p.coins,
        streak: p.streak,
        multiplier: badge.map_or(1.0, |b| b.multiplier),
    });

    Ok(Json(SubmissionsResponse {
        success: true,
        submissions,
        profile,
    }))
}
