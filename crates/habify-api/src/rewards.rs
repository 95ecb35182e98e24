use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use habify_db::models::RewardRow;
use habify_types::api::{BuyRewardRequest, BuyRewardResponse, Claims, RewardEntry};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

/// Price of a shop item when the client does not name one.
pub const DEFAULT_PRICE: i64 = 350;
const MAX_TITLE_LEN: usize = 50;
const MAX_IMG_LEN: usize = 999;

fn entry(row: RewardRow) -> RewardEntry {
    RewardEntry {
        id: row.id,
        user: row.username,
        price: row.price,
        img: row.img,
        title: row.title,
    }
}

/// POST /buyreward/: debit the caller and record the purchase.
pub async fn buy_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<BuyRewardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    if req.user.as_deref().is_some_and(|u| u != claims.username) {
        return Err(ApiError::validation("Rewards can only be bought for your own account"));
    }
    let price = req.price.unwrap_or(DEFAULT_PRICE);
    if price < 0 {
        return Err(ApiError::validation("Price cannot be negative"));
    }
    let title = req.title.trim().to_string();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation(format!(
            "Title must be 1 to {MAX_TITLE_LEN} characters"
        )));
    }
    if req.img.len() > MAX_IMG_LEN {
        return Err(ApiError::validation("Image reference is too long"));
    }

    let user_id = claims.sub.to_string();
    let img = req.img;
    let (reward, current_coins) = blocking(&state, move |db| {
        db.redeem_reward(&user_id, price, &title, &img)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(BuyRewardResponse {
            success: true,
            reward: entry(reward),
            current_coins,
        }),
    ))
}

/// GET /api/rewards/: every purchase by every user.
pub async fn list_rewards(State(state): State<AppState>) -> Result<Json<Vec<RewardEntry>>, ApiError> {
    let rows = blocking(&state, |db| db.list_rewards()).await?;
    Ok(Json(rows.into_iter().map(entry).collect()))
}

/// GET /api/rewards/mine/: the caller's inventory.
pub async fn my_rewards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<RewardEntry>>, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.list_rewards_for_user(&user_id)).await?;
    Ok(Json(rows.into_iter().map(entry).collect()))
}
