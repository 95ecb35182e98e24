use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use habify_engine::BadgeColor;

// -- JWT Claims --

/// Session token claims. `jti` identifies the token so logout can revoke it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub jti: String,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// -- Accounts --

/// Sign-up forms send extra fields (password confirmation and the like), so
/// unknown keys are ignored here.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Returned by both registration and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub success: bool,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotPasswordResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub new_password: String,
}

// -- Day logs --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DayLogRequest {
    pub activity: Option<i64>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DayLogData {
    pub day: NaiveDate,
    pub activity: i64,
    pub notes: String,
    pub coins_earned: i64,
    pub current_coins: i64,
    pub current_streak: u32,
    pub multiplier: f64,
    pub color: BadgeColor,
    pub weeks: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DayLogResponse {
    pub success: bool,
    pub message: String,
    pub data: DayLogData,
}

/// One row of `GET /log/`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DayLogEntry {
    pub user: String,
    pub day: NaiveDate,
    pub activity: i64,
    pub notes: String,
}

/// One row of the calendar view in `GET /submissions/`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionEntry {
    pub day: NaiveDate,
    pub activity: i64,
    pub notes: String,
    pub user: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub coins: i64,
    pub streak: u32,
    pub multiplier: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionsResponse {
    pub success: bool,
    pub submissions: Vec<SubmissionEntry>,
    pub profile: Option<ProfileSummary>,
}

// -- Profiles --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub id: i64,
    pub user: String,
    pub streak: u32,
    pub coins: i64,
    pub avatar: String,
    pub last_updated: NaiveDate,
}

// -- Rewards --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuyRewardRequest {
    /// Username of the buyer. Optional; when present it must be the caller.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    pub title: String,
    pub img: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RewardEntry {
    pub id: i64,
    pub user: String,
    pub price: i64,
    pub img: String,
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BuyRewardResponse {
    pub success: bool,
    pub reward: RewardEntry,
    pub current_coins: i64,
}
