//! Row types as they come out of SQLite. Joined rows carry the owner's
//! username so handlers do not need a second lookup.

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Clone)]
pub struct ProfileRow {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub coins: i64,
    pub streak: u32,
    pub avatar: String,
    pub last_updated: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct BadgeRow {
    pub user_id: String,
    pub weeks: u32,
    pub color: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct DayRow {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub day: NaiveDate,
    pub activity: i64,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct RewardRow {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub price: i64,
    pub img: String,
    pub title: String,
    pub created_at: String,
}
