//! Transactional entry points for everything that moves coins.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;
use tracing::{debug, info};

use habify_engine::{Badge, Outcome, ResubmitPolicy, Standing, Submission, Transition};

use crate::Database;
use crate::models::RewardRow;
use crate::queries::{
    OptionalExt, ensure_badge, ensure_profile, query_badge, query_profile, reward_from_row,
};

/// Business failures callers are expected to branch on. They travel inside
/// `anyhow::Error`; recover them with `downcast_ref`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("user not found")]
    UnknownUser,
    #[error("insufficient coins: balance {balance}, price {price}")]
    InsufficientFunds { balance: i64, price: i64 },
}

/// Result of a daily submission.
#[derive(Debug, Clone)]
pub struct DayReceipt {
    pub day: NaiveDate,
    pub activity: i64,
    pub notes: String,
    pub outcome: Outcome,
}

impl Database {
    /// Record `activity` for `today` and apply the streak rules, all in one
    /// transaction. Creates the profile and badge if they are missing.
    pub fn submit_day(
        &self,
        user_id: &str,
        activity: i64,
        notes: &str,
        today: NaiveDate,
        policy: ResubmitPolicy,
    ) -> Result<DayReceipt> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_user(&tx, user_id)?;

            ensure_profile(&tx, user_id, today)?;
            ensure_badge(&tx, user_id)?;
            let standing = load_standing(&tx, user_id)?;

            let previous_activity = upsert_day(&tx, user_id, today, activity, notes)?;
            let total_days: i64 = tx.query_row(
                "SELECT COUNT(*) FROM days WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;

            let submission = Submission {
                activity,
                today,
                total_days: total_days.max(0) as u64,
                previous_activity,
            };
            let outcome = habify_engine::apply(standing, &submission, policy);

            if outcome.is_mutation() {
                store_standing(&tx, user_id, &outcome.standing)?;
            }
            tx.commit()?;

            match outcome.transition {
                Transition::Reset { penalty } => {
                    info!(user_id, %today, penalty, "streak reset");
                }
                Transition::Advance { earned, week_completed } => {
                    info!(
                        user_id,
                        %today,
                        earned,
                        streak = outcome.standing.streak,
                        week_completed,
                        "streak advanced"
                    );
                }
                Transition::Unscored | Transition::AlreadyScored => {
                    debug!(user_id, %today, activity, transition = ?outcome.transition, "day logged");
                }
            }

            Ok(DayReceipt {
                day: today,
                activity,
                notes: notes.to_string(),
                outcome,
            })
        })
    }

    /// Buy a shop item. Fails with [`LedgerError::InsufficientFunds`] and
    /// writes nothing when the balance does not cover `price`.
    pub fn redeem_reward(&self, user_id: &str, price: i64, title: &str, img: &str) -> Result<(RewardRow, i64)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let balance: i64 = tx
                .query_row("SELECT coins FROM profiles WHERE user_id = ?1", [user_id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or(LedgerError::UnknownUser)?;

            if balance < price {
                return Err(LedgerError::InsufficientFunds { balance, price }.into());
            }

            tx.execute(
                "UPDATE profiles SET coins = coins - ?2 WHERE user_id = ?1",
                rusqlite::params![user_id, price],
            )?;
            tx.execute(
                "INSERT INTO rewards (user_id, price, img, title) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, price, img, title],
            )?;
            let reward_id = tx.last_insert_rowid();
            let reward = tx.query_row(
                "SELECT r.id, r.user_id, u.username, r.price, r.img, r.title, r.created_at
                 FROM rewards r
                 JOIN users u ON r.user_id = u.id
                 WHERE r.id = ?1",
                [reward_id],
                reward_from_row,
            )?;
            tx.commit()?;

            let remaining = balance - price;
            info!(user_id, price, title, remaining, "reward redeemed");
            Ok((reward, remaining))
        })
    }
}

fn require_user(conn: &Connection, user_id: &str) -> Result<()> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id], |row| row.get(0))
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(LedgerError::UnknownUser.into()),
    }
}

fn load_standing(conn: &Connection, user_id: &str) -> Result<Standing> {
    let profile = query_profile(conn, user_id)?.ok_or(LedgerError::UnknownUser)?;
    let badge = query_badge(conn, user_id)?.ok_or(LedgerError::UnknownUser)?;
    Ok(Standing {
        coins: profile.coins,
        streak: profile.streak,
        last_updated: profile.last_updated,
        badge: Badge {
            weeks: badge.weeks,
            color: badge.color.parse()?,
            multiplier: badge.multiplier,
        },
    })
}

fn store_standing(conn: &Connection, user_id: &str, standing: &Standing) -> Result<()> {
    conn.execute(
        "UPDATE profiles SET coins = ?2, streak = ?3, last_updated = ?4 WHERE user_id = ?1",
        rusqlite::params![user_id, standing.coins, standing.streak, standing.last_updated],
    )?;
    conn.execute(
        "UPDATE streak_badges SET weeks = ?2, color = ?3, multiplier = ?4 WHERE user_id = ?1",
        rusqlite::params![
            user_id,
            standing.badge.weeks,
            standing.badge.color.as_str(),
            standing.badge.multiplier
        ],
    )?;
    Ok(())
}

/// Overwrite or insert the row for `(user_id, day)`. Returns the activity the
/// row held before, if it existed.
fn upsert_day(conn: &Connection, user_id: &str, day: NaiveDate, activity: i64, notes: &str) -> Result<Option<i64>> {
    let existing: Option<(i64, i64)> = conn
        .query_row(
            "SELECT id, activity FROM days WHERE user_id = ?1 AND day = ?2",
            rusqlite::params![user_id, day],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match existing {
        Some((id, previous)) => {
            conn.execute(
                "UPDATE days SET activity = ?2, notes = ?3 WHERE id = ?1",
                rusqlite::params![id, activity, notes],
            )?;
            Ok(Some(previous))
        }
        None => {
            conn.execute(
                "INSERT INTO days (user_id, day, activity, notes) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, day, activity, notes],
            )?;
            Ok(None)
        }
    }
}
