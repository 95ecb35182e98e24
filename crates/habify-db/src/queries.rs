use crate::Database;
use crate::models::{BadgeRow, DayRow, NewUser, ProfileRow, RewardRow, UserRow};
use anyhow::Result;
use chrono::NaiveDate;
use habify_engine::Badge;
use rusqlite::{Connection, Row, TransactionBehavior};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password, created_at";

impl Database {
    // -- Users --

    /// Insert a user together with their starting profile and badge.
    pub fn create_user(&self, user: &NewUser<'_>, registered_on: NaiveDate) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO users (id, username, email, first_name, last_name, password)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.password_hash
                ],
            )?;
            ensure_profile(&tx, user.id, registered_on)?;
            ensure_badge(&tx, user.id)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    // -- Profiles and badges --

    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, user_id))
    }

    pub fn get_badge(&self, user_id: &str) -> Result<Option<BadgeRow>> {
        self.with_conn(|conn| query_badge(conn, user_id))
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.user_id, u.username, p.coins, p.streak, p.avatar, p.last_updated
                 FROM profiles p
                 JOIN users u ON p.user_id = u.id
                 ORDER BY p.id",
            )?;
            let rows = stmt
                .query_map([], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Day logs --

    /// A user's day logs, newest first.
    pub fn list_days(&self, user_id: &str) -> Result<Vec<DayRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.id, d.user_id, u.username, d.day, d.activity, d.notes
                 FROM days d
                 JOIN users u ON d.user_id = u.id
                 WHERE d.user_id = ?1
                 ORDER BY d.day DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(DayRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        day: row.get(3)?,
                        activity: row.get(4)?,
                        notes: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Rewards --

    pub fn list_rewards(&self) -> Result<Vec<RewardRow>> {
        self.with_conn(|conn| query_rewards(conn, None))
    }

    pub fn list_rewards_for_user(&self, user_id: &str) -> Result<Vec<RewardRow>> {
        self.with_conn(|conn| query_rewards(conn, Some(user_id)))
    }

    // -- Sessions --

    pub fn revoke_token(&self, jti: &str, expires_at: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?1, ?2)",
                rusqlite::params![jti, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM revoked_tokens WHERE jti = ?1", [jti], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Drop revocations and reset tokens that can no longer be presented.
    pub fn prune_expired(&self, now: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let revoked = conn.execute("DELETE FROM revoked_tokens WHERE expires_at < ?1", [now])?;
            let resets = conn.execute(
                "DELETE FROM password_resets WHERE expires_at < ?1 OR used = 1",
                [now],
            )?;
            Ok(revoked + resets)
        })
    }

    // -- Password resets --

    pub fn insert_password_reset(&self, token_hash: &str, user_id: &str, expires_at: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO password_resets (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![token_hash, user_id, expires_at],
            )?;
            Ok(())
        })
    }

    /// Spend a reset token and store the new password hash.
    ///
    /// Returns false when the token is unknown, belongs to another user, was
    /// already used, or has expired. Nothing is written in that case.
    pub fn complete_password_reset(
        &self,
        token_hash: &str,
        user_id: &str,
        password_hash: &str,
        now: i64,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let claimed = tx.execute(
                "UPDATE password_resets SET used = 1
                 WHERE token_hash = ?1 AND user_id = ?2 AND used = 0 AND expires_at >= ?3",
                rusqlite::params![token_hash, user_id, now],
            )?;
            if claimed != 1 {
                return Ok(false);
            }
            tx.execute(
                "UPDATE users SET password = ?2 WHERE id = ?1",
                (user_id, password_hash),
            )?;
            tx.commit()?;
            Ok(true)
        })
    }
}

pub(crate) fn ensure_profile(conn: &Connection, user_id: &str, today: NaiveDate) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO profiles (user_id, coins, streak, last_updated)
         VALUES (?1, ?2, 0, ?3)",
        rusqlite::params![user_id, habify_engine::streak::STARTING_COINS, today],
    )?;
    Ok(())
}

pub(crate) fn ensure_badge(conn: &Connection, user_id: &str) -> Result<()> {
    let badge = Badge::new();
    conn.execute(
        "INSERT OR IGNORE INTO streak_badges (user_id, weeks, color, multiplier)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, badge.weeks, badge.color.as_str(), badge.multiplier],
    )?;
    Ok(())
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` only ever comes from the fixed call sites above.
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
                password: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

pub(crate) fn query_profile(conn: &Connection, user_id: &str) -> Result<Option<ProfileRow>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.user_id, u.username, p.coins, p.streak, p.avatar, p.last_updated
         FROM profiles p
         JOIN users u ON p.user_id = u.id
         WHERE p.user_id = ?1",
    )?;
    let row = stmt.query_row([user_id], profile_from_row).optional()?;
    Ok(row)
}

pub(crate) fn query_badge(conn: &Connection, user_id: &str) -> Result<Option<BadgeRow>> {
    let row = conn
        .query_row(
            "SELECT user_id, weeks, color, multiplier FROM streak_badges WHERE user_id = ?1",
            [user_id],
            |row| {
                Ok(BadgeRow {
                    user_id: row.get(0)?,
                    weeks: row.get(1)?,
                    color: row.get(2)?,
                    multiplier: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        coins: row.get(3)?,
        streak: row.get(4)?,
        avatar: row.get(5)?,
        last_updated: row.get(6)?,
    })
}

pub(crate) fn reward_from_row(row: &Row<'_>) -> rusqlite::Result<RewardRow> {
    Ok(RewardRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        price: row.get(3)?,
        img: row.get(4)?,
        title: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_rewards(conn: &Connection, user_id: Option<&str>) -> Result<Vec<RewardRow>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.user_id, u.username, r.price, r.img, r.title, r.created_at
         FROM rewards r
         JOIN users u ON r.user_id = u.id
         WHERE ?1 IS NULL OR r.user_id = ?1
         ORDER BY r.id",
    )?;
    let rows = stmt
        .query_map([user_id], reward_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn register(db: &Database, username: &str, email: Option<&str>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.create_user(
            &NewUser {
                id: &id,
                username,
                email,
                first_name: "Ada",
                last_name: "Lovelace",
                password_hash: "hash",
            },
            today(),
        )
        .unwrap();
        id
    }

    #[test]
    fn registration_creates_profile_and_badge() {
        let db = Database::open_in_memory().unwrap();
        let id = register(&db, "ada", Some("ada@example.com"));

        let profile = db.get_profile(&id).unwrap().unwrap();
        assert_eq!(profile.coins, 100);
        assert_eq!(profile.streak, 0);
        assert_eq!(profile.username, "ada");
        assert_eq!(profile.last_updated, today());
        assert_eq!(profile.avatar, "/static/imgs/pets/0.svg");

        let badge = db.get_badge(&id).unwrap().unwrap();
        assert_eq!(badge.weeks, 0);
        assert_eq!(badge.color, "white");
        assert_eq!(badge.multiplier, 1.0);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada", None);

        let id = uuid::Uuid::new_v4().to_string();
        let second = db.create_user(
            &NewUser {
                id: &id,
                username: "ada",
                email: None,
                first_name: "",
                last_name: "",
                password_hash: "hash",
            },
            today(),
        );
        assert!(second.is_err());
        // The failed registration left no orphan profile behind.
        assert!(db.get_profile(&id).unwrap().is_none());
    }

    #[test]
    fn users_without_email_do_not_collide() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada", None);
        register(&db, "grace", None);
        assert_eq!(db.list_profiles().unwrap().len(), 2);
    }

    #[test]
    fn lookups_by_each_key() {
        let db = Database::open_in_memory().unwrap();
        let id = register(&db, "ada", Some("ada@example.com"));

        assert_eq!(db.get_user_by_username("ada").unwrap().unwrap().id, id);
        assert_eq!(db.get_user_by_id(&id).unwrap().unwrap().username, "ada");
        assert_eq!(db.get_user_by_email("ada@example.com").unwrap().unwrap().id, id);
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn revoked_tokens_are_remembered_until_pruned() {
        let db = Database::open_in_memory().unwrap();
        db.revoke_token("abc", 100).unwrap();
        assert!(db.is_token_revoked("abc").unwrap());
        assert!(!db.is_token_revoked("xyz").unwrap());

        db.prune_expired(101).unwrap();
        assert!(!db.is_token_revoked("abc").unwrap());
    }

    #[test]
    fn reset_token_is_single_use() {
        let db = Database::open_in_memory().unwrap();
        let id = register(&db, "ada", Some("ada@example.com"));
        db.insert_password_reset("h1", &id, 1_000).unwrap();

        assert!(db.complete_password_reset("h1", &id, "new-hash", 500).unwrap());
        assert_eq!(db.get_user_by_id(&id).unwrap().unwrap().password, "new-hash");
        assert!(!db.complete_password_reset("h1", &id, "other", 500).unwrap());
        assert_eq!(db.get_user_by_id(&id).unwrap().unwrap().password, "new-hash");
    }

    #[test]
    fn expired_reset_token_is_refused() {
        let db = Database::open_in_memory().unwrap();
        let id = register(&db, "ada", None);
        db.insert_password_reset("h1", &id, 1_000).unwrap();

        assert!(!db.complete_password_reset("h1", &id, "new-hash", 1_001).unwrap());
        assert_eq!(db.get_user_by_id(&id).unwrap().unwrap().password, "hash");
    }
}
