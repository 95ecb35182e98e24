use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT UNIQUE,
                first_name  TEXT NOT NULL DEFAULT '',
                last_name   TEXT NOT NULL DEFAULT '',
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE profiles (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                coins         INTEGER NOT NULL DEFAULT 100 CHECK (coins >= 0),
                streak        INTEGER NOT NULL DEFAULT 0 CHECK (streak >= 0),
                avatar        TEXT NOT NULL DEFAULT '/static/imgs/pets/0.svg',
                last_updated  TEXT NOT NULL
            );

            CREATE TABLE streak_badges (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                weeks       INTEGER NOT NULL DEFAULT 0 CHECK (weeks >= 0),
                color       TEXT NOT NULL DEFAULT 'white',
                multiplier  REAL NOT NULL DEFAULT 1.0 CHECK (multiplier > 0)
            );

            CREATE TABLE days (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                day       TEXT NOT NULL,
                activity  INTEGER NOT NULL DEFAULT 0,
                notes     TEXT NOT NULL DEFAULT '',
                UNIQUE(user_id, day)
            );

            CREATE INDEX idx_days_user ON days(user_id, day);

            CREATE TABLE rewards (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                price       INTEGER NOT NULL DEFAULT 350 CHECK (price >= 0),
                img         TEXT NOT NULL,
                title       TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_rewards_user ON rewards(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (session revocation, password resets)");
        conn.execute_batch(
            "
            CREATE TABLE revoked_tokens (
                jti         TEXT PRIMARY KEY,
                expires_at  INTEGER NOT NULL
            );

            CREATE TABLE password_resets (
                token_hash  TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at  INTEGER NOT NULL,
                used        INTEGER NOT NULL DEFAULT 0
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }
}
