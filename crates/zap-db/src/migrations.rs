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
                id                      TEXT PRIMARY KEY,
                handle                  TEXT NOT NULL UNIQUE,
                email                   TEXT NOT NULL UNIQUE,
                first_name              TEXT NOT NULL,
                last_name               TEXT NOT NULL,
                region                  TEXT NOT NULL,
                profile_picture_version INTEGER NOT NULL DEFAULT 0,
                device_token            TEXT
            );

            CREATE TABLE friend_requests (
                id          TEXT PRIMARY KEY,
                sender_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE(sender_id, receiver_id)
            );

            CREATE INDEX idx_friend_requests_receiver ON friend_requests(receiver_id);

            CREATE TABLE friendships (
                id          TEXT PRIMARY KEY,
                sender_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE(sender_id, receiver_id)
            );

            CREATE INDEX idx_friendships_receiver ON friendships(receiver_id);

            CREATE TABLE moments (
                id      TEXT PRIMARY KEY,
                date_ms INTEGER NOT NULL,
                eu_ms   INTEGER NOT NULL,
                us_ms   INTEGER NOT NULL,
                wa_ms   INTEGER NOT NULL,
                ea_ms   INTEGER NOT NULL
            );

            CREATE INDEX idx_moments_date ON moments(date_ms DESC, id DESC);

            CREATE TABLE zaps (
                id        TEXT PRIMARY KEY,
                moment_id TEXT NOT NULL REFERENCES moments(id),
                author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                uploaded  INTEGER NOT NULL DEFAULT 0,
                repost_id TEXT REFERENCES zaps(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_zaps_moment_author ON zaps(moment_id, author_id);

            CREATE TABLE comments (
                id        TEXT PRIMARY KEY,
                zap_id    TEXT NOT NULL REFERENCES zaps(id) ON DELETE CASCADE,
                author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content   TEXT NOT NULL
            );

            CREATE INDEX idx_comments_zap ON comments(zap_id);

            CREATE TABLE reaction_images (
                id        TEXT PRIMARY KEY,
                author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind      TEXT NOT NULL,
                uploaded  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE reactions (
                id        TEXT PRIMARY KEY,
                zap_id    TEXT NOT NULL REFERENCES zaps(id) ON DELETE CASCADE,
                author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind      TEXT NOT NULL,
                image_id  TEXT NOT NULL REFERENCES reaction_images(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_reactions_zap ON reactions(zap_id);

            CREATE TABLE invites (
                id      TEXT PRIMARY KEY,
                user_id TEXT REFERENCES users(id) ON DELETE CASCADE,
                code    TEXT NOT NULL UNIQUE
            );

            -- One invite per user, and one with no user for the server.
            CREATE UNIQUE INDEX idx_invites_owner ON invites(COALESCE(user_id, ''));

            CREATE TABLE notifications (
                id        TEXT PRIMARY KEY,
                user_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind      TEXT NOT NULL,
                title     TEXT NOT NULL,
                content   TEXT NOT NULL,
                target_id TEXT
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (one friend request per pair)");
        conn.execute_batch(
            "
            CREATE UNIQUE INDEX idx_friend_requests_pair
                ON friend_requests(min(sender_id, receiver_id), max(sender_id, receiver_id));

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
