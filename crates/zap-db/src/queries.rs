use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;
use zap_core::store::{Store, StoreError, StoreResult};
use zap_types::models::{
    Comment, FriendRequest, Invite, Moment, Notification, NotificationKind, Reaction,
    ReactionImage, Region, User, Zap,
};

use crate::Database;
use crate::models::*;

impl Database {
    /// Runs a write on the writer connection, reporting unique constraint
    /// violations as [`StoreError::Conflict`].
    fn write<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.with_conn_mut(f).map_err(classify)
    }

    fn read<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        Ok(self.with_conn(f)?)
    }
}

fn classify(err: anyhow::Error) -> StoreError {
    if let Some(rusqlite::Error::SqliteFailure(e, Some(msg))) = err.downcast_ref::<rusqlite::Error>()
    {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            if let Some(cols) = msg.strip_prefix("UNIQUE constraint failed: ") {
                return StoreError::Conflict(unique_field(cols));
            }
        }
    }
    StoreError::Backend(err)
}

/// `users.handle` -> `handle`, `t.a, t.b` -> `a, b`.
fn unique_field(cols: &str) -> String {
    cols.split(", ")
        .map(|c| c.rsplit('.').next().unwrap_or(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?1, ?2, ...` starting at `first`.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn region_column(region: Region) -> &'static str {
    match region {
        Region::Eu => "eu_ms",
        Region::Us => "us_ms",
        Region::Wa => "wa_ms",
        Region::Ea => "ea_ms",
    }
}

fn query_in<T>(
    conn: &Connection,
    columns: &str,
    table: &str,
    key: &str,
    ids: &[String],
    map: fn(&rusqlite::Row) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({})",
        columns,
        table,
        key,
        placeholders(1, ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter()), map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_one<T>(
    conn: &Connection,
    columns: &str,
    table: &str,
    key: &str,
    value: &str,
    map: fn(&rusqlite::Row) -> rusqlite::Result<T>,
) -> Result<Option<T>> {
    let sql = format!("SELECT {} FROM {} WHERE {} = ?1", columns, table, key);
    Ok(conn.query_row(&sql, [value], map).optional()?)
}

impl Store for Database {
    // -- Users --

    fn create_user(&self, user: &User) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO users (id, handle, email, first_name, last_name, region, profile_picture_version, device_token)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id,
                    user.handle,
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.region.as_str(),
                    user.profile_picture_version,
                    user.device_token,
                ],
            )?;
            Ok(())
        })
    }

    fn user(&self, id: &str) -> StoreResult<Option<User>> {
        self.read(|conn| query_one(conn, USER_COLUMNS, "users", "id", id, user_from_row))
    }

    fn user_by_handle(&self, handle: &str) -> StoreResult<Option<User>> {
        self.read(|conn| query_one(conn, USER_COLUMNS, "users", "handle", handle, user_from_row))
    }

    fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        self.read(|conn| query_in(conn, USER_COLUMNS, "users", "id", ids, user_from_row))
    }

    fn set_device_token(&self, user_id: &str, token: Option<&str>) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "UPDATE users SET device_token = ?2 WHERE id = ?1",
                params![user_id, token],
            )?;
            Ok(())
        })
    }

    fn bump_profile_picture_version(&self, user_id: &str) -> StoreResult<i64> {
        self.write(|conn| {
            let version = conn.query_row(
                "UPDATE users SET profile_picture_version = profile_picture_version + 1
                 WHERE id = ?1 RETURNING profile_picture_version",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(version)
        })
    }

    // -- Friend graph --

    fn friend_ids(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT receiver_id FROM friendships WHERE sender_id = ?1
                 UNION
                 SELECT sender_id FROM friendships WHERE receiver_id = ?1",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<HashSet<String>, _>>()?;
            Ok(ids)
        })
    }

    fn are_friends(&self, a: &str, b: &str) -> StoreResult<bool> {
        self.read(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM friendships
                    WHERE (sender_id = ?1 AND receiver_id = ?2)
                       OR (sender_id = ?2 AND receiver_id = ?1))",
                [a, b],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn friend_request(&self, sender_id: &str, receiver_id: &str) -> StoreResult<Option<FriendRequest>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM friend_requests WHERE sender_id = ?1 AND receiver_id = ?2",
                FRIEND_REQUEST_COLUMNS
            );
            Ok(conn
                .query_row(&sql, [sender_id, receiver_id], friend_request_from_row)
                .optional()?)
        })
    }

    fn friend_requests_involving(&self, user_id: &str) -> StoreResult<Vec<FriendRequest>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM friend_requests WHERE sender_id = ?1 OR receiver_id = ?1 ORDER BY id",
                FRIEND_REQUEST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], friend_request_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn create_friend_request(&self, request: &FriendRequest) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO friend_requests (id, sender_id, receiver_id) VALUES (?1, ?2, ?3)",
                params![request.id, request.sender_id, request.receiver_id],
            )?;
            Ok(())
        })
    }

    fn delete_friend_request(&self, sender_id: &str, receiver_id: &str) -> StoreResult<bool> {
        self.write(|conn| {
            let n = conn.execute(
                "DELETE FROM friend_requests WHERE sender_id = ?1 AND receiver_id = ?2",
                [sender_id, receiver_id],
            )?;
            Ok(n > 0)
        })
    }

    fn convert_friend_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
        friendship_id: &str,
    ) -> StoreResult<bool> {
        self.write(|conn| {
            let tx = conn.unchecked_transaction()?;
            let n = tx.execute(
                "DELETE FROM friend_requests WHERE sender_id = ?1 AND receiver_id = ?2",
                [sender_id, receiver_id],
            )?;
            if n == 0 {
                debug!("Request {} -> {} already consumed", sender_id, receiver_id);
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO friendships (id, sender_id, receiver_id) VALUES (?1, ?2, ?3)",
                [friendship_id, sender_id, receiver_id],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    // -- Moments --

    fn insert_moment(&self, moment: &Moment) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO moments (id, date_ms, eu_ms, us_ms, wa_ms, ea_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    moment.id,
                    moment.date.timestamp_millis(),
                    moment.activations.eu.timestamp_millis(),
                    moment.activations.us.timestamp_millis(),
                    moment.activations.wa.timestamp_millis(),
                    moment.activations.ea.timestamp_millis(),
                ],
            )?;
            Ok(())
        })
    }

    fn latest_moment_activated_before(
        &self,
        region: Region,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Moment>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM moments WHERE {} < ?1 ORDER BY date_ms DESC, id DESC LIMIT 1",
                MOMENT_COLUMNS,
                region_column(region)
            );
            Ok(conn
                .query_row(&sql, [now.timestamp_millis()], moment_from_row)
                .optional()?)
        })
    }

    fn latest_moment_date(&self) -> StoreResult<Option<DateTime<Utc>>> {
        self.read(|conn| {
            let ms: Option<i64> =
                conn.query_row("SELECT MAX(date_ms) FROM moments", [], |row| row.get(0))?;
            Ok(ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
        })
    }

    // -- Zaps --

    fn create_zap(&self, zap: &Zap) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO zaps (id, moment_id, author_id, uploaded, repost_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![zap.id, zap.moment_id, zap.author_id, zap.uploaded, zap.repost_id],
            )?;
            Ok(())
        })
    }

    fn zap(&self, id: &str) -> StoreResult<Option<Zap>> {
        self.read(|conn| query_one(conn, ZAP_COLUMNS, "zaps", "id", id, zap_from_row))
    }

    fn zaps_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Zap>> {
        self.read(|conn| query_in(conn, ZAP_COLUMNS, "zaps", "id", ids, zap_from_row))
    }

    fn mark_zap_uploaded(&self, id: &str) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute("UPDATE zaps SET uploaded = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    fn uploaded_zaps(&self, moment_id: &str, author_ids: &[String]) -> StoreResult<Vec<Zap>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM zaps WHERE uploaded = 1 AND moment_id = ?1 AND author_id IN ({})",
                ZAP_COLUMNS,
                placeholders(2, author_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let values = std::iter::once(moment_id).chain(author_ids.iter().map(String::as_str));
            let rows = stmt
                .query_map(params_from_iter(values), zap_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn create_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO comments (id, zap_id, author_id, content) VALUES (?1, ?2, ?3, ?4)",
                params![comment.id, comment.zap_id, comment.author_id, comment.content],
            )?;
            Ok(())
        })
    }

    fn comments_for_zaps(&self, zap_ids: &[String]) -> StoreResult<Vec<Comment>> {
        self.read(|conn| {
            query_in(conn, COMMENT_COLUMNS, "comments", "zap_id", zap_ids, comment_from_row)
        })
    }

    // -- Reactions --

    fn create_reaction_image(&self, image: &ReactionImage) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO reaction_images (id, author_id, kind, uploaded) VALUES (?1, ?2, ?3, ?4)",
                params![image.id, image.author_id, image.kind.as_str(), image.uploaded],
            )?;
            Ok(())
        })
    }

    fn reaction_image(&self, id: &str) -> StoreResult<Option<ReactionImage>> {
        self.read(|conn| {
            query_one(
                conn,
                REACTION_IMAGE_COLUMNS,
                "reaction_images",
                "id",
                id,
                reaction_image_from_row,
            )
        })
    }

    fn mark_reaction_image_uploaded(&self, id: &str) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute("UPDATE reaction_images SET uploaded = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    fn create_reaction(&self, reaction: &Reaction) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO reactions (id, zap_id, author_id, kind, image_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    reaction.id,
                    reaction.zap_id,
                    reaction.author_id,
                    reaction.kind.as_str(),
                    reaction.image_id,
                ],
            )?;
            Ok(())
        })
    }

    fn reaction(&self, id: &str) -> StoreResult<Option<Reaction>> {
        self.read(|conn| query_one(conn, REACTION_COLUMNS, "reactions", "id", id, reaction_from_row))
    }

    fn delete_reaction(&self, id: &str) -> StoreResult<bool> {
        self.write(|conn| Ok(conn.execute("DELETE FROM reactions WHERE id = ?1", [id])? > 0))
    }

    fn visible_reactions_for_zaps(&self, zap_ids: &[String]) -> StoreResult<Vec<Reaction>> {
        if zap_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read(|conn| {
            let sql = format!(
                "SELECT r.id, r.zap_id, r.author_id, r.kind, r.image_id
                 FROM reactions r
                 JOIN reaction_images i ON i.id = r.image_id
                 WHERE i.uploaded = 1 AND r.zap_id IN ({})",
                placeholders(1, zap_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(zap_ids.iter()), reaction_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Notifications --

    fn create_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, title, content, target_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    notification.id,
                    notification.user_id,
                    notification.kind.as_str(),
                    notification.title,
                    notification.content,
                    notification.target_id,
                ],
            )?;
            Ok(())
        })
    }

    fn notification(&self, id: &str) -> StoreResult<Option<Notification>> {
        self.read(|conn| {
            query_one(
                conn,
                NOTIFICATION_COLUMNS,
                "notifications",
                "id",
                id,
                notification_from_row,
            )
        })
    }

    fn notifications_for(&self, user_id: &str) -> StoreResult<Vec<Notification>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM notifications WHERE user_id = ?1 ORDER BY id",
                NOTIFICATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn delete_notifications(&self, ids: &[String]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.write(|conn| {
            let sql = format!(
                "DELETE FROM notifications WHERE id IN ({})",
                placeholders(1, ids.len())
            );
            Ok(conn.execute(&sql, params_from_iter(ids.iter()))?)
        })
    }

    fn delete_notifications_matching(
        &self,
        user_id: &str,
        kind: NotificationKind,
        target_id: &str,
    ) -> StoreResult<usize> {
        self.write(|conn| {
            Ok(conn.execute(
                "DELETE FROM notifications WHERE user_id = ?1 AND kind = ?2 AND target_id = ?3",
                [user_id, kind.as_str(), target_id],
            )?)
        })
    }

    // -- Invites --

    fn create_invite(&self, id: &str, user_id: Option<&str>, code: &str) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO invites (id, user_id, code) VALUES (?1, ?2, ?3)",
                params![id, user_id, code],
            )?;
            Ok(())
        })
    }

    fn server_invite(&self, with_code: bool) -> StoreResult<Option<Invite>> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, user_id, code FROM invites WHERE user_id IS NULL",
                    [],
                    |row| invite_from_row(row, with_code),
                )
                .optional()?)
        })
    }

    fn user_invite(&self, user_id: &str, with_code: bool) -> StoreResult<Option<Invite>> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, user_id, code FROM invites WHERE user_id = ?1",
                    [user_id],
                    |row| invite_from_row(row, with_code),
                )
                .optional()?)
        })
    }

    fn invite_by_code(&self, code: &str) -> StoreResult<Option<Invite>> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, user_id, code FROM invites WHERE code = ?1",
                    [code],
                    |row| invite_from_row(row, true),
                )
                .optional()?)
        })
    }
}

/// The code is a secret and stays out of the result unless asked for.
fn invite_from_row(row: &rusqlite::Row, with_code: bool) -> rusqlite::Result<Invite> {
    Ok(Invite {
        id: row.get(0)?,
        user_id: row.get(1)?,
        code: if with_code { Some(row.get(2)?) } else { None },
    })
}
