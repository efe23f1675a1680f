//! Row mapping. Column lists live next to the function that reads them so a
//! SELECT and its mapper cannot drift apart.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use zap_types::models::{
    Comment, FriendRequest, Moment, Notification, Reaction, ReactionImage, RegionalTimestamps,
    User, Zap,
};

pub const USER_COLUMNS: &str =
    "id, handle, email, first_name, last_name, region, profile_picture_version, device_token";

pub fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        handle: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        region: parse_column(row, 5)?,
        profile_picture_version: row.get(6)?,
        device_token: row.get(7)?,
    })
}

pub const FRIEND_REQUEST_COLUMNS: &str = "id, sender_id, receiver_id";

pub fn friend_request_from_row(row: &Row) -> rusqlite::Result<FriendRequest> {
    Ok(FriendRequest {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
    })
}

pub const MOMENT_COLUMNS: &str = "id, date_ms, eu_ms, us_ms, wa_ms, ea_ms";

pub fn moment_from_row(row: &Row) -> rusqlite::Result<Moment> {
    Ok(Moment {
        id: row.get(0)?,
        date: millis_column(row, 1)?,
        activations: RegionalTimestamps {
            eu: millis_column(row, 2)?,
            us: millis_column(row, 3)?,
            wa: millis_column(row, 4)?,
            ea: millis_column(row, 5)?,
        },
    })
}

pub const ZAP_COLUMNS: &str = "id, moment_id, author_id, uploaded, repost_id";

pub fn zap_from_row(row: &Row) -> rusqlite::Result<Zap> {
    Ok(Zap {
        id: row.get(0)?,
        moment_id: row.get(1)?,
        author_id: row.get(2)?,
        uploaded: row.get(3)?,
        repost_id: row.get(4)?,
    })
}

pub const COMMENT_COLUMNS: &str = "id, zap_id, author_id, content";

pub fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        zap_id: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
    })
}

pub const REACTION_IMAGE_COLUMNS: &str = "id, author_id, kind, uploaded";

pub fn reaction_image_from_row(row: &Row) -> rusqlite::Result<ReactionImage> {
    Ok(ReactionImage {
        id: row.get(0)?,
        author_id: row.get(1)?,
        kind: parse_column(row, 2)?,
        uploaded: row.get(3)?,
    })
}

pub const REACTION_COLUMNS: &str = "id, zap_id, author_id, kind, image_id";

pub fn reaction_from_row(row: &Row) -> rusqlite::Result<Reaction> {
    Ok(Reaction {
        id: row.get(0)?,
        zap_id: row.get(1)?,
        author_id: row.get(2)?,
        kind: parse_column(row, 3)?,
        image_id: row.get(4)?,
    })
}

pub const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, content, target_id";

pub fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: parse_column(row, 2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        target_id: row.get(5)?,
    })
}

/// TEXT column holding one of our enum names.
fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn millis_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {}", ms).into(),
        )
    })
}
