use tracing::info;
use zap_types::id::{Prefix, TypeId, new_id};
use zap_types::models::Invite;

use crate::error::{CoreError, CoreResult};
use crate::store::{Store, StoreError};

/// The single server-wide invite, created on first call. Always carries its code.
pub fn ensure_server_invite(store: &dyn Store) -> CoreResult<Invite> {
    ensure(store, None)
}

/// `user_id`'s personal invite, created on first call. Always carries its code.
pub fn ensure_user_invite(store: &dyn Store, user_id: &str) -> CoreResult<Invite> {
    ensure(store, Some(user_id))
}

fn ensure(store: &dyn Store, user_id: Option<&str>) -> CoreResult<Invite> {
    let lookup = || match user_id {
        Some(id) => store.user_invite(id, true),
        None => store.server_invite(true),
    };
    if let Some(invite) = lookup()? {
        return Ok(invite);
    }

    let id = new_id(Prefix::Invite);
    let code = TypeId::untyped().to_string();
    match store.create_invite(&id, user_id, &code) {
        Ok(()) => {
            info!("Created invite {} for {}", id, user_id.unwrap_or("server"));
            Ok(Invite {
                id,
                user_id: user_id.map(str::to_string),
                code: Some(code),
            })
        }
        // Lost a race with a concurrent first read.
        Err(StoreError::Conflict(_)) => lookup()?
            .ok_or_else(|| CoreError::not_found("invite", user_id.unwrap_or("server"))),
        Err(e) => Err(e.into()),
    }
}

pub fn resolve(store: &dyn Store, code: &str) -> CoreResult<Invite> {
    store
        .invite_by_code(code)?
        .ok_or_else(|| CoreError::not_found("invite", code))
}

pub fn invite_url(public_url: &str, code: &str) -> String {
    format!("{}/invite/{}", public_url.trim_end_matches('/'), code)
}

/// App deep link for an invite landing page.
pub fn deep_link(host: &str, code: &str) -> String {
    format!("dailyzap://invite/{}/{}", host, code)
}
