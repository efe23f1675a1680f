use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{blobs, feed, friends, info, notifications, profile, reactions, users, zaps};

/// Upper bound for a single uploaded image.
const MAX_BLOB_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(info::health))
        .route("/v1/info", get(info::info))
        .route("/invite/{code}", get(info::invite_landing))
        .route("/blobs/{bucket}/{*key}", get(blobs::download).put(blobs::upload))
        .layer(DefaultBodyLimit::max(MAX_BLOB_BYTES));

    let protected_routes = Router::new()
        .route("/v1/feed", get(feed::get_feed))
        .route("/v1/users", get(users::find_user))
        .route("/v1/users/{id}", get(users::get_user))
        .route("/v1/users/{id}/profile/picture", get(users::profile_picture))
        .route("/v1/profile", get(profile::get_profile))
        .route("/v1/profile/picture", put(profile::set_profile_picture))
        .route("/v1/profile/device", put(profile::set_device_token))
        .route("/v1/friends", get(friends::list_friends))
        .route("/v1/friends/requests", get(friends::list_requests))
        .route(
            "/v1/friends/requests/{handle}",
            put(friends::send_request).delete(friends::cancel_request),
        )
        .route("/v1/friends/accept/{sender_id}", put(friends::accept_request))
        .route("/v1/friends/reject/{sender_id}", put(friends::reject_request))
        .route("/v1/zaps", put(zaps::create_zap))
        .route("/v1/zaps/{id}/uploaded", put(zaps::mark_uploaded))
        .route("/v1/zaps/{id}/picture/{side}", get(zaps::picture))
        .route("/v1/zaps/{id}/comments", post(zaps::add_comment))
        .route("/v1/zaps/{id}/reactions", put(zaps::add_reaction))
        .route("/v1/reactions/images", put(reactions::create_image))
        .route("/v1/reactions/images/{id}/uploaded", put(reactions::mark_image_uploaded))
        .route("/v1/reactions/{id}/picture", get(reactions::picture))
        .route("/v1/reactions/{id}", delete(reactions::delete_reaction))
        .route("/v1/notifications", post(notifications::consume_all))
        .route("/v1/notifications/{id}", post(notifications::consume))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
