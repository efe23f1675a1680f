#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use bytes::Bytes;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;
use zap_api::config::ServerConfig;
use zap_api::router::build_router;
use zap_api::state::AppStateInner;
use zap_core::assets::ensure_buckets;
use zap_core::store::Store;
use zap_db::Database;
use zap_storage::LocalBlobStore;
use zap_types::api::Claims;
use zap_types::models::{FriendRequest, Moment, Region, RegionalTimestamps, User};

pub const PUBLIC_URL: &str = "http://zap.test";
const SECRET: &str = "integration-secret";

pub struct TestApp {
    pub router: Router,
    pub db: Arc<Database>,
    pub blobs: Arc<LocalBlobStore>,
    _dir: tempfile::TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn location(&self) -> &str {
        self.headers.get("location").unwrap().to_str().unwrap()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage_dir = dir.path().join("blobs").to_string_lossy().into_owned();
        let vars: HashMap<&str, String> = HashMap::from([
            ("DAILYZAP_JWT_SECRET", SECRET.to_string()),
            ("DAILYZAP_PUBLIC_URL", PUBLIC_URL.to_string()),
            ("DAILYZAP_STORAGE_DIR", storage_dir),
        ]);
        let config = ServerConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let settings = config.settings().unwrap();

        let db = Arc::new(Database::open_in_memory().unwrap());
        let blobs = Arc::new(
            LocalBlobStore::new(
                config.storage_dir.clone(),
                &config.public_url,
                config.signing_key.as_bytes(),
            )
            .unwrap(),
        );
        ensure_buckets(blobs.as_ref()).unwrap();

        let state = Arc::new(AppStateInner {
            store: db.clone(),
            blobs: blobs.clone(),
            push: None,
            settings,
            config,
        });
        Self {
            router: build_router(state),
            db,
            blobs,
            _dir: dir,
        }
    }

    pub fn user(&self, id: &str) -> User {
        let user = User {
            id: id.to_string(),
            handle: format!("{}_handle", id),
            email: format!("{}@example.com", id),
            first_name: id.to_uppercase(),
            last_name: "Test".into(),
            region: Region::Eu,
            profile_picture_version: 0,
            device_token: None,
        };
        self.db.create_user(&user).unwrap();
        user
    }

    pub fn befriend(&self, a: &str, b: &str) {
        self.db
            .create_friend_request(&FriendRequest {
                id: format!("friendrequest_{}_{}", a, b),
                sender_id: a.to_string(),
                receiver_id: b.to_string(),
            })
            .unwrap();
        assert!(self
            .db
            .convert_friend_request(a, b, &format!("friendship_{}_{}", a, b))
            .unwrap());
    }

    /// A Moment that activated an hour ago in every region.
    pub fn current_moment(&self, id: &str) -> Moment {
        let activated = Utc::now() - Duration::hours(1);
        let moment = Moment {
            id: id.to_string(),
            date: activated,
            activations: RegionalTimestamps {
                eu: activated,
                us: activated,
                wa: activated,
                ea: activated,
            },
        };
        self.db.insert_moment(&moment).unwrap();
        moment
    }

    pub fn token(&self, user_id: &str) -> String {
        let claims = Claims {
            sub: user_id.to_string(),
            handle: format!("{}_handle", user_id),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    pub async fn send_bytes(&self, method: Method, uri: &str, data: &'static [u8]) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(data))
            .unwrap();
        self.call(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Option<Value>) -> TestResponse {
        self.send(Method::PUT, uri, Some(token), body).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Option<Value>) -> TestResponse {
        self.send(Method::POST, uri, Some(token), body).await
    }

    async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Path and query of an absolute URL on the test host.
pub fn local(url: &str) -> &str {
    url.strip_prefix(PUBLIC_URL).unwrap()
}
