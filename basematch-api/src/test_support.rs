//! Fakes for the outbound clients plus helpers for driving the router.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use basematch_shared::clients::chain::{ChainError, ChainProfile, ChainReader, ChainStake};
use basematch_shared::clients::email::Mailer;
use basematch_shared::clients::redis::RateLimiter;
use basematch_shared::clients::storage::ObjectStorage;

use crate::config::AppConfig;
use crate::store::memory::MemoryStore;
use crate::AppState;

pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";
pub const CAROL: &str = "0x3333333333333333333333333333333333333333";

#[derive(Debug, Clone, PartialEq)]
pub enum SentMail {
    Link { to: String, url: String },
    Code { to: String, code: String },
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail: Mutex<bool>,
}

impl FakeMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send_verification_link(&self, to: &str, url: &str) -> Result<(), String> {
        if *self.fail.lock().unwrap() {
            return Err("mail provider unavailable".into());
        }
        self.sent.lock().unwrap().push(SentMail::Link { to: to.into(), url: url.into() });
        Ok(())
    }

    async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), String> {
        if *self.fail.lock().unwrap() {
            return Err("mail provider unavailable".into());
        }
        self.sent.lock().unwrap().push(SentMail::Code { to: to.into(), code: code.into() });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub objects: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, String> {
        self.objects
            .lock()
            .unwrap()
            .push((key.into(), content_type.into(), body.len()));
        Ok(format!("https://cdn.test/basematch-media/{key}"))
    }
}

/// Fixed-window counter kept in memory; `broken` simulates Redis being down.
#[derive(Default)]
pub struct FakeLimiter {
    pub hits: Mutex<HashMap<String, u64>>,
    pub broken: Mutex<bool>,
}

#[async_trait]
impl RateLimiter for FakeLimiter {
    async fn check(&self, key: &str, limit: u64, _window_secs: u64) -> Result<bool, String> {
        if *self.broken.lock().unwrap() {
            return Err("connection refused".into());
        }
        let mut hits = self.hits.lock().unwrap();
        let count = hits.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count <= limit)
    }
}

#[derive(Default)]
pub struct FakeChain {
    pub profiles: Mutex<HashMap<String, ChainProfile>>,
    pub stakes: Mutex<HashMap<i64, ChainStake>>,
    pub reputation: Mutex<HashMap<String, u64>>,
    pub unreachable: Mutex<bool>,
}

impl FakeChain {
    fn check_reachable(&self) -> Result<(), ChainError> {
        if *self.unreachable.lock().unwrap() {
            return Err(ChainError::Call("rpc unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn get_profile(&self, address: &str) -> Result<Option<ChainProfile>, ChainError> {
        self.check_reachable()?;
        Ok(self.profiles.lock().unwrap().get(address).cloned())
    }

    async fn get_stake(&self, stake_id: i64) -> Result<Option<ChainStake>, ChainError> {
        self.check_reachable()?;
        Ok(self.stakes.lock().unwrap().get(&stake_id).cloned())
    }

    async fn reputation_of(&self, address: &str) -> Result<u64, ChainError> {
        self.check_reachable()?;
        Ok(self.reputation.lock().unwrap().get(address).copied().unwrap_or(0))
    }
}

pub struct TestContext {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<FakeMailer>,
    pub storage: Arc<FakeStorage>,
    pub limiter: Arc<FakeLimiter>,
    pub chain: Arc<FakeChain>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(FakeMailer::default());
        let storage = Arc::new(FakeStorage::default());
        let limiter = Arc::new(FakeLimiter::default());
        let chain = Arc::new(FakeChain::default());

        let state = Arc::new(AppState {
            store: store.clone(),
            mailer: mailer.clone(),
            storage: storage.clone(),
            limiter: limiter.clone(),
            chain: chain.clone(),
            config: AppConfig {
                app_url: "https://basematch.test".into(),
                webhook_secret: "test-secret".into(),
                ..AppConfig::default()
            },
            metrics: None,
        });

        Self { state, store, mailer, storage, limiter, chain }
    }

    pub fn router(&self) -> Router {
        crate::build_router(self.state.clone())
    }

    /// Sends a request with an optional JSON body and returns the status and
    /// the parsed JSON response.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        send(self.router(), request).await
    }
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
