use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use outdial::analysis::TranscriptAnalyzer;
use outdial::auth::jwt::JwtService;
use outdial::auth::password::hash_password;
use outdial::config::AppConfig;
use outdial::db::{self, PgPool};
use outdial::dialer::{CallRequest, DialError, Dialer};
use outdial::models::{NewLead, NewUser};
use outdial::notify::Notifier;
use outdial::prompts::PromptStore;
use outdial::queue::CampaignQueue;
use outdial::routes;
use outdial::state::AppState;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Records placed calls and hands out sequential correlation ids.
#[derive(Default)]
pub struct FakeDialer {
    counter: AtomicUsize,
    fail: AtomicBool,
    pub requests: Mutex<Vec<CallRequest>>,
}

impl FakeDialer {
    #[allow(dead_code)]
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub async fn placed_calls(&self) -> Vec<CallRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    async fn place_call(&self, request: &CallRequest) -> Result<String, DialError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DialError::Rejected {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "provider rejected the call".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().await.push(request.clone());
        Ok(format!("call-{n}"))
    }
}

pub struct FakePromptStore(pub HashMap<String, String>);

impl PromptStore for FakePromptStore {
    fn load(&self, name: &str) -> Result<Option<String>> {
        Ok(self.0.get(name).cloned())
    }
}

/// Captures side effects fired by the webhook state machine.
#[derive(Default)]
pub struct RecordingNotifier {
    pub bookings: Mutex<Vec<Uuid>>,
    pub follow_ups: Mutex<Vec<(Uuid, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn booking_confirmed(&self, lead_id: Uuid, _meeting_time: &str) {
        self.bookings.lock().await.push(lead_id);
    }

    async fn follow_up_email(&self, lead_id: Uuid, email: &str) {
        self.follow_ups.lock().await.push((lead_id, email.to_string()));
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    pub dialer: Arc<FakeDialer>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    /// Returns `None` when `TEST_DATABASE_URL` is not set so DB-backed
    /// tests can skip instead of failing on machines without Postgres.
    pub async fn new() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            return Ok(None);
        };

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            bland_api_url: "http://127.0.0.1:9/unused".to_string(),
            bland_api_key: None,
            voice_id: "test-voice".to_string(),
            callback_url: "http://127.0.0.1:3000/api/webhook".to_string(),
            dial_concurrency: 1,
            dispatch_timeout_seconds: 5,
            llm_api_url: None,
            llm_api_key: None,
            llm_model: "test-model".to_string(),
            prompt_dir: "prompts".to_string(),
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let dialer = Arc::new(FakeDialer::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut templates = HashMap::new();
        templates.insert(
            "default".to_string(),
            "Hi ${contact}, calling about ${company}.".to_string(),
        );
        let prompts = Arc::new(FakePromptStore(templates));
        let analyzer = Arc::new(TranscriptAnalyzer::from_config(&config)?);
        let jwt = JwtService::from_config(&config)?;

        let state = AppState::new(
            pool,
            config,
            Arc::new(CampaignQueue::new()),
            dialer.clone(),
            prompts,
            analyzer,
            notifier.clone(),
            jwt,
        );
        let router = routes::create_router(state.clone());

        Ok(Some(Self {
            state,
            router,
            dialer,
            notifier,
        }))
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    pub async fn insert_user(&self, username: &str, password: &str, role: &str) -> Result<Uuid> {
        let username = username.to_string();
        let password = password.to_string();
        let role = role.to_string();
        self.with_conn(move |conn| {
            let user = NewUser {
                id: Uuid::new_v4(),
                username,
                password_hash: hash_password(&password)?,
                role,
            };
            diesel::insert_into(outdial::schema::users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_lead(&self, phone: &str, status: &str) -> Result<Uuid> {
        let phone = phone.to_string();
        let status = status.to_string();
        self.with_conn(move |conn| {
            let lead = NewLead {
                id: Uuid::new_v4(),
                phone,
                company: Some("Acme".to_string()),
                contact: Some("Dana".to_string()),
                status,
                prompt_name: "default".to_string(),
                owner_id: None,
                is_sample: false,
            };
            diesel::insert_into(outdial::schema::leads::table)
                .values(&lead)
                .execute(conn)
                .context("failed to insert lead")?;
            Ok(lead.id)
        })
        .await
    }

    pub async fn login_token(&self, username: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            username: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/api/auth/login",
                &LoginPayload { username, password },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.post_raw(path, body, "application/json", token).await
    }

    pub async fn post_raw(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", content_type);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn upload_csv(
        &self,
        csv_data: &str,
        prompt_name: &str,
        token: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"leads.csv\"\r\n"
                .as_slice(),
        );
        body.extend(b"Content-Type: text/csv\r\n\r\n");
        body.extend(csv_data.as_bytes());
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(b"Content-Disposition: form-data; name=\"prompt_name\"\r\n\r\n");
        body.extend(prompt_name.as_bytes());
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        self.post_raw(
            "/api/leads/upload",
            body,
            &format!("multipart/form-data; boundary={boundary}"),
            Some(token),
        )
        .await
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(db::MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE calls, leads, users RESTART IDENTITY CASCADE;")
        .context("failed to truncate tables")?;
    Ok(())
}
