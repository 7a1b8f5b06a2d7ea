#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc, clippy::must_use_candidate, unreachable_pub)]

use fakeprovider_server::App;
use fakeprovider_server::config::{
    AuthConfig, Config, LogFormat, LoginConfig, RateLimitConfig, ServerConfig, TelemetryConfig,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Once;
use tokio::net::TcpListener;
use tokio::sync::watch;
use uuid::Uuid;

static INIT: Once = Once::new();

pub const TEST_SECRET: &str = "test_secret";
pub const TEST_USERNAME: &str = "jane@example.com";
pub const TEST_PASSWORD: &str = "hunter2";

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("fakeprovider_server=debug".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub fn get_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            trusted_proxies: vec!["127.0.0.1/32".parse().unwrap(), "::1/128".parse().unwrap()],
            shutdown_timeout_secs: 1,
        },
        auth: AuthConfig { session_secret: TEST_SECRET.to_string(), session_max_age_secs: 3_600 },
        login: LoginConfig {
            username: TEST_USERNAME.to_string(),
            password: TEST_PASSWORD.to_string(),
            user_id: Some(Uuid::new_v4()),
        },
        rate_limit: RateLimitConfig { per_second: 10_000, burst: 10_000, login_per_second: 10_000, login_burst: 10_000 },
        telemetry: TelemetryConfig { log_format: LogFormat::Text, otlp_endpoint: None },
    }
}

pub struct TestApp {
    pub server_url: String,
    pub client: Client,
    pub config: Config,
    shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        setup_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = App::build(&config);
        let router = fakeprovider_server::api::app_router(&config, app.services).unwrap();
        let _workers = app.workers.spawn_all(shutdown_rx.clone());

        let mut server_rx = shutdown_rx;
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = server_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        Self { server_url: format!("http://{addr}"), client: Client::new(), config, shutdown_tx }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    /// Logs in with the configured account and returns the bearer token.
    pub async fn login(&self) -> String {
        let resp = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = resp.json().await.unwrap();
        body["data"].as_str().unwrap().to_string()
    }

    pub async fn create_card(&self, token: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/cards"))
            .bearer_auth(token)
            .json(&json!({ "first_name": "Jane", "last_name": "Doe" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    pub async fn verify(&self, token: &str) -> String {
        let resp = self.client.post(self.url("/me/verify")).bearer_auth(token).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = resp.json().await.unwrap();
        body["data"].as_str().unwrap().to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
