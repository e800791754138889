// tests/common/mod.rs

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use inkpost::{
    config::Config,
    db::{self, users},
    models::user::{NewUser, User},
    routes,
    state::AppState,
    utils::mail::MemoryMailer,
};
use sqlx::SqlitePool;

pub const PASSWORD: &str = "cat";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub mailer: Arc<MemoryMailer>,
    pub config: Config,
}

/// Spawns the app on a random port over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let pool = db::memory_pool()
        .await
        .expect("Failed to open in-memory database");
    db::deploy(&pool).await.expect("Failed to seed roles");

    let config = Config::for_testing();
    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::new(pool.clone(), config.clone(), mailer.clone());

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        mailer,
        config,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Browser-like client: keeps cookies, does not follow redirects.
    pub fn browser(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    /// Inserts an account directly. The password is always [`PASSWORD`].
    pub async fn create_user(&self, email: &str, username: &str, confirmed: bool) -> User {
        let new_user = NewUser {
            email,
            username,
            password: PASSWORD,
            confirmed,
        };
        users::create(&self.pool, &new_user, self.config.admin_email.as_deref())
            .await
            .expect("Failed to create user")
    }

    /// Logs `client` in through the login form.
    pub async fn login(&self, client: &reqwest::Client, username: &str) -> reqwest::Response {
        client
            .post(self.url("/auth/login"))
            .form(&[("username", username), ("password", PASSWORD)])
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Waits for the background mailer to deliver to `to`.
    pub async fn wait_for_mail(&self, to: &str) -> inkpost::utils::mail::Email {
        for _ in 0..100 {
            if let Some(email) = self.mailer.last_to(to) {
                return email;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no mail was sent to {to}");
    }
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
