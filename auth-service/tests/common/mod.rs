use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use auth::ClaimMap;
use auth::Subject;
use auth::Token;
use auth::TokenCodec;
use auth_service::inbound::http::middleware::AuthSettings;
use auth_service::inbound::http::router::create_router;
use auth_service::user::errors::StoreError;
use auth_service::user::models::StdUser;
use auth_service::user::ports::SharedUser;
use auth_service::user::ports::UserStore;
use chrono::Duration;
use chrono::Utc;

pub const SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const ISSUER: &str = "test-host";

/// Plaintext credential store seeded with bob, carol and root.
pub struct TestUserStore {
    users: HashMap<String, (StdUser, String)>,
}

impl TestUserStore {
    pub fn new() -> Self {
        let users = [
            (StdUser::new("bob", "Bob").with_email("bob@example.org"), "b0b"),
            (
                StdUser::new("carol", "Carol").with_claim("team", "platform"),
                "pass:word",
            ),
            (StdUser::new("root", "Root").with_admin(true), "t00r"),
        ]
        .into_iter()
        .map(|(user, password)| (user.id.clone(), (user, password.to_string())))
        .collect();

        Self { users }
    }
}

#[async_trait]
impl UserStore for TestUserStore {
    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SharedUser, StoreError> {
        match self.users.get(username) {
            Some((user, stored)) if stored == password => Ok(Arc::new(user.clone())),
            _ => Err(StoreError::InvalidCredentials),
        }
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<SharedUser, StoreError> {
        self.users
            .get(user_id)
            .map(|(user, _)| Arc::new(user.clone()) as SharedUser)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }

    async fn close(&self) {}
}

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub authenticator: Arc<Authenticator>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let authenticator = Arc::new(Authenticator::new(
            TokenCodec::new(SECRET, ISSUER),
            Duration::hours(24),
        ));
        let settings = AuthSettings::new(Arc::clone(&authenticator), Arc::new(TestUserStore::new()));
        let router = create_router(Arc::new(settings));

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::builder()
                .build()
                .expect("Failed to create reqwest client"),
            authenticator,
        }
    }

    /// Token for `user_id`, bound to `client_address` when given
    pub fn token_for(&self, user_id: &str, client_address: Option<&str>) -> String {
        let subject = Subject {
            id: user_id,
            name: user_id,
            domain: None,
        };
        self.authenticator
            .issue(subject, client_address, &ClaimMap::new())
            .expect("Failed to issue token")
            .access_token
    }

    /// Token for `user_id` that expired an hour ago
    pub fn expired_token_for(&self, user_id: &str) -> String {
        let token = Token::issued(
            user_id,
            user_id,
            Utc::now() - Duration::hours(2),
            Duration::hours(1),
        );
        self.authenticator
            .codec()
            .encode(&token)
            .expect("Failed to encode token")
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }
}
