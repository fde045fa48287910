//! Test helpers for Web API tests.
//!
//! Provides TestApp (an axum-test server over an in-memory database and a
//! temporary storage directory) and helpers to seed users, items and accesses.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::{TestRequest, TestServer};
use tempfile::TempDir;

use drive::analytics::{Analytics, RecordingSink};
use drive::db::{NewUser, User, UserRepository};
use drive::item::{Item, ItemAccessRepository, ItemRepository, NewItem, NewItemAccess, Role};
use drive::storage::{FileStorage, ObjectStorage};
use drive::web::handlers::AppState;
use drive::web::middleware::JwtState;
use drive::web::router::{create_router, RouterOptions};
use drive::{Database, DriveError};

/// JWT secret shared by the server and the tokens minted in tests.
pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// Media base URL download redirects point to.
pub const TEST_MEDIA_BASE_URL: &str = "http://localhost:8083/media";

/// Storage whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingStorage;

impl ObjectStorage for FailingStorage {
    fn save(&self, _key: &str, _content: &[u8]) -> drive::Result<()> {
        Err(DriveError::Storage("bucket unavailable".to_string()))
    }

    fn load(&self, key: &str) -> drive::Result<Vec<u8>> {
        Err(DriveError::NotFound(key.to_string()))
    }

    fn rename(&self, _from: &str, _to: &str) -> drive::Result<()> {
        Err(DriveError::Storage("bucket unavailable".to_string()))
    }

    fn delete(&self, _key: &str) -> drive::Result<bool> {
        Ok(false)
    }

    fn exists(&self, _key: &str) -> bool {
        false
    }
}

/// A running test application.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub db: Arc<Database>,
    pub events: Arc<RecordingSink>,
    _storage_dir: TempDir,
}

impl TestApp {
    /// Create a test application backed by a temporary storage directory.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create storage directory");
        let storage = FileStorage::new(dir.path()).expect("Failed to create storage");
        Self::build(Arc::new(storage), dir).await
    }

    /// Create a test application whose storage rejects every write.
    pub async fn with_failing_storage() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create storage directory");
        Self::build(Arc::new(FailingStorage), dir).await
    }

    async fn build(storage: Arc<dyn ObjectStorage>, dir: TempDir) -> Self {
        let db = Arc::new(
            Database::open_in_memory()
                .await
                .expect("Failed to create test database"),
        );
        let events = Arc::new(RecordingSink::new());

        let state = Arc::new(
            AppState::new(db.clone(), storage, TEST_JWT_SECRET, 900)
                .with_analytics(Analytics::with_sink(events.clone()))
                .with_media_base_url(TEST_MEDIA_BASE_URL)
                .with_max_upload_size(1024),
        );
        let jwt_state = Arc::new(JwtState::new(TEST_JWT_SECRET));
        let options = RouterOptions {
            cors_origins: vec![],
            serve_media: true,
        };

        let router = create_router(state.clone(), jwt_state, &options);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            db,
            events,
            _storage_dir: dir,
        }
    }

    /// Create a user with an email derived from `id`.
    pub async fn create_user(&self, id: &str) -> User {
        UserRepository::new(self.db.pool())
            .create(&NewUser::with_id(id).with_email(format!("{id}@example.com")))
            .await
            .expect("Failed to create user")
    }

    /// Mint an access token for `user`.
    pub fn token(&self, user: &User) -> String {
        self.token_with_teams(user, &[])
    }

    /// Mint an access token for `user` as a member of `teams`.
    pub fn token_with_teams(&self, user: &User, teams: &[&str]) -> String {
        let teams: Vec<String> = teams.iter().map(|t| t.to_string()).collect();
        self.state
            .generate_access_token(&user.id, user.email.as_deref(), None, &teams)
            .expect("Failed to mint token")
    }

    /// Insert an item.
    pub async fn create_item(&self, new_item: NewItem) -> Item {
        ItemRepository::new(self.db.pool())
            .create(&new_item)
            .await
            .expect("Failed to create item")
    }

    /// Insert a root folder owned by `owner`.
    pub async fn create_root(&self, owner: &User, title: &str) -> Item {
        let root = self
            .create_item(NewItem::folder(title).with_creator(&owner.id))
            .await;
        self.grant_user(&root, owner, Role::Owner).await;
        root
    }

    /// Grant `role` on `item` to `user`.
    pub async fn grant_user(&self, item: &Item, user: &User, role: Role) {
        ItemAccessRepository::new(self.db.pool())
            .create(&NewItemAccess::for_user(&item.id, &user.id, role))
            .await
            .expect("Failed to grant access");
    }

    /// Grant `role` on `item` to `team`.
    pub async fn grant_team(&self, item: &Item, team: &str, role: Role) {
        ItemAccessRepository::new(self.db.pool())
            .create(&NewItemAccess::for_team(&item.id, team, role))
            .await
            .expect("Failed to grant access");
    }

    /// Reload an item from the database.
    pub async fn reload(&self, id: &str) -> Option<Item> {
        ItemRepository::new(self.db.pool())
            .get_by_id(id)
            .await
            .expect("Failed to load item")
    }

    /// Store content for an item the way the storage layer addresses it.
    pub fn store(&self, item: &Item, content: &[u8]) {
        let key = item.file_key().expect("Item has no filename");
        self.state
            .storage
            .save(&key, content)
            .expect("Failed to store content");
    }

    /// Names of the analytics events captured so far.
    pub fn event_names(&self) -> Vec<String> {
        self.events.event_names()
    }
}

/// Attach a bearer token to a request.
pub fn authorized(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(AUTHORIZATION, format!("Bearer {token}"))
}
