//! User model for drive.
//!
//! Users are not registered through the API: they are provisioned from the
//! claims of the identity token the first time they call it.

/// User entity.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (identity token subject).
    pub id: String,
    /// Email address, used as the analytics identity.
    pub email: Option<String>,
    /// Display name.
    pub full_name: Option<String>,
    /// Account creation timestamp.
    pub created_at: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// User ID.
    pub id: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Display name (optional).
    pub full_name: Option<String>,
}

impl NewUser {
    /// Create a new user with a random ID.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create a new user with the given ID.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            full_name: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

impl Default for NewUser {
    fn default() -> Self {
        Self::new()
    }
}

/// Data for updating an existing user.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New email address.
    pub email: Option<Option<String>>,
    /// New display name.
    pub full_name: Option<Option<String>>,
}

impl UserUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set new email.
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = Some(email);
        self
    }

    /// Set new display name.
    pub fn full_name(mut self, full_name: Option<String>) -> Self {
        self.full_name = Some(full_name);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.full_name.is_none()
    }
}
