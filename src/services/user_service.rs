use std::sync::Arc;

use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::crypto::{ hash_password, verify_password, TokenSigner };
use crate::db::{ entity::user, UserRepository };
use crate::error::{ AppError, Result };

pub struct UserService {
    repository: Arc<UserRepository>,
    token_signer: Arc<TokenSigner>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Partial profile update. Fields left out are unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_staff: user.is_staff,
            date_joined: user.date_joined,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl UserService {
    pub fn new(repository: Arc<UserRepository>, token_signer: Arc<TokenSigner>) -> Self {
        Self {
            repository,
            token_signer,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<UserSummary> {
        let email = normalize_email(&request.email)?;

        if request.password.is_empty() {
            return Err(AppError::invalid_field("password", "This field may not be blank."));
        }
        if request.password != request.password2 {
            return Err(AppError::invalid_field("password", "Passwords don't match."));
        }

        self.ensure_email_free(&email).await?;

        let password_hash = hash_password(&request.password)?;
        let user = self.repository.create(email, password_hash).await?;

        tracing::info!("Registered user {}", user.id);

        Ok(UserSummary {
            id: user.id,
            email: user.email,
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse> {
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let email = normalize_email(&request.email).map_err(|_| invalid())?;
        let user = self.repository.find_by_email(&email).await?.ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash) {
            tracing::debug!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        Ok(TokenResponse {
            access_token: self.token_signer.issue(user.id, &user.email)?,
            token_type: "Bearer",
            expires_in: self.token_signer.ttl_seconds(),
        })
    }

    pub async fn get_profile(&self, identity: &AuthUser) -> Result<UserProfile> {
        let user = self.repository.find_by_id(identity.user_id).await?;
        Ok(user.into())
    }

    pub async fn update_profile(
        &self,
        identity: &AuthUser,
        request: UpdateProfileRequest
    ) -> Result<UserProfile> {
        let user = self.repository.find_by_id(identity.user_id).await?;

        let Some(email) = request.email else {
            return Ok(user.into());
        };

        let email = normalize_email(&email)?;
        if email == user.email {
            return Ok(user.into());
        }

        self.ensure_email_free(&email).await?;
        let user = self.repository.update_email(user, email).await?;

        Ok(user.into())
    }

    async fn ensure_email_free(&self, email: &str) -> Result<()> {
        if self.repository.find_by_email(email).await?.is_some() {
            return Err(AppError::invalid_field("email", "A user with that email already exists."));
        }
        Ok(())
    }
}

/// Trim the address and lowercase its domain part. The local part is kept
/// as typed since mail servers may treat it case-sensitively.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::invalid_field("email", "This field may not be blank."));
    }

    let invalid = || AppError::invalid_field("email", "Enter a valid email address.");

    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    let domain_ok =
        domain.contains('.') &&
        !domain.starts_with('.') &&
        !domain.ends_with('.') &&
        !domain.contains('@');

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    Ok(format!("{}@{}", local, domain.to_lowercase()))
}
