// src/handlers/auth.rs

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, PublicUser, Role, User},
    store::{self, DocumentStore, Filter, SharedStore, StoreError, USERS},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Looks a user up by username.
pub async fn find_user(store: &dyn DocumentStore, username: &str) -> Result<Option<User>, AppError> {
    let filter = Filter::eq("username", username);
    let mut users: Vec<User> = store::list_as(store, USERS, Some(&filter)).await?;
    Ok(users.pop())
}

/// Creates a user with a username no other account holds. Returns the new id.
pub async fn create_account(
    store: &dyn DocumentStore,
    username: &str,
    password: &str,
    role: Role,
) -> Result<String, AppError> {
    let taken = || AppError::Conflict(format!("Username '{}' already exists", username));

    // Skips the hash for obvious duplicates; the store decides races.
    if find_user(store, username).await?.is_some() {
        return Err(taken());
    }

    let user = User {
        id: String::new(),
        username: username.to_string(),
        password_hash: hash_password(password)?,
        role,
        created_at: Utc::now(),
    };

    let id = store::create_unique_from(store, USERS, "username", &user)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => taken(),
            other => AppError::from(other),
        })?;
    tracing::info!(user = %id, %role, "User account created");
    Ok(id)
}

/// Registers a new student.
///
/// Public registration never grants a staff role.
pub async fn register(
    State(store): State<SharedStore>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = create_account(
        store.as_ref(),
        &payload.username,
        &payload.password,
        Role::Student,
    )
    .await?;
    let user: User = store::get_as(store.as_ref(), USERS, &id).await?;

    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

/// Authenticates a user and returns a JWT token plus the dashboard to open.
pub async fn login(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = find_user(store.as_ref(), &payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let token = sign_jwt(
        &user.id,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role,
        "dashboard": user.role.dashboard(),
    })))
}

/// Returns the authenticated user.
pub async fn me(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user: User = store::get_as(store.as_ref(), USERS, &claims.sub).await?;
    Ok(Json(PublicUser::from(user)))
}
