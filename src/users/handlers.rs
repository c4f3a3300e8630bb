use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::{require_self_or_admin, AdminUser, CurrentUser},
        jwt::JwtKeys,
        password::verify_password,
    },
    error::AppError,
    state::AppState,
    users::{
        dto::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest, UpdateUserRequest},
        repo::{Role, User, UserChanges},
        validate,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/", get(list_users))
        .route("/:id", put(update_user).delete(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let role = validate::validate_register(&payload)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }
    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(AppError::Conflict("Username already taken".into()));
    }

    let user = User::create(
        &state.db,
        &payload.username,
        &payload.email,
        &payload.password,
        role,
    )
    .await?;

    let token = JwtKeys::from_ref(&state).sign(user.id, user.role)?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    // One message for both failure modes, so callers cannot probe which
    // usernames exist.
    let invalid = || AppError::Unauthorized("Invalid username or password".into());

    let user = User::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            invalid()
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(&state).sign(user.id, user.role)?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        token,
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<User>>, AppError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(users))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let requested_role = validate::validate_update(&payload)?;
    require_self_or_admin(&actor, id)?;

    // Role changes are admin-only; a non-admin's role field is dropped,
    // not rejected.
    let role = if actor.role == Role::Admin {
        requested_role
    } else {
        if requested_role.is_some() {
            warn!(user_id = actor.id, "non-admin role change ignored");
        }
        None
    };

    let user = User::update(
        &state.db,
        id,
        UserChanges {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            password_is_hashed: false,
            role,
        },
    )
    .await?;

    info!(user_id = user.id, actor_id = actor.id, "user updated");
    Ok(Json(MessageResponse {
        message: "User updated successfully".into(),
    }))
}

#[instrument(skip(state, actor))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    User::delete(&state.db, id).await?;

    info!(user_id = id, actor_id = actor.id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}
