use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use super::required;
use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, Result},
    models::{LoginRequest, LoginResponse, NewUser, RegisterRequest, Role, User},
    password::{self, MIN_PASSWORD_LEN},
    policy::{self, Action, Resource},
    response::ApiResponse,
};

/// register_user
///
/// [Public Route] Creates an account. The password is stored only as an Argon2id hash.
/// Self-registered accounts are always plain users; a `role` in the body is ignored.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Missing fields, short password or email taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<User>> {
    let user = create_account(&state, payload, Role::User).await?;
    Ok(ApiResponse::created(user))
}

/// Validates a registration payload and stores the account with `role`.
pub(crate) async fn create_account(
    state: &AppState,
    payload: RegisterRequest,
    role: Role,
) -> Result<User> {
    let missing = "All fields are required";
    let name = required(&payload.name, missing)?;
    let email = required(&payload.email, missing)?;
    if payload.password.is_empty() {
        return Err(AppError::validation(missing));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    if state.repo.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::validation("Email already taken"));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok(user)
}

/// login_user
///
/// [Public Route] Exchanges credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing fields or invalid credentials")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>> {
    let missing = "Email and password are required";
    let email = required(&payload.email, missing)?;
    if payload.password.is_empty() {
        return Err(AppError::validation(missing));
    }

    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::validation("No user found"))?;

    if !password::verify_password(&payload.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "login rejected: bad password");
        return Err(AppError::validation("Invalid credentials"));
    }

    let token = auth::issue_token(&user, &state.config)?;
    Ok(ApiResponse::ok(LoginResponse { token, user }))
}

/// get_me
///
/// [Authenticated Route] The requester's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(auth: AuthUser, State(state): State<AppState>) -> Result<ApiResponse<User>> {
    let user = state
        .repo
        .get_user(auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ApiResponse::ok(user))
}

/// get_user
///
/// [Authenticated Route] A user's profile, visible to that user and to admins.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 403, description = "Not self or admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<User>> {
    policy::authorize(&auth, Action::ViewUser, &Resource::User { id })?;

    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ApiResponse::ok(user))
}
