use axum::{Json, extract::State};

use super::required;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{Category, CreateCategoryRequest, CreateTagRequest, Tag},
    policy::{self, Action, Resource},
    response::ApiResponse,
};

/// create_category
///
/// [Admin Route] Adds a category. Names are unique.
#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Missing name or already exists"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn create_category(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<ApiResponse<Category>> {
    policy::authorize(&auth, Action::ManageCategories, &Resource::System)?;

    let name = required(&payload.name, "Category name is required")?;
    if state.repo.find_category(&name).await?.is_some() {
        return Err(AppError::validation("Category already exists"));
    }

    let category = state.repo.create_category(&name).await?;
    Ok(ApiResponse::created(category))
}

/// get_categories
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn get_categories(State(state): State<AppState>) -> Result<ApiResponse<Vec<Category>>> {
    Ok(ApiResponse::ok(state.repo.list_categories().await?))
}

/// create_tag
///
/// [Authenticated Route] Any signed-in user may add a tag. Names are unique.
#[utoipa::path(
    post,
    path = "/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Created", body = Tag),
        (status = 400, description = "Missing name or already exists")
    )
)]
pub async fn create_tag(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<ApiResponse<Tag>> {
    let name = required(&payload.name, "Tag name is required")?;
    if state.repo.find_tag(&name).await?.is_some() {
        return Err(AppError::validation("Tag already exists"));
    }

    Ok(ApiResponse::created(state.repo.create_tag(&name).await?))
}

/// get_tags
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/tags",
    responses((status = 200, description = "All tags", body = [Tag]))
)]
pub async fn get_tags(State(state): State<AppState>) -> Result<ApiResponse<Vec<Tag>>> {
    Ok(ApiResponse::ok(state.repo.list_tags().await?))
}
