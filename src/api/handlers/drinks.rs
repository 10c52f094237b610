/*
 * Responsibility
 * - /drinks 系 CRUD handler
 * - 認可は route 側の permission middleware で済んでいる。handler は AuthClaims を明示的に受け取る
 * - Json の rejection も ErrorResponse 形式 (422) に揃える
 */
use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use crate::{
    api::{
        dto::drinks::{
            CreateDrinkRequest, DeleteDrinkResponse, DrinkLong, DrinkShort, DrinksResponse,
            UpdateDrinkRequest,
        },
        extractors::AuthClaims,
    },
    error::AppError,
    repos::{DrinkRow, DrinkStore},
    state::AppState,
};

async fn list_all(store: &Arc<dyn DrinkStore>) -> Result<Vec<DrinkRow>, AppError> {
    let rows = store.list().await?;
    if rows.is_empty() {
        return Err(AppError::NotFound);
    }
    Ok(rows)
}

// Non-numeric ids are unknown drinks, not bad requests.
fn parse_drink_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id).map_err(|_| AppError::NotFound)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::unprocessable(rejection.body_text()))
}

/// GET /drinks (public, short representation)
pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<DrinkShort>>, AppError> {
    let rows = list_all(&state.store).await?;
    Ok(Json(DrinksResponse::new(
        rows.into_iter().map(DrinkShort::from).collect(),
    )))
}

/// GET /drinks-detail (get:drinks-detail)
pub async fn list_drinks_detail(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let rows = list_all(&state.store).await?;
    tracing::debug!(subject = %claims.subject, count = rows.len(), "drinks detail listed");

    Ok(Json(DrinksResponse::new(
        rows.into_iter().map(DrinkLong::from).collect(),
    )))
}

/// POST /drinks (post:drinks)
pub async fn create_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    payload: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let (title, recipe) = json_body(payload)?
        .validate()
        .map_err(AppError::unprocessable)?;

    let row = state.store.create(&title, &recipe).await?;
    tracing::info!(subject = %claims.subject, drink_id = row.id, "drink created");

    Ok(Json(DrinksResponse::new(vec![DrinkLong::from(row)])))
}

/// PATCH /drinks/{drink_id} (patch:drinks)
pub async fn update_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let drink_id = parse_drink_id(path)?;
    let (title, recipe) = json_body(payload)?
        .validate()
        .map_err(AppError::unprocessable)?;

    let row = state
        .store
        .update(drink_id, title.as_deref(), recipe.as_deref())
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(subject = %claims.subject, drink_id, "drink updated");

    Ok(Json(DrinksResponse::new(vec![DrinkLong::from(row)])))
}

/// DELETE /drinks/{drink_id} (delete:drinks)
pub async fn delete_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteDrinkResponse>, AppError> {
    let drink_id = parse_drink_id(path)?;
    let drink = state.store.get(drink_id).await?.ok_or(AppError::NotFound)?;

    // A concurrent delete may win between the lookup and here.
    if !state.store.delete(drink.id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(subject = %claims.subject, drink_id, title = %drink.title, "drink deleted");

    Ok(Json(DeleteDrinkResponse {
        success: true,
        delete: drink_id,
    }))
}
