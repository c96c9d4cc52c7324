//! Inventory route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{self, Result, add_breadcrumb};
use crate::filters;
use crate::flash::{self, Level, Notice};
use crate::forms::{FieldErrors, ItemForm, ItemUpdateRequest};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, InsertOutcome, Item, UpdateOutcome};
use crate::redirect::HOME;
use crate::state::AppState;

pub const ADDED_MESSAGE: &str = "Successfully added an item!";
pub const DUPLICATE_MESSAGE: &str = "That item already exists! Try another one!";
pub const UPDATED_MESSAGE: &str = "Successfully updated an item!";
pub const UPDATE_FAILED_MESSAGE: &str = "Update failed!";
pub const STORAGE_FAILED_MESSAGE: &str = "Something went wrong. Please try again.";

// =============================================================================
// Templates
// =============================================================================

/// Item list with the add-item form.
#[derive(Template, WebTemplate)]
#[template(path = "items/index.html")]
pub struct ItemsTemplate {
    pub user: Option<CurrentUser>,
    pub notices: Vec<Notice>,
    pub items: Vec<Item>,
    pub form: ItemForm,
    pub errors: FieldErrors,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display all items and the add form.
#[instrument(skip_all, fields(user = %user.username))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<ItemsTemplate> {
    let items = state.items().list_all().await?;

    Ok(ItemsTemplate {
        user: Some(user),
        notices: flash::take(&session).await,
        items,
        form: ItemForm::default(),
        errors: FieldErrors::default(),
    })
}

/// Handle the add-item form.
///
/// Invalid input re-renders the page with field errors and writes nothing.
#[instrument(skip_all, fields(user = %user.username))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<ItemForm>,
) -> Result<Response> {
    let item = match form.validate() {
        Ok(item) => item,
        Err(errors) => {
            let items = state.items().list_all().await?;
            return Ok(ItemsTemplate {
                user: Some(user),
                notices: flash::take(&session).await,
                items,
                form,
                errors,
            }
            .into_response());
        }
    };

    match state.items().insert_if_absent(&item).await {
        Ok(InsertOutcome::Inserted) => {
            tracing::info!(item_name = %item.item_name, "Item added");
            add_breadcrumb("items", "Added item", Some(&[("item_name", item.item_name.as_str())]));
            flash::push(&session, Level::Success, ADDED_MESSAGE).await;
        }
        Ok(InsertOutcome::Duplicate) => {
            tracing::warn!(item_name = %item.item_name, "Insert failed due to unique constraint");
            flash::push(&session, Level::Error, DUPLICATE_MESSAGE).await;
        }
        Err(e) => {
            error::report(&e);
            flash::push(&session, Level::Error, STORAGE_FAILED_MESSAGE).await;
        }
    }

    Ok(Redirect::to(HOME).into_response())
}

/// JSON body returned by `POST /items/update`.
#[derive(Debug, Serialize)]
struct UpdateResponse {
    updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl UpdateResponse {
    const fn failed(reason: &'static str) -> Self {
        Self {
            updated: false,
            reason: Some(reason),
            errors: None,
        }
    }
}

/// Rewrite an item located by its old name.
///
/// Called by the page script; the page reloads afterwards and shows the
/// flashed outcome.
#[instrument(skip_all, fields(user = %user.username))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    payload: std::result::Result<Json<ItemUpdateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let mut errors = FieldErrors::default();
            errors.add("body", rejection.body_text());
            return invalid(&session, errors).await;
        }
    };

    let update = match request.validate() {
        Ok(update) => update,
        Err(errors) => return invalid(&session, errors).await,
    };

    let outcome = state
        .items()
        .update_by_old_name(&update.item, &update.old_name)
        .await;

    match outcome {
        Ok(UpdateOutcome::Updated) => {
            tracing::info!(
                old_name = %update.old_name,
                item_name = %update.item.item_name,
                "Item updated"
            );
            flash::push(&session, Level::Success, UPDATED_MESSAGE).await;
            (
                StatusCode::OK,
                Json(UpdateResponse {
                    updated: true,
                    reason: None,
                    errors: None,
                }),
            )
                .into_response()
        }
        Ok(UpdateOutcome::NotFound) => {
            tracing::warn!(old_name = %update.old_name, "Update failed: no such item");
            flash::push(&session, Level::Error, UPDATE_FAILED_MESSAGE).await;
            (
                StatusCode::NOT_FOUND,
                Json(UpdateResponse::failed("not_found")),
            )
                .into_response()
        }
        Ok(UpdateOutcome::Conflict) => {
            tracing::warn!(
                old_name = %update.old_name,
                item_name = %update.item.item_name,
                "Update failed: name already taken"
            );
            flash::push(&session, Level::Error, UPDATE_FAILED_MESSAGE).await;
            (StatusCode::CONFLICT, Json(UpdateResponse::failed("conflict"))).into_response()
        }
        Err(e) => {
            error::report(&e);
            flash::push(&session, Level::Error, STORAGE_FAILED_MESSAGE).await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "updated": false, "reason": "error" })),
            )
                .into_response()
        }
    }
}

async fn invalid(session: &Session, errors: FieldErrors) -> Response {
    flash::push(session, Level::Error, UPDATE_FAILED_MESSAGE).await;
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(UpdateResponse {
            updated: false,
            reason: Some("invalid"),
            errors: Some(errors),
        }),
    )
        .into_response()
}
