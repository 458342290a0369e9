use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument, warn};

use super::{
    dto::{MessageResponse, UserEnvelope},
    repo_types::User,
    services::UserError,
    validation::{validate_create, validate_id, validate_update, RawUserPayload},
};
use uuid::Uuid;

use crate::{
    config::Environment,
    error::{route_not_found, ApiError, FieldError},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/users",
            get(list_users).post(create_user).fallback(route_not_found),
        )
        .route(
            "/api/users/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(route_not_found),
        )
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Could not fetch the list of users",
            Operation::Get => "Could not fetch the user",
            Operation::Create => "Could not create the user",
            Operation::Update => "Could not update the user",
            Operation::Delete => "Could not remove the user",
        }
    }

    fn not_found_details(self) -> &'static str {
        match self {
            Operation::Update => "The user you are trying to update does not exist or was removed",
            Operation::Delete => {
                "The user you are trying to remove does not exist or was already removed"
            }
            _ => "The requested user does not exist or was removed",
        }
    }

    fn conflict_details(self) -> &'static str {
        match self {
            Operation::Update => "Another user with this email already exists",
            _ => "A user with this email already exists",
        }
    }

    fn into_api_error(self, err: UserError, env: Environment) -> ApiError {
        match err {
            UserError::Validation(errors) => ApiError::invalid_data(errors),
            UserError::Conflict => {
                ApiError::new(StatusCode::BAD_REQUEST, "Email already registered")
                    .with_details(self.conflict_details())
            }
            UserError::NotFound => ApiError::new(StatusCode::NOT_FOUND, "User not found")
                .with_details(self.not_found_details()),
            UserError::Internal(e) => {
                error!(error = %e, operation = ?self, "user operation failed");
                ApiError::internal(self.failure_message(), &e, env)
            }
        }
    }
}

fn parse_body(
    payload: Result<Json<RawUserPayload>, JsonRejection>,
) -> Result<RawUserPayload, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            warn!(error = %rejection, "unreadable request body");
            Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid data")
                .with_details(rejection.body_text()))
        }
    }
}

/// Undecodable path segments get the same treatment as malformed ids.
fn parse_id(path: Result<Path<String>, PathRejection>) -> Result<Uuid, Vec<FieldError>> {
    match path {
        Ok(Path(raw)) => validate_id(&raw),
        Err(rejection) => {
            warn!(error = %rejection, "unreadable id in path");
            Err(vec![FieldError::new("id", "invalid id")])
        }
    }
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let env = state.config.env;
    let users = state
        .users
        .list()
        .await
        .map_err(|e| Operation::List.into_api_error(e, env))?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let env = state.config.env;
    let fail = |e| Operation::Get.into_api_error(e, env);
    let id = parse_id(id).map_err(|errs| fail(UserError::Validation(errs)))?;
    let user = state.users.get(id).await.map_err(fail)?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<RawUserPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let env = state.config.env;
    let fail = |e| Operation::Create.into_api_error(e, env);
    let input = validate_create(parse_body(payload)?)
        .map_err(|errs| fail(UserError::Validation(errs)))?;
    let user = state.users.create(input).await.map_err(fail)?;
    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            message: "User created successfully",
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<RawUserPayload>, JsonRejection>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let env = state.config.env;
    let fail = |e| Operation::Update.into_api_error(e, env);

    // id and body problems are reported together
    let id = parse_id(id);
    let changes = validate_update(parse_body(payload)?);
    let (id, changes) = match (id, changes) {
        (Ok(id), Ok(changes)) => (id, changes),
        (id, changes) => {
            let mut errors = id.err().unwrap_or_default();
            errors.extend(changes.err().unwrap_or_default());
            return Err(fail(UserError::Validation(errors)));
        }
    };

    let user = state.users.update(id, changes).await.map_err(fail)?;
    Ok(Json(UserEnvelope {
        message: "User updated successfully",
        user,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let env = state.config.env;
    let fail = |e| Operation::Delete.into_api_error(e, env);
    let id = parse_id(id).map_err(|errs| fail(UserError::Validation(errs)))?;
    state.users.delete(id).await.map_err(fail)?;
    Ok(Json(MessageResponse {
        message: "User removed successfully",
        details: "The user was removed from the system",
    }))
}
