//! Domain errors → HTTP responses.
//!
//! Every error body is `{"error": <code>, "message": <text>}`, plus `errors`
//! when a service reported several coded errors or `fields` for form errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use orgdesk_accounts::AccountError;
use orgdesk_catalog::ItemError;
use orgdesk_core::{FieldErrors, StoreError};
use orgdesk_crud::{CrudError, RegistryError, SourceError};
use orgdesk_orgs::{ErrorCode, ServiceErrors, SettingsError};

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden | ErrorCode::OrganizationRequired => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::AlreadyMember | ErrorCode::LastAdminForbidden | ErrorCode::SetupComplete => {
            StatusCode::CONFLICT
        }
        ErrorCode::InvalidRole | ErrorCode::EmailRequired | ErrorCode::ValidationError => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn service_errors_response(errors: ServiceErrors) -> Response {
    let code = errors.code();
    let mut body = json!({
        "error": code.as_str(),
        "message": errors.first().message,
    });
    if errors.len() > 1 || errors.first().field.is_some() {
        body["errors"] = json!(errors);
    }
    (status_for(code), axum::Json(body)).into_response()
}

pub fn organization_required() -> Response {
    json_error(
        StatusCode::FORBIDDEN,
        ErrorCode::OrganizationRequired.as_str(),
        "no active organization",
    )
}

pub fn field_errors_response(errors: FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": ErrorCode::ValidationError.as_str(),
            "message": errors.to_string(),
            "fields": errors,
        })),
    )
        .into_response()
}

pub fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
    }
}

pub fn crud_error_response(err: CrudError) -> Response {
    let code = err.code();
    let status = match &err {
        CrudError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CrudError::Forbidden(_) => StatusCode::FORBIDDEN,
        CrudError::ExportDisabled => StatusCode::NOT_FOUND,
        CrudError::FormatNotAllowed(_) | CrudError::UnknownFormat(_) => StatusCode::BAD_REQUEST,
        CrudError::Source(SourceError::UnknownField(_)) => StatusCode::BAD_REQUEST,
        CrudError::NoExportFields | CrudError::Export(_) | CrudError::Source(_) => {
            tracing::error!(error = %err, "listing failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, code, "internal error");
        }
    };
    json_error(status, code, err.to_string())
}

pub fn registry_error_response(err: RegistryError) -> Response {
    json_error(StatusCode::BAD_REQUEST, "unknown_listing", err.to_string())
}

pub fn item_error_response(err: ItemError) -> Response {
    match err {
        ItemError::Denied(e) => crud_error_response(e),
        ItemError::Invalid(fields) => field_errors_response(fields),
        ItemError::Store(e) => store_error_response(e),
    }
}

pub fn account_error_response(err: AccountError) -> Response {
    match err {
        AccountError::SelfDeactivation | AccountError::SuperuserProtected => {
            json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
        }
        AccountError::Denied(e) => crud_error_response(e),
        AccountError::Invalid(fields) => field_errors_response(fields),
        AccountError::InvalidToken => json_error(StatusCode::BAD_REQUEST, "invalid_token", err.to_string()),
        AccountError::Delivery(_) => json_error(StatusCode::BAD_GATEWAY, "delivery_failed", err.to_string()),
        AccountError::Signing(_) => {
            tracing::error!(error = %err, "verification link signing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
        AccountError::Store(e) => store_error_response(e),
    }
}

pub fn settings_error_response(err: SettingsError) -> Response {
    match err {
        SettingsError::Denied(e) => crud_error_response(e),
        SettingsError::Invalid(fields) => field_errors_response(fields),
        SettingsError::Store(e) => store_error_response(e),
    }
}

pub fn invalid_id(what: &str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}
