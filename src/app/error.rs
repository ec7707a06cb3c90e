use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::Error as SqlxError;

use crate::app::authz::{Capability, Feature};
use crate::app::domain::{OrganizationId, Permission, SubscriptionTier};

/// Application error type for unified error handling across the app.
///
/// Authorization and validation variants are safe to show to the caller verbatim.
/// Store failures are logged where they happen and surface as `Persistence`
/// with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No principal was resolved for the call.
    #[error("Authentication required")]
    Unauthenticated,

    /// Tier gate failed.
    #[error("Upgrade to {} tier to access {feature} features", .required.label())]
    UpgradeRequired { feature: Feature, required: SubscriptionTier },

    /// Global-role gate failed.
    #[error("Your account role does not allow this action")]
    ForbiddenGlobal { capability: Capability },

    /// Organization-role gate failed.
    #[error("Missing organization permission {permission}")]
    ForbiddenOrg { permission: Permission },

    /// Resource missing or owned by another tenant. The two cases render identically.
    #[error("Not found")]
    NotFoundOrForbidden,

    /// Input failed validation. Only produced after authorization passed.
    #[error("{0}")]
    Validation(String),

    /// Store failure, already logged with full context.
    #[error("{message}")]
    Persistence { operation: &'static str, message: &'static str },

    /// A data-layer call was attempted outside a tenant context.
    #[error("Tenant context required for this operation")]
    MissingTenantContext,

    /// A nested call tried to switch tenants mid-operation.
    #[error("Tenant context already bound to {active}; refusing to enter {requested}")]
    TenantConflict { active: OrganizationId, requested: OrganizationId },

    /// Raw database errors (500 Internal Server Error). Converted to `Persistence` by the pipeline.
    #[error(transparent)]
    Database(#[from] SqlxError),

    /// Generic internal errors (500 Internal Server Error)
    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::UpgradeRequired { .. } => "upgrade_required",
            AppError::ForbiddenGlobal { .. } => "forbidden_global",
            AppError::ForbiddenOrg { .. } => "forbidden_org",
            AppError::NotFoundOrForbidden => "not_found",
            AppError::Validation(_) => "validation_failed",
            AppError::Persistence { .. } => "persistence_error",
            AppError::MissingTenantContext
            | AppError::TenantConflict { .. }
            | AppError::Database(_)
            | AppError::Internal => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::UpgradeRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::ForbiddenGlobal { .. } | AppError::ForbiddenOrg { .. } => StatusCode::FORBIDDEN,
            AppError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence { .. }
            | AppError::MissingTenantContext
            | AppError::TenantConflict { .. }
            | AppError::Database(_)
            | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort_unstable();
        AppError::Validation(format!("Invalid input: {}", fields.join(", ")))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(err) => {
                tracing::error!(%err, "database error");
                "Internal server error".to_string()
            }
            AppError::MissingTenantContext | AppError::TenantConflict { .. } => {
                tracing::error!(error = %self, "tenant context violation");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Input {
        #[validate(length(min = 1))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn validation_message_names_fields_in_order() {
        let err: AppError = Input { name: String::new(), email: "nope".into() }
            .validate()
            .unwrap_err()
            .into();
        assert_eq!(err.to_string(), "Invalid input: email, name");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_variants_share_a_generic_code() {
        assert_eq!(AppError::MissingTenantContext.code(), "internal");
        assert_eq!(AppError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
