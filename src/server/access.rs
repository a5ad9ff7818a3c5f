//! Access guard middleware and the caller extractor
//!
//! Each resource route carries its own guard layer with the level resolved
//! for that operation. An accepted caller is stored in the request
//! extensions, where handlers read it back as an [`AuthContext`].

use crate::core::auth::{AccessGuard, AccessLevel, AuthContext, Operation};
use crate::core::error::{AuthError, FrameworkResult};
use axum::extract::{FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

/// What one guarded route requires
#[derive(Clone, Debug)]
pub(crate) struct OperationAccess {
    pub guard: Option<AccessGuard>,
    pub required: AccessLevel,
    pub resource: Arc<str>,
    pub operation: Operation,
}

pub(crate) async fn enforce_access(
    State(access): State<OperationAccess>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = access
        .guard
        .as_ref()
        .and_then(|guard| presented_token(guard, &request));
    match authorize(&access, presented.as_deref()).await {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                resource = %access.resource,
                operation = %access.operation,
                required = %access.required,
                error = %e,
                "Access refused"
            );
            e.into_response()
        }
    }
}

async fn authorize(access: &OperationAccess, presented: Option<&str>) -> FrameworkResult<AuthContext> {
    if access.required.is_free() {
        return Ok(AuthContext::Anonymous);
    }
    let Some(guard) = &access.guard else {
        return Err(AuthError::PermissionDenied {
            required: access.required,
            granted: AccessLevel::None,
        }
        .into());
    };
    guard.check(presented, access.required).await
}

/// Token from the guard's header, else from its query parameter
fn presented_token(guard: &AccessGuard, request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(guard.header())
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<HashMap<String, String>>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(mut params)| params.remove(guard.query_param()))
    })
}

/// Handlers take the caller as an argument; routes without a guard see `Anonymous`
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default())
    }
}
