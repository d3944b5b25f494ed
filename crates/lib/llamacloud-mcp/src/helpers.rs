use std::borrow::Cow;

use llamacloud_core::RouteError;
use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use serde_json::json;

fn mcp_err(
    code: ErrorCode,
    message: impl Into<Cow<'static, str>>,
    kind: &'static str,
) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: Some(json!({ "kind": kind })),
    }
}

/// Caller mistakes map to `INVALID_PARAMS`, engine failures to `INTERNAL_ERROR`.
pub fn map_route_err(err: &RouteError) -> ErrorData {
    let code = match err {
        RouteError::UnknownTool(_) | RouteError::MissingQuery => ErrorCode::INVALID_PARAMS,
        RouteError::RetrievalFailed(_) => ErrorCode::INTERNAL_ERROR,
    };
    mcp_err(code, err.to_string(), err.code())
}
