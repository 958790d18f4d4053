// Shared HTTP response types for consistent API error/data payloads.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

#[derive(Debug, serde::Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}
