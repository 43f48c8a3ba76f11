/// Shared Relief Hub types.
///
/// `models` holds the domain records and their enums, `api` the request and
/// response bodies exchanged over HTTP, `money` the decimal helpers used to
/// move amounts between memory and storage.
pub mod api;
pub mod models;
pub mod money;
