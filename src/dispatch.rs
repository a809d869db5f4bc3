//! Purpose: Route a declared content type to one of the decode pipelines.
//! Exports: `Route`, `route`.
//! Role: Entry gate; anything unrecognized is an explicit skip, not an error.
//! Invariants: Matching is a case-sensitive prefix match; parameters never affect routing.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Route {
    Json,
    UrlEncoded,
    Multipart,
}

/// Pick the decode pipeline for a declared content type.
///
/// Parameters such as `charset` or `boundary` are ignored here; the form
/// decoder consumes them later. `None` means the request carries no body
/// this crate knows how to decode.
pub fn route(content_type: Option<&str>) -> Option<Route> {
    let declared = content_type?;
    if declared.starts_with("application/json") {
        return Some(Route::Json);
    }
    if declared.starts_with("application/x-www-form-urlencoded") {
        return Some(Route::UrlEncoded);
    }
    if declared.starts_with("multipart/form-data") {
        return Some(Route::Multipart);
    }
    None
}
