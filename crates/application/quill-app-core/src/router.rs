//! URL to route glue at the platform boundary.

use quill_core::Route;
use tracing::debug;

/// Decodes `location` (path and query). Unknown or malformed URLs become
/// [`Route::NotFound`].
pub fn resolve(location: &str) -> Route {
    Route::from_url(location).unwrap_or_else(|e| {
        debug!(location, "no route for location: {e}");
        Route::NotFound
    })
}

/// URL to hand to the platform for `route`; `None` keeps the current URL.
pub fn url_for(route: &Route) -> Option<String> {
    let url = route.path_with_params();
    (!url.is_empty()).then_some(url)
}
