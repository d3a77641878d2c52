//! Endpoint routing for the gateway's split URL space
//!
//! Tryton exposes two URL families: server-wide discovery methods are served
//! at the root, while everything tied to a database (model access, wizards,
//! reports, login) is served under `{database}/`. Posting a database-scoped
//! method to the root returns an opaque 404, so routing mistakes here are
//! expensive to debug downstream. The rules in this module are the single
//! source of truth for which family a method belongs to.

/// Methods served at the server root rather than a database path
pub const ROOT_ENDPOINT_METHODS: [&str; 3] =
    ["common.server.version", "common.db.list", "common.authentication.services"];

/// Returns the URL path suffix for `method`
///
/// Discovery methods resolve to the empty path even though they match the
/// `common.db.` prefix, so the root list is checked first. Unknown method
/// families default to the root.
pub fn resolve_path(database: &str, method: &str) -> String {
    if ROOT_ENDPOINT_METHODS.contains(&method) {
        return String::new();
    }

    if method == "common.db.login"
        || method.starts_with("model.")
        || method.starts_with("wizard.")
        || method.starts_with("report.")
        || method.starts_with("common.db.")
    {
        return database_path(database);
    }

    String::new()
}

/// Path suffix for database-scoped methods, always exactly one trailing slash
pub fn database_path(database: &str) -> String {
    format!("{}/", database.trim_end_matches('/'))
}

/// Joins the server base URL with a path suffix
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Builds the full dotted method name from a service and method
///
/// Callers sometimes pass a method that is already fully qualified (it starts
/// with `{service}.`) or that belongs to the shared `common.` namespace; both
/// are passed through unchanged.
pub fn compose_method(service: &str, method: &str) -> String {
    if method.starts_with("common.") {
        return method.to_string();
    }

    let prefix = format!("{service}.");
    if method.starts_with(&prefix) {
        method.to_string()
    } else {
        format!("{service}.{method}")
    }
}
