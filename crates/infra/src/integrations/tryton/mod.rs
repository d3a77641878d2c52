/// Tryton ERP integration module
///
/// JSON-RPC client and supporting machinery for talking to a Tryton server:
/// session authentication, endpoint routing, response caching, and error
/// classification.
///
/// # Architecture
///
/// - **Client**: [`TrytonClient`] - JSON-RPC dispatcher implementing the
///   `ErpGateway` port from the core crate
/// - **Sessions**: [`session`] - login result parsing and the cached
///   `Authorization: Session ...` header
/// - **Endpoints**: [`endpoints`] - root vs `{database}/` URL routing
/// - **Cache**: [`cache`] - TTL-bounded memoization of read-only calls
/// - **Errors**: [`errors`] - HTTP and RPC failure classification
///
/// # Usage
///
/// ```no_run
/// use portico_domain::ErpConfig;
/// use portico_infra::integrations::tryton::TrytonClient;
///
/// # async fn example() -> portico_domain::Result<()> {
/// let config = ErpConfig {
///     base_url: "http://erp.internal:8000".to_string(),
///     database: "portal".to_string(),
///     username: "portal-service".to_string(),
///     password: "secret".to_string(),
///     ..Default::default()
/// };
///
/// let client = TrytonClient::new(config)?;
/// let products = client
///     .call("model.product.product", "search", vec![serde_json::json!([[]])])
///     .await?;
/// println!("products: {products}");
/// # Ok(())
/// # }
/// ```
///
/// # Authentication
///
/// The client logs in lazily with the configured service account and caches
/// the session header. Expired sessions are renewed transparently with a
/// single retry of the failed call.
///
/// # Error Handling
///
/// - Network errors: retried automatically by `HttpClient`
/// - Authentication failures: `PorticoError::Auth`, triggering one re-login
/// - RPC faults: `PorticoError::Rpc` with the server's code, message, data
pub mod cache;
pub mod endpoints;
pub mod errors;
pub mod session;

mod client;

pub use client::TrytonClient;
