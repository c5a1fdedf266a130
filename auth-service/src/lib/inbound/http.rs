pub mod context;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use context::CurrentUser;
pub use errors::ErrorFormat;
pub use errors::ErrorRenderer;
pub use middleware::AuthGuard;
pub use middleware::AuthSettings;
pub use middleware::SchemeValidator;
