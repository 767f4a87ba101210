//! Static bearer-token authentication.
//!
//! ```ignore
//! use axum_helpers::auth::{AuthConfig, BearerAuth, bearer_auth_middleware};
//! use core_config::FromEnv;
//!
//! let auth = BearerAuth::new(&AuthConfig::from_env()?);
//! let protected = Router::new()
//!     .route("/vector_stores", get(list))
//!     .route_layer(axum::middleware::from_fn_with_state(auth, bearer_auth_middleware));
//! ```

pub mod bearer;
pub mod config;

pub use bearer::{BearerAuth, bearer_auth_middleware, extract_bearer_token};
pub use config::AuthConfig;
