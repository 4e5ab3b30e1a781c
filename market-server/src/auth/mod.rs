//! Authentication boundary
//!
//! - [`JwtService`] - token validation
//! - [`CurrentUser`] - authenticated caller
//! - [`require_auth`] - bearer-token middleware for `/api/`
//! - [`require_staff`] - admin/manager gate for `/api/admin/`

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_auth, require_role, require_staff};
