//! Endpoint cookie resolution.
//!
//! # Data Flow
//! ```text
//! config.resolver.cookie_strategy (name)
//!     → registry.rs (name → strategy)
//!     → cookie.rs (CookieResolver, capability-checked)
//!     → reconcile (cookie value per endpoint, if available)
//! ```
//!
//! # Design Decisions
//! - The core depends on the trait only, never on how a strategy is loaded
//! - A missing strategy disables sticky cookies, it is never fatal
//! - Callers check `can_resolve_cookie` before resolving

pub mod cookie;
pub mod registry;

pub use cookie::{CookieResolver, FnResolver, NoopResolver};
pub use registry::{create_resolver, ResolverRegistry};
