//! Content acquisition: extraction sessions, per-source adapters, mirror
//! rotation and the orchestrator that fans requests out across platforms.

pub mod adapters;
pub mod error;
pub mod extract;
pub mod mirror;
pub mod numbers;
pub mod orchestrator;
pub mod session;
pub mod web_search;

pub use adapters::{AdapterContext, PlatformAdapter};
pub use error::AcquireError;
pub use mirror::MirrorRouter;
pub use numbers::parse_abbreviated_number;
pub use orchestrator::{AdapterConstructor, AdapterRegistry, Orchestrator};
pub use session::{DriverFactory, HttpDriverFactory, PageDriver, Session, SessionConfig, SessionPool};
pub use web_search::{SearchBackend, SearchHit, SiteSearch};
