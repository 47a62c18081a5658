//! The authorization core: pure decision logic with no HTTP or SQL
//! dependency. Everything here is exercised directly by unit tests; the
//! adapter and store modules are thin shells around it.

pub mod authorizer;
pub mod client;
pub mod credentials;
pub mod decision;
pub mod permission;
pub mod repository;
pub mod route;
pub mod signature;

pub use authorizer::{AuthorizeInput, Authorizer};
pub use client::{Client, ClientStatus};
pub use credentials::Headers;
pub use decision::{Decision, ReasonTag, SubReason};
pub use permission::Permission;
pub use repository::{InMemoryRepository, Repository, RepositoryError};
pub use route::{Method, MethodPolicy, Route};
pub use signature::{Clock, FixedClock, SystemClock};
