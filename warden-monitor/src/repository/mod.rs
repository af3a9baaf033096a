//! Repository layer
//!
//! Repositories are stateless HTTP clients that abstract communication
//! with the control plane. They provide simple, focused interfaces for
//! different API endpoints without any business logic.
//!
//! All repositories are trait-based to enable testing and mocking.

mod services;

pub use services::HttpServiceRepository;
pub use services::ServiceRepository;
