//! Domain types and DTOs
//!
//! These types define the data structures for roadside assistance entities.

pub mod ai;
pub mod location;
pub mod notifications;
pub mod roles;
pub mod service_requests;
pub mod technicians;

pub use location::Location;
pub use roles::{Actor, UserRole};
pub use service_requests::*;
pub use technicians::*;

// AI and notification types are accessed via their modules to avoid namespace pollution
