//! # Domain Layer (Inner Hexagon)
//!
//! Pure values, entities and services shared by the interpreter and its
//! collaborators. No I/O and no state access.

pub mod entities;
pub mod fork;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use fork::*;
pub use services::*;
pub use value_objects::*;
