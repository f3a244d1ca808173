//! OCC Facade Core Types
//!
//! This crate provides the plain data shared by the facade and its callers:
//! - Vector and angle math with no kernel resources
//! - Construction and query DTOs
//! - Facade-level enumerations (shape kinds, orientation, builder levels)
//! - Configuration loaded from RON

pub mod config;
pub mod enums;
pub mod inputs;
pub mod vector;

pub use config::{ConfigError, KernelConfig, OccConfig};
pub use enums::{Orientation, ShapeKind, TypeSpecificity};
pub use inputs::{Point2, Point3, Vector3};
pub use vector::VectorHelper;
