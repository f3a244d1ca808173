//! Facade-level enumerations
//!
//! These are the enums callers see. Translation to and from the kernel's own
//! enumerations happens in the enum service of the facade crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Topological kind of a shape, ordered from the simplest entity to the most
/// composite one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    Vertex,
    Edge,
    Wire,
    Face,
    Shell,
    Solid,
    CompSolid,
    Compound,
}

impl ShapeKind {
    /// All kinds, simplest first
    pub const ALL: [ShapeKind; 8] = [
        ShapeKind::Vertex,
        ShapeKind::Edge,
        ShapeKind::Wire,
        ShapeKind::Face,
        ShapeKind::Shell,
        ShapeKind::Solid,
        ShapeKind::CompSolid,
        ShapeKind::Compound,
    ];

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Vertex => "vertex",
            ShapeKind::Edge => "edge",
            ShapeKind::Wire => "wire",
            ShapeKind::Face => "face",
            ShapeKind::Shell => "shell",
            ShapeKind::Solid => "solid",
            ShapeKind::CompSolid => "compsolid",
            ShapeKind::Compound => "compound",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Orientation of a shape relative to its underlying geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Forward,
    Reversed,
    Internal,
    External,
}

/// Which topological level a shared builder should stop at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TypeSpecificity {
    #[default]
    Edge,
    Wire,
    Face,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_kind_ordering() {
        assert!(ShapeKind::Vertex < ShapeKind::Edge);
        assert!(ShapeKind::Wire < ShapeKind::Face);
        assert!(ShapeKind::Solid > ShapeKind::Wire);
        assert!(ShapeKind::Compound > ShapeKind::Solid);
    }

    #[test]
    fn test_shape_kind_display() {
        assert_eq!(ShapeKind::Shell.to_string(), "shell");
    }
}
