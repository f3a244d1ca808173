//! B-rep Kernel Facade
//!
//! This crate provides:
//! - A typed kernel boundary with scoped ownership of native objects
//! - An allocation-counting in-memory reference kernel
//! - One service per topological level, each depending only on lower levels
//! - The `OccHelper` facade that wires the services together

pub mod error;
pub mod helper;
pub mod kernel;
pub mod services;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use error::{KernelResultExt, OccError, OccResult};
pub use helper::{OccBase, OccHelper};
pub use kernel::{
    Compound, Edge, Face, Kernel, KernelError, MemoryKernel, Shape, Shell, Solid, Vertex, Wire,
    default_kernel,
};
pub use services::{
    ArcMode, BooleansService, ConverterService, EdgesService, EntitiesService, EnumService,
    FacesService, FilletsService, GeomService, IteratorService, OperationsService,
    ShapeGettersService, ShellsService, SolidsService, TransformsService, VerticesService,
    WiresService,
};
