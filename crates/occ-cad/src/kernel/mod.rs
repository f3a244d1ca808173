//! Kernel boundary
//!
//! - [`Kernel`]: the typed foreign interface to a B-rep kernel
//! - [`native`]: scoped owners that release native objects exactly once
//! - [`MemoryKernel`]: allocation-counting in-memory reference kernel

pub mod memory;
pub mod native;
pub mod traits;

use std::sync::Arc;

pub use memory::MemoryKernel;
pub use native::{
    Algorithm, Compound, CurveAdaptor, Edge, Face, Geom2dCurve, GeomCurve, GeomSurface, GpAx1,
    GpAx2, GpCirc, GpDir, GpElips, GpPnt, GpTrsf, GpVec, Native, Properties, Shape, ShapeMap,
    Shell, Solid, Vertex, Wire,
};
pub use traits::{
    AlgorithmRequest, ArcOfCircleRequest, BooleanOperation, GPropKind, GeomAbsCurveType, Kernel,
    KernelError, KernelResult, NativeClass, NativeId, TopAbsOrientation, TopAbsShapeEnum,
    TrsfRequest,
};

/// Get the default kernel
pub fn default_kernel() -> Arc<dyn Kernel> {
    Arc::new(MemoryKernel::default())
}
