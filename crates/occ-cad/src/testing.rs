//! Shared fixtures for unit tests

use std::sync::Arc;

use occ_core::OccConfig;
use occ_core::inputs::PolygonDto;

use crate::helper::OccHelper;
use crate::kernel::{MemoryKernel, Wire};

/// Facade over a fresh counting kernel
pub(crate) fn fixture() -> (Arc<MemoryKernel>, OccHelper) {
    let memory = Arc::new(MemoryKernel::default());
    let occ = OccHelper::new(memory.clone(), OccConfig::default());
    (memory, occ)
}

/// Closed square in the XY plane with one corner at the origin
pub(crate) fn square_wire(occ: &OccHelper, size: f64) -> Wire {
    occ.wires()
        .create_polygon_wire(&PolygonDto {
            points: vec![
                [0.0, 0.0, 0.0],
                [size, 0.0, 0.0],
                [size, size, 0.0],
                [0.0, size, 0.0],
            ],
        })
        .unwrap()
}
