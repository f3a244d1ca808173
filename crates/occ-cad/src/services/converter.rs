//! Conversion between kernel primitives and plain data

use std::sync::Arc;

use occ_core::{Point3, ShapeKind, Vector3};

use crate::error::{KernelResultExt, OccResult};
use crate::kernel::{
    Algorithm, AlgorithmRequest, Compound, GpDir, GpPnt, GpVec, Kernel, Shape,
};

pub struct ConverterService {
    kernel: Arc<dyn Kernel>,
}

impl ConverterService {
    /// Create a converter reading from `kernel`
    pub fn new(kernel: Arc<dyn Kernel>) -> Self {
        Self { kernel }
    }

    /// Coordinates of a point primitive
    pub fn point_from_pnt(&self, pnt: &GpPnt) -> OccResult<Point3> {
        self.kernel.coords(pnt.id()).during("read point")
    }

    /// Components of a vector primitive
    pub fn vector_from_vec(&self, vec: &GpVec) -> OccResult<Vector3> {
        self.kernel.coords(vec.id()).during("read vector")
    }

    /// Components of a unit direction
    pub fn vector_from_dir(&self, dir: &GpDir) -> OccResult<Vector3> {
        self.kernel.coords(dir.id()).during("read direction")
    }

    /// Group shapes into one compound without copying them
    pub fn make_compound(&self, shapes: &[&Shape]) -> OccResult<Compound> {
        let request = AlgorithmRequest::MakeCompound {
            shapes: shapes.iter().map(|s| s.id()).collect(),
        };
        let builder = Algorithm::build(&self.kernel, &request, "make compound")?;
        let raw = builder.raw_shape("make compound")?;
        Compound::try_from(Shape::from_parts(raw, Some(ShapeKind::Compound)))
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{fixture, square_wire};

    #[test]
    fn test_point_roundtrip() {
        let (memory, occ) = fixture();
        let base = occ.base();
        {
            let pnt = base.pnt([1.0, -2.0, 3.5]).unwrap();
            assert_eq!(base.converter().point_from_pnt(&pnt).unwrap(), [1.0, -2.0, 3.5]);
        }
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_direction_is_normalized() {
        let (_memory, occ) = fixture();
        let base = occ.base();
        let dir = base.dir([0.0, 0.0, 5.0]).unwrap();
        assert_eq!(base.converter().vector_from_dir(&dir).unwrap(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_compound_keeps_children() {
        let (memory, occ) = fixture();
        let a = square_wire(&occ, 1.0);
        let b = square_wire(&occ, 2.0);
        let before = memory.live_total();
        let compound = occ
            .base()
            .converter()
            .make_compound(&[a.shape(), b.shape()])
            .unwrap();
        assert_eq!(occ.wires().get_wires(compound.shape()).unwrap().len(), 2);
        drop(compound);
        assert_eq!(memory.live_total(), before);
    }
}
