//! Kernel primitive constructors
//!
//! Every constructor returns a scoped owner; inputs are validated before
//! anything is allocated.

use std::sync::Arc;

use occ_core::{Point3, Vector3, VectorHelper};

use crate::error::{KernelResultExt, OccError, OccResult};
use crate::kernel::{GpAx1, GpAx2, GpDir, GpPnt, GpTrsf, GpVec, Kernel, TrsfRequest};

pub struct EntitiesService {
    kernel: Arc<dyn Kernel>,
    vector: VectorHelper,
}

impl EntitiesService {
    /// Create a primitive factory over `kernel`
    pub fn new(kernel: Arc<dyn Kernel>, vector: VectorHelper) -> Self {
        Self { kernel, vector }
    }

    /// Point primitive; non-finite coordinates are rejected before allocation
    pub fn pnt(&self, point: Point3) -> OccResult<GpPnt> {
        self.require_finite("point", point)?;
        GpPnt::from_result(&self.kernel, self.kernel.new_pnt(point)).during("point")
    }

    /// Free vector primitive
    pub fn vec(&self, vector: Vector3) -> OccResult<GpVec> {
        self.require_finite("vector", vector)?;
        GpVec::from_result(&self.kernel, self.kernel.new_vec(vector)).during("vector")
    }

    /// Unit direction; a zero vector is rejected before allocation
    pub fn dir(&self, direction: Vector3) -> OccResult<GpDir> {
        self.require_finite("direction", direction)?;
        if self.vector.normalized(direction).is_none() {
            return Err(OccError::InvalidInput(format!(
                "direction {direction:?} has no length"
            )));
        }
        GpDir::from_result(&self.kernel, self.kernel.new_dir(direction)).during("direction")
    }

    /// Axis through `origin` along `direction`
    pub fn ax1(&self, origin: Point3, direction: Vector3) -> OccResult<GpAx1> {
        let dir = self.dir(direction)?;
        let origin = self.pnt(origin)?;
        GpAx1::from_result(&self.kernel, self.kernel.new_ax1(origin.id(), dir.id())).during("axis")
    }

    /// Coordinate system with `direction` as its main axis
    pub fn ax2(&self, origin: Point3, direction: Vector3) -> OccResult<GpAx2> {
        let dir = self.dir(direction)?;
        let origin = self.pnt(origin)?;
        GpAx2::from_result(&self.kernel, self.kernel.new_ax2(origin.id(), dir.id()))
            .during("coordinate system")
    }

    /// Translation by a vector
    pub fn translation(&self, translation: Vector3) -> OccResult<GpTrsf> {
        let vector = self.vec(translation)?;
        self.trsf(TrsfRequest::Translation { vector: vector.id() }, "translation")
    }

    /// Rotation about the axis through `center`, angle in radians
    pub fn rotation(&self, center: Point3, axis: Vector3, angle: f64) -> OccResult<GpTrsf> {
        if !angle.is_finite() {
            return Err(OccError::InvalidInput(format!("invalid rotation angle {angle}")));
        }
        let axis = self.ax1(center, axis)?;
        self.trsf(
            TrsfRequest::Rotation {
                axis: axis.id(),
                angle,
            },
            "rotation",
        )
    }

    /// Uniform scale about `center`; a zero factor is rejected
    pub fn scaling(&self, center: Point3, factor: f64) -> OccResult<GpTrsf> {
        if factor == 0.0 || !factor.is_finite() {
            return Err(OccError::InvalidInput(format!("invalid scale factor {factor}")));
        }
        let center = self.pnt(center)?;
        self.trsf(
            TrsfRequest::Scale {
                center: center.id(),
                factor,
            },
            "scaling",
        )
    }

    /// Mirror through the plane at `origin` with normal `normal`
    pub fn mirroring(&self, origin: Point3, normal: Vector3) -> OccResult<GpTrsf> {
        let plane = self.ax2(origin, normal)?;
        self.trsf(TrsfRequest::Mirror { plane: plane.id() }, "mirroring")
    }

    fn require_finite(&self, what: &str, coords: [f64; 3]) -> OccResult<()> {
        if self.vector.is_finite(coords) {
            Ok(())
        } else {
            Err(OccError::InvalidInput(format!(
                "{what} {coords:?} has non-finite coordinates"
            )))
        }
    }

    fn trsf(&self, request: TrsfRequest, step: &str) -> OccResult<GpTrsf> {
        GpTrsf::from_result(&self.kernel, self.kernel.new_trsf(request)).during(step)
    }
}
