//! Scoped ownership of kernel-native objects
//!
//! - [`Native`] owns one primitive, geometry, algorithm or query object and
//!   releases it on drop
//! - [`Shape`] owns one topological handle together with its classified kind
//! - [`Vertex`], [`Edge`], ... are kind-checked views over [`Shape`]
//!
//! Every id handed out by the kernel is wrapped here right after allocation,
//! so release happens exactly once on every exit path, `?` and unwinding
//! included.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use occ_core::ShapeKind;

use super::traits::{AlgorithmRequest, Kernel, KernelResult, NativeId};
use crate::error::{KernelResultExt, OccError, OccResult};

/// Marker types naming what a [`Native`] holds
pub mod markers {
    pub enum Pnt {}
    pub enum Vec {}
    pub enum Dir {}
    pub enum Ax1 {}
    pub enum Ax2 {}
    pub enum Circ {}
    pub enum Elips {}
    pub enum Trsf {}
    pub enum Curve {}
    pub enum Curve2d {}
    pub enum Surface {}
    pub enum Algorithm {}
    pub enum CurveAdaptor {}
    pub enum ShapeMap {}
    pub enum Properties {}
    pub enum Topology {}
}

/// Owner of exactly one kernel-native object
pub struct Native<M> {
    id: NativeId,
    kernel: Arc<dyn Kernel>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Native<M> {
    /// Take ownership of a freshly allocated id
    pub fn adopt(kernel: &Arc<dyn Kernel>, id: NativeId) -> Self {
        Self {
            id,
            kernel: Arc::clone(kernel),
            _marker: PhantomData,
        }
    }

    /// Wrap the result of a kernel constructor
    pub fn from_result(kernel: &Arc<dyn Kernel>, id: KernelResult<NativeId>) -> KernelResult<Self> {
        id.map(|id| Self::adopt(kernel, id))
    }

    pub fn id(&self) -> NativeId {
        self.id
    }

    pub fn kernel(&self) -> &Arc<dyn Kernel> {
        &self.kernel
    }
}

impl<M> Drop for Native<M> {
    fn drop(&mut self) {
        self.kernel.release(self.id);
    }
}

impl<M> fmt::Debug for Native<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native")
            .field("id", &self.id)
            .field("type", &std::any::type_name::<M>())
            .finish()
    }
}

pub type GpPnt = Native<markers::Pnt>;
pub type GpVec = Native<markers::Vec>;
pub type GpDir = Native<markers::Dir>;
pub type GpAx1 = Native<markers::Ax1>;
pub type GpAx2 = Native<markers::Ax2>;
pub type GpCirc = Native<markers::Circ>;
pub type GpElips = Native<markers::Elips>;
pub type GpTrsf = Native<markers::Trsf>;
pub type GeomCurve = Native<markers::Curve>;
pub type Geom2dCurve = Native<markers::Curve2d>;
pub type GeomSurface = Native<markers::Surface>;
pub type Algorithm = Native<markers::Algorithm>;
pub type CurveAdaptor = Native<markers::CurveAdaptor>;
pub type ShapeMap = Native<markers::ShapeMap>;
pub type Properties = Native<markers::Properties>;

impl Native<markers::Algorithm> {
    /// Allocate an algorithm object and run it. The object is released if
    /// building fails.
    pub fn build(kernel: &Arc<dyn Kernel>, request: &AlgorithmRequest, step: &str) -> OccResult<Self> {
        let algorithm = Self::from_result(kernel, kernel.new_algorithm(request)).during(step)?;
        kernel.build(algorithm.id()).during(step)?;
        Ok(algorithm)
    }

    /// Resulting curve of a curve maker
    pub fn curve(&self, step: &str) -> OccResult<GeomCurve> {
        GeomCurve::from_result(self.kernel(), self.kernel().algorithm_curve(self.id())).during(step)
    }

    /// Resulting shape handle, not yet classified
    pub fn raw_shape(&self, step: &str) -> OccResult<Native<markers::Topology>> {
        Native::from_result(self.kernel(), self.kernel().algorithm_shape(self.id())).during(step)
    }

    pub fn parameters(&self, step: &str) -> OccResult<Vec<f64>> {
        self.kernel().algorithm_parameters(self.id()).during(step)
    }
}

/// Owned handle to a kernel topological entity
///
/// The kind is discovered by classification when the handle is wrapped;
/// `None` means the handle is null.
#[derive(Debug)]
pub struct Shape {
    native: Native<markers::Topology>,
    kind: Option<ShapeKind>,
}

impl Shape {
    /// Wrap an owned handle whose kind is already known
    pub(crate) fn from_parts(native: Native<markers::Topology>, kind: Option<ShapeKind>) -> Self {
        Self { native, kind }
    }

    pub fn id(&self) -> NativeId {
        self.native.id()
    }

    pub fn kernel(&self) -> &Arc<dyn Kernel> {
        self.native.kernel()
    }

    /// Topological kind, `None` for a null handle
    pub fn kind(&self) -> Option<ShapeKind> {
        self.kind
    }

    pub fn is_null(&self) -> bool {
        self.kind.is_none()
    }

    /// Independent handle on the same entity
    pub fn try_clone(&self) -> OccResult<Self> {
        let id = self.kernel().duplicate(self.id()).during("duplicate shape")?;
        Ok(Self {
            native: Native::adopt(self.kernel(), id),
            kind: self.kind,
        })
    }

    /// Fail with `InvalidInput` unless the handle is non-null and of `kind`
    pub fn expect_kind(&self, kind: ShapeKind) -> OccResult<()> {
        match self.kind {
            Some(actual) if actual == kind => Ok(()),
            Some(actual) => Err(OccError::InvalidInput(format!(
                "expected a {kind}, got a {actual}"
            ))),
            None => Err(OccError::InvalidInput(format!(
                "expected a {kind}, got a null shape"
            ))),
        }
    }
}

impl AsRef<Shape> for Shape {
    fn as_ref(&self) -> &Shape {
        self
    }
}

macro_rules! typed_shape {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name(Shape);

        impl $name {
            pub fn shape(&self) -> &Shape {
                &self.0
            }

            pub fn into_shape(self) -> Shape {
                self.0
            }

            pub fn id(&self) -> NativeId {
                self.0.id()
            }

            pub fn try_clone(&self) -> OccResult<Self> {
                self.0.try_clone().map(Self)
            }
        }

        impl TryFrom<Shape> for $name {
            type Error = OccError;

            fn try_from(shape: Shape) -> OccResult<Self> {
                shape.expect_kind($kind)?;
                Ok(Self(shape))
            }
        }

        impl AsRef<Shape> for $name {
            fn as_ref(&self) -> &Shape {
                &self.0
            }
        }

        impl From<$name> for Shape {
            fn from(value: $name) -> Shape {
                value.0
            }
        }
    };
}

typed_shape!(
    /// Shape handle known to be a vertex
    Vertex,
    ShapeKind::Vertex
);
typed_shape!(
    /// Shape handle known to be an edge
    Edge,
    ShapeKind::Edge
);
typed_shape!(
    /// Shape handle known to be a wire
    Wire,
    ShapeKind::Wire
);
typed_shape!(
    /// Shape handle known to be a face
    Face,
    ShapeKind::Face
);
typed_shape!(
    /// Shape handle known to be a shell
    Shell,
    ShapeKind::Shell
);
typed_shape!(
    /// Shape handle known to be a solid
    Solid,
    ShapeKind::Solid
);
typed_shape!(
    /// Shape handle known to be a compound
    Compound,
    ShapeKind::Compound
);
