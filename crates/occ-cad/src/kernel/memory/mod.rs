//! In-memory reference kernel
//!
//! An allocation-counting [`Kernel`] implementation:
//! - Analytic lines, circles and ellipses; planes and ruled surfaces
//! - Planar faces with exact boundary-integral areas
//! - Prisms, ruled lofts, sewing, transforms and colinear-edge unification
//! - Booleans between operands with disjoint bounding boxes
//!
//! Every native object is tracked, so tests can assert that the facade
//! releases what it allocates.

mod algorithms;
mod geometry;
mod topology;

use std::collections::HashMap;

use glam::{DAffine3, DMat3, DVec2, DVec3};
use occ_core::KernelConfig;
use parking_lot::Mutex;
use tracing::{trace, warn};

use self::geometry::{BoundedCurve, Circle, Curve, Curve2d, Frame, Surface};
use self::topology::{ShapeRef, Sub, Topology};
use super::traits::{
    AlgorithmRequest, GPropKind, GeomAbsCurveType, Kernel, KernelError, KernelResult, NativeClass,
    NativeId, TopAbsOrientation, TopAbsShapeEnum, TrsfRequest,
};

/// A native object held by the kernel
#[derive(Debug, Clone)]
enum Object {
    Pnt(DVec3),
    Vec(DVec3),
    Dir(DVec3),
    Ax1 { origin: DVec3, dir: DVec3 },
    Ax2(Frame),
    Circ(Circle),
    Elips { frame: Frame, major: f64, minor: f64 },
    Trsf(DAffine3),
    Curve(BoundedCurve),
    Curve2d(Curve2d),
    Surface(Surface),
    Algorithm {
        request: AlgorithmRequest,
        outcome: Option<Outcome>,
    },
    Adaptor(BoundedCurve),
    ShapeMap(Vec<Sub>),
    Properties { mass: f64, center: Option<DVec3> },
    Shape(ShapeRef),
}

impl Object {
    fn class(&self) -> NativeClass {
        match self {
            Object::Pnt(_)
            | Object::Vec(_)
            | Object::Dir(_)
            | Object::Ax1 { .. }
            | Object::Ax2(_)
            | Object::Circ(_)
            | Object::Elips { .. }
            | Object::Trsf(_) => NativeClass::Primitive,
            Object::Curve(_) | Object::Curve2d(_) | Object::Surface(_) => NativeClass::Geometry,
            Object::Algorithm { .. } => NativeClass::Algorithm,
            Object::Adaptor(_) | Object::ShapeMap(_) | Object::Properties { .. } => {
                NativeClass::Query
            }
            Object::Shape(_) => NativeClass::Shape,
        }
    }
}

/// Result of a built algorithm
#[derive(Debug, Clone)]
enum Outcome {
    Curve(BoundedCurve),
    Shape(ShapeRef),
    Parameters(Vec<f64>),
}

#[derive(Debug, Default)]
struct Counters {
    allocated: usize,
    released: usize,
    invalid_releases: usize,
}

#[derive(Debug)]
struct State {
    next_id: u64,
    objects: HashMap<NativeId, Object>,
    topology: Topology,
    counters: Counters,
}

fn wrong(id: NativeId, expected: &'static str) -> KernelError {
    KernelError::WrongClass { id, expected }
}

impl State {
    fn alloc(&mut self, object: Object) -> NativeId {
        self.next_id += 1;
        let id = NativeId(self.next_id);
        trace!(id = id.0, class = ?object.class(), "allocated native object");
        self.objects.insert(id, object);
        self.counters.allocated += 1;
        id
    }

    fn get(&self, id: NativeId) -> KernelResult<&Object> {
        self.objects.get(&id).ok_or(KernelError::UnknownObject(id))
    }

    fn pnt(&self, id: NativeId) -> KernelResult<DVec3> {
        match self.get(id)? {
            Object::Pnt(p) => Ok(*p),
            _ => Err(wrong(id, "point")),
        }
    }

    fn vector(&self, id: NativeId) -> KernelResult<DVec3> {
        match self.get(id)? {
            Object::Vec(v) | Object::Dir(v) => Ok(*v),
            _ => Err(wrong(id, "vector")),
        }
    }

    fn dir(&self, id: NativeId) -> KernelResult<DVec3> {
        match self.get(id)? {
            Object::Dir(d) => Ok(*d),
            _ => Err(wrong(id, "direction")),
        }
    }

    fn ax1(&self, id: NativeId) -> KernelResult<(DVec3, DVec3)> {
        match self.get(id)? {
            Object::Ax1 { origin, dir } => Ok((*origin, *dir)),
            _ => Err(wrong(id, "axis")),
        }
    }

    fn ax2(&self, id: NativeId) -> KernelResult<Frame> {
        match self.get(id)? {
            Object::Ax2(frame) => Ok(*frame),
            _ => Err(wrong(id, "coordinate system")),
        }
    }

    fn circ(&self, id: NativeId) -> KernelResult<Circle> {
        match self.get(id)? {
            Object::Circ(circle) => Ok(*circle),
            _ => Err(wrong(id, "circle")),
        }
    }

    fn trsf(&self, id: NativeId) -> KernelResult<DAffine3> {
        match self.get(id)? {
            Object::Trsf(t) => Ok(*t),
            _ => Err(wrong(id, "transformation")),
        }
    }

    fn curve(&self, id: NativeId) -> KernelResult<BoundedCurve> {
        match self.get(id)? {
            Object::Curve(c) => Ok(*c),
            _ => Err(wrong(id, "curve")),
        }
    }

    fn curve2d(&self, id: NativeId) -> KernelResult<Curve2d> {
        match self.get(id)? {
            Object::Curve2d(c) => Ok(*c),
            _ => Err(wrong(id, "2D curve")),
        }
    }

    fn surface(&self, id: NativeId) -> KernelResult<Surface> {
        match self.get(id)? {
            Object::Surface(surface) => Ok(*surface),
            _ => Err(wrong(id, "surface")),
        }
    }

    fn plane(&self, id: NativeId) -> KernelResult<Frame> {
        match self.surface(id)? {
            Surface::Plane(frame) => Ok(frame),
            Surface::Ruled { .. } => Err(KernelError::NotSupported(
                "faces bounded on a ruled surface".into(),
            )),
        }
    }

    fn adaptor(&self, id: NativeId) -> KernelResult<BoundedCurve> {
        match self.get(id)? {
            Object::Adaptor(c) => Ok(*c),
            _ => Err(wrong(id, "curve adaptor")),
        }
    }

    fn shape(&self, id: NativeId) -> KernelResult<ShapeRef> {
        match self.get(id)? {
            Object::Shape(shape) => Ok(*shape),
            _ => Err(wrong(id, "shape")),
        }
    }

    fn solid_shape(&self, id: NativeId) -> KernelResult<Sub> {
        self.shape(id)?
            .ok_or_else(|| KernelError::NotDone("operation on a null shape".into()))
    }

    fn shapes(&self, ids: &[NativeId]) -> KernelResult<Vec<Sub>> {
        ids.iter().map(|id| self.solid_shape(*id)).collect()
    }

    fn outcome(&self, id: NativeId) -> KernelResult<&Outcome> {
        match self.get(id)? {
            Object::Algorithm {
                outcome: Some(outcome),
                ..
            } => Ok(outcome),
            Object::Algorithm { outcome: None, .. } => {
                Err(KernelError::NotDone("algorithm has not been built".into()))
            }
            _ => Err(wrong(id, "algorithm")),
        }
    }
}

/// Allocation-counting in-memory kernel
#[derive(Debug)]
pub struct MemoryKernel {
    state: Mutex<State>,
}

impl Default for MemoryKernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl MemoryKernel {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 0,
                objects: HashMap::new(),
                topology: Topology::new(config),
                counters: Counters::default(),
            }),
        }
    }

    /// Number of unreleased objects of a class
    pub fn live(&self, class: NativeClass) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|o| o.class() == class)
            .count()
    }

    /// Number of unreleased objects of every class
    pub fn live_total(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Number of objects allocated since creation
    pub fn allocated_total(&self) -> usize {
        self.state.lock().counters.allocated
    }

    pub fn released_total(&self) -> usize {
        self.state.lock().counters.released
    }

    /// Releases of unknown or already released ids
    pub fn invalid_releases(&self) -> usize {
        self.state.lock().counters.invalid_releases
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> KernelResult<T>) -> KernelResult<T> {
        f(&mut self.state.lock())
    }

    fn alloc_with(&self, f: impl FnOnce(&State) -> KernelResult<Object>) -> KernelResult<NativeId> {
        self.with(|state| {
            let object = f(state)?;
            Ok(state.alloc(object))
        })
    }
}

fn kind_name(kind: TopAbsShapeEnum) -> &'static str {
    match kind {
        TopAbsShapeEnum::Compound => "compound",
        TopAbsShapeEnum::CompSolid => "compsolid",
        TopAbsShapeEnum::Solid => "solid",
        TopAbsShapeEnum::Shell => "shell",
        TopAbsShapeEnum::Face => "face",
        TopAbsShapeEnum::Wire => "wire",
        TopAbsShapeEnum::Edge => "edge",
        TopAbsShapeEnum::Vertex => "vertex",
        TopAbsShapeEnum::Shape => "shape",
    }
}

impl Kernel for MemoryKernel {
    fn name(&self) -> &str {
        "memory"
    }

    fn release(&self, id: NativeId) {
        let mut state = self.state.lock();
        match state.objects.remove(&id) {
            Some(object) => {
                state.counters.released += 1;
                trace!(id = id.0, class = ?object.class(), "released native object");
            }
            None => {
                state.counters.invalid_releases += 1;
                warn!(id = id.0, "release of an unknown or already released native object");
            }
        }
    }

    fn duplicate(&self, shape: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| Ok(Object::Shape(state.shape(shape)?)))
    }

    // ========== Primitives ==========

    fn new_pnt(&self, xyz: [f64; 3]) -> KernelResult<NativeId> {
        self.alloc_with(|_| Ok(Object::Pnt(DVec3::from_array(xyz))))
    }

    fn new_vec(&self, xyz: [f64; 3]) -> KernelResult<NativeId> {
        self.alloc_with(|_| Ok(Object::Vec(DVec3::from_array(xyz))))
    }

    fn new_dir(&self, xyz: [f64; 3]) -> KernelResult<NativeId> {
        self.alloc_with(|_| {
            DVec3::from_array(xyz)
                .try_normalize()
                .map(Object::Dir)
                .ok_or_else(|| KernelError::Degenerate("null direction".into()))
        })
    }

    fn new_ax1(&self, origin: NativeId, direction: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            Ok(Object::Ax1 {
                origin: state.pnt(origin)?,
                dir: state.dir(direction)?,
            })
        })
    }

    fn new_ax2(&self, origin: NativeId, direction: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            Ok(Object::Ax2(Frame::from_normal(
                state.pnt(origin)?,
                state.dir(direction)?,
            )))
        })
    }

    fn new_circ(&self, axis: NativeId, radius: f64) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            if radius <= 0.0 {
                return Err(KernelError::Degenerate("circle radius must be positive".into()));
            }
            Ok(Object::Circ(Circle {
                frame: state.ax2(axis)?,
                radius,
            }))
        })
    }

    fn new_elips(
        &self,
        axis: NativeId,
        major_radius: f64,
        minor_radius: f64,
    ) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            if minor_radius <= 0.0 || major_radius < minor_radius {
                return Err(KernelError::Degenerate(
                    "ellipse needs 0 < minor radius <= major radius".into(),
                ));
            }
            Ok(Object::Elips {
                frame: state.ax2(axis)?,
                major: major_radius,
                minor: minor_radius,
            })
        })
    }

    fn new_trsf(&self, request: TrsfRequest) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            let t = match request {
                TrsfRequest::Translation { vector } => {
                    DAffine3::from_translation(state.vector(vector)?)
                }
                TrsfRequest::Rotation { axis, angle } => {
                    let (origin, dir) = state.ax1(axis)?;
                    DAffine3::from_translation(origin)
                        * DAffine3::from_axis_angle(dir, angle)
                        * DAffine3::from_translation(-origin)
                }
                TrsfRequest::Scale { center, factor } => {
                    if factor.abs() <= f64::EPSILON {
                        return Err(KernelError::Degenerate("scale factor is zero".into()));
                    }
                    let center = state.pnt(center)?;
                    DAffine3::from_translation(center)
                        * DAffine3::from_scale(DVec3::splat(factor))
                        * DAffine3::from_translation(-center)
                }
                TrsfRequest::Mirror { plane } => {
                    let frame = state.ax2(plane)?;
                    let n = frame.z;
                    let column = |e: DVec3| e - n * (2.0 * e.dot(n));
                    DAffine3 {
                        matrix3: DMat3::from_cols(column(DVec3::X), column(DVec3::Y), column(DVec3::Z)),
                        translation: n * (2.0 * frame.origin.dot(n)),
                    }
                }
            };
            Ok(Object::Trsf(t))
        })
    }

    fn coords(&self, primitive: NativeId) -> KernelResult<[f64; 3]> {
        self.with(|state| match state.get(primitive)? {
            Object::Pnt(v) | Object::Vec(v) | Object::Dir(v) => Ok(v.to_array()),
            _ => Err(wrong(primitive, "point, vector or direction")),
        })
    }

    fn circ_properties(&self, circ: NativeId) -> KernelResult<([f64; 3], f64, [f64; 3])> {
        self.with(|state| {
            let circle = state.circ(circ)?;
            Ok((
                circle.frame.origin.to_array(),
                circle.radius,
                circle.frame.z.to_array(),
            ))
        })
    }

    // ========== Geometry ==========

    fn new_geom_circle(&self, circ: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            let circle = state.circ(circ)?;
            Ok(Object::Curve(BoundedCurve::full_circle(
                circle.frame,
                circle.radius,
            )))
        })
    }

    fn new_geom_ellipse(&self, elips: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| match state.get(elips)? {
            Object::Elips {
                frame,
                major,
                minor,
            } => Ok(Object::Curve(BoundedCurve::full_ellipse(
                *frame, *major, *minor,
            ))),
            _ => Err(wrong(elips, "ellipse")),
        })
    }

    fn new_geom_plane(&self, origin: NativeId, normal: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            Ok(Object::Surface(Surface::Plane(Frame::from_normal(
                state.pnt(origin)?,
                state.dir(normal)?,
            ))))
        })
    }

    fn new_geom2d_segment(&self, start: [f64; 2], end: [f64; 2]) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            Curve2d::segment(
                DVec2::from_array(start),
                DVec2::from_array(end),
                state.topology.tolerance(),
            )
            .map(Object::Curve2d)
        })
    }

    fn new_geom2d_circle(&self, center: [f64; 2], radius: f64) -> KernelResult<NativeId> {
        self.alloc_with(|_| Curve2d::circle(DVec2::from_array(center), radius).map(Object::Curve2d))
    }

    // ========== Algorithms ==========

    fn new_algorithm(&self, request: &AlgorithmRequest) -> KernelResult<NativeId> {
        self.alloc_with(|_| {
            Ok(Object::Algorithm {
                request: request.clone(),
                outcome: None,
            })
        })
    }

    fn build(&self, algorithm: NativeId) -> KernelResult<()> {
        self.with(|state| {
            let request = match state.get(algorithm)? {
                Object::Algorithm { request, .. } => request.clone(),
                _ => return Err(wrong(algorithm, "algorithm")),
            };
            let result = state.run(&request)?;
            if let Some(Object::Algorithm { outcome, .. }) = state.objects.get_mut(&algorithm) {
                *outcome = Some(result);
            }
            Ok(())
        })
    }

    fn algorithm_curve(&self, algorithm: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| match state.outcome(algorithm)? {
            Outcome::Curve(curve) => Ok(Object::Curve(*curve)),
            _ => Err(wrong(algorithm, "curve maker")),
        })
    }

    fn algorithm_shape(&self, algorithm: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| match state.outcome(algorithm)? {
            Outcome::Shape(shape) => Ok(Object::Shape(*shape)),
            _ => Err(wrong(algorithm, "shape algorithm")),
        })
    }

    fn algorithm_parameters(&self, algorithm: NativeId) -> KernelResult<Vec<f64>> {
        self.with(|state| match state.outcome(algorithm)? {
            Outcome::Parameters(parameters) => Ok(parameters.clone()),
            _ => Err(wrong(algorithm, "sampling algorithm")),
        })
    }

    // ========== Topology ==========

    fn new_null_shape(&self) -> KernelResult<NativeId> {
        self.alloc_with(|_| Ok(Object::Shape(None)))
    }

    fn is_null(&self, shape: NativeId) -> KernelResult<bool> {
        self.with(|state| Ok(state.shape(shape)?.is_none()))
    }

    fn shape_type(&self, shape: NativeId) -> KernelResult<TopAbsShapeEnum> {
        self.with(|state| {
            let sub = state.solid_shape(shape)?;
            state.topology.kind(sub.id)
        })
    }

    fn orientation(&self, shape: NativeId) -> KernelResult<TopAbsOrientation> {
        self.with(|state| {
            Ok(if state.solid_shape(shape)?.reversed {
                TopAbsOrientation::Reversed
            } else {
                TopAbsOrientation::Forward
            })
        })
    }

    fn reversed(&self, shape: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| Ok(Object::Shape(state.shape(shape)?.map(Sub::flipped))))
    }

    fn cast(&self, shape: NativeId, target: TopAbsShapeEnum) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            let sub = state.solid_shape(shape)?;
            let kind = state.topology.kind(sub.id)?;
            if target != TopAbsShapeEnum::Shape && kind != target {
                return Err(wrong(shape, kind_name(target)));
            }
            Ok(Object::Shape(Some(sub)))
        })
    }

    fn is_closed(&self, shape: NativeId) -> KernelResult<bool> {
        self.with(|state| {
            let sub = state.solid_shape(shape)?;
            state.topology.is_closed(sub)
        })
    }

    fn vertex_point(&self, vertex: NativeId) -> KernelResult<[f64; 3]> {
        self.with(|state| {
            let sub = state.solid_shape(vertex)?;
            Ok(state.topology.point(sub.id)?.to_array())
        })
    }

    fn face_surface(&self, face: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            let sub = state.solid_shape(face)?;
            Ok(Object::Surface(state.topology.face_surface(sub.id)?))
        })
    }

    fn wire_edges(&self, wire: NativeId) -> KernelResult<Vec<NativeId>> {
        self.with(|state| {
            let sub = state.solid_shape(wire)?;
            let uses = state.topology.wire_uses(sub)?;
            Ok(uses
                .into_iter()
                .map(|edge| state.alloc(Object::Shape(Some(edge))))
                .collect())
        })
    }

    fn new_shape_map(&self, shape: NativeId, kind: TopAbsShapeEnum) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            let entries = match state.shape(shape)? {
                Some(sub) => state.topology.explore(sub, kind)?,
                None => Vec::new(),
            };
            Ok(Object::ShapeMap(entries))
        })
    }

    fn shape_map_extent(&self, map: NativeId) -> KernelResult<usize> {
        self.with(|state| match state.get(map)? {
            Object::ShapeMap(entries) => Ok(entries.len()),
            _ => Err(wrong(map, "shape map")),
        })
    }

    fn shape_map_item(&self, map: NativeId, index: usize) -> KernelResult<NativeId> {
        self.alloc_with(|state| match state.get(map)? {
            Object::ShapeMap(entries) => entries
                .get(index)
                .map(|sub| Object::Shape(Some(*sub)))
                .ok_or_else(|| KernelError::NotDone(format!("map index {index} out of range"))),
            _ => Err(wrong(map, "shape map")),
        })
    }

    // ========== Curve evaluation ==========

    fn new_curve_adaptor(&self, edge: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            let sub = state.solid_shape(edge)?;
            let (curve, _, _) = state.topology.edge(sub.id)?;
            Ok(Object::Adaptor(curve))
        })
    }

    fn curve_type(&self, adaptor: NativeId) -> KernelResult<GeomAbsCurveType> {
        self.with(|state| {
            Ok(match state.adaptor(adaptor)?.curve {
                Curve::Line { .. } => GeomAbsCurveType::Line,
                Curve::Circle { .. } => GeomAbsCurveType::Circle,
                Curve::Ellipse { .. } => GeomAbsCurveType::Ellipse,
            })
        })
    }

    fn curve_bounds(&self, adaptor: NativeId) -> KernelResult<(f64, f64)> {
        self.with(|state| {
            let curve = state.adaptor(adaptor)?;
            Ok((curve.first, curve.last))
        })
    }

    fn curve_d0(&self, adaptor: NativeId, u: f64) -> KernelResult<[f64; 3]> {
        self.with(|state| Ok(state.adaptor(adaptor)?.value(u).to_array()))
    }

    fn curve_d1(&self, adaptor: NativeId, u: f64) -> KernelResult<([f64; 3], [f64; 3])> {
        self.with(|state| {
            let curve = state.adaptor(adaptor)?;
            Ok((curve.value(u).to_array(), curve.d1(u).to_array()))
        })
    }

    fn curve_parameter_at_length(
        &self,
        adaptor: NativeId,
        from: f64,
        length: f64,
    ) -> KernelResult<f64> {
        self.with(|state| {
            let intervals = state.topology.intervals();
            Ok(state
                .adaptor(adaptor)?
                .parameter_at_length(from, length, intervals))
        })
    }

    fn curve_circle(&self, adaptor: NativeId) -> KernelResult<NativeId> {
        self.alloc_with(|state| match state.adaptor(adaptor)?.curve {
            Curve::Circle { frame, radius } => Ok(Object::Circ(Circle { frame, radius })),
            _ => Err(wrong(adaptor, "circular curve adaptor")),
        })
    }

    // ========== Global properties ==========

    fn new_properties(&self, shape: NativeId, kind: GPropKind) -> KernelResult<NativeId> {
        self.alloc_with(|state| {
            let (mass, center) = match state.shape(shape)? {
                Some(sub) => state.topology.properties(sub, kind)?,
                None => (0.0, None),
            };
            Ok(Object::Properties { mass, center })
        })
    }

    fn properties_mass(&self, properties: NativeId) -> KernelResult<f64> {
        self.with(|state| match state.get(properties)? {
            Object::Properties { mass, .. } => Ok(*mass),
            _ => Err(wrong(properties, "property accumulator")),
        })
    }

    fn properties_center(&self, properties: NativeId) -> KernelResult<[f64; 3]> {
        self.with(|state| match state.get(properties)? {
            Object::Properties {
                center: Some(center),
                ..
            } => Ok(center.to_array()),
            Object::Properties { center: None, .. } => {
                Err(KernelError::Degenerate("shape has no mass".into()))
            }
            _ => Err(wrong(properties, "property accumulator")),
        })
    }
}
