//! Facade
//!
//! - [`OccBase`]: the base services plus the construction templates shared by
//!   every level service
//! - [`OccHelper`]: builds the whole service graph, leaves first, and wires
//!   the single late-bound association from faces to fillets

use std::sync::Arc;

use occ_core::inputs::{CircleDto, EllipseDto};
use occ_core::{OccConfig, Point3, ShapeKind, TypeSpecificity, Vector3, VectorHelper};
use tracing::debug;

use crate::error::{KernelResultExt, OccError, OccResult};
use crate::kernel::native::markers;
use crate::kernel::{
    Algorithm, AlgorithmRequest, Edge, Face, GPropKind, GeomCurve, GeomSurface, GpDir, GpPnt,
    GpVec, Kernel, Native, Properties, Shape, Vertex, Wire, default_kernel,
};
use crate::services::{
    BooleansService, ConverterService, EdgesService, EntitiesService, EnumService, FacesService,
    FilletsService, GeomService, IteratorService, OperationsService, ShapeGettersService,
    ShellsService, SolidsService, TransformsService, VerticesService, WiresService,
};

// ========== Shared base ==========

/// Base services and the helpers every level service builds on
pub struct OccBase {
    kernel: Arc<dyn Kernel>,
    config: OccConfig,
    vector: VectorHelper,
    enums: Arc<EnumService>,
    iterator: Arc<IteratorService>,
    converter: Arc<ConverterService>,
    entities: Arc<EntitiesService>,
    shape_getters: Arc<ShapeGettersService>,
    geom: Arc<GeomService>,
}

impl OccBase {
    /// Build the base services over `kernel`
    pub fn new(kernel: Arc<dyn Kernel>, config: OccConfig) -> Self {
        let vector = VectorHelper::new();
        let enums = Arc::new(EnumService::new());
        let iterator = Arc::new(IteratorService::new(kernel.clone(), enums.clone()));
        let converter = Arc::new(ConverterService::new(kernel.clone()));
        let entities = Arc::new(EntitiesService::new(kernel.clone(), vector));
        let shape_getters = Arc::new(ShapeGettersService::new(
            kernel.clone(),
            enums.clone(),
            iterator.clone(),
        ));
        let geom = Arc::new(GeomService::new(kernel.clone(), entities.clone(), vector));
        Self {
            kernel,
            config,
            vector,
            enums,
            iterator,
            converter,
            entities,
            shape_getters,
            geom,
        }
    }

    /// Kernel shared by every service
    pub fn kernel(&self) -> &Arc<dyn Kernel> {
        &self.kernel
    }

    pub fn config(&self) -> &OccConfig {
        &self.config
    }

    pub fn vector(&self) -> &VectorHelper {
        &self.vector
    }

    pub fn enums(&self) -> &Arc<EnumService> {
        &self.enums
    }

    pub fn iterator(&self) -> &Arc<IteratorService> {
        &self.iterator
    }

    pub fn converter(&self) -> &Arc<ConverterService> {
        &self.converter
    }

    pub fn entities(&self) -> &Arc<EntitiesService> {
        &self.entities
    }

    pub fn shape_getters(&self) -> &Arc<ShapeGettersService> {
        &self.shape_getters
    }

    pub fn geom(&self) -> &Arc<GeomService> {
        &self.geom
    }

    // ========== Primitives ==========

    pub fn pnt(&self, point: Point3) -> OccResult<GpPnt> {
        self.entities.pnt(point)
    }

    pub fn vec(&self, vector: Vector3) -> OccResult<GpVec> {
        self.entities.vec(vector)
    }

    pub fn dir(&self, direction: Vector3) -> OccResult<GpDir> {
        self.entities.dir(direction)
    }

    pub fn circle_curve(&self, dto: &CircleDto) -> OccResult<GeomCurve> {
        self.geom.circle_curve(dto)
    }

    // ========== Classification ==========

    /// Wrap a raw topology handle as a shape of its discovered kind
    pub fn classify(&self, native: Native<markers::Topology>) -> OccResult<Shape> {
        self.shape_getters.classify(native)
    }

    /// Kind of a non-null shape
    pub fn shape_kind(&self, shape: &Shape) -> OccResult<ShapeKind> {
        self.shape_getters.shape_kind(shape)
    }

    /// Fresh handle typed as the shape's concrete kind
    pub fn normalized(&self, shape: &Shape) -> OccResult<Shape> {
        self.shape_getters.actual_type_of_shape(shape)
    }

    /// Fail with `InvalidInput` unless every shape is non-null
    pub fn require_non_null<S: AsRef<Shape>>(&self, shapes: &[S]) -> OccResult<()> {
        if let Some(index) = shapes.iter().position(|s| s.as_ref().is_null()) {
            return Err(OccError::InvalidInput(format!("shape {index} is null")));
        }
        Ok(())
    }

    // ========== Construction templates ==========

    /// Run a shape algorithm and classify its result. The algorithm object is
    /// released before returning.
    pub fn build_shape(&self, request: &AlgorithmRequest, step: &str) -> OccResult<Shape> {
        let algorithm = Algorithm::build(&self.kernel, request, step)?;
        let raw = algorithm.raw_shape(step)?;
        self.classify(raw)
    }

    /// Like [`Self::build_shape`], converting to a typed view
    pub fn build_typed<T>(&self, request: &AlgorithmRequest, step: &str) -> OccResult<T>
    where
        T: TryFrom<Shape, Error = OccError>,
    {
        let shape = self.build_shape(request, step)?;
        T::try_from(shape).map_err(|err| OccError::ConstructionFailure(format!("{step}: {err}")))
    }

    /// Curve to edge: make the edge, normalize it, release the raw handle
    pub fn edge_from_curve(&self, curve: &GeomCurve) -> OccResult<Edge> {
        let raw = self.build_shape(&AlgorithmRequest::MakeEdge { curve: curve.id() }, "make edge")?;
        Edge::try_from(self.normalized(&raw)?)
    }

    /// Copy of a shape with flipped orientation. The raw reversed handle is
    /// released once its classified copy exists.
    pub fn reversed<T>(&self, shape: &Shape, step: &str) -> OccResult<T>
    where
        T: TryFrom<Shape, Error = OccError>,
    {
        let reversed =
            Native::from_result(&self.kernel, self.kernel.reversed(shape.id())).during(step)?;
        let raw = self.classify(reversed)?;
        T::try_from(self.normalized(&raw)?)
    }

    /// Surface geometry a face lies on, owned by the caller
    pub fn surface_from_face(&self, face: &Face) -> OccResult<GeomSurface> {
        GeomSurface::from_result(&self.kernel, self.kernel.face_surface(face.id()))
            .during("face surface")
    }

    /// Vertex at a point
    pub fn vertex_from_point(&self, point: Point3) -> OccResult<Vertex> {
        let pnt = self.pnt(point)?;
        self.build_typed(&AlgorithmRequest::MakeVertex { point: pnt.id() }, "make vertex")
    }

    /// Connect edges and wires, in order, into one wire
    pub fn make_wire<S: AsRef<Shape>>(&self, shapes: &[S]) -> OccResult<Wire> {
        if shapes.is_empty() {
            return Err(OccError::InvalidInput("no edges or wires to connect".into()));
        }
        self.require_non_null(shapes)?;
        for shape in shapes {
            let kind = self.shape_kind(shape.as_ref())?;
            if kind != ShapeKind::Edge && kind != ShapeKind::Wire {
                return Err(OccError::InvalidInput(format!(
                    "only edges and wires can form a wire, got a {kind}"
                )));
            }
        }
        let request = AlgorithmRequest::MakeWire {
            shapes: shapes.iter().map(|s| s.as_ref().id()).collect(),
        };
        self.build_typed(&request, "make wire")
    }

    /// Planar face bounded by a closed wire
    pub fn make_face(&self, wire: &Wire, planar_only: bool) -> OccResult<Face> {
        let request = AlgorithmRequest::MakeFace {
            wire: wire.id(),
            surface: None,
            planar_only,
        };
        self.build_typed(&request, "make face")
    }

    /// Circle as an edge, a wire or a face
    pub fn create_circle(&self, dto: &CircleDto, specificity: TypeSpecificity) -> OccResult<Shape> {
        let curve = self.geom.circle_curve(dto)?;
        self.lift_curve(&curve, specificity)
    }

    /// Ellipse as an edge, a wire or a face
    pub fn create_ellipse(&self, dto: &EllipseDto, specificity: TypeSpecificity) -> OccResult<Shape> {
        let curve = self.geom.ellipse_curve(dto)?;
        self.lift_curve(&curve, specificity)
    }

    fn lift_curve(&self, curve: &GeomCurve, specificity: TypeSpecificity) -> OccResult<Shape> {
        let edge = self.edge_from_curve(curve)?;
        if specificity == TypeSpecificity::Edge {
            return Ok(edge.into_shape());
        }
        let wire = self.make_wire(&[edge])?;
        if specificity == TypeSpecificity::Wire {
            return Ok(wire.into_shape());
        }
        Ok(self.make_face(&wire, true)?.into_shape())
    }

    /// Same-domain unification; the algorithm object is released after the
    /// result is extracted
    pub fn unify_same_domain(
        &self,
        shape: &Shape,
        unify_edges: bool,
        unify_faces: bool,
        concat_bsplines: bool,
    ) -> OccResult<Shape> {
        self.require_non_null(&[shape])?;
        let request = AlgorithmRequest::UnifySameDomain {
            shape: shape.id(),
            unify_edges,
            unify_faces,
            concat_bsplines,
        };
        self.build_shape(&request, "unify same domain")
    }

    // ========== Traversal callbacks ==========

    /// Visit the distinct vertices of a shape
    pub fn for_each_vertex<F>(&self, shape: &Shape, mut f: F) -> OccResult<()>
    where
        F: FnMut(usize, Vertex) -> OccResult<()>,
    {
        self.iterator
            .for_each_sub_shape(shape, ShapeKind::Vertex, |i, s| f(i, Vertex::try_from(s)?))
    }

    /// Visit the distinct edges of a shape
    pub fn for_each_edge<F>(&self, shape: &Shape, mut f: F) -> OccResult<()>
    where
        F: FnMut(usize, Edge) -> OccResult<()>,
    {
        self.iterator
            .for_each_sub_shape(shape, ShapeKind::Edge, |i, s| f(i, Edge::try_from(s)?))
    }

    pub fn for_each_wire<F>(&self, shape: &Shape, mut f: F) -> OccResult<()>
    where
        F: FnMut(usize, Wire) -> OccResult<()>,
    {
        self.iterator
            .for_each_sub_shape(shape, ShapeKind::Wire, |i, s| f(i, Wire::try_from(s)?))
    }

    pub fn for_each_face<F>(&self, shape: &Shape, mut f: F) -> OccResult<()>
    where
        F: FnMut(usize, Face) -> OccResult<()>,
    {
        self.iterator
            .for_each_sub_shape(shape, ShapeKind::Face, |i, s| f(i, Face::try_from(s)?))
    }

    /// Sub-shape at `index`, with the lookup rules shared by the indexed
    /// getters: missing or null shapes and shapes of a disallowed kind are
    /// `InvalidInput` before anything is allocated, a missing index is 0,
    /// and an index past the end is `NotFound`.
    pub fn indexed_sub_shape<T>(
        &self,
        shape: Option<&Shape>,
        index: Option<usize>,
        kind: ShapeKind,
        allowed: impl Fn(ShapeKind) -> bool,
    ) -> OccResult<T>
    where
        T: TryFrom<Shape, Error = OccError>,
    {
        let Some(shape) = shape else {
            return Err(OccError::InvalidInput(format!("no shape to take a {kind} from")));
        };
        let actual = shape
            .kind()
            .ok_or_else(|| OccError::InvalidInput(format!("cannot take a {kind} from a null shape")))?;
        if !allowed(actual) {
            return Err(OccError::InvalidInput(format!(
                "cannot take a {kind} from a {actual}"
            )));
        }
        let index = index.unwrap_or(0);
        match self.iterator.nth(shape, kind, index)? {
            Some(found) => T::try_from(found),
            None => Err(OccError::NotFound(format!("no {kind} at index {index}"))),
        }
    }

    // ========== Global properties ==========

    fn properties(&self, shape: &Shape, kind: GPropKind) -> OccResult<Properties> {
        self.require_non_null(&[shape])?;
        Properties::from_result(&self.kernel, self.kernel.new_properties(shape.id(), kind))
            .during("global properties")
    }

    /// Length, area or volume accumulated over a shape
    pub fn mass(&self, shape: &Shape, kind: GPropKind) -> OccResult<f64> {
        let props = self.properties(shape, kind)?;
        self.kernel.properties_mass(props.id()).during("global properties")
    }

    /// Center of mass for the given property kind
    pub fn center_of_mass(&self, shape: &Shape, kind: GPropKind) -> OccResult<Point3> {
        let props = self.properties(shape, kind)?;
        self.kernel
            .properties_center(props.id())
            .during("center of mass")
    }
}

// ========== Facade ==========

/// Entry point owning the complete service graph
pub struct OccHelper {
    base: Arc<OccBase>,
    transforms: Arc<TransformsService>,
    booleans: Arc<BooleansService>,
    vertices: Arc<VerticesService>,
    edges: Arc<EdgesService>,
    wires: Arc<WiresService>,
    faces: Arc<FacesService>,
    shells: Arc<ShellsService>,
    solids: Arc<SolidsService>,
    operations: Arc<OperationsService>,
    fillets: Arc<FilletsService>,
}

impl OccHelper {
    /// Build every service over `kernel`, lower levels first
    pub fn new(kernel: Arc<dyn Kernel>, config: OccConfig) -> Self {
        debug!(kernel = kernel.name(), "building facade services");
        let base = Arc::new(OccBase::new(kernel, config));
        debug!("base services ready");

        let transforms = Arc::new(TransformsService::new(base.clone()));
        let booleans = Arc::new(BooleansService::new(base.clone()));
        let vertices = Arc::new(VerticesService::new(base.clone()));
        let edges = Arc::new(EdgesService::new(base.clone(), vertices.clone()));
        let wires = Arc::new(WiresService::new(
            base.clone(),
            edges.clone(),
            transforms.clone(),
        ));
        let faces = Arc::new(FacesService::new(base.clone(), wires.clone()));
        let shells = Arc::new(ShellsService::new(base.clone(), faces.clone()));
        let solids = Arc::new(SolidsService::new(
            base.clone(),
            faces.clone(),
            transforms.clone(),
        ));
        let operations = Arc::new(OperationsService::new(
            base.clone(),
            edges.clone(),
            wires.clone(),
            faces.clone(),
            booleans.clone(),
        ));
        let fillets = Arc::new(FilletsService::new(
            base.clone(),
            wires.clone(),
            faces.clone(),
            operations.clone(),
        ));
        debug!("level services ready");

        faces.attach_fillets(&fillets);
        debug!("faces linked to fillets");

        Self {
            base,
            transforms,
            booleans,
            vertices,
            edges,
            wires,
            faces,
            shells,
            solids,
            operations,
            fillets,
        }
    }

    /// Facade over the default kernel with default settings
    pub fn with_default_kernel() -> Self {
        Self::new(default_kernel(), OccConfig::default())
    }

    /// Base services shared by every level
    pub fn base(&self) -> &Arc<OccBase> {
        &self.base
    }

    pub fn transforms(&self) -> &Arc<TransformsService> {
        &self.transforms
    }

    pub fn booleans(&self) -> &Arc<BooleansService> {
        &self.booleans
    }

    pub fn vertices(&self) -> &Arc<VerticesService> {
        &self.vertices
    }

    pub fn edges(&self) -> &Arc<EdgesService> {
        &self.edges
    }

    pub fn wires(&self) -> &Arc<WiresService> {
        &self.wires
    }

    pub fn faces(&self) -> &Arc<FacesService> {
        &self.faces
    }

    pub fn shells(&self) -> &Arc<ShellsService> {
        &self.shells
    }

    pub fn solids(&self) -> &Arc<SolidsService> {
        &self.solids
    }

    pub fn operations(&self) -> &Arc<OperationsService> {
        &self.operations
    }

    pub fn fillets(&self) -> &Arc<FilletsService> {
        &self.fillets
    }

    /// Kind of a non-null shape
    pub fn shape_kind(&self, shape: &Shape) -> OccResult<ShapeKind> {
        self.base.shape_kind(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{MemoryKernel, NativeClass};
    use crate::testing::{fixture, square_wire};
    use approx::assert_relative_eq;
    use occ_core::inputs::{
        ArcEdgeThreePointsDto, CubeDto, DivideDto, FaceFromWireDto, FilletDto, LineDto,
        PolylineDto, ShapeIndexDto, ShapesDto,
    };

    fn circle(radius: f64) -> CircleDto {
        CircleDto {
            radius,
            center: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn test_services_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OccHelper>();
        assert_send_sync::<OccBase>();
    }

    #[test]
    fn test_create_circle_specificities() {
        let (memory, occ) = fixture();
        let base = occ.base();
        let edge = base.create_circle(&circle(1.0), TypeSpecificity::Edge).unwrap();
        let wire = base.create_circle(&circle(1.0), TypeSpecificity::Wire).unwrap();
        let face = base.create_circle(&circle(1.0), TypeSpecificity::Face).unwrap();
        assert_eq!(edge.kind(), Some(ShapeKind::Edge));
        assert_eq!(wire.kind(), Some(ShapeKind::Wire));
        assert_eq!(face.kind(), Some(ShapeKind::Face));

        assert_eq!(memory.live(NativeClass::Primitive), 0);
        assert_eq!(memory.live(NativeClass::Geometry), 0);
        assert_eq!(memory.live(NativeClass::Algorithm), 0);
        assert_eq!(memory.live(NativeClass::Shape), 3);
        drop((edge, wire, face));
        assert_eq!(memory.live_total(), 0);
        assert_eq!(memory.invalid_releases(), 0);
    }

    #[test]
    fn test_failing_face_releases_intermediates() {
        let (memory, occ) = fixture();
        let open = occ
            .wires()
            .create_polyline_wire(&PolylineDto {
                points: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
            })
            .unwrap();
        let before = memory.live_total();
        let err = occ.base().make_face(&open, true).unwrap_err();
        assert!(matches!(err, OccError::ConstructionFailure(_)));
        assert_eq!(memory.live_total(), before);
    }

    #[test]
    fn test_end_to_end_leaves_nothing_behind() {
        let memory = Arc::new(MemoryKernel::default());
        {
            let occ = OccHelper::new(memory.clone(), OccConfig::default());
            let arc = occ
                .edges()
                .arc_through_three_points(&ArcEdgeThreePointsDto {
                    start: [0.0, 0.0, 0.0],
                    middle: [1.0, 1.0, 0.0],
                    end: [2.0, 0.0, 0.0],
                })
                .unwrap();
            let closing = occ
                .edges()
                .line(&LineDto {
                    start: [2.0, 0.0, 0.0],
                    end: [0.0, 0.0, 0.0],
                })
                .unwrap();
            let wire = occ
                .wires()
                .combine_edges_and_wires_into_a_wire(&ShapesDto {
                    shapes: vec![arc.shape(), closing.shape()],
                })
                .unwrap();
            let face = occ
                .faces()
                .create_face_from_wire(&FaceFromWireDto {
                    shape: &wire,
                    planar_only: true,
                })
                .unwrap();
            assert_relative_eq!(
                occ.faces().get_face_area(&face).unwrap(),
                std::f64::consts::FRAC_PI_2,
                epsilon = 1e-6
            );
            let points = occ
                .edges()
                .divide_edge_by_params_to_points(&DivideDto {
                    shape: &arc,
                    nr_of_divisions: 5,
                    remove_start_point: false,
                    remove_end_point: false,
                })
                .unwrap();
            assert_eq!(points.len(), 5);
        }
        assert_eq!(memory.live_total(), 0);
        assert_eq!(memory.invalid_releases(), 0);
        assert_eq!(memory.allocated_total(), memory.released_total());
    }

    #[test]
    fn test_get_edge_on_solid_allocates_nothing() {
        let (memory, occ) = fixture();
        let cube = occ
            .solids()
            .create_cube(&CubeDto {
                size: 1.0,
                center: [0.0; 3],
            })
            .unwrap();
        let allocated = memory.allocated_total();
        let err = occ
            .edges()
            .get_edge(&ShapeIndexDto::new(cube.shape(), 0))
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.allocated_total(), allocated);
    }

    #[test]
    fn test_fillet_face_routes_through_fillets() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 4.0);
        let face = occ.base().make_face(&wire, true).unwrap();
        let rounded = occ
            .faces()
            .fillet_face(&FilletDto {
                shape: &face,
                radius: 1.0,
                indexes: None,
            })
            .unwrap();
        assert_relative_eq!(
            occ.faces().get_face_area(&rounded).unwrap(),
            16.0 - (4.0 - std::f64::consts::PI),
            epsilon = 1e-6
        );
        drop((wire, face, rounded));
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_shape_kind_through_facade() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 1.0);
        assert_eq!(occ.shape_kind(wire.shape()).unwrap(), ShapeKind::Wire);
        let copy = occ.wires().get_wire(&ShapeIndexDto::new(wire.shape(), 0)).unwrap();
        assert_eq!(occ.shape_kind(copy.shape()).unwrap(), ShapeKind::Wire);
        assert!(occ.wires().is_wire_closed(&copy).unwrap());
    }
}
