//! Algorithm execution for the reference kernel

use glam::DVec3;

use super::geometry::{BoundedCurve, arc_through_three_points, arc_through_two_points_and_tangent};
use super::topology::Sub;
use super::{Outcome, State};
use crate::kernel::traits::{AlgorithmRequest, ArcOfCircleRequest, KernelError, KernelResult};

impl State {
    /// Run an algorithm request against the current objects
    pub(super) fn run(&mut self, request: &AlgorithmRequest) -> KernelResult<Outcome> {
        let tolerance = self.topology.tolerance();
        let shape = |sub: Sub| Outcome::Shape(Some(sub));
        match request {
            AlgorithmRequest::ArcOfCircle(arc) => Ok(Outcome::Curve(self.arc_of_circle(arc)?)),
            AlgorithmRequest::Segment { start, end } => Ok(Outcome::Curve(BoundedCurve::segment(
                self.pnt(*start)?,
                self.pnt(*end)?,
                tolerance,
            )?)),
            AlgorithmRequest::MakeVertex { point } => {
                let point = self.pnt(*point)?;
                Ok(shape(Sub::forward(self.topology.make_vertex(point))))
            }
            AlgorithmRequest::MakeEdge { curve } => {
                let curve = self.curve(*curve)?;
                Ok(shape(Sub::forward(self.topology.make_edge(curve))))
            }
            AlgorithmRequest::MakeEdgeOnSurface { curve, surface } => {
                let curve = self.curve2d(*curve)?.on_surface(&self.surface(*surface)?)?;
                Ok(shape(Sub::forward(self.topology.make_edge(curve))))
            }
            AlgorithmRequest::MakeWire { shapes } => {
                let subs = self.shapes(shapes)?;
                Ok(shape(Sub::forward(self.topology.make_wire(&subs)?)))
            }
            AlgorithmRequest::MakePolygon { points, closed } => {
                let points = points
                    .iter()
                    .map(|p| self.pnt(*p))
                    .collect::<KernelResult<Vec<DVec3>>>()?;
                Ok(shape(Sub::forward(
                    self.topology.make_polygon(&points, *closed)?,
                )))
            }
            AlgorithmRequest::MakeFace {
                wire,
                surface,
                planar_only,
            } => {
                let wire = self.solid_shape(*wire)?;
                let plane = surface.map(|s| self.plane(s)).transpose()?;
                Ok(shape(Sub::forward(
                    self.topology.make_face(wire, plane, *planar_only)?,
                )))
            }
            AlgorithmRequest::Sewing {
                shapes,
                tolerance: sewing_tolerance,
            } => {
                let subs = self.shapes(shapes)?;
                Ok(shape(Sub::forward(
                    self.topology.sew(&subs, *sewing_tolerance)?,
                )))
            }
            AlgorithmRequest::MakeSolid { shell } => {
                let shell = self.solid_shape(*shell)?;
                Ok(shape(Sub::forward(self.topology.make_solid(shell)?)))
            }
            AlgorithmRequest::MakeBox { corner, dx, dy, dz } => {
                let corner = self.pnt(*corner)?;
                Ok(shape(Sub::forward(
                    self.topology.make_box(corner, *dx, *dy, *dz)?,
                )))
            }
            AlgorithmRequest::Prism { shape: base, vector } => {
                let base = self.solid_shape(*base)?;
                let vector = self.vector(*vector)?;
                Ok(shape(self.topology.prism(base, vector)?))
            }
            AlgorithmRequest::ThruSections { wires, make_solid } => {
                let subs = self.shapes(wires)?;
                Ok(shape(Sub::forward(self.topology.loft(&subs, *make_solid)?)))
            }
            AlgorithmRequest::Boolean {
                operation,
                arguments,
                tools,
            } => {
                let arguments = self.shapes(arguments)?;
                let tools = self.shapes(tools)?;
                Ok(shape(self.topology.boolean(*operation, &arguments, &tools)?))
            }
            AlgorithmRequest::Transform { shape: target, trsf } => {
                let target = self.solid_shape(*target)?;
                let t = self.trsf(*trsf)?;
                Ok(shape(self.topology.transformed(target, &t)?))
            }
            AlgorithmRequest::UnifySameDomain {
                shape: target,
                unify_edges,
                ..
            } => {
                let target = self.solid_shape(*target)?;
                if !unify_edges {
                    return Ok(shape(target));
                }
                Ok(shape(self.topology.unified(target)?))
            }
            AlgorithmRequest::Fillet2d {
                face,
                radius,
                corners,
            } => {
                let face = self.solid_shape(*face)?;
                Ok(shape(self.topology.fillet_2d(
                    face,
                    *radius,
                    corners.as_deref(),
                )?))
            }
            AlgorithmRequest::UniformAbscissa { adaptor, nb_points } => {
                let curve = self.adaptor(*adaptor)?;
                if *nb_points < 2 {
                    return Err(KernelError::NotDone(
                        "uniform abscissa needs at least two points".into(),
                    ));
                }
                let intervals = self.topology.intervals();
                let length = curve.length(intervals);
                let step = length / (*nb_points - 1) as f64;
                let parameters = (0..*nb_points)
                    .map(|i| {
                        if i + 1 == *nb_points {
                            curve.last
                        } else {
                            curve.parameter_at_length(curve.first, step * i as f64, intervals)
                        }
                    })
                    .collect();
                Ok(Outcome::Parameters(parameters))
            }
            AlgorithmRequest::MakeCompound { shapes } => {
                let subs = self.shapes(shapes)?;
                Ok(shape(Sub::forward(self.topology.make_compound(subs))))
            }
        }
    }

    fn arc_of_circle(&self, request: &ArcOfCircleRequest) -> KernelResult<BoundedCurve> {
        let tolerance = self.topology.tolerance();
        match *request {
            ArcOfCircleRequest::ThreePoints { start, middle, end } => arc_through_three_points(
                self.pnt(start)?,
                self.pnt(middle)?,
                self.pnt(end)?,
                tolerance,
            ),
            ArcOfCircleRequest::TwoPointsTangent {
                start,
                tangent,
                end,
            } => arc_through_two_points_and_tangent(
                self.pnt(start)?,
                self.vector(tangent)?,
                self.pnt(end)?,
                tolerance,
            ),
            ArcOfCircleRequest::CircleTwoPoints {
                circle,
                start,
                end,
                sense,
            } => {
                let circle = self.circ(circle)?;
                let alpha1 = circle.frame.angle_of(self.pnt(start)?);
                let alpha2 = circle.frame.angle_of(self.pnt(end)?);
                circle.arc_between(alpha1, alpha2, sense)
            }
            ArcOfCircleRequest::CircleTwoAngles {
                circle,
                alpha1,
                alpha2,
                sense,
            } => self.circ(circle)?.arc_between(alpha1, alpha2, sense),
            ArcOfCircleRequest::CirclePointAngle {
                circle,
                point,
                alpha,
                sense,
            } => {
                let circle = self.circ(circle)?;
                let alpha1 = circle.frame.angle_of(self.pnt(point)?);
                circle.arc_between(alpha1, alpha, sense)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::kernel::traits::{
        AlgorithmRequest, ArcOfCircleRequest, BooleanOperation, GPropKind, Kernel, KernelError,
        NativeClass, TopAbsShapeEnum,
    };
    use crate::kernel::MemoryKernel;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn built(kernel: &MemoryKernel, request: AlgorithmRequest) -> crate::kernel::NativeId {
        let maker = kernel.new_algorithm(&request).unwrap();
        kernel.build(maker).unwrap();
        let shape = kernel.algorithm_shape(maker).unwrap();
        kernel.release(maker);
        shape
    }

    #[test]
    fn test_circle_from_two_angles_is_quarter() {
        let kernel = MemoryKernel::default();
        let origin = kernel.new_pnt([0.0, 0.0, 0.0]).unwrap();
        let z = kernel.new_dir([0.0, 0.0, 1.0]).unwrap();
        let axis = kernel.new_ax2(origin, z).unwrap();
        let circ = kernel.new_circ(axis, 2.0).unwrap();
        let maker = kernel
            .new_algorithm(&AlgorithmRequest::ArcOfCircle(
                ArcOfCircleRequest::CircleTwoAngles {
                    circle: circ,
                    alpha1: 0.0,
                    alpha2: PI / 2.0,
                    sense: true,
                },
            ))
            .unwrap();
        kernel.build(maker).unwrap();
        let curve = kernel.algorithm_curve(maker).unwrap();
        let edge = built(&kernel, AlgorithmRequest::MakeEdge { curve });
        let props = kernel.new_properties(edge, GPropKind::Linear).unwrap();
        assert_relative_eq!(kernel.properties_mass(props).unwrap(), PI, epsilon = 1e-9);
    }

    #[test]
    fn test_prism_of_box_base_is_solid() {
        let kernel = MemoryKernel::default();
        let corner = kernel.new_pnt([0.0, 0.0, 0.0]).unwrap();
        let solid = built(
            &kernel,
            AlgorithmRequest::MakeBox {
                corner,
                dx: 2.0,
                dy: 2.0,
                dz: 2.0,
            },
        );
        assert_eq!(kernel.shape_type(solid).unwrap(), TopAbsShapeEnum::Solid);
        let props = kernel.new_properties(solid, GPropKind::Volume).unwrap();
        assert_relative_eq!(kernel.properties_mass(props).unwrap(), 8.0, epsilon = 1e-9);
        let center = kernel.properties_center(props).unwrap();
        assert_relative_eq!(center[2], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_uniform_abscissa_on_segment() {
        let kernel = MemoryKernel::default();
        let a = kernel.new_pnt([0.0, 0.0, 0.0]).unwrap();
        let b = kernel.new_pnt([9.0, 0.0, 0.0]).unwrap();
        let segment = kernel
            .new_algorithm(&AlgorithmRequest::Segment { start: a, end: b })
            .unwrap();
        kernel.build(segment).unwrap();
        let curve = kernel.algorithm_curve(segment).unwrap();
        let edge = built(&kernel, AlgorithmRequest::MakeEdge { curve });
        let adaptor = kernel.new_curve_adaptor(edge).unwrap();
        let sampler = kernel
            .new_algorithm(&AlgorithmRequest::UniformAbscissa {
                adaptor,
                nb_points: 4,
            })
            .unwrap();
        kernel.build(sampler).unwrap();
        let parameters = kernel.algorithm_parameters(sampler).unwrap();
        assert_eq!(parameters.len(), 4);
        assert_relative_eq!(parameters[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(parameters[3], 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_failed_build_keeps_objects_releasable() {
        let kernel = MemoryKernel::default();
        let a = kernel.new_pnt([0.0, 0.0, 0.0]).unwrap();
        let b = kernel.new_pnt([1.0, 0.0, 0.0]).unwrap();
        let c = kernel.new_pnt([2.0, 0.0, 0.0]).unwrap();
        let maker = kernel
            .new_algorithm(&AlgorithmRequest::ArcOfCircle(
                ArcOfCircleRequest::ThreePoints {
                    start: a,
                    middle: b,
                    end: c,
                },
            ))
            .unwrap();
        assert!(matches!(
            kernel.build(maker),
            Err(KernelError::Degenerate(_))
        ));
        for id in [a, b, c, maker] {
            kernel.release(id);
        }
        assert_eq!(kernel.live(NativeClass::Algorithm), 0);
        assert_eq!(kernel.live(NativeClass::Primitive), 0);
        assert_eq!(kernel.invalid_releases(), 0);
    }

    #[test]
    fn test_overlapping_fuse_not_supported() {
        let kernel = MemoryKernel::default();
        let corner = kernel.new_pnt([0.0, 0.0, 0.0]).unwrap();
        let request = AlgorithmRequest::MakeBox {
            corner,
            dx: 1.0,
            dy: 1.0,
            dz: 1.0,
        };
        let a = built(&kernel, request.clone());
        let b = built(&kernel, request);
        let fuse = kernel
            .new_algorithm(&AlgorithmRequest::Boolean {
                operation: BooleanOperation::Fuse,
                arguments: vec![a, b],
                tools: Vec::new(),
            })
            .unwrap();
        assert!(matches!(
            kernel.build(fuse),
            Err(KernelError::NotSupported(_))
        ));
    }
}
