//! Topological entities of the reference kernel
//!
//! Entities live in an append-only arena and are immutable once added;
//! shape handles are oriented uses of arena entries. Every builder returns
//! new entities and shares the unchanged ones.

use std::collections::{HashMap, HashSet};

use glam::{DAffine3, DVec3};
use occ_core::KernelConfig;

use super::geometry::{BoundedCurve, Frame, Surface, corner_fillet, ruled_integral, simpson};
use crate::kernel::traits::{BooleanOperation, GPropKind, KernelError, KernelResult, TopAbsShapeEnum};

pub(crate) type EntityId = usize;

/// Oriented use of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Sub {
    pub id: EntityId,
    pub reversed: bool,
}

impl Sub {
    pub fn forward(id: EntityId) -> Self {
        Self {
            id,
            reversed: false,
        }
    }

    pub fn flipped(self) -> Self {
        Self {
            reversed: !self.reversed,
            ..self
        }
    }

    /// Orientation composed with the parent's
    pub fn under(self, parent_reversed: bool) -> Self {
        Self {
            reversed: self.reversed ^ parent_reversed,
            ..self
        }
    }
}

/// Value of a shape handle: null or an oriented entity use
pub(crate) type ShapeRef = Option<Sub>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Entity {
    Vertex {
        point: DVec3,
    },
    /// `start == end` for closed edges
    Edge {
        curve: BoundedCurve,
        start: EntityId,
        end: EntityId,
    },
    /// Edges in connection order
    Wire {
        edges: Vec<Sub>,
    },
    /// First wire is the outer boundary
    Face {
        surface: Surface,
        wires: Vec<Sub>,
    },
    Shell {
        faces: Vec<Sub>,
    },
    Solid {
        shells: Vec<Sub>,
        volume: f64,
        centroid: DVec3,
    },
    Compound {
        children: Vec<Sub>,
    },
}

impl Entity {
    pub fn kind(&self) -> TopAbsShapeEnum {
        match self {
            Entity::Vertex { .. } => TopAbsShapeEnum::Vertex,
            Entity::Edge { .. } => TopAbsShapeEnum::Edge,
            Entity::Wire { .. } => TopAbsShapeEnum::Wire,
            Entity::Face { .. } => TopAbsShapeEnum::Face,
            Entity::Shell { .. } => TopAbsShapeEnum::Shell,
            Entity::Solid { .. } => TopAbsShapeEnum::Solid,
            Entity::Compound { .. } => TopAbsShapeEnum::Compound,
        }
    }
}

fn expected(kind: &str) -> KernelError {
    KernelError::NotDone(format!("expected a {kind}"))
}

/// Entity arena plus the numeric settings builders need
#[derive(Debug, Default)]
pub(crate) struct Topology {
    entities: Vec<Entity>,
    config: KernelConfig,
}

impl Topology {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            entities: Vec::new(),
            config,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.config.linear_tolerance
    }

    pub fn intervals(&self) -> usize {
        self.config.integration_intervals
    }

    pub fn add(&mut self, entity: Entity) -> EntityId {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn entity(&self, id: EntityId) -> KernelResult<&Entity> {
        self.entities
            .get(id)
            .ok_or_else(|| KernelError::NotDone(format!("dangling entity {id}")))
    }

    pub fn kind(&self, id: EntityId) -> KernelResult<TopAbsShapeEnum> {
        Ok(self.entity(id)?.kind())
    }

    // ========== Accessors ==========

    pub fn point(&self, vertex: EntityId) -> KernelResult<DVec3> {
        match self.entity(vertex)? {
            Entity::Vertex { point } => Ok(*point),
            _ => Err(expected("vertex")),
        }
    }

    pub fn face_surface(&self, face: EntityId) -> KernelResult<Surface> {
        match self.entity(face)? {
            Entity::Face { surface, .. } => Ok(*surface),
            _ => Err(expected("face")),
        }
    }

    pub fn edge(&self, id: EntityId) -> KernelResult<(BoundedCurve, EntityId, EntityId)> {
        match self.entity(id)? {
            Entity::Edge { curve, start, end } => Ok((*curve, *start, *end)),
            _ => Err(expected("edge")),
        }
    }

    /// Start and end vertices of an edge use, in traversal direction
    pub fn oriented_ends(&self, sub: Sub) -> KernelResult<(EntityId, EntityId)> {
        let (_, start, end) = self.edge(sub.id)?;
        Ok(if sub.reversed {
            (end, start)
        } else {
            (start, end)
        })
    }

    /// Curve of an edge use parametrized in traversal direction
    pub fn oriented_curve(&self, sub: Sub) -> KernelResult<BoundedCurve> {
        let (curve, _, _) = self.edge(sub.id)?;
        Ok(if sub.reversed { curve.reversed() } else { curve })
    }

    /// Edge uses of a wire in connection order
    pub fn wire_uses(&self, wire: Sub) -> KernelResult<Vec<Sub>> {
        match self.entity(wire.id)? {
            Entity::Wire { edges } if wire.reversed => {
                Ok(edges.iter().rev().map(|e| e.flipped()).collect())
            }
            Entity::Wire { edges } => Ok(edges.clone()),
            _ => Err(expected("wire")),
        }
    }

    /// Direct sub-entities in stored order
    pub fn children(&self, id: EntityId) -> KernelResult<Vec<Sub>> {
        Ok(match self.entity(id)? {
            Entity::Vertex { .. } => Vec::new(),
            Entity::Edge { start, end, .. } => {
                let mut vertices = vec![Sub::forward(*start)];
                if end != start {
                    vertices.push(Sub {
                        id: *end,
                        reversed: true,
                    });
                }
                vertices
            }
            Entity::Wire { edges } => edges.clone(),
            Entity::Face { wires, .. } => wires.clone(),
            Entity::Shell { faces } => faces.clone(),
            Entity::Solid { shells, .. } => shells.clone(),
            Entity::Compound { children } => children.clone(),
        })
    }

    /// Distinct sub-shapes of a kind, depth-first in order of first occurrence
    pub fn explore(&self, root: Sub, kind: TopAbsShapeEnum) -> KernelResult<Vec<Sub>> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(sub) = stack.pop() {
            if !seen.insert(sub.id) {
                continue;
            }
            let entity_kind = self.kind(sub.id)?;
            if kind == TopAbsShapeEnum::Shape || entity_kind == kind {
                found.push(sub);
            }
            let children = self.children(sub.id)?;
            stack.extend(children.into_iter().rev().map(|c| c.under(sub.reversed)));
        }
        Ok(found)
    }

    pub fn is_closed(&self, sub: Sub) -> KernelResult<bool> {
        match self.entity(sub.id)? {
            Entity::Edge { start, end, .. } => Ok(start == end),
            Entity::Wire { edges } => match (edges.first(), edges.last()) {
                (Some(first), Some(last)) => {
                    Ok(self.oriented_ends(*first)?.0 == self.oriented_ends(*last)?.1)
                }
                _ => Ok(false),
            },
            Entity::Shell { faces } => self.shell_is_closed(faces),
            Entity::Vertex { .. } => Ok(false),
            other => Err(KernelError::NotSupported(format!(
                "closure of a {:?}",
                other.kind()
            ))),
        }
    }

    fn shell_is_closed(&self, faces: &[Sub]) -> KernelResult<bool> {
        let mut uses: HashMap<EntityId, usize> = HashMap::new();
        for face in faces {
            for wire in self.children(face.id)? {
                for edge in self.wire_uses(wire)? {
                    *uses.entry(edge.id).or_default() += 1;
                }
            }
        }
        Ok(!uses.is_empty() && uses.values().all(|&count| count == 2))
    }

    fn curve_samples(&self) -> usize {
        (self.intervals() / 4).max(8)
    }

    /// Points along a wire in traversal order
    fn wire_samples(&self, wire: Sub) -> KernelResult<Vec<DVec3>> {
        let mut points = Vec::new();
        for edge in self.wire_uses(wire)? {
            let samples = self.oriented_curve(edge)?.samples(self.curve_samples());
            let skip = usize::from(!points.is_empty());
            points.extend(samples.into_iter().skip(skip));
        }
        Ok(points)
    }

    pub fn bounding_box(&self, root: Sub) -> KernelResult<(DVec3, DVec3)> {
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        for vertex in self.explore(root, TopAbsShapeEnum::Vertex)? {
            let p = self.point(vertex.id)?;
            min = min.min(p);
            max = max.max(p);
        }
        for edge in self.explore(root, TopAbsShapeEnum::Edge)? {
            for p in self.edge(edge.id)?.0.samples(self.curve_samples()) {
                min = min.min(p);
                max = max.max(p);
            }
        }
        Ok((min, max))
    }

    // ========== Elementary builders ==========

    pub fn make_vertex(&mut self, point: DVec3) -> EntityId {
        self.add(Entity::Vertex { point })
    }

    /// Edge over a curve with fresh vertices, one when the curve closes
    pub fn make_edge(&mut self, curve: BoundedCurve) -> EntityId {
        let start = self.make_vertex(curve.start());
        let end = if curve.start().distance(curve.end()) <= self.tolerance() {
            start
        } else {
            self.make_vertex(curve.end())
        };
        self.add(Entity::Edge { curve, start, end })
    }

    pub fn make_compound(&mut self, children: Vec<Sub>) -> EntityId {
        self.add(Entity::Compound { children })
    }

    /// Copy of an edge use with one of its traversal ends replaced
    fn with_vertex(&mut self, sub: Sub, at_start: bool, vertex: EntityId) -> KernelResult<Sub> {
        let (curve, mut start, mut end) = self.edge(sub.id)?;
        if at_start != sub.reversed {
            start = vertex;
        } else {
            end = vertex;
        }
        let id = self.add(Entity::Edge { curve, start, end });
        Ok(Sub { id, ..sub })
    }

    pub fn make_wire(&mut self, shapes: &[Sub]) -> KernelResult<EntityId> {
        let mut pending = Vec::new();
        for shape in shapes {
            match self.kind(shape.id)? {
                TopAbsShapeEnum::Edge => pending.push(*shape),
                TopAbsShapeEnum::Wire => pending.extend(self.wire_uses(*shape)?),
                _ => return Err(KernelError::NotDone("wire maker accepts edges and wires".into())),
            }
        }
        let Some(&first) = pending.first() else {
            return Err(KernelError::NotDone("wire maker got no edges".into()));
        };

        let tolerance = self.tolerance();
        let mut chain = vec![first];
        if let Some(&second) = pending.get(1) {
            let (start, end) = self.oriented_ends(first)?;
            let (s2, e2) = self.oriented_ends(second)?;
            let touches = |a: EntityId, this: &Self| -> KernelResult<bool> {
                let p = this.point(a)?;
                Ok(p.distance(this.point(s2)?) <= tolerance || p.distance(this.point(e2)?) <= tolerance)
            };
            if !touches(end, self)? && touches(start, self)? {
                chain[0] = first.flipped();
            }
        }

        for &next in &pending[1..] {
            let Some(&last) = chain.last() else { break };
            let (_, joint) = self.oriented_ends(last)?;
            let joint_point = self.point(joint)?;
            let (s, e) = self.oriented_ends(next)?;
            let oriented = if self.point(s)?.distance(joint_point) <= tolerance {
                next
            } else if self.point(e)?.distance(joint_point) <= tolerance {
                next.flipped()
            } else {
                return Err(KernelError::NotDone("edges are not connected".into()));
            };
            let (start, _) = self.oriented_ends(oriented)?;
            let shared = if start == joint {
                oriented
            } else {
                self.with_vertex(oriented, true, joint)?
            };
            chain.push(shared);
        }

        if chain.len() > 1 {
            let (first_start, _) = self.oriented_ends(chain[0])?;
            let last_index = chain.len() - 1;
            let (_, last_end) = self.oriented_ends(chain[last_index])?;
            if last_end != first_start
                && self.point(last_end)?.distance(self.point(first_start)?) <= tolerance
            {
                chain[last_index] = self.with_vertex(chain[last_index], false, first_start)?;
            }
        }
        Ok(self.add(Entity::Wire { edges: chain }))
    }

    /// Wire of straight segments, sharing one vertex per corner
    pub fn make_polygon(&mut self, points: &[DVec3], closed: bool) -> KernelResult<EntityId> {
        let tolerance = self.tolerance();
        let mut distinct: Vec<DVec3> = Vec::with_capacity(points.len());
        for p in points {
            if distinct.last().is_none_or(|last| last.distance(*p) > tolerance) {
                distinct.push(*p);
            }
        }
        if closed
            && distinct.len() > 1
            && distinct[0].distance(distinct[distinct.len() - 1]) <= tolerance
        {
            distinct.pop();
        }
        let needed = if closed { 3 } else { 2 };
        if distinct.len() < needed {
            return Err(KernelError::NotDone(format!(
                "polygon needs at least {needed} distinct points"
            )));
        }

        let vertices: Vec<EntityId> = distinct.iter().map(|p| self.make_vertex(*p)).collect();
        let count = if closed {
            vertices.len()
        } else {
            vertices.len() - 1
        };
        let mut edges = Vec::with_capacity(count);
        for i in 0..count {
            let j = (i + 1) % vertices.len();
            let curve = BoundedCurve::segment(distinct[i], distinct[j], tolerance)?;
            let id = self.add(Entity::Edge {
                curve,
                start: vertices[i],
                end: vertices[j],
            });
            edges.push(Sub::forward(id));
        }
        Ok(self.add(Entity::Wire { edges }))
    }

    // ========== Faces ==========

    /// Planar face bounded by a closed wire
    pub fn make_face(
        &mut self,
        wire: Sub,
        plane: Option<Frame>,
        planar_only: bool,
    ) -> KernelResult<EntityId> {
        if self.kind(wire.id)? != TopAbsShapeEnum::Wire {
            return Err(expected("wire"));
        }
        if !self.is_closed(wire)? {
            return Err(KernelError::NotDone("wire is not closed".into()));
        }
        let samples = self.wire_samples(wire)?;
        let tolerance = self.tolerance().max(1e-9);
        let off_plane = |frame: &Frame| {
            samples
                .iter()
                .any(|p| frame.to_local(*p).z.abs() > tolerance)
        };

        let frame = match plane {
            Some(frame) => {
                if off_plane(&frame) {
                    return Err(KernelError::NotDone("wire does not lie on the plane".into()));
                }
                frame
            }
            None => {
                let center = samples.iter().copied().sum::<DVec3>() / samples.len() as f64;
                let mut normal = DVec3::ZERO;
                for pair in samples.windows(2) {
                    normal += (pair[0] - center).cross(pair[1] - center);
                }
                if normal.length() <= tolerance {
                    return Err(KernelError::Degenerate("wire encloses no area".into()));
                }
                let frame = Frame::from_normal(center, normal);
                if off_plane(&frame) {
                    return Err(if planar_only {
                        KernelError::NotDone("wire is not planar".into())
                    } else {
                        KernelError::NotSupported("non-planar filling surfaces".into())
                    });
                }
                frame
            }
        };

        Ok(self.add(Entity::Face {
            surface: Surface::Plane(frame),
            wires: vec![wire],
        }))
    }

    /// Signed area and first moments of a wire loop in plane coordinates
    fn loop_moments(&self, wire: Sub, frame: &Frame) -> KernelResult<DVec3> {
        let mut total = DVec3::ZERO;
        for edge in self.wire_uses(wire)? {
            let curve = self.oriented_curve(edge)?;
            total += simpson(curve.first, curve.last, self.intervals(), |u| {
                let p = frame.to_local(curve.value(u));
                let d = curve.d1(u);
                let (dx, dy) = (d.dot(frame.x), d.dot(frame.y));
                DVec3::new(
                    0.5 * (p.x * dy - p.y * dx),
                    0.5 * p.x * p.x * dy,
                    -0.5 * p.y * p.y * dx,
                )
            });
        }
        Ok(if total.x < 0.0 { -total } else { total })
    }

    /// Area and centroid of a face
    pub fn face_properties(&self, face: EntityId) -> KernelResult<(f64, DVec3)> {
        let Entity::Face { surface, wires } = self.entity(face)? else {
            return Err(expected("face"));
        };
        match surface {
            Surface::Plane(frame) => {
                let mut moments = DVec3::ZERO;
                for (i, wire) in wires.iter().enumerate() {
                    let m = self.loop_moments(*wire, frame)?;
                    moments += if i == 0 { m } else { -m };
                }
                let area = moments.x;
                if area <= 0.0 {
                    return Ok((0.0, frame.origin));
                }
                Ok((area, frame.from_local(moments.y / area, moments.z / area)))
            }
            Surface::Ruled { a, b } => {
                let area = ruled_integral(a, b, self.intervals(), |_, n| n.length());
                let moment = ruled_integral(a, b, self.intervals(), |p, n| p * n.length());
                if area <= 0.0 {
                    return Ok((0.0, a.at(0.5)));
                }
                Ok((area, moment / area))
            }
        }
    }

    /// Integral of `(p - center) . n` over a face, sign depending on
    /// the parametrization
    fn face_flux(&self, face: EntityId, center: DVec3) -> KernelResult<f64> {
        let Entity::Face { surface, .. } = self.entity(face)? else {
            return Err(expected("face"));
        };
        Ok(match surface {
            Surface::Plane(frame) => {
                let (area, _) = self.face_properties(face)?;
                (frame.origin - center).dot(frame.z) * area
            }
            Surface::Ruled { a, b } => {
                ruled_integral(a, b, self.intervals(), |p, n| (p - center).dot(n))
            }
        })
    }

    // ========== Shells and solids ==========

    /// Merge coincident vertices and edges of faces into one shell
    pub fn sew(&mut self, shapes: &[Sub], tolerance: f64) -> KernelResult<EntityId> {
        let tolerance = tolerance.max(self.tolerance());
        let mut faces = Vec::new();
        for shape in shapes {
            faces.extend(self.explore(*shape, TopAbsShapeEnum::Face)?);
        }
        if faces.is_empty() {
            return Err(KernelError::NotDone("nothing to sew".into()));
        }

        let mut vertices: Vec<(DVec3, EntityId)> = Vec::new();
        let mut vertex_map: HashMap<EntityId, EntityId> = HashMap::new();
        let mut edges: Vec<(EntityId, EntityId, EntityId, DVec3)> = Vec::new();
        let mut edge_map: HashMap<EntityId, (EntityId, bool)> = HashMap::new();
        let mut sewn = Vec::with_capacity(faces.len());

        for face in faces {
            let Entity::Face { surface, wires } = self.entity(face.id)?.clone() else {
                return Err(expected("face"));
            };
            let mut new_wires = Vec::with_capacity(wires.len());
            for wire in wires {
                let Entity::Wire { edges: uses } = self.entity(wire.id)?.clone() else {
                    return Err(expected("wire"));
                };
                let mut new_uses = Vec::with_capacity(uses.len());
                for edge_use in uses {
                    if let Some(&(id, flip)) = edge_map.get(&edge_use.id) {
                        new_uses.push(Sub {
                            id,
                            reversed: edge_use.reversed ^ flip,
                        });
                        continue;
                    }
                    let (curve, start, end) = self.edge(edge_use.id)?;
                    let mut canonical = |old: EntityId, this: &mut Self| -> KernelResult<EntityId> {
                        if let Some(&id) = vertex_map.get(&old) {
                            return Ok(id);
                        }
                        let p = this.point(old)?;
                        let id = match vertices.iter().find(|(q, _)| q.distance(p) <= tolerance) {
                            Some(&(_, id)) => id,
                            None => {
                                vertices.push((p, old));
                                old
                            }
                        };
                        vertex_map.insert(old, id);
                        Ok(id)
                    };
                    let new_start = canonical(start, self)?;
                    let new_end = canonical(end, self)?;
                    let mid = curve.at(0.5);
                    let existing = edges.iter().find(|(_, a, b, m)| {
                        m.distance(mid) <= tolerance
                            && ((*a == new_start && *b == new_end) || (*a == new_end && *b == new_start))
                    });
                    let (id, flip) = match existing {
                        Some(&(id, a, _, _)) => (id, a != new_start),
                        None => {
                            let id = if new_start == start && new_end == end {
                                edge_use.id
                            } else {
                                self.add(Entity::Edge {
                                    curve,
                                    start: new_start,
                                    end: new_end,
                                })
                            };
                            edges.push((id, new_start, new_end, mid));
                            (id, false)
                        }
                    };
                    edge_map.insert(edge_use.id, (id, flip));
                    new_uses.push(Sub {
                        id,
                        reversed: edge_use.reversed ^ flip,
                    });
                }
                let id = self.add(Entity::Wire { edges: new_uses });
                new_wires.push(Sub { id, ..wire });
            }
            let id = self.add(Entity::Face {
                surface,
                wires: new_wires,
            });
            sewn.push(Sub { id, ..face });
        }
        Ok(self.add(Entity::Shell { faces: sewn }))
    }

    /// Volume and centroid enclosed by a closed shell, assuming it is convex
    /// around the area centroid of its faces
    fn enclosed_volume(&self, faces: &[Sub]) -> KernelResult<(f64, DVec3)> {
        let mut area = 0.0;
        let mut moment = DVec3::ZERO;
        let mut properties = Vec::with_capacity(faces.len());
        for face in faces {
            let (a, c) = self.face_properties(face.id)?;
            area += a;
            moment += c * a;
            properties.push((face.id, c));
        }
        if area <= 0.0 {
            return Err(KernelError::Degenerate("shell has no area".into()));
        }
        let center = moment / area;

        let mut volume = 0.0;
        let mut weighted = DVec3::ZERO;
        for (face, face_center) in properties {
            let cone = self.face_flux(face, center)?.abs() / 3.0;
            volume += cone;
            weighted += (center + (face_center - center) * 0.75) * cone;
        }
        if volume <= self.tolerance() {
            return Err(KernelError::Degenerate("shell encloses no volume".into()));
        }
        Ok((volume, weighted / volume))
    }

    pub fn make_solid(&mut self, shell: Sub) -> KernelResult<EntityId> {
        let Entity::Shell { faces } = self.entity(shell.id)?.clone() else {
            return Err(expected("shell"));
        };
        if !self.shell_is_closed(&faces)? {
            return Err(KernelError::NotDone("shell is not closed".into()));
        }
        let (volume, centroid) = self.enclosed_volume(&faces)?;
        Ok(self.add(Entity::Solid {
            shells: vec![shell],
            volume,
            centroid,
        }))
    }

    pub fn make_box(&mut self, corner: DVec3, dx: f64, dy: f64, dz: f64) -> KernelResult<EntityId> {
        if dx <= self.tolerance() || dy <= self.tolerance() || dz <= self.tolerance() {
            return Err(KernelError::NotDone("box dimensions must be positive".into()));
        }
        let base = [
            corner,
            corner + DVec3::new(dx, 0.0, 0.0),
            corner + DVec3::new(dx, dy, 0.0),
            corner + DVec3::new(0.0, dy, 0.0),
        ];
        let wire = self.make_polygon(&base, true)?;
        let face = self.make_face(Sub::forward(wire), None, true)?;
        let solid = self.prism(Sub::forward(face), DVec3::new(0.0, 0.0, dz))?;
        Ok(solid.id)
    }

    // ========== Sweeps ==========

    /// Linear sweep: vertex to edge, edge to face, wire to shell, face to solid
    pub fn prism(&mut self, root: Sub, v: DVec3) -> KernelResult<Sub> {
        if v.length() <= self.tolerance() {
            return Err(KernelError::Degenerate("extrusion vector is null".into()));
        }
        let mut sweep = Sweep::new(v);
        self.prism_with(root, &mut sweep)
    }

    fn prism_with(&mut self, root: Sub, sweep: &mut Sweep) -> KernelResult<Sub> {
        match self.entity(root.id)?.clone() {
            Entity::Vertex { .. } => Ok(Sub {
                id: self.lateral_edge(root.id, sweep)?,
                ..root
            }),
            Entity::Edge { .. } => Ok(Sub {
                id: self.side_face(root.id, sweep)?,
                ..root
            }),
            Entity::Wire { edges } => {
                let mut faces = Vec::with_capacity(edges.len());
                for edge in edges {
                    faces.push(Sub {
                        id: self.side_face(edge.id, sweep)?,
                        reversed: edge.reversed,
                    });
                }
                Ok(Sub {
                    id: self.add(Entity::Shell { faces }),
                    ..root
                })
            }
            Entity::Face { surface, wires } => {
                let Surface::Plane(frame) = surface else {
                    return Err(KernelError::NotSupported("extrusion of a ruled face".into()));
                };
                let (area, centroid) = self.face_properties(root.id)?;
                let height = sweep.vector.dot(frame.z).abs();
                if height <= self.tolerance() {
                    return Err(KernelError::Degenerate(
                        "extrusion vector lies in the face plane".into(),
                    ));
                }
                let mut faces = vec![root.flipped()];
                let mut top_wires = Vec::with_capacity(wires.len());
                for wire in &wires {
                    let mut top_uses = Vec::new();
                    for edge in self.wire_uses(Sub::forward(wire.id))? {
                        faces.push(Sub {
                            id: self.side_face(edge.id, sweep)?,
                            reversed: edge.reversed ^ wire.reversed,
                        });
                        top_uses.push(Sub {
                            id: self.top_edge(edge.id, sweep)?,
                            reversed: edge.reversed,
                        });
                    }
                    top_wires.push(Sub {
                        id: self.add(Entity::Wire { edges: top_uses }),
                        reversed: wire.reversed,
                    });
                }
                let top_frame = Frame {
                    origin: frame.origin + sweep.vector,
                    ..frame
                };
                let top = self.add(Entity::Face {
                    surface: Surface::Plane(top_frame),
                    wires: top_wires,
                });
                faces.push(Sub { id: top, ..root });
                let shell = self.add(Entity::Shell { faces });
                Ok(Sub::forward(self.add(Entity::Solid {
                    shells: vec![Sub::forward(shell)],
                    volume: area * height,
                    centroid: centroid + sweep.vector * 0.5,
                })))
            }
            Entity::Compound { children } => {
                let mut swept = Vec::with_capacity(children.len());
                for child in children {
                    swept.push(self.prism_with(child, sweep)?);
                }
                Ok(Sub {
                    id: self.add(Entity::Compound { children: swept }),
                    ..root
                })
            }
            other => Err(KernelError::NotSupported(format!(
                "extrusion of a {:?}",
                other.kind()
            ))),
        }
    }

    fn top_vertex(&mut self, vertex: EntityId, sweep: &mut Sweep) -> KernelResult<EntityId> {
        if let Some(&id) = sweep.top_vertices.get(&vertex) {
            return Ok(id);
        }
        let point = self.point(vertex)? + sweep.vector;
        let id = self.make_vertex(point);
        sweep.top_vertices.insert(vertex, id);
        Ok(id)
    }

    fn lateral_edge(&mut self, vertex: EntityId, sweep: &mut Sweep) -> KernelResult<EntityId> {
        if let Some(&id) = sweep.laterals.get(&vertex) {
            return Ok(id);
        }
        let top = self.top_vertex(vertex, sweep)?;
        let p = self.point(vertex)?;
        let curve = BoundedCurve::segment(p, p + sweep.vector, self.tolerance())?;
        let id = self.add(Entity::Edge {
            curve,
            start: vertex,
            end: top,
        });
        sweep.laterals.insert(vertex, id);
        Ok(id)
    }

    fn top_edge(&mut self, edge: EntityId, sweep: &mut Sweep) -> KernelResult<EntityId> {
        if let Some(&id) = sweep.top_edges.get(&edge) {
            return Ok(id);
        }
        let (curve, start, end) = self.edge(edge)?;
        let top_start = self.top_vertex(start, sweep)?;
        let top_end = self.top_vertex(end, sweep)?;
        let id = self.add(Entity::Edge {
            curve: curve.translated(sweep.vector),
            start: top_start,
            end: top_end,
        });
        sweep.top_edges.insert(edge, id);
        Ok(id)
    }

    fn side_face(&mut self, edge: EntityId, sweep: &mut Sweep) -> KernelResult<EntityId> {
        if let Some(&id) = sweep.sides.get(&edge) {
            return Ok(id);
        }
        let (curve, start, end) = self.edge(edge)?;
        let lateral_start = self.lateral_edge(start, sweep)?;
        let lateral_end = self.lateral_edge(end, sweep)?;
        let top = self.top_edge(edge, sweep)?;
        let wire = self.add(Entity::Wire {
            edges: vec![
                Sub::forward(edge),
                Sub::forward(lateral_end),
                Sub::forward(top).flipped(),
                Sub::forward(lateral_start).flipped(),
            ],
        });
        let id = self.add(Entity::Face {
            surface: Surface::Ruled {
                a: curve,
                b: curve.translated(sweep.vector),
            },
            wires: vec![Sub::forward(wire)],
        });
        sweep.sides.insert(edge, id);
        Ok(id)
    }

    /// Ruled loft through wires with matching edge counts
    pub fn loft(&mut self, wires: &[Sub], make_solid: bool) -> KernelResult<EntityId> {
        if wires.len() < 2 {
            return Err(KernelError::NotDone("loft needs at least two sections".into()));
        }
        let mut sections = Vec::with_capacity(wires.len());
        for wire in wires {
            if make_solid && !self.is_closed(*wire)? {
                return Err(KernelError::NotDone("closed loft needs closed sections".into()));
            }
            sections.push(self.wire_uses(*wire)?);
        }
        if sections.iter().any(|s| s.len() != sections[0].len()) {
            return Err(KernelError::NotSupported(
                "loft through sections with different edge counts".into(),
            ));
        }

        let tolerance = self.tolerance();
        let mut rulings: HashMap<(EntityId, EntityId), EntityId> = HashMap::new();
        let mut ruling = |a: EntityId, b: EntityId, this: &mut Self| -> KernelResult<EntityId> {
            if let Some(&id) = rulings.get(&(a, b)) {
                return Ok(id);
            }
            let curve = BoundedCurve::segment(this.point(a)?, this.point(b)?, tolerance)?;
            let id = this.add(Entity::Edge {
                curve,
                start: a,
                end: b,
            });
            rulings.insert((a, b), id);
            Ok(id)
        };

        let mut faces = Vec::new();
        if make_solid {
            faces.push(Sub::forward(self.make_face(wires[0], None, true)?));
        }
        for pair in sections.windows(2) {
            for (lower, upper) in pair[0].iter().zip(&pair[1]) {
                let (lower_start, lower_end) = self.oriented_ends(*lower)?;
                let (upper_start, upper_end) = self.oriented_ends(*upper)?;
                let end_ruling = ruling(lower_end, upper_end, self)?;
                let start_ruling = ruling(lower_start, upper_start, self)?;
                let wire = self.add(Entity::Wire {
                    edges: vec![
                        *lower,
                        Sub::forward(end_ruling),
                        upper.flipped(),
                        Sub::forward(start_ruling).flipped(),
                    ],
                });
                let surface = Surface::Ruled {
                    a: self.oriented_curve(*lower)?,
                    b: self.oriented_curve(*upper)?,
                };
                faces.push(Sub::forward(self.add(Entity::Face {
                    surface,
                    wires: vec![Sub::forward(wire)],
                })));
            }
        }
        if make_solid {
            let last = wires[wires.len() - 1];
            faces.push(Sub::forward(self.make_face(last, None, true)?));
            let shell = self.add(Entity::Shell { faces });
            return self.make_solid(Sub::forward(shell));
        }
        Ok(self.add(Entity::Shell { faces }))
    }

    // ========== Booleans ==========

    fn disjoint(&self, a: Sub, b: Sub) -> KernelResult<bool> {
        let (amin, amax) = self.bounding_box(a)?;
        let (bmin, bmax) = self.bounding_box(b)?;
        let gap = self.tolerance();
        Ok((0..3).any(|i| amax[i] + gap < bmin[i] || bmax[i] + gap < amin[i]))
    }

    /// Booleans between operands whose bounding boxes do not overlap
    pub fn boolean(
        &mut self,
        operation: BooleanOperation,
        arguments: &[Sub],
        tools: &[Sub],
    ) -> KernelResult<Sub> {
        let Some((&object, rest)) = arguments.split_first() else {
            return Err(KernelError::NotDone("boolean operation without arguments".into()));
        };
        let others: Vec<Sub> = rest.iter().chain(tools).copied().collect();
        match operation {
            BooleanOperation::Fuse => {
                if others.is_empty() {
                    return Ok(object);
                }
                let all: Vec<Sub> = std::iter::once(object).chain(others).collect();
                for (i, a) in all.iter().enumerate() {
                    for b in &all[i + 1..] {
                        if !self.disjoint(*a, *b)? {
                            return Err(KernelError::NotSupported("fuse of overlapping shapes".into()));
                        }
                    }
                }
                Ok(Sub::forward(self.make_compound(all)))
            }
            BooleanOperation::Cut => {
                for tool in &others {
                    if !self.disjoint(object, *tool)? {
                        return Err(KernelError::NotSupported("cut of overlapping shapes".into()));
                    }
                }
                Ok(object)
            }
            BooleanOperation::Common => {
                if others.is_empty() {
                    return Ok(object);
                }
                for other in &others {
                    if self.disjoint(object, *other)? {
                        return Ok(Sub::forward(self.make_compound(Vec::new())));
                    }
                }
                Err(KernelError::NotSupported("common of overlapping shapes".into()))
            }
        }
    }

    // ========== Modifications ==========

    /// Deep copy of a shape mapped through an affine transformation
    pub fn transformed(&mut self, root: Sub, t: &DAffine3) -> KernelResult<Sub> {
        let mut copies = HashMap::new();
        let volume_scale = t.matrix3.determinant().abs();
        let id = self.transform_entity(root.id, t, volume_scale, &mut copies)?;
        Ok(Sub { id, ..root })
    }

    fn transform_entity(
        &mut self,
        id: EntityId,
        t: &DAffine3,
        volume_scale: f64,
        copies: &mut HashMap<EntityId, EntityId>,
    ) -> KernelResult<EntityId> {
        if let Some(&copy) = copies.get(&id) {
            return Ok(copy);
        }
        let entity = match self.entity(id)?.clone() {
            Entity::Vertex { point } => Entity::Vertex {
                point: t.transform_point3(point),
            },
            Entity::Edge { curve, start, end } => {
                let start = self.transform_entity(start, t, volume_scale, copies)?;
                let end = self.transform_entity(end, t, volume_scale, copies)?;
                Entity::Edge {
                    curve: curve.transformed(t),
                    start,
                    end,
                }
            }
            Entity::Wire { edges } => Entity::Wire {
                edges: self.transform_subs(edges, t, volume_scale, copies)?,
            },
            Entity::Face { surface, wires } => Entity::Face {
                surface: surface.transformed(t),
                wires: self.transform_subs(wires, t, volume_scale, copies)?,
            },
            Entity::Shell { faces } => Entity::Shell {
                faces: self.transform_subs(faces, t, volume_scale, copies)?,
            },
            Entity::Solid {
                shells,
                volume,
                centroid,
            } => Entity::Solid {
                shells: self.transform_subs(shells, t, volume_scale, copies)?,
                volume: volume * volume_scale,
                centroid: t.transform_point3(centroid),
            },
            Entity::Compound { children } => Entity::Compound {
                children: self.transform_subs(children, t, volume_scale, copies)?,
            },
        };
        let copy = self.add(entity);
        copies.insert(id, copy);
        Ok(copy)
    }

    fn transform_subs(
        &mut self,
        subs: Vec<Sub>,
        t: &DAffine3,
        volume_scale: f64,
        copies: &mut HashMap<EntityId, EntityId>,
    ) -> KernelResult<Vec<Sub>> {
        let mut mapped = Vec::with_capacity(subs.len());
        for sub in subs {
            mapped.push(Sub {
                id: self.transform_entity(sub.id, t, volume_scale, copies)?,
                ..sub
            });
        }
        Ok(mapped)
    }

    /// Merge chains of colinear line edges inside every wire of a shape
    pub fn unified(&mut self, root: Sub) -> KernelResult<Sub> {
        let mut unify = Unify::default();
        let id = self.unify_entity(root.id, &mut unify)?;
        Ok(Sub { id, ..root })
    }

    fn unify_entity(&mut self, id: EntityId, unify: &mut Unify) -> KernelResult<EntityId> {
        if let Some(&done) = unify.entities.get(&id) {
            return Ok(done);
        }
        let entity = self.entity(id)?.clone();
        let result = match entity {
            Entity::Vertex { .. } | Entity::Edge { .. } => id,
            Entity::Wire { edges } => match self.merge_colinear(&edges, unify)? {
                Some(merged) => self.add(Entity::Wire { edges: merged }),
                None => id,
            },
            Entity::Face { surface, wires } => match self.unify_subs(&wires, unify)? {
                Some(wires) => self.add(Entity::Face { surface, wires }),
                None => id,
            },
            Entity::Shell { faces } => match self.unify_subs(&faces, unify)? {
                Some(faces) => self.add(Entity::Shell { faces }),
                None => id,
            },
            Entity::Solid {
                shells,
                volume,
                centroid,
            } => match self.unify_subs(&shells, unify)? {
                Some(shells) => self.add(Entity::Solid {
                    shells,
                    volume,
                    centroid,
                }),
                None => id,
            },
            Entity::Compound { children } => match self.unify_subs(&children, unify)? {
                Some(children) => self.add(Entity::Compound { children }),
                None => id,
            },
        };
        unify.entities.insert(id, result);
        Ok(result)
    }

    /// Unified children, or `None` when none of them changed
    fn unify_subs(&mut self, subs: &[Sub], unify: &mut Unify) -> KernelResult<Option<Vec<Sub>>> {
        let mut changed = false;
        let mut mapped = Vec::with_capacity(subs.len());
        for sub in subs {
            let id = self.unify_entity(sub.id, unify)?;
            changed |= id != sub.id;
            mapped.push(Sub { id, ..*sub });
        }
        Ok(changed.then_some(mapped))
    }

    fn joinable(&self, a: Sub, b: Sub) -> KernelResult<bool> {
        let ca = self.oriented_curve(a)?;
        let cb = self.oriented_curve(b)?;
        if !ca.is_line() || !cb.is_line() || self.oriented_ends(a)?.1 != self.oriented_ends(b)?.0 {
            return Ok(false);
        }
        let da = ca.d1(ca.first);
        let db = cb.d1(cb.first);
        Ok(da.dot(db) > 0.0 && da.cross(db).length() <= self.config.angular_tolerance)
    }

    fn merge_colinear(&mut self, uses: &[Sub], unify: &mut Unify) -> KernelResult<Option<Vec<Sub>>> {
        let n = uses.len();
        if n < 2 {
            return Ok(None);
        }
        let closed = self.oriented_ends(uses[0])?.0 == self.oriented_ends(uses[n - 1])?.1;
        let mut begin = 0;
        if closed {
            let mut boundary = None;
            for k in 0..n {
                if !self.joinable(uses[(k + n - 1) % n], uses[k])? {
                    boundary = Some(k);
                    break;
                }
            }
            match boundary {
                Some(k) => begin = k,
                None => return Ok(None),
            }
        }
        let order: Vec<Sub> = (0..n).map(|k| uses[(begin + k) % n]).collect();

        let mut merged_any = false;
        let mut result = Vec::with_capacity(n);
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j + 1 < n && self.joinable(order[j], order[j + 1])? {
                j += 1;
            }
            if j == i {
                result.push(order[i]);
            } else {
                merged_any = true;
                result.push(self.merged_edge(&order[i..=j], unify)?);
            }
            i = j + 1;
        }
        Ok(merged_any.then_some(result))
    }

    fn merged_edge(&mut self, chain: &[Sub], unify: &mut Unify) -> KernelResult<Sub> {
        let (start, _) = self.oriented_ends(chain[0])?;
        let (_, end) = self.oriented_ends(chain[chain.len() - 1])?;
        let mut key: Vec<EntityId> = chain.iter().map(|s| s.id).collect();
        key.sort_unstable();
        if let Some(&(id, stored_start)) = unify.edges.get(&key) {
            return Ok(Sub {
                id,
                reversed: stored_start != start,
            });
        }
        let curve = BoundedCurve::segment(self.point(start)?, self.point(end)?, self.tolerance())?;
        let id = self.add(Entity::Edge { curve, start, end });
        unify.edges.insert(key, (id, start));
        Ok(Sub::forward(id))
    }

    /// Round corners of a planar face's outer wire. Corner `k` is the start
    /// vertex of the `k`-th edge along the wire.
    pub fn fillet_2d(
        &mut self,
        face: Sub,
        radius: f64,
        corners: Option<&[usize]>,
    ) -> KernelResult<Sub> {
        let Entity::Face { surface, wires } = self.entity(face.id)?.clone() else {
            return Err(expected("face"));
        };
        if !matches!(surface, Surface::Plane(_)) {
            return Err(KernelError::NotSupported("fillet of a ruled face".into()));
        }
        if radius <= self.tolerance() {
            return Err(KernelError::NotDone("fillet radius must be positive".into()));
        }
        let uses = self.wire_uses(wires[0])?;
        let n = uses.len();
        let selected: Vec<bool> = match corners {
            Some(indexes) => {
                let mut flags = vec![false; n];
                for &k in indexes {
                    *flags.get_mut(k).ok_or_else(|| {
                        KernelError::NotDone(format!("corner {k} out of range"))
                    })? = true;
                }
                flags
            }
            None => vec![true; n],
        };

        let mut trim_start = vec![0.0; n];
        let mut trim_end = vec![0.0; n];
        let mut arcs: Vec<Option<BoundedCurve>> = vec![None; n];
        for k in 0..n {
            if !selected[k] {
                continue;
            }
            let prev = self.oriented_curve(uses[(k + n - 1) % n])?;
            let next = self.oriented_curve(uses[k])?;
            if !prev.is_line() || !next.is_line() || n < 2 {
                if corners.is_some() {
                    return Err(KernelError::NotSupported(
                        "fillet at a corner next to a curved edge".into(),
                    ));
                }
                continue;
            }
            let corner = next.start();
            if let Some((trim, arc)) =
                corner_fillet(corner, prev.start() - corner, next.end() - corner, radius)
            {
                trim_start[k] = trim;
                trim_end[(k + n - 1) % n] = trim;
                arcs[k] = Some(arc);
            }
        }

        let mut pieces = Vec::new();
        for k in 0..n {
            if let Some(arc) = arcs[k] {
                pieces.push(arc);
            }
            let curve = self.oriented_curve(uses[k])?;
            if !curve.is_line() {
                pieces.push(curve);
                continue;
            }
            let remaining = curve.length(1) - trim_start[k] - trim_end[k];
            if remaining < -self.tolerance() {
                return Err(KernelError::NotDone("fillet radius too large for edge".into()));
            }
            if remaining > self.tolerance() {
                pieces.push(BoundedCurve::segment(
                    curve.value(curve.first + trim_start[k]),
                    curve.value(curve.last - trim_end[k]),
                    self.tolerance(),
                )?);
            }
        }

        let vertices: Vec<EntityId> = pieces.iter().map(|c| self.make_vertex(c.start())).collect();
        let mut edges = Vec::with_capacity(pieces.len());
        for (i, curve) in pieces.into_iter().enumerate() {
            let id = self.add(Entity::Edge {
                curve,
                start: vertices[i],
                end: vertices[(i + 1) % vertices.len()],
            });
            edges.push(Sub::forward(id));
        }
        let outer = self.add(Entity::Wire { edges });
        let mut new_wires = vec![Sub::forward(outer)];
        new_wires.extend(wires.into_iter().skip(1));
        let id = self.add(Entity::Face {
            surface,
            wires: new_wires,
        });
        Ok(Sub { id, ..face })
    }

    // ========== Global properties ==========

    /// Accumulated mass and center of a shape, `None` center when massless
    pub fn properties(&self, root: Sub, kind: GPropKind) -> KernelResult<(f64, Option<DVec3>)> {
        let mut mass = 0.0;
        let mut moment = DVec3::ZERO;
        match kind {
            GPropKind::Linear => {
                for edge in self.explore(root, TopAbsShapeEnum::Edge)? {
                    let (curve, _, _) = self.edge(edge.id)?;
                    let length = curve.length(self.intervals());
                    mass += length;
                    moment += curve.centroid(self.intervals()) * length;
                }
            }
            GPropKind::Surface => {
                for face in self.explore(root, TopAbsShapeEnum::Face)? {
                    let (area, centroid) = self.face_properties(face.id)?;
                    mass += area;
                    moment += centroid * area;
                }
            }
            GPropKind::Volume => {
                for solid in self.explore(root, TopAbsShapeEnum::Solid)? {
                    if let Entity::Solid {
                        volume, centroid, ..
                    } = self.entity(solid.id)?
                    {
                        mass += volume;
                        moment += *centroid * *volume;
                    }
                }
            }
        }
        Ok((mass, (mass > 0.0).then(|| moment / mass)))
    }
}

/// Memo tables for one linear sweep
struct Sweep {
    vector: DVec3,
    top_vertices: HashMap<EntityId, EntityId>,
    top_edges: HashMap<EntityId, EntityId>,
    laterals: HashMap<EntityId, EntityId>,
    sides: HashMap<EntityId, EntityId>,
}

impl Sweep {
    fn new(vector: DVec3) -> Self {
        Self {
            vector,
            top_vertices: HashMap::new(),
            top_edges: HashMap::new(),
            laterals: HashMap::new(),
            sides: HashMap::new(),
        }
    }
}

/// Memo tables for one unification pass
#[derive(Default)]
struct Unify {
    entities: HashMap<EntityId, EntityId>,
    /// merged chain (sorted edge ids) to new edge and its start vertex
    edges: HashMap<Vec<EntityId>, (EntityId, EntityId)>,
}
