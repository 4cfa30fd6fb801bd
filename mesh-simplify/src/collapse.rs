//! Transactional edge collapse.
//!
//! [`Engine`] owns the working state of a simplification run: half-edge
//! connectivity, vertex quadrics, cached face normals, per-edge collapse
//! costs and the face index table shared with the caller's mesh.
//!
//! [`Engine::collapse_edge`] runs four validity gates in order. The face-flip
//! gate tentatively applies the index relabel and the new vertex position, so
//! the recomputed normals it inspects are exactly the ones a successful
//! collapse keeps; every later rejection restores that tentative state before
//! returning. A rejected collapse leaves all structures bit-for-bit
//! unchanged.

use nalgebra::{Point3, Vector3};
use thiserror::Error;

use crate::cost::{EdgeCost, evaluate_collapse};
use crate::error::SimplifyResult;
use crate::half_edge::{HalfEdgeMesh, INVALID_INDEX};
use crate::normalize::NormalizedMesh;
use crate::params::SimplifyParams;
use crate::quadric::Quadric;

/// Squared distance below which the solved position counts as coinciding
/// with an opposite vertex.
const COINCIDENT_SQ: f64 = 1e-24;

/// Why a collapse attempt was rejected.
///
/// These are recoverable: the driver skips the edge and carries on. None of
/// them leave any trace in the shared structures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollapseReject {
    /// The endpoints share more vertices than the adjoining faces explain.
    #[error("endpoints share too many neighbours")]
    TooManyNeighbours,

    /// The endpoints share too few vertices, or the merged vertex would not
    /// retain enough neighbours to span a face ring.
    #[error("endpoints share too few neighbours")]
    NotEnoughNeighbours,

    /// The merged position coincides with an opposite vertex of an adjoining
    /// face, which would create a zero-area triangle.
    #[error("merged position coincides with an opposite vertex")]
    SingularFace,

    /// A surviving face's normal would reverse direction.
    #[error("collapse would flip a face normal")]
    FaceFlip,

    /// The merged vertex would keep half-edges but no incident face.
    #[error("collapse would detach the merged vertex from all faces")]
    DetachedVertex,
}

/// A face touched by the tentative relabel, with the state to restore on
/// rejection.
#[derive(Debug, Clone, Copy)]
struct TouchedFace {
    face: u32,
    indices: [u32; 3],
    normal: Vector3<f64>,
}

/// Working state of a simplification run.
pub(crate) struct Engine {
    pub topo: HalfEdgeMesh,
    pub positions: Vec<Point3<f64>>,
    pub faces: Vec<Option<[u32; 3]>>,
    pub face_normals: Vec<Vector3<f64>>,
    pub quadrics: Vec<Quadric>,
    /// Collapse cost per undirected edge, stored at the representative
    /// half-edge index.
    pub costs: Vec<EdgeCost>,
    pub live_vertex: Vec<bool>,
    pub live_triangles: usize,
    /// Representative ids of undirected edges destroyed by the last
    /// successful collapse; the driver drops them from the queue.
    pub removed_edges: Vec<u32>,

    // Reusable per-collapse scratch, cleared between attempts. After the
    // neighbour census, `ring_survivor` holds the surviving vertex's
    // outgoing ring and `ring_removed` the removed vertex's.
    ring_survivor: Vec<u32>,
    ring_removed: Vec<u32>,
    nbr_survivor: Vec<u32>,
    nbr_removed: Vec<u32>,
    touched: Vec<TouchedFace>,
}

impl Engine {
    /// Build the engine from a normalised mesh.
    ///
    /// Seeds half-edge connectivity and per-vertex quadrics, including the
    /// penalised boundary constraint planes.
    pub fn new(normalized: NormalizedMesh, params: &SimplifyParams) -> SimplifyResult<Self> {
        let NormalizedMesh {
            positions,
            faces,
            face_normals,
        } = normalized;

        let topo = HalfEdgeMesh::build(positions.len(), &faces)?;
        let live_triangles = faces.len();

        let mut quadrics = vec![Quadric::default(); positions.len()];
        for (face, normal) in faces.iter().zip(&face_normals) {
            let plane = Quadric::from_plane_through_point(*normal, positions[face[0] as usize]);
            for &corner in face {
                quadrics[corner as usize].add(&plane);
            }
        }

        // Each boundary edge contributes a virtual constraint plane running
        // through the edge, perpendicular to its face. Collapses that drag a
        // boundary vertex off the rim pay the penalty.
        for id in 0..topo.half_edge_count() as u32 {
            let edge = topo.e(id);
            let Some(face) = edge.face else { continue };
            if topo.e(edge.twin).face.is_some() {
                continue;
            }
            let origin = edge.origin;
            let dest = topo.dest(id);
            let along = positions[dest as usize] - positions[origin as usize];
            let mut constraint = face_normals[face as usize].cross(&along);
            let len = constraint.norm();
            if len < 1e-12 {
                continue;
            }
            constraint /= len;
            let plane = Quadric::from_plane_through_point(constraint, positions[origin as usize])
                .scaled(params.boundary_penalty);
            quadrics[origin as usize].add(&plane);
            quadrics[dest as usize].add(&plane);
        }

        let costs = vec![EdgeCost::placeholder(); topo.half_edge_count()];
        let live_vertex = vec![true; positions.len()];

        Ok(Self {
            topo,
            positions,
            faces: faces.into_iter().map(Some).collect(),
            face_normals,
            quadrics,
            costs,
            live_vertex,
            live_triangles,
            removed_edges: Vec::with_capacity(8),
            ring_survivor: Vec::new(),
            ring_removed: Vec::new(),
            nbr_survivor: Vec::new(),
            nbr_removed: Vec::new(),
            touched: Vec::new(),
        })
    }

    /// Evaluate the collapse cost of the undirected edge represented by `id`.
    pub fn pair_cost(&self, id: u32, params: &SimplifyParams) -> EdgeCost {
        let a = self.topo.e(id).origin as usize;
        let b = self.topo.dest(id) as usize;
        evaluate_collapse(
            &self.quadrics[a],
            &self.quadrics[b],
            self.positions[a],
            self.positions[b],
            params,
        )
    }

    /// Attempt to collapse the edge represented by `id`.
    ///
    /// On success the endpoints merge into the lower-indexed vertex at the
    /// precomputed optimal position, the adjoining faces are destroyed and
    /// the hole is stitched; returns the surviving vertex. On rejection every
    /// owned and shared structure is exactly as it was.
    pub fn collapse_edge(
        &mut self,
        id: u32,
        params: &SimplifyParams,
    ) -> Result<u32, CollapseReject> {
        // Work from the face-carrying side; the twin of a synthetic
        // half-edge always carries one.
        let edge = if self.topo.e(id).face.is_some() {
            id
        } else {
            self.topo.e(id).twin
        };
        let twin = self.topo.e(edge).twin;
        let p = self.topo.e(edge).origin;
        let q = self.topo.e(twin).origin;
        let interior = self.topo.e(twin).face.is_some();

        let survivor = p.min(q);
        let removed = p.max(q);

        // Gate 1: the shared neighbourhood must be exactly the apices of the
        // adjoining faces, and the merged vertex must keep enough neighbours
        // to span a face ring.
        let (common, union) = self.neighbour_census(survivor, removed);
        let expected = if interior { 2 } else { 1 };
        if common > expected {
            return Err(CollapseReject::TooManyNeighbours);
        }
        if common < expected {
            return Err(CollapseReject::NotEnoughNeighbours);
        }
        let union_floor = if interior { 3 } else { 2 };
        if union < union_floor {
            return Err(CollapseReject::NotEnoughNeighbours);
        }

        // Gate 2: the merged position must not land on an opposite vertex.
        let new_pos = self.costs[self.topo.canonical(edge) as usize].position;
        let apex_e = self.topo.e(self.topo.e(edge).prev).origin;
        if (new_pos - self.positions[apex_e as usize]).norm_squared() < COINCIDENT_SQ {
            return Err(CollapseReject::SingularFace);
        }
        let apex_t = if interior {
            let apex = self.topo.e(self.topo.e(twin).prev).origin;
            if (new_pos - self.positions[apex as usize]).norm_squared() < COINCIDENT_SQ {
                return Err(CollapseReject::SingularFace);
            }
            Some(apex)
        } else {
            None
        };

        let dying_e = self.topo.e(edge).face;
        let dying_t = self.topo.e(twin).face;

        // Gate 3: tentatively move the survivor and relabel the removed
        // vertex's faces, watching every reshaped normal for reversal.
        self.touched.clear();
        let old_pos = self.positions[survivor as usize];
        self.positions[survivor as usize] = new_pos;

        let mut flipped = false;
        for i in 0..self.ring_removed.len() {
            let face = self.topo.e(self.ring_removed[i]).face;
            let Some(face) = face else { continue };
            if Some(face) == dying_e || Some(face) == dying_t {
                continue;
            }
            if !self.touch_face(face, true, survivor, removed) {
                flipped = true;
                break;
            }
        }
        if !flipped {
            for i in 0..self.ring_survivor.len() {
                let face = self.topo.e(self.ring_survivor[i]).face;
                let Some(face) = face else { continue };
                if Some(face) == dying_e || Some(face) == dying_t {
                    continue;
                }
                if !self.touch_face(face, false, survivor, removed) {
                    flipped = true;
                    break;
                }
            }
        }
        if flipped {
            self.restore_touched(survivor, old_pos);
            return Err(CollapseReject::FaceFlip);
        }

        // Gate 4: removing the adjoining faces must not leave the merged
        // vertex with face-less half-edge pairs only.
        let would_detach = |inner: u32| {
            let outer_a = self.topo.e(self.topo.e(inner).next).twin;
            let outer_b = self.topo.e(self.topo.e(inner).prev).twin;
            self.topo.e(outer_a).face.is_none() && self.topo.e(outer_b).face.is_none()
        };
        if would_detach(edge) || (interior && would_detach(twin)) {
            self.restore_touched(survivor, old_pos);
            return Err(CollapseReject::DetachedVertex);
        }

        // Commit. Record which undirected edges disappear while the old
        // twin wiring is still in place.
        self.removed_edges.clear();
        self.removed_edges.push(self.topo.canonical(edge));
        self.record_face_edges(edge);
        if interior {
            self.record_face_edges(twin);
        }

        // Every half-edge leaving the removed vertex now leaves the survivor.
        for i in 0..self.ring_removed.len() {
            let out = self.ring_removed[i];
            self.topo.e_mut(out).origin = survivor;
        }

        // Destroy the adjoining faces and re-pair their rims.
        let (outer_a_e, outer_b_e) = self.stitch_face(edge);
        if let Some(face) = dying_e {
            self.faces[face as usize] = None;
            self.live_triangles -= 1;
        }
        if interior {
            let (outer_a_t, _) = self.stitch_face(twin);
            if let Some(face) = dying_t {
                self.faces[face as usize] = None;
                self.live_triangles -= 1;
            }
            if let Some(apex) = apex_t {
                self.topo.vertex_edge[apex as usize] = outer_a_t;
            }
        } else {
            // Boundary collapse: close the hole cycle over the missing edge.
            let before = self.topo.e(twin).prev;
            let after = self.topo.e(twin).next;
            self.topo.e_mut(before).next = after;
            self.topo.e_mut(after).prev = before;
            self.topo.retired[twin as usize] = true;
        }

        self.topo.vertex_edge[survivor as usize] = outer_b_e;
        self.topo.vertex_edge[apex_e as usize] = outer_a_e;
        self.topo.vertex_edge[removed as usize] = INVALID_INDEX;
        self.live_vertex[removed as usize] = false;

        let removed_quadric = self.quadrics[removed as usize];
        self.quadrics[survivor as usize].add(&removed_quadric);

        Ok(survivor)
    }

    /// Count common and total distinct neighbours of the two endpoints,
    /// excluding the endpoints themselves. Also leaves both outgoing rings in
    /// the scratch buffers for the gates and the commit path.
    fn neighbour_census(&mut self, survivor: u32, removed: u32) -> (usize, usize) {
        let Self {
            topo,
            ring_survivor,
            ring_removed,
            nbr_survivor,
            nbr_removed,
            ..
        } = self;

        topo.collect_outgoing(survivor, ring_survivor);
        topo.collect_outgoing(removed, ring_removed);

        nbr_survivor.clear();
        nbr_removed.clear();
        for &out in ring_survivor.iter() {
            let dest = topo.dest(out);
            if dest != removed {
                nbr_survivor.push(dest);
            }
        }
        for &out in ring_removed.iter() {
            let dest = topo.dest(out);
            if dest != survivor {
                nbr_removed.push(dest);
            }
        }

        let common = nbr_survivor
            .iter()
            .filter(|v| nbr_removed.contains(v))
            .count();
        let union = nbr_survivor.len() + nbr_removed.len() - common;
        (common, union)
    }

    /// Tentatively update one face for the collapse: relabel the removed
    /// vertex if asked, recompute the cached normal at the new survivor
    /// position, and remember the previous state. Returns `false` when the
    /// recomputed normal reverses or degenerates.
    fn touch_face(&mut self, face: u32, relabel: bool, survivor: u32, removed: u32) -> bool {
        let Some(mut indices) = self.faces[face as usize] else {
            return true;
        };
        let old_normal = self.face_normals[face as usize];
        self.touched.push(TouchedFace {
            face,
            indices,
            normal: old_normal,
        });

        if relabel {
            for index in &mut indices {
                if *index == removed {
                    *index = survivor;
                }
            }
            self.faces[face as usize] = Some(indices);
        }

        let v0 = self.positions[indices[0] as usize];
        let v1 = self.positions[indices[1] as usize];
        let v2 = self.positions[indices[2] as usize];
        let cross = (v1 - v0).cross(&(v2 - v0));
        let len = cross.norm();
        if len < 1e-12 {
            return false;
        }
        let new_normal = cross / len;
        if new_normal.dot(&old_normal) < 0.0 {
            return false;
        }
        self.face_normals[face as usize] = new_normal;
        true
    }

    /// Undo every tentative mutation of the face-flip gate.
    fn restore_touched(&mut self, survivor: u32, old_pos: Point3<f64>) {
        self.positions[survivor as usize] = old_pos;
        while let Some(touched) = self.touched.pop() {
            self.faces[touched.face as usize] = Some(touched.indices);
            self.face_normals[touched.face as usize] = touched.normal;
        }
    }

    /// Record the representative ids of the two rim edges of a dying face.
    fn record_face_edges(&mut self, inner: u32) {
        let next = self.topo.e(inner).next;
        let prev = self.topo.e(inner).prev;
        let a = self.topo.canonical(next);
        let b = self.topo.canonical(prev);
        self.removed_edges.push(a);
        self.removed_edges.push(b);
    }

    /// Retire a dying face's three half-edges and twin its two rim
    /// neighbours with each other. Returns the re-paired outer half-edges
    /// `(towards the apex, away from the apex)`.
    fn stitch_face(&mut self, inner: u32) -> (u32, u32) {
        let i1 = self.topo.e(inner).next;
        let i2 = self.topo.e(inner).prev;
        let outer_a = self.topo.e(i1).twin;
        let outer_b = self.topo.e(i2).twin;

        self.topo.e_mut(outer_a).twin = outer_b;
        self.topo.e_mut(outer_b).twin = outer_a;

        if let Some(face) = self.topo.e(inner).face {
            self.topo.face_edge[face as usize] = INVALID_INDEX;
        }
        for retired in [inner, i1, i2] {
            self.topo.retired[retired as usize] = true;
        }
        (outer_a, outer_b)
    }
}
