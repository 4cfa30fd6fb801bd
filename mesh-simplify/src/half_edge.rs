//! Half-edge connectivity.
//!
//! Every undirected mesh edge is represented by two oppositely oriented
//! half-edges. Interior edges pair two face-carrying half-edges; boundary
//! edges pair one face-carrying half-edge with a synthetic face-less twin.
//! The synthetic twins are wired into closed cycles around each hole, so
//! `twin`, `next` and `prev` are total: no traversal ever has to special-case
//! the rim.
//!
//! The structure is an arena of records indexed by `u32`; twin/next/prev are
//! indices, not pointers, which keeps the inherently cyclic graph free of
//! ownership cycles.

use hashbrown::HashMap;

use crate::error::{SimplifyError, SimplifyResult};

/// Sentinel for "no half-edge".
pub(crate) const INVALID_INDEX: u32 = u32::MAX;

/// A directed edge record.
///
/// Invariants (for live records):
/// - `twin(twin(e)) == e`
/// - `prev(next(e)) == e` and `next(prev(e)) == e`
/// - when `face` is present, `e → next(e) → prev(e)` is a 3-cycle on that
///   face and the three origins are the face corners in winding order
/// - when `face` is absent the record is a synthetic boundary half-edge and
///   `next`/`prev` walk the hole cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    /// Vertex this half-edge leaves from.
    pub origin: u32,
    /// Oppositely oriented half-edge of the same undirected edge.
    pub twin: u32,
    /// Next half-edge around the face (or around the hole).
    pub next: u32,
    /// Previous half-edge around the face (or around the hole).
    pub prev: u32,
    /// Adjoining face, absent for synthetic boundary half-edges.
    pub face: Option<u32>,
}

/// Half-edge connectivity for an indexed triangle mesh.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    pub(crate) edges: Vec<HalfEdge>,
    /// Retired (logically destroyed) half-edges; slots are never reused.
    pub(crate) retired: Vec<bool>,
    /// One live outgoing half-edge per vertex, [`INVALID_INDEX`] when the
    /// vertex has none.
    pub(crate) vertex_edge: Vec<u32>,
    /// One live interior half-edge per face, [`INVALID_INDEX`] when the face
    /// has been destroyed.
    pub(crate) face_edge: Vec<u32>,
}

impl HalfEdgeMesh {
    /// Build connectivity from a triangle index buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::NonManifoldEdge`] when any undirected edge is
    /// claimed by more than two faces, or when a hole rim cannot be closed
    /// into cycles.
    pub fn build(vertex_count: usize, faces: &[[u32; 3]]) -> SimplifyResult<Self> {
        let mut edges: Vec<HalfEdge> = Vec::with_capacity(faces.len() * 3);
        let mut vertex_edge = vec![INVALID_INDEX; vertex_count];
        let mut face_edge = Vec::with_capacity(faces.len());

        for (face_index, face) in faces.iter().enumerate() {
            let base = edges.len() as u32;
            for corner in 0u32..3 {
                edges.push(HalfEdge {
                    origin: face[corner as usize],
                    twin: INVALID_INDEX,
                    next: base + (corner + 1) % 3,
                    prev: base + (corner + 2) % 3,
                    face: Some(face_index as u32),
                });
                let slot = &mut vertex_edge[face[corner as usize] as usize];
                if *slot == INVALID_INDEX {
                    *slot = base + corner;
                }
            }
            face_edge.push(base);
        }

        // Pair twins through the undirected edge table. The first claimant
        // registers the edge, the second pairs up, a third is non-manifold.
        let mut claimed: HashMap<(u32, u32), u32> = HashMap::with_capacity(edges.len());
        for id in 0..edges.len() as u32 {
            let u = edges[id as usize].origin;
            let v = edges[edges[id as usize].next as usize].origin;
            let key = (u.min(v), u.max(v));
            if let Some(&first) = claimed.get(&key) {
                if edges[first as usize].twin != INVALID_INDEX {
                    return Err(SimplifyError::NonManifoldEdge);
                }
                edges[first as usize].twin = id;
                edges[id as usize].twin = first;
            } else {
                claimed.insert(key, id);
            }
        }

        // Every still-twinless half-edge lies on the boundary; give each a
        // synthetic face-less twin running the opposite way.
        let real_count = edges.len() as u32;
        for real in 0..real_count {
            if edges[real as usize].twin != INVALID_INDEX {
                continue;
            }
            let synthetic = edges.len() as u32;
            let dest = edges[edges[real as usize].next as usize].origin;
            edges.push(HalfEdge {
                origin: dest,
                twin: real,
                next: INVALID_INDEX,
                prev: INVALID_INDEX,
                face: None,
            });
            edges[real as usize].twin = synthetic;
        }

        // Wire the synthetic half-edges into hole cycles. The successor of a
        // synthetic edge ends where this one starts: rotate around that
        // vertex (twin of prev) until the rim is hit again.
        let total = edges.len() as u32;
        for synthetic in real_count..total {
            let real = edges[synthetic as usize].twin;
            let mut cursor = real;
            let mut successor = INVALID_INDEX;
            for _ in 0..total {
                let incoming = edges[cursor as usize].prev;
                let candidate = edges[incoming as usize].twin;
                if edges[candidate as usize].face.is_none() {
                    successor = candidate;
                    break;
                }
                cursor = candidate;
            }
            if successor == INVALID_INDEX {
                return Err(SimplifyError::NonManifoldEdge);
            }
            edges[synthetic as usize].next = successor;
            edges[successor as usize].prev = synthetic;
        }

        // A rim that failed to close leaves some synthetic edge without a
        // predecessor.
        if edges[real_count as usize..]
            .iter()
            .any(|e| e.next == INVALID_INDEX || e.prev == INVALID_INDEX)
        {
            return Err(SimplifyError::NonManifoldEdge);
        }

        let retired = vec![false; edges.len()];
        Ok(Self {
            edges,
            retired,
            vertex_edge,
            face_edge,
        })
    }

    /// Total number of half-edge slots, including retired ones.
    #[must_use]
    pub fn half_edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of live half-edges.
    #[must_use]
    pub fn live_half_edge_count(&self) -> usize {
        self.retired.iter().filter(|&&r| !r).count()
    }

    /// Read a half-edge record.
    #[must_use]
    pub fn half_edge(&self, id: u32) -> Option<&HalfEdge> {
        if self.is_live(id) {
            Some(&self.edges[id as usize])
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn is_live(&self, id: u32) -> bool {
        (id as usize) < self.edges.len() && !self.retired[id as usize]
    }

    #[inline]
    pub(crate) fn e(&self, id: u32) -> &HalfEdge {
        &self.edges[id as usize]
    }

    #[inline]
    pub(crate) fn e_mut(&mut self, id: u32) -> &mut HalfEdge {
        &mut self.edges[id as usize]
    }

    /// Vertex this half-edge points to.
    #[inline]
    #[must_use]
    pub fn dest(&self, id: u32) -> u32 {
        self.e(self.e(id).twin).origin
    }

    /// The representative half-edge of an undirected edge pair.
    ///
    /// Synthetic half-edges are never representatives; for interior pairs the
    /// smaller index wins. Per-edge bookkeeping (costs, queue membership) is
    /// keyed by representatives.
    #[inline]
    pub(crate) fn canonical(&self, id: u32) -> u32 {
        let twin = self.e(id).twin;
        if self.e(id).face.is_none() {
            twin
        } else if self.e(twin).face.is_none() {
            id
        } else {
            id.min(twin)
        }
    }

    /// Collect all live outgoing half-edges of a vertex into `out`.
    ///
    /// Rotation crosses synthetic boundary half-edges like any other, so the
    /// full ring is visited for interior and boundary vertices alike.
    pub(crate) fn collect_outgoing(&self, vertex: u32, out: &mut Vec<u32>) {
        out.clear();
        let start = self.vertex_edge[vertex as usize];
        if start == INVALID_INDEX {
            return;
        }
        let mut cursor = start;
        for _ in 0..self.edges.len() {
            debug_assert_eq!(self.e(cursor).origin, vertex);
            out.push(cursor);
            cursor = self.e(self.e(cursor).twin).next;
            if cursor == start {
                return;
            }
        }
        debug_assert!(false, "outgoing ring of vertex {vertex} did not close");
    }

    /// The three corner indices of a live face, in winding order.
    #[must_use]
    pub fn face_indices(&self, face: u32) -> Option<[u32; 3]> {
        let e0 = *self.face_edge.get(face as usize)?;
        if e0 == INVALID_INDEX {
            return None;
        }
        let e1 = self.e(e0).next;
        let e2 = self.e(e0).prev;
        Some([self.e(e0).origin, self.e(e1).origin, self.e(e2).origin])
    }

    /// Reconstruct the triangle index buffer from connectivity.
    ///
    /// Live faces are emitted in face id order; for freshly built meshes this
    /// reproduces the input buffer exactly.
    #[must_use]
    pub fn reconstruct_faces(&self) -> Vec<[u32; 3]> {
        (0..self.face_edge.len() as u32)
            .filter_map(|f| self.face_indices(f))
            .collect()
    }

    /// Number of closed boundary cycles (holes).
    #[must_use]
    pub fn boundary_loop_count(&self) -> usize {
        let mut visited = vec![false; self.edges.len()];
        let mut loops = 0;
        for id in 0..self.edges.len() as u32 {
            if !self.is_live(id) || self.e(id).face.is_some() || visited[id as usize] {
                continue;
            }
            loops += 1;
            let mut cursor = id;
            for _ in 0..self.edges.len() {
                visited[cursor as usize] = true;
                cursor = self.e(cursor).next;
                if cursor == id {
                    break;
                }
            }
        }
        loops
    }

    /// Check the structural invariants over all live records.
    ///
    /// Intended for tests and debug assertions after mutations; the collapse
    /// path maintains these invariants itself.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        for id in 0..self.edges.len() as u32 {
            if !self.is_live(id) {
                continue;
            }
            let edge = self.e(id);
            let (twin, next, prev) = (edge.twin, edge.next, edge.prev);
            if !self.is_live(twin) || !self.is_live(next) || !self.is_live(prev) {
                return false;
            }
            if self.e(twin).twin != id || self.e(next).prev != id || self.e(prev).next != id {
                return false;
            }
            if let Some(face) = edge.face {
                if self.e(self.e(next).next).next != id {
                    return false;
                }
                if self.e(next).face != Some(face) || self.e(prev).face != Some(face) {
                    return false;
                }
                let corners = [edge.origin, self.e(next).origin, self.e(prev).origin];
                if corners[0] == corners[1] || corners[1] == corners[2] || corners[0] == corners[2]
                {
                    return false;
                }
                let entry = self.face_edge[face as usize];
                if entry == INVALID_INDEX || self.e(entry).face != Some(face) {
                    return false;
                }
            }
        }

        for (face, &entry) in self.face_edge.iter().enumerate() {
            if entry != INVALID_INDEX
                && (!self.is_live(entry) || self.e(entry).face != Some(face as u32))
            {
                return false;
            }
        }

        for (vertex, &entry) in self.vertex_edge.iter().enumerate() {
            if entry != INVALID_INDEX
                && (!self.is_live(entry) || self.e(entry).origin != vertex as u32)
            {
                return false;
            }
        }

        true
    }
}
