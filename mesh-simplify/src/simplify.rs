//! The collapse driver.
//!
//! Repeatedly collapses the globally cheapest valid edge until nothing can
//! be collapsed below the error budget, then compacts the result back into
//! the caller's mesh.

use mesh_types::{IndexedMesh, Vertex};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::collapse::Engine;
use crate::error::{SimplifyError, SimplifyResult};
use crate::half_edge::INVALID_INDEX;
use crate::normalize::normalize;
use crate::params::SimplifyParams;
use crate::queue::OrderedErrors;
use crate::result::SimplifySummary;

/// Simplify a mesh in place using quadric error metrics.
///
/// Welds coincident vertices, builds half-edge connectivity, then collapses
/// the cheapest valid edge until every remaining collapse would exceed
/// `params.error_budget`. On return the mesh holds the simplified geometry
/// with unreferenced vertices compacted away. Callers that need normals or
/// other attributes recompute them afterwards.
///
/// # Errors
///
/// - [`SimplifyError::NonManifoldEdge`] / [`SimplifyError::DegenerateFace`]:
///   the input is rejected at build time and left untouched.
/// - [`SimplifyError::Cancelled`]: the token fired between collapse steps;
///   the mesh still receives the valid, partially simplified result.
///
/// # Example
///
/// ```
/// use mesh_simplify::{simplify_mesh, SimplifyParams};
/// use mesh_types::{unit_cube, MeshTopology};
///
/// let mut mesh = unit_cube();
/// let summary = simplify_mesh(
///     &mut mesh,
///     &SimplifyParams::with_error_budget(1e-6),
///     None,
/// )
/// .unwrap();
///
/// // A cube has no redundant geometry at this budget
/// assert_eq!(summary.collapses_performed, 0);
/// assert_eq!(mesh.face_count(), 12);
/// ```
pub fn simplify_mesh(
    mesh: &mut IndexedMesh,
    params: &SimplifyParams,
    cancel: Option<&CancelToken>,
) -> SimplifyResult<SimplifySummary> {
    if mesh.vertices.is_empty() || mesh.faces.is_empty() {
        return Ok(SimplifySummary {
            original_vertices: mesh.vertices.len(),
            final_vertices: mesh.vertices.len(),
            ..Default::default()
        });
    }

    let normalized = normalize(mesh)?;
    let original_vertices = normalized.positions.len();
    let original_triangles = normalized.faces.len();

    let mut engine = Engine::new(normalized, params)?;

    // Seed per-edge costs and the ordered queue, one entry per undirected
    // edge keyed by its representative half-edge.
    let mut queue = OrderedErrors::new(engine.topo.half_edge_count());
    for id in 0..engine.topo.half_edge_count() as u32 {
        if engine.topo.is_live(id) && engine.topo.canonical(id) == id {
            let cost = engine.pair_cost(id, params);
            engine.costs[id as usize] = cost;
            queue.insert(id, cost.error);
        }
    }

    info!(
        vertices = original_vertices,
        triangles = original_triangles,
        edges = queue.len(),
        budget = params.error_budget,
        "Starting simplification"
    );

    let mut performed = 0usize;
    let mut rejected = 0usize;
    // Retry cursor over the ordered queue. Rejections advance it without
    // touching any state; a success resets it to the cheapest edge. Two
    // passes in a row without progress end the run.
    let mut cursor: Option<u32> = None;
    let mut stale_passes = 0u32;
    let mut requeue_ring: Vec<u32> = Vec::new();

    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            export(&engine, mesh);
            return Err(SimplifyError::Cancelled);
        }
        if params.max_collapses.is_some_and(|max| performed >= max) {
            break;
        }

        let candidate = match cursor {
            None => queue.first(),
            Some(at) => queue.next_after(at),
        };
        let Some(edge) = candidate else {
            if queue.first().is_none() {
                break;
            }
            stale_passes += 1;
            if stale_passes >= 2 {
                break;
            }
            cursor = None;
            continue;
        };

        if queue.key_of(edge) > params.error_budget {
            // Everything from here on is over budget
            if cursor.is_none() {
                break;
            }
            stale_passes += 1;
            if stale_passes >= 2 {
                break;
            }
            cursor = None;
            continue;
        }

        match engine.collapse_edge(edge, params) {
            Ok(survivor) => {
                performed += 1;
                stale_passes = 0;
                cursor = None;

                // Destroyed edges leave the queue; everything incident to
                // the survivor is re-evaluated under its merged quadric.
                for i in 0..engine.removed_edges.len() {
                    let dead = engine.removed_edges[i];
                    if queue.contains(dead) {
                        queue.remove(dead);
                    }
                }

                engine.topo.collect_outgoing(survivor, &mut requeue_ring);
                for i in 0..requeue_ring.len() {
                    let representative = engine.topo.canonical(requeue_ring[i]);
                    let cost = engine.pair_cost(representative, params);
                    engine.costs[representative as usize] = cost;
                    queue.upsert(representative, cost.error);
                }
            }
            Err(reject) => {
                debug!(edge, ?reject, "Collapse rejected");
                rejected += 1;
                cursor = Some(edge);
            }
        }
    }

    export(&engine, mesh);

    let summary = SimplifySummary {
        original_vertices,
        original_triangles,
        final_vertices: mesh.vertices.len(),
        final_triangles: mesh.faces.len(),
        collapses_performed: performed,
        collapses_rejected: rejected,
    };
    info!(%summary, "Simplification complete");
    Ok(summary)
}

/// Compact the live vertices and faces back into the shared mesh container.
fn export(engine: &Engine, mesh: &mut IndexedMesh) {
    let mut remap = vec![INVALID_INDEX; engine.positions.len()];
    let mut vertices = Vec::with_capacity(engine.positions.len());

    for (index, &live) in engine.live_vertex.iter().enumerate() {
        if live && engine.topo.vertex_edge[index] != INVALID_INDEX {
            remap[index] = vertices.len() as u32;
            vertices.push(Vertex::new(engine.positions[index]));
        }
    }

    let faces: Vec<[u32; 3]> = engine
        .faces
        .iter()
        .flatten()
        .map(|face| {
            [
                remap[face[0] as usize],
                remap[face[1] as usize],
                remap[face[2] as usize],
            ]
        })
        .collect();

    debug!(
        vertices = vertices.len(),
        faces = faces.len(),
        "Exported simplified mesh"
    );

    mesh.vertices = vertices;
    mesh.faces = faces;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::MeshTopology;

    fn plane_grid(size: usize) -> IndexedMesh {
        let mut mesh = IndexedMesh::new();
        for y in 0..size {
            for x in 0..size {
                mesh.vertices.push(Vertex::from_coords(x as f64, y as f64, 0.0));
            }
        }
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let tl = (y * size + x) as u32;
                let tr = tl + 1;
                let bl = tl + size as u32;
                let br = bl + 1;
                mesh.faces.push([tl, bl, tr]);
                mesh.faces.push([tr, bl, br]);
            }
        }
        mesh
    }

    #[test]
    fn empty_mesh_is_a_no_op() {
        let mut mesh = IndexedMesh::new();
        let summary = simplify_mesh(&mut mesh, &SimplifyParams::default(), None).unwrap();
        assert_eq!(summary.collapses_performed, 0);
        assert!(mesh.is_empty());
    }

    #[test]
    fn coplanar_grid_collapses_to_corners() {
        let mut mesh = plane_grid(3);
        let params = SimplifyParams::with_error_budget(1.0).with_boundary_penalty(1000.0);
        let summary = simplify_mesh(&mut mesh, &params, None).unwrap();

        // Interior and edge-midpoint vertices are free to merge into the
        // corners; corner merges cost the boundary penalty and stay put
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(summary.collapses_performed, 5);
        assert_eq!(summary.final_triangles, 2);
    }

    #[test]
    fn cancellation_returns_partial_mesh() {
        let mut mesh = plane_grid(3);
        let token = CancelToken::new();
        token.cancel();

        let result = simplify_mesh(
            &mut mesh,
            &SimplifyParams::with_error_budget(1.0),
            Some(&token),
        );
        assert_eq!(result.unwrap_err(), SimplifyError::Cancelled);

        // Cancelled before the first step: the mesh is written back unchanged
        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.face_count(), 8);
    }

    #[test]
    fn step_budget_limits_collapses() {
        let mut mesh = plane_grid(5);
        let params = SimplifyParams::with_error_budget(1.0).with_max_collapses(3);
        let summary = simplify_mesh(&mut mesh, &params, None).unwrap();
        assert_eq!(summary.collapses_performed, 3);
        assert_eq!(mesh.face_count(), summary.final_triangles);
    }

    #[test]
    fn non_manifold_input_is_rejected_untouched() {
        let mut mesh = IndexedMesh::from_parts(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.5, 1.0, 0.0),
                Vertex::from_coords(0.5, -1.0, 0.0),
                Vertex::from_coords(0.5, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        );
        let before = mesh.clone();

        let result = simplify_mesh(&mut mesh, &SimplifyParams::default(), None);
        assert_eq!(result.unwrap_err(), SimplifyError::NonManifoldEdge);
        assert_eq!(mesh.faces, before.faces);
        assert_eq!(mesh.vertex_count(), before.vertex_count());
    }

    #[test]
    fn degenerate_input_is_rejected() {
        let mut mesh = IndexedMesh::from_parts(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(2.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let result = simplify_mesh(&mut mesh, &SimplifyParams::default(), None);
        assert_eq!(result.unwrap_err(), SimplifyError::DegenerateFace);
    }
}
