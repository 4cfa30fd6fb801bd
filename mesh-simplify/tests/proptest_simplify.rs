//! Property-based tests for the simplification engine.
//!
//! Generates bumpy grid meshes and random budgets and verifies the
//! invariants every run must uphold: no panics, monotone counts, valid
//! connectivity of the output, and idempotence.
//!
//! Run with: cargo test -p mesh-simplify --test proptest_simplify

use mesh_simplify::{HalfEdgeMesh, SimplifyParams, simplify_mesh};
use mesh_types::{IndexedMesh, MeshTopology, Vertex};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// A grid mesh with per-vertex height offsets, between flat and noisy.
fn arb_bumpy_grid() -> impl Strategy<Value = IndexedMesh> {
    (3usize..=6).prop_flat_map(|size| {
        prop::collection::vec(-0.5..0.5f64, size * size).prop_map(move |heights| {
            let mut mesh = IndexedMesh::new();
            for y in 0..size {
                for x in 0..size {
                    let z = heights[y * size + x];
                    mesh.vertices.push(Vertex::from_coords(x as f64, y as f64, z));
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
        })
    })
}

fn arb_params() -> impl Strategy<Value = SimplifyParams> {
    (0.0..2.0f64, prop::sample::select(vec![1.0, 10.0, 100.0, 1000.0])).prop_map(
        |(budget, penalty)| {
            SimplifyParams::with_error_budget(budget).with_boundary_penalty(penalty)
        },
    )
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Simplification must never panic on any grid/budget combination.
    #[test]
    fn never_panics(mesh in arb_bumpy_grid(), params in arb_params()) {
        let mut mesh = mesh;
        let _ = simplify_mesh(&mut mesh, &params, None);
    }

    /// Vertex and triangle counts never increase.
    #[test]
    fn counts_never_increase(mesh in arb_bumpy_grid(), params in arb_params()) {
        let mut mesh = mesh;
        let vertices_before = mesh.vertex_count();
        let faces_before = mesh.face_count();

        simplify_mesh(&mut mesh, &params, None).unwrap();

        prop_assert!(mesh.vertex_count() <= vertices_before);
        prop_assert!(mesh.face_count() <= faces_before);
    }

    /// The output is itself a valid manifold-with-boundary mesh: half-edge
    /// connectivity rebuilds cleanly and stays consistent, and every face
    /// references live, distinct vertices.
    #[test]
    fn output_remains_well_formed(mesh in arb_bumpy_grid(), params in arb_params()) {
        let mut mesh = mesh;
        simplify_mesh(&mut mesh, &params, None).unwrap();

        for face in &mesh.faces {
            prop_assert!(face[0] != face[1] && face[1] != face[2] && face[0] != face[2]);
            for &corner in face {
                prop_assert!((corner as usize) < mesh.vertex_count());
            }
        }

        if !mesh.is_empty() {
            let topo = HalfEdgeMesh::build(mesh.vertex_count(), &mesh.faces).unwrap();
            prop_assert!(topo.is_consistent());
        }
    }

    /// Repeated runs reach a fixpoint: once a run performs no collapse, a
    /// further run performs none either and leaves the mesh untouched.
    #[test]
    fn repeated_runs_reach_a_fixpoint(mesh in arb_bumpy_grid(), params in arb_params()) {
        let mut mesh = mesh;
        let vertex_budget = mesh.vertex_count();
        for _ in 0..=vertex_budget {
            let summary = simplify_mesh(&mut mesh, &params, None).unwrap();
            if summary.collapses_performed == 0 {
                break;
            }
        }

        let frozen_faces = mesh.faces.clone();
        let frozen_count = mesh.vertex_count();

        let summary = simplify_mesh(&mut mesh, &params, None).unwrap();
        prop_assert_eq!(summary.collapses_performed, 0);
        prop_assert_eq!(mesh.vertex_count(), frozen_count);
        prop_assert_eq!(&mesh.faces, &frozen_faces);
    }
}
