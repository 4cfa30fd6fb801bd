//! Progressive mesh simplification using quadric error metrics.
//!
//! Given a manifold (or near-manifold) triangle mesh and an error budget,
//! the engine repeatedly collapses edges, always picking the globally
//! cheapest valid collapse, until no edge can be collapsed below the budget.
//! The result is a geometrically faithful mesh with fewer vertices and
//! triangles.
//!
//! # Pipeline
//!
//! 1. **Normalise**: weld coincident vertices, compute face normals
//! 2. **Connect**: build half-edge connectivity with synthetic boundary
//!    half-edges so every hole rim forms a closed cycle
//! 3. **Measure**: accumulate per-vertex quadrics from incident face planes,
//!    plus penalised constraint planes along the boundary
//! 4. **Collapse**: pop the cheapest edge from an ordered error list, run the
//!    validity gates (neighbourhood, singular face, face flip, detached
//!    vertex) and merge; re-key affected edges and repeat
//!
//! # Example
//!
//! ```
//! use mesh_simplify::{simplify_mesh, SimplifyParams};
//! use mesh_types::{unit_cube, MeshTopology};
//!
//! let mut mesh = unit_cube();
//! let summary = simplify_mesh(
//!     &mut mesh,
//!     &SimplifyParams::with_error_budget(1e-3),
//!     None,
//! )
//! .unwrap();
//!
//! println!("{summary}");
//! assert!(mesh.face_count() <= 12);
//! ```
//!
//! # Layer 0 Crate
//!
//! Zero engine dependencies: usable from CLI tools, WASM, servers and other
//! game engines. The collapse loop is single-threaded and allocation-free
//! after construction; long runs can be interrupted through a
//! [`CancelToken`].

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cancel;
mod collapse;
mod cost;
mod error;
pub mod half_edge;
mod normalize;
mod params;
pub mod quadric;
mod queue;
mod result;
mod simplify;

// Re-export main types and functions
pub use cancel::CancelToken;
pub use error::{SimplifyError, SimplifyResult};
pub use half_edge::{HalfEdge, HalfEdgeMesh};
pub use params::SimplifyParams;
pub use quadric::Quadric;
pub use result::SimplifySummary;
pub use simplify::simplify_mesh;
