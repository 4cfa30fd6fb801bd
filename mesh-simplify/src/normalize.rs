//! Mesh normalisation.
//!
//! Welds bit-identical vertex positions into a single index, rewrites the
//! index buffer accordingly and computes cached unit face normals. Runs once,
//! before half-edge construction.

use hashbrown::HashMap;
use mesh_types::IndexedMesh;
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::error::{SimplifyError, SimplifyResult};

/// A welded mesh with cached face normals, ready for half-edge construction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalizedMesh {
    pub positions: Vec<Point3<f64>>,
    pub faces: Vec<[u32; 3]>,
    pub face_normals: Vec<Vector3<f64>>,
}

/// Weld coincident vertices and compute face normals.
///
/// Only bit-identical positions are merged; positions that differ by any
/// rounding are distinct vertices. Fails with
/// [`SimplifyError::DegenerateFace`] when a triangle has collinear corners
/// (which includes triangles whose corners weld into fewer than three
/// distinct vertices).
pub(crate) fn normalize(mesh: &IndexedMesh) -> SimplifyResult<NormalizedMesh> {
    let mut seen: HashMap<[u64; 3], u32> = HashMap::with_capacity(mesh.vertices.len());
    let mut remap: Vec<u32> = Vec::with_capacity(mesh.vertices.len());
    let mut positions: Vec<Point3<f64>> = Vec::with_capacity(mesh.vertices.len());

    for vertex in &mesh.vertices {
        let p = vertex.position;
        let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
        let index = *seen.entry(key).or_insert_with(|| {
            positions.push(p);
            positions.len() as u32 - 1
        });
        remap.push(index);
    }

    let faces: Vec<[u32; 3]> = mesh
        .faces
        .iter()
        .map(|f| {
            [
                remap[f[0] as usize],
                remap[f[1] as usize],
                remap[f[2] as usize],
            ]
        })
        .collect();

    let mut face_normals = Vec::with_capacity(faces.len());
    for face in &faces {
        face_normals.push(face_normal(&positions, *face)?);
    }

    debug!(
        input_vertices = mesh.vertices.len(),
        welded_vertices = positions.len(),
        faces = faces.len(),
        "Normalised mesh"
    );

    Ok(NormalizedMesh {
        positions,
        faces,
        face_normals,
    })
}

/// Unit normal of a face, or `DegenerateFace` when the cross product of its
/// edge vectors has zero magnitude.
pub(crate) fn face_normal(
    positions: &[Point3<f64>],
    face: [u32; 3],
) -> SimplifyResult<Vector3<f64>> {
    let v0 = positions[face[0] as usize];
    let v1 = positions[face[1] as usize];
    let v2 = positions[face[2] as usize];

    let cross = (v1 - v0).cross(&(v2 - v0));
    let len = cross.norm();
    if len < 1e-12 {
        return Err(SimplifyError::DegenerateFace);
    }
    Ok(cross / len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::Vertex;

    #[test]
    fn welds_bit_identical_positions() {
        let mesh = IndexedMesh::from_parts(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0), // duplicate of 1
                Vertex::from_coords(1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 2]],
        );

        let normalized = normalize(&mesh).unwrap();
        assert_eq!(normalized.positions.len(), 4);
        assert_eq!(normalized.faces[1], [1, 3, 2]);
    }

    #[test]
    fn nearby_positions_stay_distinct() {
        let mesh = IndexedMesh::from_parts(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 1e-9),
                Vertex::from_coords(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        );

        let normalized = normalize(&mesh).unwrap();
        assert_eq!(normalized.positions.len(), 4);
    }

    #[test]
    fn face_normals_follow_winding() {
        let mesh = IndexedMesh::from_parts(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );

        let normalized = normalize(&mesh).unwrap();
        assert!((normalized.face_normals[0] - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn collinear_face_is_degenerate() {
        let mesh = IndexedMesh::from_parts(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(2.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );

        assert_eq!(normalize(&mesh), Err(SimplifyError::DegenerateFace));
    }

    #[test]
    fn welded_sliver_is_degenerate() {
        // Two corners weld to the same vertex, leaving a zero-area face
        let mesh = IndexedMesh::from_parts(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );

        assert_eq!(normalize(&mesh), Err(SimplifyError::DegenerateFace));
    }
}
