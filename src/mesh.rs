use nalgebra::Vector3;
use ndarray::{Array2, ArrayView2, Axis};

use crate::{error::Error, io::Geometry, pointcloud::PointCloud};

/// Per vertex normals: the normalized, area weighted sum of the normals of the faces
/// touching each vertex. Vertices without faces get a zero normal.
///
/// Face indices must be lower than the number of points.
pub fn compute_normals(points: &ArrayView2<f32>, faces: &ArrayView2<usize>) -> Array2<f32> {
    let point = |i: usize| Vector3::new(points[[i, 0]], points[[i, 1]], points[[i, 2]]);
    let face_normals = faces
        .axis_iter(Axis(0))
        .map(|face| {
            let p0 = point(face[0]);
            let v0 = point(face[1]) - p0;
            let v1 = point(face[2]) - p0;
            v0.cross(&v1)
        })
        .collect::<Vec<_>>();

    let mut vertex_normals = vec![Vector3::<f32>::zeros(); points.nrows()];
    faces
        .axis_iter(Axis(0))
        .zip(face_normals)
        .for_each(|(face, face_normal)| {
            for f in [face[0], face[1], face[2]] {
                vertex_normals[f] += face_normal;
            }
        });

    Array2::from_shape_fn((points.nrows(), 3), |(i, c)| {
        let normal = vertex_normals[i];
        let mag = normal.magnitude();
        if mag > 0.0 {
            normal[c] / mag
        } else {
            0.0
        }
    })
}

/// Triangle mesh extracted from a fusion volume.
#[derive(Clone, Debug, PartialEq)]
pub struct TriangleMesh {
    /// Shape is (Nx3).
    pub vertices: Array2<f32>,
    /// RGB per vertex. Shape is (Nx3).
    pub vertex_colors: Option<Array2<u8>>,
    pub vertex_normals: Option<Array2<f32>>,
    /// Vertex indices. Shape is (Mx3).
    pub triangles: Array2<usize>,
}

impl TriangleMesh {
    pub fn new(vertices: Array2<f32>, triangles: Array2<usize>) -> Self {
        Self {
            vertices,
            vertex_colors: None,
            vertex_normals: None,
            triangles,
        }
    }

    pub fn with_colors(mut self, colors: Array2<u8>) -> Self {
        self.vertex_colors = Some(colors);
        self
    }

    pub fn len_vertices(&self) -> usize {
        self.vertices.nrows()
    }

    pub fn len_triangles(&self) -> usize {
        self.triangles.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Fails when a triangle references a vertex out of range.
    pub fn compute_vertex_normals(&mut self) -> Result<(), Error> {
        let n_vertices = self.len_vertices();
        if let Some(index) = self.triangles.iter().find(|&&index| index >= n_vertices) {
            return Err(Error::engine(format!(
                "Triangle references vertex {index} of a mesh with {n_vertices} vertices"
            )));
        }
        self.vertex_normals = Some(compute_normals(
            &self.vertices.view(),
            &self.triangles.view(),
        ));
        Ok(())
    }

    /// Point cloud made of the mesh vertices and colors. Normals are not carried.
    pub fn to_point_cloud(&self) -> PointCloud {
        PointCloud {
            points: self.vertices.clone(),
            normals: None,
            colors: self.vertex_colors.clone(),
        }
    }
}

impl From<TriangleMesh> for Geometry {
    fn from(mesh: TriangleMesh) -> Geometry {
        Geometry {
            points: mesh.vertices,
            colors: mesh.vertex_colors,
            normals: mesh.vertex_normals,
            faces: Some(mesh.triangles),
        }
    }
}
