pub mod engine;
pub mod grid;

pub use engine::{MeshEngine, MeshResult};
pub use grid::generate_grid;

#[derive(Clone)]
pub struct TriangleMesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}
