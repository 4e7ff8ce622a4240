use std::fmt::{self, Debug};

/// How the primitive assembler walks a mesh's vertices.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RenderMode {
    Points,
    Lines,
    Triangles,
    IndexedTriangles,
    TriWire,
    IndexedTriWire,
}

impl RenderMode {
    #[inline]
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            RenderMode::Points => 1,
            RenderMode::Lines => 2,
            _ => 3,
        }
    }

    #[inline]
    pub fn is_indexed(self) -> bool {
        match self {
            RenderMode::IndexedTriangles | RenderMode::IndexedTriWire => true,
            _ => false,
        }
    }

    #[inline]
    pub fn is_wireframe(self) -> bool {
        match self {
            RenderMode::TriWire | RenderMode::IndexedTriWire => true,
            _ => false,
        }
    }
}

/// An index-buffer/vertex-range pair. The vertex data itself lives wherever
/// the vertex shader wants to fetch it from (usually the uniform buffer);
/// the mesh only assembles vertex ids into primitives.
#[derive(Clone)]
pub struct Mesh {
    pub mode: RenderMode,
    pub vertex_count: u32,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(mode: RenderMode, vertex_count: u32) -> Mesh {
        Mesh {
            mode: mode,
            vertex_count: vertex_count,
            indices: Vec::new(),
        }
    }

    pub fn with_indices(mode: RenderMode, indices: Vec<u32>) -> Mesh {
        Mesh {
            mode: mode,
            vertex_count: indices.len() as u32,
            indices: indices,
        }
    }

    pub fn num_primitives(&self) -> usize {
        let vpp = self.mode.vertices_per_primitive();

        if self.mode.is_indexed() {
            self.indices.len() / vpp
        } else {
            self.vertex_count as usize / vpp
        }
    }

    /// Resolve the vertex id of one corner of one primitive.
    #[inline]
    pub fn vertex_id(&self, primitive: usize, corner: usize) -> u32 {
        let element = primitive * self.mode.vertices_per_primitive() + corner;

        if self.mode.is_indexed() {
            self.indices[element]
        } else {
            element as u32
        }
    }
}

impl Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Mesh ({:?}) {{ vertices: {}, primitives: {} }}", self.mode, self.vertex_count, self.num_primitives())
    }
}

#[cfg(test)]
mod tests {
    use super::{Mesh, RenderMode};

    #[test]
    fn primitive_counts() {
        assert_eq!(Mesh::new(RenderMode::Triangles, 9).num_primitives(), 3);
        assert_eq!(Mesh::new(RenderMode::Lines, 9).num_primitives(), 4);
        assert_eq!(Mesh::new(RenderMode::Points, 9).num_primitives(), 9);
        assert_eq!(Mesh::with_indices(RenderMode::IndexedTriangles, vec![0, 1, 2, 2, 1, 3]).num_primitives(), 2);
    }

    #[test]
    fn vertex_resolution() {
        let mesh = Mesh::with_indices(RenderMode::IndexedTriangles, vec![4, 5, 6, 6, 5, 7]);
        assert_eq!(mesh.vertex_id(0, 0), 4);
        assert_eq!(mesh.vertex_id(1, 2), 7);

        let mesh = Mesh::new(RenderMode::Triangles, 6);
        assert_eq!(mesh.vertex_id(1, 1), 4);
    }
}
