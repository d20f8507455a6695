use std::ops::{Deref, DerefMut};

/// Connectivity for a bilinear quadrilateral cell.
///
/// The vertex numbering is given by
/// ```text
/// 3 _______ 2
/// |         |
/// |         |
/// |         |
/// 0 _______ 1
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quad4Connectivity(pub [usize; 4]);

impl Quad4Connectivity {
    pub fn vertex_indices(&self) -> &[usize; 4] {
        &self.0
    }

    /// The four edges in local order bottom, right, top, left.
    ///
    /// Each edge is given as a pair of vertex indices oriented along
    /// increasing reference coordinate (ξ for bottom/top, η for right/left).
    pub fn edges(&self) -> [(usize, usize); 4] {
        let v = &self.0;
        [(v[0], v[1]), (v[1], v[2]), (v[3], v[2]), (v[0], v[3])]
    }
}

impl Deref for Quad4Connectivity {
    type Target = [usize; 4];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Quad4Connectivity {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Connectivity for a segment cell of the embedded parameter mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SegmentConnectivity(pub [usize; 2]);

impl SegmentConnectivity {
    pub fn vertex_indices(&self) -> &[usize; 2] {
        &self.0
    }
}

impl Deref for SegmentConnectivity {
    type Target = [usize; 2];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
