//! Export of solved fields as legacy-VTK unstructured grids.
use std::path::Path;

use nalgebra::Point2;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataSet, Piece, UnstructuredGridPiece,
    Version, VertexNumbers, Vtk,
};

use crate::connectivity::SegmentConnectivity;
use crate::error::IoError;
use crate::mesh::QuadMesh2d;

/// Builder for a VTK dataset over a set of points, cells and point-scalar
/// fields.
pub struct FieldDataSetBuilder {
    title: Option<String>,
    points: Vec<Point2<f64>>,
    cell_vertex_counts: Vec<usize>,
    cell_vertex_indices: Vec<usize>,
    cell_types: Vec<CellType>,
    point_scalars: Vec<(String, Vec<f64>)>,
}

impl FieldDataSetBuilder {
    /// A dataset over the quadrilateral cells of a host mesh.
    pub fn from_quad_mesh(mesh: &QuadMesh2d) -> Self {
        let mut cell_vertex_indices = Vec::with_capacity(4 * mesh.num_cells());
        for cell in mesh.connectivity() {
            cell_vertex_indices.extend_from_slice(cell.vertex_indices());
        }
        Self {
            title: None,
            points: mesh.vertices().to_vec(),
            cell_vertex_counts: vec![4; mesh.num_cells()],
            cell_vertex_indices,
            cell_types: vec![CellType::Quad; mesh.num_cells()],
            point_scalars: Vec::new(),
        }
    }

    /// A dataset over a polyline through physically mapped points.
    pub fn from_polyline(points: Vec<Point2<f64>>, segments: &[SegmentConnectivity]) -> Self {
        let mut cell_vertex_indices = Vec::with_capacity(2 * segments.len());
        for segment in segments {
            cell_vertex_indices.extend_from_slice(segment.vertex_indices());
        }
        Self {
            title: None,
            points,
            cell_vertex_counts: vec![2; segments.len()],
            cell_vertex_indices,
            cell_types: vec![CellType::Line; segments.len()],
            point_scalars: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attaches a point-scalar field. The first `points.len()` values are
    /// written; fields indexed by dof may therefore carry trailing
    /// non-vertex dofs, which are not part of the geometry.
    ///
    /// # Panics
    ///
    /// Panics if fewer values than points are supplied.
    pub fn with_point_scalars(mut self, name: impl Into<String>, values: &[f64]) -> Self {
        assert!(
            values.len() >= self.points.len(),
            "point scalar field shorter than the point set"
        );
        self.point_scalars
            .push((name.into(), values[..self.points.len()].to_vec()));
        self
    }

    pub fn try_build(&self) -> Result<DataSet, String> {
        let mut points = Vec::with_capacity(3 * self.points.len());
        for point in &self.points {
            points.extend_from_slice(&[point.x, point.y, 0.0]);
        }

        // Legacy vertex layout: N, i_1, ..., i_N per cell.
        let mut vertices: Vec<u32> = Vec::with_capacity(self.cell_vertex_indices.len() + self.cell_vertex_counts.len());
        let mut index_cursor = 0;
        for &count in &self.cell_vertex_counts {
            vertices.push(count.try_into().map_err(|_| "cell vertex count exceeds u32")?);
            for &index in &self.cell_vertex_indices[index_cursor..index_cursor + count] {
                vertices.push(index.try_into().map_err(|_| "vertex index exceeds u32")?);
            }
            index_cursor += count;
        }

        let mut attributes = Attributes::default();
        for (name, values) in &self.point_scalars {
            attributes
                .point
                .push(Attribute::scalars(name, 1).with_data(values.clone()));
        }

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: self.cell_vertex_counts.len() as u32,
                    vertices,
                },
                types: self.cell_types.clone(),
            },
            data: attributes,
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Exports the dataset to a file; the format follows the extension.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> Result<(), IoError> {
        let path = filename.as_ref();
        let fallback_title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self.try_build().map_err(|message| IoError {
            path: path.to_path_buf(),
            message,
        })?;
        Vtk {
            version: Version { major: 4, minor: 1 },
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export(path)
        .map_err(|err| IoError {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}
