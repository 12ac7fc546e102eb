//! Packed terrain buffer shared with the batch evaluator.
//!
//! Layout, in 4-byte words:
//!
//! ```text
//! [0..3)                      header: vertex_offset, contour_offset, children_offset
//! [vertex_offset..)           x: f32, y: f32 per sampled boundary point
//! [contour_offset..)          one ContourRecord (8 words) per contour
//! [children_offset..len)      u32 child contour indices
//! ```
//!
//! [`PackedTerrain::pack`] writes it from a [`TerrainSnapshot`], and
//! [`PackedTerrainView::parse`] reads it back without copying. Capacity is bounded by
//! [`PackLimits`]; exceeding a limit is an error, never a silent truncation.
use bytemuck::{Pod, Zeroable};
use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::source::ContourSource;
use crate::terrain::snapshot::TerrainSnapshot;
use crate::terrain::tree::{ContourTree, ContourTreeNode, NO_PARENT};

/// Number of header words.
pub const HEADER_WORDS: usize = 3;
/// Words per contour record.
pub const RECORD_WORDS: usize = 8;

/// Per-contour record in the packed buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ContourRecord {
    pub point_start: u32,
    pub point_count: u32,
    pub height: f32,
    pub parent_index: i32,
    pub depth: u32,
    pub child_start: u32,
    pub child_count: u32,
    pub _pad: u32,
}

/// Upper bounds for the fixed-capacity sections of the packed buffer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackLimits {
    pub max_contours: usize,
    pub max_points: usize,
    /// Bound on the total number of child entries.
    pub max_children: usize,
}

impl Default for PackLimits {
    fn default() -> Self {
        Self {
            max_contours: 4096,
            max_points: 1 << 20,
            max_children: 4096,
        }
    }
}

impl PackLimits {
    pub fn with_max_contours(mut self, max_contours: usize) -> Self {
        self.max_contours = max_contours;
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children;
        self
    }

    /// Fail with [`Error::CapacityExceeded`] if `snapshot` does not fit.
    pub fn check(&self, snapshot: &TerrainSnapshot) -> Result<()> {
        let checks = [
            ("contours", snapshot.contours.len(), self.max_contours),
            ("points", snapshot.point_count(), self.max_points),
            ("children", snapshot.tree.child_indices().len(), self.max_children),
        ];
        for (what, count, max) in checks {
            if count > max {
                return Err(Error::CapacityExceeded { what, count, max });
            }
        }
        Ok(())
    }
}

/// Owned packed buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedTerrain {
    words: Vec<u32>,
    default_depth: f32,
}

impl PackedTerrain {
    /// Pack `snapshot`, enforcing `limits`.
    pub fn pack(snapshot: &TerrainSnapshot, limits: &PackLimits) -> Result<Self> {
        limits.check(snapshot)?;

        let contour_count = snapshot.contours.len();
        let point_count = snapshot.point_count();
        let child_indices = snapshot.tree.child_indices();

        let vertex_offset = HEADER_WORDS;
        let contour_offset = vertex_offset + point_count * 2;
        let children_offset = contour_offset + contour_count * RECORD_WORDS;
        let total = children_offset + child_indices.len();

        let mut words = Vec::with_capacity(total);
        words.extend([
            vertex_offset as u32,
            contour_offset as u32,
            children_offset as u32,
        ]);

        for contour in &snapshot.contours {
            for p in &contour.points {
                words.push(p.x.to_bits());
                words.push(p.y.to_bits());
            }
        }

        let mut point_start = 0u32;
        for (i, contour) in snapshot.contours.iter().enumerate() {
            let node = snapshot.tree.nodes()[i];
            let record = ContourRecord {
                point_start,
                point_count: contour.points.len() as u32,
                height: contour.height,
                parent_index: node.parent_index,
                depth: node.depth,
                child_start: node.child_start,
                child_count: node.child_count,
                _pad: 0,
            };
            words.extend_from_slice(bytemuck::cast_slice(std::slice::from_ref(&record)));
            point_start += contour.points.len() as u32;
        }

        words.extend_from_slice(child_indices);
        debug_assert_eq!(words.len(), total);

        Ok(Self {
            words,
            default_depth: snapshot.default_depth,
        })
    }

    /// Rebuild from raw bytes (any alignment); the layout is validated.
    pub fn from_bytes(bytes: &[u8], default_depth: f32) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::InvalidLayout(format!(
                "byte length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let words: Vec<u32> = bytemuck::pod_collect_to_vec(bytes);
        PackedTerrainView::parse(&words, default_depth)?;
        Ok(Self {
            words,
            default_depth,
        })
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    pub fn default_depth(&self) -> f32 {
        self.default_depth
    }

    /// Borrowing view over the buffer.
    pub fn view(&self) -> Result<PackedTerrainView<'_>> {
        PackedTerrainView::parse(&self.words, self.default_depth)
    }
}

/// Zero-copy reader over a packed buffer.
#[derive(Clone, Debug)]
pub struct PackedTerrainView<'a> {
    vertices: &'a [Vec2],
    records: &'a [ContourRecord],
    children: &'a [u32],
    roots: Vec<u32>,
    default_depth: f32,
}

fn layout_err(msg: impl Into<String>) -> Error {
    Error::InvalidLayout(msg.into())
}

impl<'a> PackedTerrainView<'a> {
    /// Validate `words` as a packed terrain buffer and borrow its sections.
    pub fn parse(words: &'a [u32], default_depth: f32) -> Result<Self> {
        if words.len() < HEADER_WORDS {
            return Err(layout_err("buffer shorter than header"));
        }
        let vertex_offset = words[0] as usize;
        let contour_offset = words[1] as usize;
        let children_offset = words[2] as usize;

        if vertex_offset < HEADER_WORDS
            || contour_offset < vertex_offset
            || children_offset < contour_offset
            || children_offset > words.len()
        {
            return Err(layout_err(format!(
                "section offsets out of order: {vertex_offset}, {contour_offset}, {children_offset} (len {})",
                words.len()
            )));
        }

        let vertices: &[Vec2] = bytemuck::try_cast_slice(&words[vertex_offset..contour_offset])
            .map_err(|e| layout_err(format!("vertex section: {e}")))?;
        let records: &[ContourRecord] =
            bytemuck::try_cast_slice(&words[contour_offset..children_offset])
                .map_err(|e| layout_err(format!("contour section: {e}")))?;
        let children = &words[children_offset..];

        let count = records.len();
        let mut roots = Vec::new();
        for (i, r) in records.iter().enumerate() {
            let point_end = r.point_start as usize + r.point_count as usize;
            let child_end = r.child_start as usize + r.child_count as usize;
            if point_end > vertices.len() {
                return Err(layout_err(format!("contour {i} points out of range")));
            }
            if child_end > children.len() {
                return Err(layout_err(format!("contour {i} children out of range")));
            }
            if r.parent_index == NO_PARENT {
                roots.push(i as u32);
            } else if r.parent_index < 0 || r.parent_index as usize >= count {
                return Err(layout_err(format!(
                    "contour {i} has invalid parent {}",
                    r.parent_index
                )));
            }
        }
        if let Some(bad) = children.iter().find(|&&c| c as usize >= count) {
            return Err(layout_err(format!("child index {bad} out of range")));
        }
        // Every child must point back at its parent one level deeper, so descending
        // through children always terminates.
        for (i, r) in records.iter().enumerate() {
            let start = r.child_start as usize;
            for &c in &children[start..start + r.child_count as usize] {
                let child = &records[c as usize];
                if child.parent_index != i as i32 || Some(child.depth) != r.depth.checked_add(1)
                {
                    return Err(layout_err(format!(
                        "contour {c} listed as a child of {i} but records parent {} at depth {}",
                        child.parent_index, child.depth
                    )));
                }
            }
        }

        Ok(Self {
            vertices,
            records,
            children,
            roots,
            default_depth,
        })
    }

    pub fn records(&self) -> &'a [ContourRecord] {
        self.records
    }

    pub fn vertices(&self) -> &'a [Vec2] {
        self.vertices
    }

    /// Reconstruct the containment tree stored in the buffer.
    pub fn to_tree(&self) -> ContourTree {
        let nodes = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| ContourTreeNode {
                contour_index: i as u32,
                parent_index: r.parent_index,
                depth: r.depth,
                child_start: r.child_start,
                child_count: r.child_count,
            })
            .collect();
        ContourTree::from_parts(nodes, self.children.to_vec())
    }
}

impl ContourSource for PackedTerrainView<'_> {
    #[inline]
    fn contour_count(&self) -> usize {
        self.records.len()
    }

    #[inline]
    fn points(&self, index: usize) -> &[Vec2] {
        let r = &self.records[index];
        let start = r.point_start as usize;
        &self.vertices[start..start + r.point_count as usize]
    }

    #[inline]
    fn height(&self, index: usize) -> f32 {
        self.records[index].height
    }

    #[inline]
    fn children(&self, index: usize) -> &[u32] {
        let r = &self.records[index];
        let start = r.child_start as usize;
        &self.children[start..start + r.child_count as usize]
    }

    #[inline]
    fn roots(&self) -> &[u32] {
        &self.roots
    }

    #[inline]
    fn default_depth(&self) -> f32 {
        self.default_depth
    }
}
