//! Facet sets: triangles indexing into shared vertex and normal tables.

use glam::DVec3;

/// One triangle: three vertex indices and one normal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Facet {
    /// Indices into the point table, in winding order.
    pub vertices: [u32; 3],
    /// Index into the normal table.
    pub normal: u32,
}

/// An ordered sequence of facets with the tables they index into.
///
/// Indices are not validated when facets are added.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacetSet {
    points: Vec<DVec3>,
    normals: Vec<DVec3>,
    facets: Vec<Facet>,
}

impl FacetSet {
    /// Create a new empty facet set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point and return its index.
    pub fn add_point(&mut self, point: DVec3) -> u32 {
        self.points.push(point);
        (self.points.len() - 1) as u32
    }

    /// Add a normal and return its index.
    pub fn add_normal(&mut self, normal: DVec3) -> u32 {
        self.normals.push(normal);
        (self.normals.len() - 1) as u32
    }

    /// Add a facet referencing existing table entries.
    pub fn add_facet(&mut self, vertices: [u32; 3], normal: u32) {
        self.facets.push(Facet { vertices, normal });
    }

    /// Add a standalone triangle with its own points and normal.
    pub fn add_triangle(&mut self, a: DVec3, b: DVec3, c: DVec3, normal: DVec3) {
        let vertices = [self.add_point(a), self.add_point(b), self.add_point(c)];
        let normal = self.add_normal(normal);
        self.add_facet(vertices, normal);
    }

    /// Number of facets, without materializing them.
    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn facet(&self, index: usize) -> Option<&Facet> {
        self.facets.get(index)
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn point(&self, index: u32) -> Option<DVec3> {
        self.points.get(index as usize).copied()
    }

    pub fn normal(&self, index: u32) -> Option<DVec3> {
        self.normals.get(index as usize).copied()
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn normals(&self) -> &[DVec3] {
        &self.normals
    }

    /// Facets of an axis-aligned box, wound counter-clockwise seen from outside.
    pub fn axis_aligned_box(min: DVec3, max: DVec3) -> Self {
        let corners = [
            DVec3::new(min.x, min.y, min.z), // 0: left-bottom-back
            DVec3::new(max.x, min.y, min.z), // 1: right-bottom-back
            DVec3::new(max.x, max.y, min.z), // 2: right-top-back
            DVec3::new(min.x, max.y, min.z), // 3: left-top-back
            DVec3::new(min.x, min.y, max.z), // 4: left-bottom-front
            DVec3::new(max.x, min.y, max.z), // 5: right-bottom-front
            DVec3::new(max.x, max.y, max.z), // 6: right-top-front
            DVec3::new(min.x, max.y, max.z), // 7: left-top-front
        ];

        let faces = [
            ([0, 3, 2, 1], DVec3::NEG_Z), // back
            ([4, 5, 6, 7], DVec3::Z),     // front
            ([0, 4, 7, 3], DVec3::NEG_X), // left
            ([1, 2, 6, 5], DVec3::X),     // right
            ([0, 1, 5, 4], DVec3::NEG_Y), // bottom
            ([3, 7, 6, 2], DVec3::Y),     // top
        ];

        let mut set = FacetSet {
            points: corners.to_vec(),
            normals: Vec::with_capacity(6),
            facets: Vec::with_capacity(12),
        };

        for (quad, normal) in faces {
            let n = set.add_normal(normal);
            set.add_facet([quad[0], quad[1], quad[2]], n);
            set.add_facet([quad[0], quad[2], quad[3]], n);
        }

        set
    }
}

/// A cached mesh for one representation item.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    facets: FacetSet,
}

impl Mesh {
    pub fn new(facets: FacetSet) -> Self {
        Self { facets }
    }

    pub fn facet_set(&self) -> &FacetSet {
        &self.facets
    }

    pub fn facet_count(&self) -> usize {
        self.facets.facet_count()
    }
}

impl From<FacetSet> for Mesh {
    fn from(facets: FacetSet) -> Self {
        Self::new(facets)
    }
}
