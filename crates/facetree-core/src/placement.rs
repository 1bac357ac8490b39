//! Placement transforms carried by child linkages.

use glam::{DMat4, DQuat, DVec3};

/// A rigid or affine placement, stored as a column-major 4x4 matrix.
///
/// Placements are small `Copy` values. The walker builds a fresh accumulated
/// placement for every recursive call instead of mutating shared state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    matrix: DMat4,
}

impl Placement {
    /// The identity placement.
    pub const IDENTITY: Self = Self {
        matrix: DMat4::IDENTITY,
    };

    /// Wrap an existing matrix.
    pub fn from_matrix(matrix: DMat4) -> Self {
        Self { matrix }
    }

    /// A pure translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            matrix: DMat4::from_translation(translation),
        }
    }

    /// A rotation followed by a translation.
    pub fn from_rotation_translation(rotation: DQuat, translation: DVec3) -> Self {
        Self {
            matrix: DMat4::from_rotation_translation(rotation, translation),
        }
    }

    /// A uniform scale about the origin.
    pub fn from_scale(scale: f64) -> Self {
        Self {
            matrix: DMat4::from_scale(DVec3::splat(scale)),
        }
    }

    /// Build a frame from an origin, a Z axis and an X reference direction.
    ///
    /// Missing or degenerate directions fall back to the global axes. The
    /// reference direction is projected onto the plane normal to `axis`.
    pub fn from_axis2(origin: DVec3, axis: Option<DVec3>, ref_direction: Option<DVec3>) -> Self {
        let z = axis
            .and_then(|a| a.try_normalize())
            .unwrap_or(DVec3::Z);
        let x = ref_direction
            .and_then(|r| (r - z * r.dot(z)).try_normalize())
            .or_else(|| (DVec3::X - z * z.x).try_normalize())
            .unwrap_or_else(|| z.any_orthonormal_vector());
        let y = z.cross(x);

        Self {
            matrix: DMat4::from_cols(
                x.extend(0.0),
                y.extend(0.0),
                z.extend(0.0),
                origin.extend(1.0),
            ),
        }
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> DMat4 {
        self.matrix
    }

    /// Check whether this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        self.matrix == DMat4::IDENTITY
    }

    /// Compose this (child-local) placement with an accumulated parent placement.
    ///
    /// The child placement is applied first, then the parent's.
    pub fn then(&self, parent: &Placement) -> Placement {
        Placement {
            matrix: parent.matrix * self.matrix,
        }
    }

    /// Transform a point (rotation, scale and translation).
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.matrix.transform_point3(point)
    }

    /// Transform a direction such as a facet normal (no translation).
    pub fn transform_direction(&self, direction: DVec3) -> DVec3 {
        self.matrix.transform_vector3(direction)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<DMat4> for Placement {
    fn from(matrix: DMat4) -> Self {
        Self::from_matrix(matrix)
    }
}
