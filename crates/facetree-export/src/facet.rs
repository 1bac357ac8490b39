//! Facet emitter: one transformed triangle record per facet.

use std::io::Write;

use facetree_core::{ExportError, ExportStage, Placement};
use facetree_mesh::FacetSet;
use glam::DVec3;

use crate::binary::{write_f32, write_u16};

/// Write facet `index` of `facets` as a 50-byte record placed by `accum`.
///
/// The normal is transformed as a direction and the vertices as points. Vertices
/// keep their stored order so the winding is preserved.
pub fn emit_facet<W: Write + ?Sized>(
    out: &mut W,
    facets: &FacetSet,
    index: usize,
    accum: &Placement,
) -> Result<(), ExportError> {
    let (normal, corners) = resolve_facet(facets, index)?;
    write_record(
        out,
        accum.transform_direction(normal),
        corners.map(|p| accum.transform_point(p)),
    )
    .map_err(|e| ExportError::write(ExportStage::Emitting, e))
}

/// Check that every facet of `facets` resolves its normal and all three vertices.
pub fn check_facets(facets: &FacetSet) -> Result<(), ExportError> {
    for index in 0..facets.facet_count() {
        resolve_facet(facets, index)?;
    }
    Ok(())
}

fn resolve_facet(facets: &FacetSet, index: usize) -> Result<(DVec3, [DVec3; 3]), ExportError> {
    let facet = facets.facet(index).ok_or(ExportError::FacetIndex {
        facet: index,
        index: u32::try_from(index).unwrap_or(u32::MAX),
    })?;

    let missing = |entry: u32| ExportError::FacetIndex { facet: index, index: entry };
    let normal = facets.normal(facet.normal).ok_or_else(|| missing(facet.normal))?;
    let mut corners = [DVec3::ZERO; 3];
    for (corner, &v) in corners.iter_mut().zip(facet.vertices.iter()) {
        *corner = facets.point(v).ok_or_else(|| missing(v))?;
    }
    Ok((normal, corners))
}

fn write_record<W: Write + ?Sized>(out: &mut W, normal: DVec3, corners: [DVec3; 3]) -> std::io::Result<()> {
    for v in std::iter::once(normal).chain(corners) {
        write_f32(out, v.x)?;
        write_f32(out, v.y)?;
        write_f32(out, v.z)?;
    }
    write_u16(out, 0)
}
