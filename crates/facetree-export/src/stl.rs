//! Binary STL export of a whole assembly.
//!
//! Binary STL declares its triangle count before the first record, so an export
//! walks the assembly twice: once to count and once to write. Both passes go
//! through the same walker and therefore agree by construction.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use facetree_core::{AssemblyModel, ExportError, ExportStage, Placement, ProductId};
use facetree_mesh::{MeshCache, MeshLookup, Mesher};
use tracing::{debug, info, warn};

use crate::binary::{stl_len, write_u32, HEADER_LEN};
use crate::options::{Destination, ExportOptions};
use crate::walker::ShapeWalker;

/// Outcome of a successful export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Triangle records written (and declared in the header).
    pub triangles: u32,
    /// Total bytes written.
    pub bytes: u64,
}

/// Written ahead of header text that begins with `solid`.
const BINARY_PREFIX: &[u8] = b"binary ";

/// Build the 80-byte header: `text` truncated to fit, padded with zero bytes.
///
/// Readers take a file whose header begins with `solid` for ASCII STL, so such
/// text is prefixed with `binary `.
pub fn header_bytes(text: &str) -> [u8; HEADER_LEN] {
    let prefix: &[u8] = if reads_as_ascii_stl(text) {
        debug!(header = text, "prefixing header that would read as ASCII STL");
        BINARY_PREFIX
    } else {
        &[]
    };

    let mut header = [0u8; HEADER_LEN];
    for (slot, &byte) in header.iter_mut().zip(prefix.iter().chain(text.as_bytes())) {
        *slot = byte;
    }
    header
}

fn reads_as_ascii_stl(text: &str) -> bool {
    text.trim_start()
        .as_bytes()
        .get(..5)
        .is_some_and(|start| start.eq_ignore_ascii_case(b"solid"))
}

/// Write a binary STL for `roots` from an already populated mesh lookup.
///
/// Every root starts from a fresh identity placement.
pub fn write_binary_stl<W, L>(
    model: &AssemblyModel,
    meshes: &L,
    roots: &[ProductId],
    header: &str,
    out: &mut W,
) -> Result<ExportSummary, ExportError>
where
    W: Write + ?Sized,
    L: MeshLookup,
{
    let walker = ShapeWalker::new(model, meshes);

    enter(ExportStage::Counting);
    let mut total = 0u64;
    for &root in roots {
        total += walker.count_mesh_for_product(root)?;
    }
    let count = u32::try_from(total).map_err(|_| ExportError::TooManyTriangles { count: total })?;
    debug!(roots = roots.len(), triangles = count, "counted triangles");

    write_preamble(out, header, count)
        .map_err(|e| ExportError::write(ExportStage::HeaderWritten, e))?;
    enter(ExportStage::HeaderWritten);

    enter(ExportStage::Emitting);
    let mut emitted = 0u64;
    for &root in roots {
        emitted += walker.emit_mesh_for_product(out, root, Placement::IDENTITY)?;
    }
    if emitted != total {
        return Err(ExportError::CountMismatch {
            declared: count,
            emitted,
        });
    }

    Ok(ExportSummary {
        triangles: count,
        bytes: stl_len(count),
    })
}

/// Exports an assembly model to binary STL, meshing it first.
pub struct StlExporter<'a, M: Mesher + ?Sized> {
    model: &'a AssemblyModel,
    mesher: &'a M,
}

impl<'a, M: Mesher + ?Sized> StlExporter<'a, M> {
    pub fn new(model: &'a AssemblyModel, mesher: &'a M) -> Self {
        Self { model, mesher }
    }

    /// Run a full export as configured by `options`.
    ///
    /// A split request is rejected before anything is opened. When writing to a
    /// file fails part way, the partial file is removed.
    pub fn export(&self, options: &ExportOptions) -> Result<ExportSummary, ExportError> {
        enter(ExportStage::Start);
        if options.split {
            return Err(failed(ExportError::SplitUnsupported));
        }

        let roots = options.resolve_roots(self.model);
        let result = match &options.destination {
            Destination::Stdout => {
                info!(roots = roots.len(), "exporting binary STL to standard output");
                let stdout = io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                self.export_to(&roots, &options.header, &mut out)
                    .and_then(|summary| close(out).map(|_| summary))
            }
            Destination::Path(path) => self.export_to_path(&roots, &options.header, path),
        };

        match result {
            Ok(summary) => {
                enter(ExportStage::Closed);
                info!(triangles = summary.triangles, bytes = summary.bytes, "binary STL written");
                Ok(summary)
            }
            Err(e) => Err(failed(e)),
        }
    }

    /// Mesh the roots and write the binary STL to `out`.
    pub fn export_to<W: Write + ?Sized>(
        &self,
        roots: &[ProductId],
        header: &str,
        out: &mut W,
    ) -> Result<ExportSummary, ExportError> {
        enter(ExportStage::Meshing);
        let mut cache = MeshCache::new();
        self.mesher.facet_all_products(self.model, roots, &mut cache)?;
        debug!(meshes = cache.len(), facets = cache.total_facets(), "meshing finished");

        write_binary_stl(self.model, &cache, roots, header, out)
    }

    fn export_to_path(
        &self,
        roots: &[ProductId],
        header: &str,
        path: &Path,
    ) -> Result<ExportSummary, ExportError> {
        let file = File::create(path).map_err(|source| ExportError::OpenDestination {
            path: path.to_path_buf(),
            source,
        })?;
        info!(roots = roots.len(), path = %path.display(), "exporting binary STL");

        let mut out = BufWriter::new(file);
        let result = self
            .export_to(roots, header, &mut out)
            .and_then(|summary| close(out).map(|_| summary));

        if result.is_err() {
            warn!(path = %path.display(), "removing partial output");
            if let Err(e) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "could not remove partial output");
            }
        }
        result
    }
}

/// Export `roots` (or the model's roots when `None`) and return the bytes.
pub fn export_to_vec<M: Mesher + ?Sized>(
    model: &AssemblyModel,
    mesher: &M,
    roots: Option<&[ProductId]>,
) -> Result<Vec<u8>, ExportError> {
    let roots = roots.unwrap_or(&model.roots);
    let mut out = Vec::new();
    StlExporter::new(model, mesher).export_to(roots, crate::options::DEFAULT_HEADER, &mut out)?;
    Ok(out)
}

fn write_preamble<W: Write + ?Sized>(out: &mut W, header: &str, count: u32) -> io::Result<()> {
    out.write_all(&header_bytes(header))?;
    write_u32(out, count)
}

fn close<W: Write>(mut out: BufWriter<W>) -> Result<(), ExportError> {
    out.flush()
        .map_err(|e| ExportError::write(ExportStage::Closed, e))
}

fn enter(stage: ExportStage) {
    debug!(stage = %stage, "export stage");
}

fn failed(error: ExportError) -> ExportError {
    warn!(stage = %ExportStage::Failed, code = error.exit_code(), error = %error, "export failed");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::StlSummary;
    use facetree_core::{exit_code, AssemblyBuilder, LinkageKind, MeshError, RepId};
    use facetree_mesh::{FacetSet, PrefacetedMesher};
    use glam::{DQuat, DVec3};
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn unit_box() -> FacetSet {
        FacetSet::axis_aligned_box(DVec3::ZERO, DVec3::ONE)
    }

    fn single_triangle(v: DVec3) -> FacetSet {
        let mut set = FacetSet::new();
        set.add_triangle(v, v + DVec3::X, v + DVec3::Y, DVec3::Z);
        set
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("facetree-{}-{name}.stl", std::process::id()))
    }

    /// Two roots. The first nests a part twice (relationship and mapped item)
    /// under a sub-assembly; the second is a bare part.
    fn sample_model() -> (AssemblyModel, PrefacetedMesher) {
        let mut b = AssemblyBuilder::new();
        let car = b.add_root("car");
        let bolt = b.add_root("bolt");

        let car_shape = b.add_representation("car");
        let axle = b.add_representation("axle");
        let wheel = b.add_representation("wheel");
        let bolt_shape = b.add_representation("bolt");

        let _frame = b.add_item(car_shape, "frame placement");
        let axle_solid = b.add_item(axle, "axle");
        let wheel_solid = b.add_item(wheel, "tire");
        let bolt_solid = b.add_item(bolt_shape, "bolt");

        b.attach_shape(car, car_shape)
            .attach_shape(bolt, bolt_shape)
            .link_relationship(car_shape, axle, Placement::from_translation(DVec3::new(0.0, 0.0, 1.0)))
            .link_relationship(axle, wheel, Placement::from_translation(DVec3::new(-2.0, 0.0, 0.0)))
            .link_mapped_item(axle, wheel, Placement::from_translation(DVec3::new(2.0, 0.0, 0.0)))
            .link_unresolved(axle, LinkageKind::MappedItem);

        let mut meshes = MeshCache::new();
        meshes.insert(axle_solid, unit_box());
        meshes.insert(wheel_solid, unit_box());
        meshes.insert(bolt_solid, single_triangle(DVec3::ZERO));

        (b.build(), PrefacetedMesher::new(meshes))
    }

    #[test]
    fn test_header_bytes() {
        let header = header_bytes("binary stl");
        assert_eq!(&header[..10], b"binary stl");
        assert!(header[10..].iter().all(|&b| b == 0));

        let long = "x".repeat(120);
        assert_eq!(header_bytes(&long), [b'x'; HEADER_LEN]);
    }

    #[test]
    fn test_header_never_starts_with_solid() {
        for text in ["solid part", "SOLID", "  Solid body", "solidworks export"] {
            let header = header_bytes(text);
            assert!(header.starts_with(b"binary "), "{text:?}");
            assert!(!header[..5].eq_ignore_ascii_case(b"solid"));
        }
        assert_eq!(&header_bytes("solid part")[..17], b"binary solid part");
        assert_eq!(&header_bytes("a solid part")[..12], b"a solid part");
        assert_eq!(&header_bytes("sol")[..3], b"sol");

        let long = format!("solid {}", "x".repeat(100));
        let header = header_bytes(&long);
        assert_eq!(&header[..13], b"binary solid ");
        assert_eq!(header[HEADER_LEN - 1], b'x');
    }

    #[test]
    fn test_solid_header_from_options() {
        let (model, mesher) = sample_model();
        let path = temp_path("solid-header");
        let options = ExportOptions::new().with_path(&path).with_header("solid car");
        StlExporter::new(&model, &mesher).export(&options).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(StlSummary::parse(&bytes).unwrap().header_text(), "binary solid car");
    }

    #[test]
    fn test_count_matches_records() {
        let (model, mesher) = sample_model();
        let bytes = export_to_vec(&model, &mesher, None).unwrap();
        let summary = StlSummary::parse(&bytes).unwrap();

        // axle 12 + two wheels 24 + bolt 1
        assert_eq!(summary.count, 37);
        assert_eq!(summary.triangles.len(), 37);
        assert_eq!(bytes.len() as u64, stl_len(37));
        assert_eq!(summary.header_text(), "binary stl");
    }

    #[test]
    fn test_export_is_idempotent() {
        let (model, mesher) = sample_model();
        let first = export_to_vec(&model, &mesher, None).unwrap();
        let second = export_to_vec(&model, &mesher, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_two_level_placement() {
        let mut b = AssemblyBuilder::new();
        let root = b.add_root("assembly");
        let top = b.add_representation("top");
        let child = b.add_representation("child");
        let item = b.add_item(child, "solid");
        let t_child = Placement::from_rotation_translation(
            DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2),
            DVec3::new(10.0, 0.0, 0.0),
        );
        b.attach_shape(root, top).link_relationship(top, child, t_child);
        let model = b.build();

        let v = DVec3::new(1.0, 2.0, 3.0);
        let mut meshes = MeshCache::new();
        meshes.insert(item, single_triangle(v));

        let bytes = export_to_vec(&model, &PrefacetedMesher::new(meshes), None).unwrap();
        let summary = StlSummary::parse(&bytes).unwrap();
        let expected = t_child.transform_point(v);
        let got = summary.triangles[0].vertices[0];
        assert!((got[0] as f64 - expected.x).abs() < 1e-5);
        assert!((got[1] as f64 - expected.y).abs() < 1e-5);
        assert!((got[2] as f64 - expected.z).abs() < 1e-5);
        // Rotated a quarter turn then shifted: (1,2,3) -> (-2,1,3) -> (8,1,3)
        assert!((got[0] - 8.0).abs() < 1e-5 && (got[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_deep_nesting() {
        let mut b = AssemblyBuilder::new();
        let root = b.add_root("root");
        let top = b.add_representation("level0");
        b.attach_shape(root, top);
        let quarter = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2);
        let mut parent = top;
        for depth in 1..=4 {
            let rep = b.add_representation(&format!("level{depth}"));
            b.link_mapped_item(parent, rep, Placement::from_rotation_translation(quarter, DVec3::X));
            parent = rep;
        }
        let item = b.add_item(parent, "leaf");
        let model = b.build();

        let mut meshes = MeshCache::new();
        meshes.insert(item, single_triangle(DVec3::ZERO));
        let bytes = export_to_vec(&model, &PrefacetedMesher::new(meshes), None).unwrap();
        let v = StlSummary::parse(&bytes).unwrap().triangles[0].vertices[0];

        // Each level moves one unit along its parent's X and turns a quarter:
        // (1,0) + (0,1) + (-1,0) + (0,-1) lands back at the origin.
        assert!(v.iter().all(|c| c.abs() < 1e-5), "{v:?}");
    }

    #[test]
    fn test_empty_model_is_84_bytes() {
        let model = AssemblyModel::new();
        let bytes = export_to_vec(&model, &PrefacetedMesher::default(), None).unwrap();
        assert_eq!(bytes.len(), 84);
        assert_eq!(&bytes[80..], &[0, 0, 0, 0]);

        // Roots whose shapes have no meshes behave the same.
        let mut b = AssemblyBuilder::new();
        let root = b.add_root("empty");
        let rep = b.add_representation("shape");
        b.add_item(rep, "placement");
        b.attach_shape(root, rep);
        let model = b.build();
        let bytes = export_to_vec(&model, &PrefacetedMesher::default(), None).unwrap();
        assert_eq!(bytes.len(), 84);
    }

    #[test]
    fn test_unresolved_data_contributes_nothing() {
        let mut b = AssemblyBuilder::new();
        let root = b.add_root("root");
        let top = b.add_representation("top");
        b.attach_shape(root, top)
            .attach_shape(root, RepId(50))
            .link_unresolved(top, LinkageKind::Relationship)
            .link_mapped_item(top, RepId(51), Placement::IDENTITY);
        let model = b.build();

        let bytes = export_to_vec(&model, &PrefacetedMesher::default(), Some(&[root, ProductId(9)])).unwrap();
        assert_eq!(bytes.len(), 84);
    }

    #[test]
    fn test_explicit_roots_limit_export() {
        let (model, mesher) = sample_model();
        let bolt_only = export_to_vec(&model, &mesher, Some(&[ProductId(1)])).unwrap();
        assert_eq!(StlSummary::parse(&bolt_only).unwrap().count, 1);
    }

    #[test]
    fn test_roots_do_not_share_placements() {
        let mut b = AssemblyBuilder::new();
        let first = b.add_root("first");
        let second = b.add_root("second");
        let shape = b.add_representation("shape");
        let item = b.add_item(shape, "solid");
        b.attach_shape(first, shape).attach_shape(second, shape);
        let model = b.build();

        let mut meshes = MeshCache::new();
        meshes.insert(item, single_triangle(DVec3::new(4.0, 5.0, 6.0)));
        let bytes = export_to_vec(&model, &PrefacetedMesher::new(meshes), None).unwrap();
        let summary = StlSummary::parse(&bytes).unwrap();
        assert_eq!(summary.triangles[0], summary.triangles[1]);
        assert_eq!(summary.triangles[0].vertices[0], [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_split_rejected_without_writing() {
        let (model, mesher) = sample_model();
        let path = temp_path("split");
        let _ = fs::remove_file(&path);

        let options = ExportOptions::new().with_path(&path).split_output();
        let result = StlExporter::new(&model, &mesher).export(&options);
        assert!(matches!(result, Err(ExportError::SplitUnsupported)));
        assert_eq!(exit_code(&result), 2);
        assert!(!path.exists());
    }

    #[test]
    fn test_unopenable_destination() {
        let (model, mesher) = sample_model();
        let path = std::env::temp_dir()
            .join(format!("facetree-missing-{}", std::process::id()))
            .join("nested")
            .join("out.stl");
        let options = ExportOptions::new().with_path(&path);
        let result = StlExporter::new(&model, &mesher).export(&options);
        assert!(matches!(result, Err(ExportError::OpenDestination { .. })));
        assert_eq!(exit_code(&result), 3);
    }

    #[test]
    fn test_export_to_file() {
        let (model, mesher) = sample_model();
        let path = temp_path("file");
        let options = ExportOptions::new().with_path(&path).with_header("car assembly");

        let summary = StlExporter::new(&model, &mesher).export(&options).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(summary.triangles, 37);
        assert_eq!(summary.bytes, bytes.len() as u64);
        let parsed = StlSummary::parse(&bytes).unwrap();
        assert_eq!(parsed.header_text(), "car assembly");
        assert_eq!(bytes, {
            let mut expected = Vec::new();
            StlExporter::new(&model, &mesher)
                .export_to(&model.roots, "car assembly", &mut expected)
                .unwrap();
            expected
        });
    }

    #[test]
    fn test_meshing_failure_removes_file() {
        let (model, _) = sample_model();
        let mesher = |_: &AssemblyModel, _: &[ProductId], _: &mut MeshCache| -> Result<(), MeshError> {
            Err(MeshError::FacetingFailed {
                item: facetree_core::ItemId(1),
                reason: "bad surface".to_string(),
            })
        };
        let path = temp_path("meshing");
        let options = ExportOptions::new().with_path(&path);
        let result = StlExporter::new(&model, &mesher).export(&options);
        assert!(matches!(result, Err(ExportError::Meshing(_))));
        assert_eq!(exit_code(&result), 6);
        assert!(!path.exists());
    }

    #[test]
    fn test_cycle_reported_before_header() {
        let mut b = AssemblyBuilder::new();
        let root = b.add_root("root");
        let a = b.add_representation("a");
        let c = b.add_representation("c");
        b.attach_shape(root, a)
            .link_relationship(a, c, Placement::IDENTITY)
            .link_relationship(c, a, Placement::IDENTITY);
        let model = b.build();

        let mut out = Vec::new();
        let result = write_binary_stl(&model, &MeshCache::new(), &[root], "x", &mut out);
        assert!(matches!(result, Err(ExportError::CyclicAssembly { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_bad_facet_index_reported_before_header() {
        let mut b = AssemblyBuilder::new();
        let root = b.add_root("root");
        let rep = b.add_representation("part");
        let solid = b.add_item(rep, "solid");
        b.attach_shape(root, rep);
        let model = b.build();

        let mut broken = unit_box();
        broken.add_facet([0, 1, 99], 0);
        let mut meshes = MeshCache::new();
        meshes.insert(solid, broken);

        let mut out = Vec::new();
        let result = write_binary_stl(&model, &meshes, &[root], "x", &mut out);
        assert!(matches!(result, Err(ExportError::FacetIndex { facet: 12, index: 99 })));
        assert_eq!(exit_code(&result), 7);
        assert!(out.is_empty());
    }

    #[test]
    fn test_very_deep_assembly_exports() {
        const DEPTH: usize = 50_000;
        let mut b = AssemblyBuilder::new();
        let root = b.add_root("root");
        let top = b.add_representation("level0");
        b.attach_shape(root, top);
        let mut parent = top;
        for depth in 1..=DEPTH {
            let rep = b.add_representation(&format!("level{depth}"));
            b.link_relationship(parent, rep, Placement::IDENTITY);
            parent = rep;
        }
        let item = b.add_item(parent, "leaf");
        let model = b.build();

        let mut meshes = MeshCache::new();
        meshes.insert(item, single_triangle(DVec3::ZERO));
        let bytes = export_to_vec(&model, &PrefacetedMesher::new(meshes), None).unwrap();
        assert_eq!(StlSummary::parse(&bytes).unwrap().count, 1);
    }

    /// Accepts a fixed number of bytes, then fails like a full disk.
    struct FullDisk {
        room: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_surfaces_stage() {
        let (model, mesher) = sample_model();
        let exporter = StlExporter::new(&model, &mesher);

        let mut tiny = FullDisk { room: 10 };
        match exporter.export_to(&model.roots, "h", &mut tiny) {
            Err(ExportError::Write { stage, .. }) => assert_eq!(stage, ExportStage::HeaderWritten),
            other => panic!("unexpected result: {other:?}"),
        }

        let mut after_header = FullDisk { room: 100 };
        match exporter.export_to(&model.roots, "h", &mut after_header) {
            Err(ExportError::Write { stage, .. }) => assert_eq!(stage, ExportStage::Emitting),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    /// Per representation: whether it carries a box mesh, and up to two child
    /// linkages as (target offset, mapped item). Children always point at a
    /// later representation, so the graph is acyclic.
    fn graph_strategy() -> impl Strategy<Value = Vec<(bool, Vec<(usize, bool)>)>> {
        prop::collection::vec(
            (any::<bool>(), prop::collection::vec((0usize..8, any::<bool>()), 0..=2)),
            1..8,
        )
    }

    fn build_graph(spec: &[(bool, Vec<(usize, bool)>)]) -> (AssemblyModel, MeshCache, u64) {
        let mut b = AssemblyBuilder::new();
        let root = b.add_root("root");
        let reps: Vec<RepId> = (0..spec.len())
            .map(|i| b.add_representation(&format!("rep{i}")))
            .collect();
        b.attach_shape(root, reps[0]);

        let mut meshes = MeshCache::new();
        let mut expected = vec![0u64; spec.len()];
        for (i, (has_mesh, children)) in spec.iter().enumerate().rev() {
            if *has_mesh {
                let item = b.add_item(reps[i], "solid");
                meshes.insert(item, unit_box());
                expected[i] += 12;
            }
            let later = spec.len() - i - 1;
            if later == 0 {
                continue;
            }
            for (step, &(offset, mapped)) in children.iter().enumerate() {
                let child = i + 1 + offset % later;
                let placement = Placement::from_translation(DVec3::new(step as f64, i as f64, 0.0));
                if mapped {
                    b.link_mapped_item(reps[i], reps[child], placement);
                } else {
                    b.link_relationship(reps[i], reps[child], placement);
                }
                expected[i] += expected[child];
            }
        }
        (b.build(), meshes, expected[0])
    }

    proptest! {
        #[test]
        fn prop_header_count_matches_records(spec in graph_strategy()) {
            let (model, meshes, expected) = build_graph(&spec);
            let mut out = Vec::new();
            let summary = write_binary_stl(&model, &meshes, &model.roots, "graph", &mut out).unwrap();

            prop_assert_eq!(u64::from(summary.triangles), expected);
            prop_assert_eq!(out.len() as u64, stl_len(summary.triangles));
            prop_assert_eq!(summary.bytes, out.len() as u64);

            let parsed = StlSummary::parse(&out).unwrap();
            prop_assert_eq!(u64::from(parsed.count), expected);
            prop_assert_eq!(parsed.triangles.len() as u64, expected);
        }
    }
}
