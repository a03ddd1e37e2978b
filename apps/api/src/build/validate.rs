//! Mesh validation for compiled STL files.
//!
//! Reads binary or ASCII STL, welds coincident vertices and reports bounds,
//! face/vertex counts and whether the surface is closed. Never fails: problems
//! are reported in `MeshReport::error`.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec3;
use serde::Serialize;

/// Files smaller than this are treated as failed exports.
pub const MIN_STL_BYTES: u64 = 1000;

const BINARY_HEADER_BYTES: usize = 80;
const BINARY_TRIANGLE_BYTES: usize = 50;

type Triangle = [Vec3; 3];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshStats {
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    pub size_xyz_mm: [f32; 3],
    /// Every edge is shared by exactly two triangles.
    pub watertight: bool,
    pub faces: usize,
    /// Unique vertices after welding.
    pub verts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub stats: Option<MeshStats>,
}

impl MeshReport {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(reason.into()),
            stats: None,
        }
    }
}

pub fn validate_stl(path: &Path) -> MeshReport {
    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => return MeshReport::failed("STL missing"),
    };
    if metadata.len() < MIN_STL_BYTES {
        return MeshReport::failed("STL too small / likely empty");
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => return MeshReport::failed(format!("STL unreadable: {e}")),
    };
    let triangles = match parse_stl(&bytes) {
        Ok(t) => t,
        Err(reason) => return MeshReport::failed(format!("STL unreadable: {reason}")),
    };
    if triangles.is_empty() {
        return MeshReport::failed("Mesh is empty");
    }

    MeshReport {
        ok: true,
        error: None,
        stats: Some(mesh_stats(&triangles)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

fn parse_stl(bytes: &[u8]) -> Result<Vec<Triangle>, String> {
    // Binary files whose size matches their triangle count are binary even when
    // the header happens to start with "solid".
    if let Some(count) = binary_count(bytes) {
        if bytes.len() == binary_len(count) {
            return parse_binary(bytes, count);
        }
    }
    if looks_ascii(bytes) {
        return parse_ascii(bytes);
    }
    match binary_count(bytes) {
        Some(count) => parse_binary(bytes, count),
        None => Err("file shorter than a binary STL header".to_string()),
    }
}

fn binary_count(bytes: &[u8]) -> Option<usize> {
    let raw = bytes.get(BINARY_HEADER_BYTES..BINARY_HEADER_BYTES + 4)?;
    let count = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    Some(count as usize)
}

fn binary_len(count: usize) -> usize {
    BINARY_HEADER_BYTES + 4 + count * BINARY_TRIANGLE_BYTES
}

fn looks_ascii(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"solid")
}

fn parse_binary(bytes: &[u8], count: usize) -> Result<Vec<Triangle>, String> {
    let needed = binary_len(count);
    if bytes.len() < needed {
        return Err(format!(
            "binary STL declares {count} triangles but holds only {} bytes",
            bytes.len()
        ));
    }

    let read_vec = |at: usize| -> Vec3 {
        let f = |o: usize| {
            f32::from_le_bytes([bytes[at + o], bytes[at + o + 1], bytes[at + o + 2], bytes[at + o + 3]])
        };
        Vec3::new(f(0), f(4), f(8))
    };

    let body = BINARY_HEADER_BYTES + 4;
    Ok((0..count)
        .map(|i| {
            // 12 bytes of normal precede the three vertices.
            let at = body + i * BINARY_TRIANGLE_BYTES + 12;
            [read_vec(at), read_vec(at + 12), read_vec(at + 24)]
        })
        .collect())
}

fn parse_ascii(bytes: &[u8]) -> Result<Vec<Triangle>, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("invalid ASCII STL: {e}"))?;
    let mut tokens = text.split_whitespace();
    let mut vertices = Vec::new();

    while let Some(token) = tokens.next() {
        if token != "vertex" {
            continue;
        }
        let mut coord = [0.0f32; 3];
        for c in coord.iter_mut() {
            let raw = tokens.next().ok_or("truncated vertex")?;
            *c = raw
                .parse::<f32>()
                .map_err(|_| format!("bad vertex coordinate '{raw}'"))?;
        }
        vertices.push(Vec3::from_array(coord));
    }

    if vertices.len() % 3 != 0 {
        return Err(format!("{} vertices do not form whole triangles", vertices.len()));
    }
    Ok(vertices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}

// ────────────────────────────────────────────────────────────────────────────
// Topology
// ────────────────────────────────────────────────────────────────────────────

fn weld_key(v: Vec3) -> [u32; 3] {
    // +0.0 folds -0.0 into the same key.
    [(v.x + 0.0).to_bits(), (v.y + 0.0).to_bits(), (v.z + 0.0).to_bits()]
}

fn mesh_stats(triangles: &[Triangle]) -> MeshStats {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    let mut welded: HashMap<[u32; 3], usize> = HashMap::new();
    let mut edges: HashMap<(usize, usize), u32> = HashMap::new();

    for tri in triangles {
        let mut ids = [0usize; 3];
        for (slot, v) in ids.iter_mut().zip(tri) {
            min = min.min(*v);
            max = max.max(*v);
            let next = welded.len();
            *slot = *welded.entry(weld_key(*v)).or_insert(next);
        }
        for (a, b) in [(ids[0], ids[1]), (ids[1], ids[2]), (ids[2], ids[0])] {
            *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }

    MeshStats {
        bounds_min: min.to_array(),
        bounds_max: max.to_array(),
        size_xyz_mm: (max - min).to_array(),
        watertight: edges.values().all(|&n| n == 2),
        faces: triangles.len(),
        verts: welded.len(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fmt::Write as _;

    /// A 2 mm cube with every face split into a 2×2 grid: 48 triangles, 26 vertices.
    pub(crate) fn cube_triangles() -> Vec<[[f32; 3]; 3]> {
        let mut tris = Vec::new();
        for axis in 0..3 {
            let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
            for side in [0.0f32, 2.0] {
                let corner = |a: f32, b: f32| {
                    let mut p = [0.0f32; 3];
                    p[axis] = side;
                    p[u] = a;
                    p[v] = b;
                    p
                };
                for i in 0..2 {
                    for j in 0..2 {
                        let (a0, b0) = (i as f32, j as f32);
                        let (a1, b1) = (a0 + 1.0, b0 + 1.0);
                        tris.push([corner(a0, b0), corner(a1, b0), corner(a1, b1)]);
                        tris.push([corner(a0, b0), corner(a1, b1), corner(a0, b1)]);
                    }
                }
            }
        }
        tris
    }

    pub(crate) fn binary_stl(tris: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut out = vec![0u8; BINARY_HEADER_BYTES];
        out.extend_from_slice(&(tris.len() as u32).to_le_bytes());
        for tri in tris {
            out.extend_from_slice(&[0u8; 12]);
            for v in tri {
                for c in v {
                    out.extend_from_slice(&c.to_le_bytes());
                }
            }
            out.extend_from_slice(&[0u8; 2]);
        }
        out
    }

    fn ascii_stl(tris: &[[[f32; 3]; 3]]) -> String {
        let mut out = String::from("solid cube\n");
        for tri in tris {
            out.push_str("  facet normal 0 0 0\n    outer loop\n");
            for v in tri {
                writeln!(out, "      vertex {} {} {}", v[0], v[1], v[2]).unwrap();
            }
            out.push_str("    endloop\n  endfacet\n");
        }
        out.push_str("endsolid cube\n");
        out
    }

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_binary_cube_is_watertight() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(&tmp, "cube.stl", &binary_stl(&cube_triangles()));
        let report = validate_stl(&path);
        assert!(report.ok, "{report:?}");
        let stats = report.stats.unwrap();
        assert_eq!(stats.faces, 48);
        assert_eq!(stats.verts, 26);
        assert!(stats.watertight);
        assert_eq!(stats.bounds_min, [0.0, 0.0, 0.0]);
        assert_eq!(stats.bounds_max, [2.0, 2.0, 2.0]);
        assert_eq!(stats.size_xyz_mm, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_ascii_cube_matches_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let ascii = write(&tmp, "a.stl", ascii_stl(&cube_triangles()).as_bytes());
        let binary = write(&tmp, "b.stl", &binary_stl(&cube_triangles()));
        assert_eq!(validate_stl(&ascii), validate_stl(&binary));
    }

    #[test]
    fn test_open_mesh_is_not_watertight() {
        let tmp = tempfile::tempdir().unwrap();
        let mut tris = cube_triangles();
        tris.pop();
        let path = write(&tmp, "open.stl", &binary_stl(&tris));
        let stats = validate_stl(&path).stats.unwrap();
        assert_eq!(stats.faces, 47);
        assert!(!stats.watertight);
    }

    #[test]
    fn test_missing_and_small_files() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = validate_stl(&tmp.path().join("nope.stl"));
        assert_eq!(missing.error.as_deref(), Some("STL missing"));

        let small = write(&tmp, "small.stl", &[0u8; 500]);
        let report = validate_stl(&small);
        assert!(!report.ok);
        assert_eq!(report.error.as_deref(), Some("STL too small / likely empty"));
    }

    #[test]
    fn test_zero_triangles_is_empty_mesh() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(&tmp, "empty.stl", &[0u8; 1200]);
        assert_eq!(validate_stl(&path).error.as_deref(), Some("Mesh is empty"));
    }

    #[test]
    fn test_truncated_binary_is_unreadable() {
        let tmp = tempfile::tempdir().unwrap();
        let mut bytes = vec![0u8; 1200];
        bytes[80..84].copy_from_slice(&1000u32.to_le_bytes());
        let path = write(&tmp, "cut.stl", &bytes);
        let error = validate_stl(&path).error.unwrap();
        assert!(error.starts_with("STL unreadable:"), "{error}");
    }

    #[test]
    fn test_report_serializes_flat() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(&tmp, "cube.stl", &binary_stl(&cube_triangles()));
        let json = serde_json::to_value(validate_stl(&path)).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["faces"], 48);
        assert!(json.get("error").is_none());

        let failed = serde_json::to_value(MeshReport::failed("STL missing")).unwrap();
        assert_eq!(failed, serde_json::json!({"ok": false, "error": "STL missing"}));
    }
}
