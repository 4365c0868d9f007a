use std::path::{Path, PathBuf};

use ffmpeg_pipe::qp::MACROBLOCK;

/// One region of interest in macroblock-grid coordinates, inclusive on both
/// ends. Built fresh from a side file for each frame and discarded once the
/// frame's QP map exists.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSpec {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub qp: f32,
}

/// Side-file location for a decoded frame index: frame_NNNN_multi.txt,
/// zero-padded to width 4.
pub fn region_file_path(dir: &Path, frame_index: u64) -> PathBuf {
    dir.join(format!("frame_{:04}_multi.txt", frame_index))
}

/// Loads the per-frame region list, in file line order. A missing or
/// unreadable file means "no overrides" and returns an empty list; malformed
/// lines are skipped without disturbing their neighbours. The file is
/// re-read from scratch on every call.
pub fn load_regions(path: &Path) -> Vec<RegionSpec> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::debug!("no region file {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    text.lines().filter_map(parse_line).collect()
}

/// Parses `x1,y1,x2,y2:qp` with pixel coordinates; anything else is None.
fn parse_line(line: &str) -> Option<RegionSpec> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (coords, qp) = line.split_once(':')?;
    let qp: f32 = qp.trim().parse().ok()?;

    let mut fields = coords.split(',');
    let mut px = [0i64; 4];
    for value in px.iter_mut() {
        *value = fields.next()?.trim().parse().ok()?;
    }
    if fields.next().is_some() {
        return None;
    }

    let [x1, y1, x2, y2] = px.map(to_grid);
    Some(RegionSpec { x1, y1, x2, y2, qp })
}

/// Pixel coordinate to macroblock cell: truncating division by the
/// macroblock edge. Negative coordinates clamp to the grid origin.
fn to_grid(px: i64) -> u32 {
    (px.max(0) / MACROBLOCK as i64) as u32
}
