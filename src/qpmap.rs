use ffmpeg_pipe::qp::QpTable;

use crate::region::RegionSpec;

/// Builds the per-macroblock QP map for one frame: every cell starts at the
/// base QP, then each region overwrites its cells in input order, so later
/// regions win on overlap. Never fails; no regions means a uniform map.
pub fn map_regions(width: u32, height: u32, regions: &[RegionSpec], base_qp: f32) -> QpTable {
    let mut table = QpTable::for_frame(width, height, base_qp);
    for region in regions {
        table.fill_rect(region.x1, region.y1, region.x2, region.y2, region.qp);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{load_regions, RegionSpec};

    fn region(x1: u32, y1: u32, x2: u32, y2: u32, qp: f32) -> RegionSpec {
        RegionSpec { x1, y1, x2, y2, qp }
    }

    #[test]
    fn test_uncovered_cells_hold_base_qp() {
        let table = map_regions(64, 64, &[region(1, 1, 2, 2, 10.0)], 30.0);
        assert_eq!(table.get(0, 0), Some(30.0));
        assert_eq!(table.get(3, 3), Some(30.0));
        assert_eq!(table.get(1, 1), Some(10.0));
        assert_eq!(table.get(2, 2), Some(10.0));
    }

    #[test]
    fn test_later_region_wins_on_overlap() {
        let regions = [region(0, 0, 3, 3, 10.0), region(1, 1, 2, 2, 20.0)];
        let table = map_regions(64, 64, &regions, 30.0);
        // inside the later region
        assert_eq!(table.get(1, 1), Some(20.0));
        assert_eq!(table.get(2, 2), Some(20.0));
        // inside the earlier one only
        assert_eq!(table.get(0, 0), Some(10.0));
        assert_eq!(table.get(3, 0), Some(10.0));
        assert_eq!(table.get(0, 3), Some(10.0));
    }

    #[test]
    fn test_empty_sequence_yields_uniform_map() {
        let table = map_regions(48, 32, &[], 26.0);
        assert!(table.is_uniform());
        assert_eq!(table.mb_width(), 3);
        assert_eq!(table.mb_height(), 2);
    }

    #[test]
    fn test_missing_file_equals_empty_sequence() {
        let path = std::env::temp_dir().join("qpblock_qpmap_missing.txt");
        let loaded = load_regions(&path);
        let from_missing = map_regions(64, 48, &loaded, 26.0);
        let from_empty = map_regions(64, 48, &[], 26.0);
        assert_eq!(from_missing, from_empty);
    }

    #[test]
    fn test_out_of_grid_region_clipped() {
        let table = map_regions(64, 64, &[region(2, 2, 50, 50, 14.0)], 30.0);
        assert_eq!(table.get(3, 3), Some(14.0));
        assert_eq!(table.get(0, 0), Some(30.0));
        assert!(!table.is_uniform());
    }
}
