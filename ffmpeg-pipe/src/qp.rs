use ffmpeg_next::ffi::{AVRational, AVRegionOfInterest};

/// Macroblock edge length, in pixels. The override grid is fixed at 16x16
/// cells regardless of what the encoder negotiates internally.
pub const MACROBLOCK: u32 = 16;

/// qoffset denominator: the H.264 QP span (51) scaled for two decimal
/// places of QP delta precision.
const QOFFSET_DEN: i32 = 51 * 100;

/// Dense per-macroblock QP grid for one frame. Every cell always holds a
/// value: construction seeds the whole grid with the base QP and region
/// fills overwrite cells in place. Rebuilt per frame, never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct QpTable {
    mb_width: u32,
    mb_height: u32,
    base: f32,
    cells: Vec<f32>,
}

impl QpTable {
    pub fn uniform(mb_width: u32, mb_height: u32, base: f32) -> Self {
        Self {
            mb_width,
            mb_height,
            base,
            cells: vec![base; (mb_width * mb_height) as usize],
        }
    }

    /// Grid sized for a frame in pixels, one cell per started macroblock.
    pub fn for_frame(width: u32, height: u32, base: f32) -> Self {
        Self::uniform(width.div_ceil(MACROBLOCK), height.div_ceil(MACROBLOCK), base)
    }

    pub fn mb_width(&self) -> u32 {
        self.mb_width
    }

    pub fn mb_height(&self) -> u32 {
        self.mb_height
    }

    pub fn base_qp(&self) -> f32 {
        self.base
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.mb_width || y >= self.mb_height {
            return None;
        }
        Some(self.cells[(y * self.mb_width + x) as usize])
    }

    /// Overwrites every cell inside the inclusive rectangle. Parts outside
    /// the grid are clipped; a zero-area rectangle still writes one cell.
    pub fn fill_rect(&mut self, x1: u32, y1: u32, x2: u32, y2: u32, qp: f32) {
        if self.mb_width == 0 || self.mb_height == 0 {
            return;
        }
        if x1 >= self.mb_width || y1 >= self.mb_height {
            return;
        }
        let x2 = x2.min(self.mb_width - 1);
        let y2 = y2.min(self.mb_height - 1);
        for y in y1..=y2 {
            for x in x1..=x2 {
                self.cells[(y * self.mb_width + x) as usize] = qp;
            }
        }
    }

    /// True when no cell deviates from the base QP; the encoder then skips
    /// side data entirely and falls back to its uniform default.
    pub fn is_uniform(&self) -> bool {
        self.cells.iter().all(|&c| c == self.base)
    }

    /// Converts override cells into FFmpeg regions of interest, coalescing
    /// horizontal runs of equal QP. qoffset carries the QP delta mapped
    /// onto the [-1, 1] range encoders expect: positive coarsens, negative
    /// refines.
    pub fn regions_of_interest(&self) -> Vec<AVRegionOfInterest> {
        let mut out = Vec::new();
        for y in 0..self.mb_height {
            let row = (y * self.mb_width) as usize;
            let mut x = 0;
            while x < self.mb_width {
                let qp = self.cells[row + x as usize];
                if qp == self.base {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < self.mb_width && self.cells[row + x as usize] == qp {
                    x += 1;
                }
                out.push(AVRegionOfInterest {
                    self_size: std::mem::size_of::<AVRegionOfInterest>() as u32,
                    top: (y * MACROBLOCK) as i32,
                    bottom: ((y + 1) * MACROBLOCK) as i32,
                    left: (start * MACROBLOCK) as i32,
                    right: (x * MACROBLOCK) as i32,
                    qoffset: qp_delta_to_offset(qp - self.base),
                });
            }
        }
        out
    }
}

fn qp_delta_to_offset(delta: f32) -> AVRational {
    let num = (delta * 100.0).round() as i32;
    AVRational {
        num: num.clamp(-QOFFSET_DEN, QOFFSET_DEN),
        den: QOFFSET_DEN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_frame_rounds_up() {
        let t = QpTable::for_frame(1920, 1080, 26.0);
        assert_eq!(t.mb_width(), 120);
        assert_eq!(t.mb_height(), 68);

        let t = QpTable::for_frame(17, 16, 26.0);
        assert_eq!(t.mb_width(), 2);
        assert_eq!(t.mb_height(), 1);
    }

    #[test]
    fn test_uniform_seeds_every_cell() {
        let t = QpTable::uniform(4, 3, 30.0);
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(t.get(x, y), Some(30.0));
            }
        }
        assert!(t.is_uniform());
        assert!(t.regions_of_interest().is_empty());
    }

    #[test]
    fn test_fill_rect_clips_to_grid() {
        let mut t = QpTable::uniform(4, 4, 30.0);
        t.fill_rect(2, 2, 100, 100, 10.0);
        assert_eq!(t.get(2, 2), Some(10.0));
        assert_eq!(t.get(3, 3), Some(10.0));
        assert_eq!(t.get(1, 1), Some(30.0));

        // fully outside: untouched
        let mut t = QpTable::uniform(4, 4, 30.0);
        t.fill_rect(4, 0, 9, 0, 10.0);
        assert!(t.is_uniform());
    }

    #[test]
    fn test_zero_area_rect_writes_one_cell() {
        let mut t = QpTable::uniform(4, 4, 30.0);
        t.fill_rect(1, 2, 1, 2, 12.0);
        assert_eq!(t.get(1, 2), Some(12.0));
        assert_eq!(
            t.cells.iter().filter(|&&c| c == 12.0).count(),
            1
        );
    }

    #[test]
    fn test_reversed_rect_writes_nothing() {
        let mut t = QpTable::uniform(4, 4, 30.0);
        t.fill_rect(3, 3, 1, 1, 12.0);
        assert!(t.is_uniform());
    }

    #[test]
    fn test_regions_of_interest_coalesce_runs() {
        let mut t = QpTable::uniform(4, 2, 30.0);
        t.fill_rect(1, 0, 2, 0, 20.0);
        let rois = t.regions_of_interest();
        assert_eq!(rois.len(), 1);
        let r = &rois[0];
        assert_eq!((r.left, r.right), (16, 48));
        assert_eq!((r.top, r.bottom), (0, 16));
        // 20 - 30 = -10 => better quality, negative offset
        assert_eq!(r.qoffset.num, -1000);
        assert_eq!(r.qoffset.den, 5100);
    }

    #[test]
    fn test_regions_of_interest_split_on_qp_change() {
        let mut t = QpTable::uniform(4, 1, 30.0);
        t.fill_rect(0, 0, 1, 0, 20.0);
        t.fill_rect(2, 0, 3, 0, 40.0);
        let rois = t.regions_of_interest();
        assert_eq!(rois.len(), 2);
        assert!(rois[0].qoffset.num < 0);
        assert!(rois[1].qoffset.num > 0);
    }

    #[test]
    fn test_qoffset_clamped_to_unit_range() {
        let off = qp_delta_to_offset(200.0);
        assert_eq!(off.num, off.den);
        let off = qp_delta_to_offset(-200.0);
        assert_eq!(off.num, -off.den);
    }
}
