//! Visible window computation.

use crate::viewport::Viewport;
use std::ops::Range;

/// Rows to materialize plus the offsets that position them inside a
/// full-height scroll container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VisibleWindow {
    pub start_index: usize,
    pub end_index: usize,
    /// `len * item_height`
    pub total_height: f64,
    /// `start_index * item_height`
    pub offset_y: f64,
}

impl VisibleWindow {
    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }

    /// The windowed slice of `items`, clamped to what exists.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let end = self.end_index.min(items.len());
        let start = self.start_index.min(end);
        &items[start..end]
    }
}

/// Compute which rows of a `len`-row list to render for `viewport`.
///
/// Uses the scroll offset as given. An offset past the last page yields a
/// short (or empty) window at the end, never indices beyond `len`, so the
/// result is always `0 <= start <= end <= len`. Callers that want the last
/// page kept on screen clamp the offset first (`Viewport::scroll_by`).
/// O(1) in `len`.
pub fn compute_window(len: usize, viewport: &Viewport) -> VisibleWindow {
    let item_height = viewport.item_height();
    let total_height = len as f64 * item_height;
    if len == 0 {
        return VisibleWindow::default();
    }

    let scroll = viewport.scroll_offset();
    let overscan = viewport.overscan();

    let first_visible = (scroll / item_height).floor() as usize;
    let last_visible = ((scroll + viewport.viewport_height()) / item_height).ceil() as usize;

    let end_index = last_visible.saturating_add(overscan).min(len);
    let start_index = first_visible.saturating_sub(overscan).min(end_index);

    VisibleWindow {
        start_index,
        end_index,
        total_height,
        offset_y: start_index as f64 * item_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(item: f64, height: f64, overscan: usize, scroll: f64) -> Viewport {
        Viewport::new(item, height, overscan)
            .unwrap()
            .with_scroll_offset(scroll)
    }

    #[test]
    fn test_reference_scenario() {
        let w = compute_window(100, &viewport(40.0, 200.0, 2, 400.0));
        assert_eq!(w.start_index, 8);
        assert_eq!(w.end_index, 17);
        assert_eq!(w.total_height, 4000.0);
        assert_eq!(w.offset_y, 320.0);
    }

    #[test]
    fn test_empty_list() {
        let w = compute_window(0, &viewport(40.0, 200.0, 2, 400.0));
        assert!(w.is_empty());
        assert_eq!(w.total_height, 0.0);
        assert_eq!(w.offset_y, 0.0);
    }

    #[test]
    fn test_top_of_list_clamps_start() {
        let w = compute_window(100, &viewport(40.0, 200.0, 3, 0.0));
        assert_eq!(w.range(), 0..8);
    }

    #[test]
    fn test_short_list_renders_everything() {
        let w = compute_window(3, &viewport(40.0, 200.0, 2, 0.0));
        assert_eq!(w.range(), 0..3);
        assert_eq!(w.total_height, 120.0);
    }

    #[test]
    fn test_offset_inside_last_page_keeps_overscan_bound() {
        // max_scroll_offset is 3800; 3900 is past it but rows 97..100 are
        // still on screen.
        let w = compute_window(100, &viewport(40.0, 200.0, 2, 3900.0));
        assert_eq!(w.range(), 95..100);
        assert_eq!(w.offset_y, 3800.0);
        assert_eq!(w.total_height, 4000.0);
    }

    #[test]
    fn test_scroll_far_past_end_is_empty_not_out_of_bounds() {
        let w = compute_window(100, &viewport(40.0, 200.0, 2, 1_000_000.0));
        assert_eq!(w.end_index, 100);
        assert_eq!(w.start_index, 100);
        assert!(w.is_empty());
        assert_eq!(w.len(), 0);
    }

    #[test]
    fn test_clamped_viewport_shows_last_page() {
        let mut vp = viewport(40.0, 200.0, 2, 1_000_000.0);
        vp.scroll_by(0.0, 100);
        let w = compute_window(100, &vp);
        assert_eq!(w.range(), 93..100);
    }

    #[test]
    fn test_len_of_inverted_window_is_zero() {
        let w = VisibleWindow {
            start_index: 9,
            end_index: 4,
            total_height: 0.0,
            offset_y: 0.0,
        };
        assert_eq!(w.len(), 0);
        assert!(w.is_empty());
        assert!(w.slice(&[0u8; 10]).is_empty());
    }

    #[test]
    fn test_partial_rows_are_covered() {
        // Rows 2 (80..120) through 7 (280..320) intersect 100..300.
        let w = compute_window(50, &viewport(40.0, 200.0, 0, 100.0));
        assert_eq!(w.range(), 2..8);
    }

    #[test]
    fn test_invariants_over_grid() {
        for len in [0usize, 1, 2, 7, 50, 1000] {
            for scroll in [0.0, 13.5, 40.0, 999.0, 1e7] {
                for overscan in [0usize, 1, 5] {
                    let vp = viewport(17.0, 120.0, overscan, scroll);
                    let w = compute_window(len, &vp);
                    assert!(w.start_index <= w.end_index);
                    assert!(w.end_index <= len);

                    // Every row intersecting the viewport is included.
                    let top = scroll;
                    let bottom = top + vp.viewport_height();
                    for row in 0..len {
                        let row_top = row as f64 * 17.0;
                        let row_bottom = row_top + 17.0;
                        if row_bottom > top && row_top < bottom {
                            assert!(w.range().contains(&row), "row {row} missing for len={len} scroll={scroll}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_slice_clamps() {
        let items: Vec<u32> = (0..10).collect();
        let w = VisibleWindow {
            start_index: 8,
            end_index: 15,
            total_height: 0.0,
            offset_y: 0.0,
        };
        assert_eq!(w.slice(&items), &[8, 9]);
    }

    #[test]
    fn test_cost_does_not_depend_on_length() {
        let vp = viewport(1.0, 24.0, 2, 500.0);
        let small = compute_window(1_000, &vp);
        let large = compute_window(10_000_000, &vp);
        assert_eq!(small.len(), large.len());
    }
}
