//! Viewport state: scroll position and uniform row geometry.

/// Invalid geometry, rejected at construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WindowConfigError {
    #[error("item_height must be a positive finite number (got {0})")]
    ItemHeight(f64),

    #[error("viewport_height must be a non-negative finite number (got {0})")]
    ViewportHeight(f64),

    #[error("overscan must not be negative (got {0})")]
    Overscan(i64),
}

/// Scroll position and geometry. Heights and offsets are in pixels
/// (or rows, for a terminal host with `item_height == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    scroll_offset: f64,
    viewport_height: f64,
    item_height: f64,
    overscan: usize,
}

impl Viewport {
    pub fn new(
        item_height: f64,
        viewport_height: f64,
        overscan: usize,
    ) -> Result<Self, WindowConfigError> {
        if !item_height.is_finite() || item_height <= 0.0 {
            return Err(WindowConfigError::ItemHeight(item_height));
        }
        check_viewport_height(viewport_height)?;
        Ok(Self {
            scroll_offset: 0.0,
            viewport_height,
            item_height,
            overscan,
        })
    }

    /// Build from untrusted signed input, e.g. a config file.
    pub fn from_signed(
        item_height: f64,
        viewport_height: f64,
        overscan: i64,
    ) -> Result<Self, WindowConfigError> {
        let overscan = usize::try_from(overscan).map_err(|_| WindowConfigError::Overscan(overscan))?;
        Self::new(item_height, viewport_height, overscan)
    }

    #[must_use]
    pub fn with_scroll_offset(mut self, offset: f64) -> Self {
        self.set_scroll_offset(offset);
        self
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Negative and non-finite offsets clamp to the top.
    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
    }

    pub fn set_viewport_height(&mut self, height: f64) -> Result<(), WindowConfigError> {
        check_viewport_height(height)?;
        self.viewport_height = height;
        Ok(())
    }

    /// Largest useful offset for a list of `len` rows.
    pub fn max_scroll_offset(&self, len: usize) -> f64 {
        (len as f64 * self.item_height - self.viewport_height).max(0.0)
    }

    /// Full rows that fit on one page (at least one).
    pub fn rows_per_page(&self) -> usize {
        ((self.viewport_height / self.item_height).floor() as usize).max(1)
    }

    pub fn is_at_top(&self) -> bool {
        self.scroll_offset <= 0.0
    }

    /// Scroll by pixels, clamped to `[0, max_scroll_offset]`.
    pub fn scroll_by(&mut self, delta: f64, len: usize) {
        let target = (self.scroll_offset + delta).min(self.max_scroll_offset(len));
        self.set_scroll_offset(target);
    }

    pub fn scroll_rows(&mut self, rows: i64, len: usize) {
        self.scroll_by(rows as f64 * self.item_height, len);
    }

    /// Bring row `idx` to the top of the viewport (as far as the list allows).
    pub fn scroll_to_index(&mut self, idx: usize, len: usize) {
        let target = (idx as f64 * self.item_height).min(self.max_scroll_offset(len));
        self.set_scroll_offset(target);
    }

    pub fn page_down(&mut self, len: usize) {
        self.scroll_rows(self.rows_per_page() as i64, len);
    }

    pub fn page_up(&mut self, len: usize) {
        self.scroll_rows(-(self.rows_per_page() as i64), len);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0.0;
    }

    pub fn scroll_to_bottom(&mut self, len: usize) {
        self.scroll_offset = self.max_scroll_offset(len);
    }

    /// Keep the rows on screen stable after `count` rows were inserted above
    /// them. A viewport at the top keeps following the newest rows.
    pub fn anchor_prepended(&mut self, count: usize) {
        if count > 0 && !self.is_at_top() {
            self.scroll_offset += count as f64 * self.item_height;
        }
    }
}

fn check_viewport_height(height: f64) -> Result<(), WindowConfigError> {
    if !height.is_finite() || height < 0.0 {
        return Err(WindowConfigError::ViewportHeight(height));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_geometry() {
        assert_eq!(
            Viewport::new(0.0, 100.0, 1).unwrap_err(),
            WindowConfigError::ItemHeight(0.0)
        );
        assert!(Viewport::new(-4.0, 100.0, 1).is_err());
        assert!(Viewport::new(f64::NAN, 100.0, 1).is_err());
        assert!(Viewport::new(10.0, -1.0, 1).is_err());
        assert_eq!(
            Viewport::from_signed(10.0, 100.0, -2).unwrap_err(),
            WindowConfigError::Overscan(-2)
        );
    }

    #[test]
    fn test_negative_offset_clamps_to_top() {
        let vp = Viewport::new(10.0, 100.0, 0).unwrap().with_scroll_offset(-50.0);
        assert_eq!(vp.scroll_offset(), 0.0);
        let vp = vp.with_scroll_offset(f64::INFINITY);
        assert_eq!(vp.scroll_offset(), 0.0);
    }

    #[test]
    fn test_scroll_bounds() {
        let mut vp = Viewport::new(10.0, 100.0, 0).unwrap();
        vp.scroll_rows(5, 50);
        assert_eq!(vp.scroll_offset(), 50.0);
        vp.scroll_rows(-10, 50);
        assert_eq!(vp.scroll_offset(), 0.0);
        vp.scroll_rows(1000, 50);
        assert_eq!(vp.scroll_offset(), 400.0);

        // A list shorter than the viewport cannot scroll.
        vp.scroll_to_top();
        vp.scroll_rows(3, 5);
        assert_eq!(vp.scroll_offset(), 0.0);
    }

    #[test]
    fn test_page_navigation() {
        let mut vp = Viewport::new(20.0, 100.0, 0).unwrap();
        assert_eq!(vp.rows_per_page(), 5);
        vp.page_down(100);
        assert_eq!(vp.scroll_offset(), 100.0);
        vp.page_down(100);
        vp.page_up(100);
        assert_eq!(vp.scroll_offset(), 100.0);
        vp.scroll_to_bottom(100);
        assert_eq!(vp.scroll_offset(), 1900.0);
        vp.scroll_to_index(3, 100);
        assert_eq!(vp.scroll_offset(), 60.0);
    }

    #[test]
    fn test_anchor_prepended() {
        let mut vp = Viewport::new(10.0, 100.0, 0).unwrap();
        vp.anchor_prepended(3);
        assert!(vp.is_at_top());

        vp.set_scroll_offset(25.0);
        vp.anchor_prepended(3);
        assert_eq!(vp.scroll_offset(), 55.0);
    }

    #[test]
    fn test_viewport_height_update_is_validated() {
        let mut vp = Viewport::new(10.0, 100.0, 0).unwrap();
        assert!(vp.set_viewport_height(-3.0).is_err());
        assert_eq!(vp.viewport_height(), 100.0);
        vp.set_viewport_height(0.0).unwrap();
        assert_eq!(vp.rows_per_page(), 1);
    }
}
