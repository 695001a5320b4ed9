//! pulse-window: Visible-window computation for virtualized lists
//!
//! Only the rows intersecting the viewport (plus an overscan margin) are ever
//! materialized. Recomputation is O(1) in the list length.
//!
//! ```
//! use pulse_window::{Viewport, compute_window};
//!
//! let viewport = Viewport::new(40.0, 200.0, 2).unwrap().with_scroll_offset(400.0);
//! let window = compute_window(100, &viewport);
//! assert_eq!(window.range(), 8..17);
//! ```

pub mod renderer;
pub mod viewport;
pub mod window;

pub use renderer::WindowedRenderer;
pub use viewport::{Viewport, WindowConfigError};
pub use window::{VisibleWindow, compute_window};
