//! Feed services.
//!
//! - `feed` - the mounted ingestion + render pipeline
//! - `input` - scroll and control commands from stdin

pub mod feed;
pub mod input;
