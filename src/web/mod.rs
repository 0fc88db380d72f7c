//! Committing to a live DOM through [`web_sys`].
//!
//! Enabled by the `web` feature.

mod diff;
mod load;

pub use diff::DomSurface;
pub use load::{load_attributes, load_child_nodes, load_element};
