#![doc(html_root_url = "https://docs.rs/cambium/0.0.1")]
#![warn(clippy::pedantic)]

//! A component tree renderer with Suspense and error boundaries.
//!
//! Components render [`Descriptor`]s. Instead of a descriptor, a component may throw a [`PendingSignal`]
//! to wait on a value that isn't available yet, or a [`ComponentError`].
//! Pending signals are caught by the nearest enclosing [`suspense`] boundary, which shows its fallback until all of
//! them have settled. Errors are caught by the nearest component that [catches errors](`Component::catches_errors`).
//!
//! See the README for a complete example.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod component;
mod coordinator;
mod countdown;
mod descriptor;
mod error;
mod lazy;
mod mounted;
mod options;
mod output;
mod registry;
mod render;
mod root;
mod signal;

#[cfg(feature = "web")]
pub mod web;

pub use component::{Component, Render, RenderContext, State, Thrown};
pub use descriptor::{component, element, fragment, suspense, text, Descriptor, Key, Props, SuspenseOptions, Tag};
pub use error::{ComponentError, RenderError, MISSING_SUSPENSE};
pub use lazy::{lazy, Lazy, Module};
pub use mounted::InstanceId;
pub use options::Options;
pub use output::{Node, Scratch, Surface};
pub use registry::BoundaryKind;
pub use root::Root;
pub use signal::{deferred, pending, Deferred, PendingSignal, Resolver, Settlement, Settler, SignalId};
