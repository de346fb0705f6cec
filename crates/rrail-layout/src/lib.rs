#![forbid(unsafe_code)]

//! Ladder rung layout.
//!
//! Converts a rung's flat element sequence (instructions plus branch
//! markers) into positioned, sized boxes. The pass is atomic: geometry is
//! built off to the side and swapped in only when the whole rung succeeds,
//! so readers never observe a half-updated rung.
//!
//! Component map:
//!
//! - [`BranchTracker`] — validates branch balance while walking a sequence.
//! - [`BranchGeometryStore`] — id-keyed arena of per-branch geometry.
//! - [`LayoutEngine`] — owns committed [`RungGeometry`] and the rung top-Y
//!   table; the only writer of either.
//! - [`LayoutMetrics`] — the fixed spacing/sizing constants.

pub mod element;
pub mod engine;
pub mod metrics;
pub mod store;
pub mod tracker;

pub use element::LadderElement;
pub use engine::{HeightDelta, LayoutEngine, RungGeometry};
pub use metrics::LayoutMetrics;
pub use store::{BranchGeometryStore, LadderBranch};
pub use tracker::{BranchTracker, OpenBranch};
