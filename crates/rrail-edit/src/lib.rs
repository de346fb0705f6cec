#![forbid(unsafe_code)]

//! Pointer resolution and structural editing.
//!
//! [`PositionResolver`] maps pointer coordinates to insertion targets and
//! back; [`StructuralEditor`] applies sequence mutations through the host's
//! [`rrail_core::SequenceModel`] implementations and keeps committed
//! geometry consistent, cascading repositioning to the rungs below an edit.
//!
//! Both components only read the layout engine's committed state; the
//! engine itself is the sole writer of geometry.

pub mod editor;
pub mod resolver;

pub use editor::{EditOutcome, EditReport, StructuralEditor};
pub use resolver::{HitTarget, PositionResolver};
