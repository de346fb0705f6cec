#![forbid(unsafe_code)]

//! RungRail public facade crate.
//!
//! Re-exports the common types from the internal crates and offers a
//! lightweight prelude for day-to-day usage:
//!
//! ```
//! use rrail::prelude::*;
//!
//! let mut rungs = vec![TokenRung::parse("XIC(Start)[XIC(Seal),XIC(Jog)]OTE(Motor)")];
//! let mut editor = StructuralEditor::new(LayoutMetrics::default());
//! editor.open(&rungs).unwrap();
//!
//! let geo = editor.engine().rung(0).unwrap();
//! assert_eq!(geo.elements.len(), rungs[0].len());
//!
//! let mut sink = RecordingSink::new();
//! RungPainter::new(LayoutMetrics::default())
//!     .paint_document(editor.engine().iter(), &mut sink)
//!     .unwrap();
//! assert!(!sink.is_empty());
//! ```

// --- Core re-exports -------------------------------------------------------

pub use rrail_core::{
    BranchId, CoordinateError, ElementKind, Instruction, LadderError, NotFoundError, Point, Rect,
    SeqElement, SequenceModel, StructuralError, SymbolKind, Token, TokenRung,
};

// --- Layout re-exports -----------------------------------------------------

pub use rrail_layout::{
    BranchGeometryStore, BranchTracker, HeightDelta, LadderBranch, LadderElement, LayoutEngine,
    LayoutMetrics, OpenBranch, RungGeometry,
};

// --- Edit re-exports -------------------------------------------------------

pub use rrail_edit::{EditOutcome, EditReport, HitTarget, PositionResolver, StructuralEditor};

// --- Render re-exports -----------------------------------------------------

pub use rrail_render::{DrawPrimitive, DrawRole, RecordingSink, RenderSink, RungPainter, Shape};

/// Commonly used types, importable as a block.
pub mod prelude {
    pub use crate::{
        BranchId, DrawPrimitive, DrawRole, EditOutcome, ElementKind, HitTarget, Instruction,
        LadderError, LayoutEngine, LayoutMetrics, PositionResolver, RecordingSink, RenderSink,
        RungGeometry, RungPainter, SequenceModel, StructuralEditor, SymbolKind, TokenRung,
    };
}
