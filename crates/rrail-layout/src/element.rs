//! Positioned view elements.

use rrail_core::{BranchId, ElementKind, Instruction, Rect, SymbolKind};

/// One positioned, sized element of a laid-out rung.
///
/// Exactly one exists per sequence entry of the most recent layout pass of
/// its rung; a re-layout discards and recreates all of a rung's elements
/// atomically.
///
/// `rect` is the full interactive box: the label band above the symbol
/// (operand text and alias) is folded into it so hit testing and height
/// aggregation see one extent. [`symbol_rect`](Self::symbol_rect) recovers
/// the drawn symbol's own box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderElement {
    pub kind: ElementKind,
    /// Full box including the label band above the symbol.
    pub rect: Rect,
    /// The wire line this element connects on.
    pub wire_y: i32,
    /// Extent of label text above the symbol, 0 when none.
    pub label_height: i32,
    pub rung: u32,
    pub branch_level: u32,
    /// The branch this element belongs to or introduces.
    pub branch_id: Option<BranchId>,
    pub root_branch_id: Option<BranchId>,
    /// The context this element is spaced in: enclosing context for branch
    /// start/end connectors, own leg for everything else, `None` on the main
    /// rung.
    pub context_branch_id: Option<BranchId>,
    /// Index into the rung's sequence.
    pub position: usize,
    pub selected: bool,
    /// Present on instruction elements only.
    pub instruction: Option<Instruction>,
}

impl LadderElement {
    /// The drawn symbol's box, excluding the label band.
    pub fn symbol_rect(&self) -> Rect {
        Rect::new(
            self.rect.x,
            self.rect.y + self.label_height,
            self.rect.width,
            self.rect.height - self.label_height,
        )
    }

    /// Horizontal center, used for insertion resolution.
    pub fn center_x(&self) -> i32 {
        self.rect.center_x()
    }

    /// Symbol classification, when this is an instruction element.
    pub fn symbol_kind(&self) -> Option<SymbolKind> {
        self.instruction.as_ref().map(Instruction::symbol_kind)
    }
}
