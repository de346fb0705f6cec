//! Branch balance tracking.

use rrail_core::{BranchId, ElementKind, SeqElement, StructuralError};

/// One open branch context on the tracker's stack.
///
/// `leg` is the leg currently receiving elements; it starts as the group
/// itself and is replaced each time a branch-next marker opens a sibling
/// leg, so parallel legs chain rather than flatten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenBranch {
    /// The branch group this context belongs to.
    pub group: BranchId,
    /// The leg currently on top.
    pub leg: BranchId,
    /// Sequence position of the group's start marker.
    pub start_position: usize,
}

/// Walks one rung's element sequence and validates branch balance.
///
/// The stack is explicit and typed so the balance invariant is mechanically
/// checkable: after a well-formed walk [`finish`](Self::finish) observes an
/// empty stack, and every malformed sequence fails with a specific
/// [`StructuralError`] before any geometry is committed.
#[derive(Debug, Default)]
pub struct BranchTracker {
    stack: Vec<OpenBranch>,
}

impl BranchTracker {
    /// Create a tracker with an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The context currently on top, if any.
    pub fn top(&self) -> Option<&OpenBranch> {
        self.stack.last()
    }

    /// Process a branch-start marker: push a new context.
    pub fn on_start(&mut self, element: &SeqElement) -> Result<OpenBranch, StructuralError> {
        let group = marker_id(element)?;
        let context = OpenBranch {
            group,
            leg: group,
            start_position: element.position,
        };
        self.stack.push(context);
        Ok(context)
    }

    /// Process a branch-next marker: the marker must chain from the leg on
    /// top, which it then replaces.
    pub fn on_next(&mut self, element: &SeqElement) -> Result<OpenBranch, StructuralError> {
        let leg = marker_id(element)?;
        let top = self
            .stack
            .last_mut()
            .ok_or(StructuralError::MalformedTokens {
                position: element.position,
            })?;
        let parent = element
            .parent_branch_id
            .ok_or(StructuralError::MalformedTokens {
                position: element.position,
            })?;
        if parent != top.leg {
            return Err(StructuralError::BranchIdMismatch {
                expected: top.leg,
                found: parent,
                position: element.position,
            });
        }
        top.leg = leg;
        Ok(*top)
    }

    /// Process a branch-end marker: pop the top context, which must belong
    /// to the group the marker names.
    pub fn on_end(&mut self, element: &SeqElement) -> Result<OpenBranch, StructuralError> {
        let group = marker_id(element)?;
        let popped = self.stack.pop().ok_or(StructuralError::EndWithoutStart {
            position: element.position,
        })?;
        if popped.group != group {
            return Err(StructuralError::BranchIdMismatch {
                expected: popped.group,
                found: group,
                position: element.position,
            });
        }
        Ok(popped)
    }

    /// End-of-sequence check: every opened branch must have closed.
    pub fn finish(&self) -> Result<(), StructuralError> {
        if self.stack.is_empty() {
            Ok(())
        } else {
            Err(StructuralError::Unbalanced {
                open: self.stack.len(),
            })
        }
    }
}

fn marker_id(element: &SeqElement) -> Result<BranchId, StructuralError> {
    debug_assert_ne!(element.kind, ElementKind::Instruction);
    element
        .branch_id
        .ok_or(StructuralError::MalformedTokens {
            position: element.position,
        })
}
