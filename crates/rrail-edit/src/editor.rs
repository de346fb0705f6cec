//! Structural edits and the height-change cascade.

use rrail_core::{
    BranchId, Instruction, LadderError, NotFoundError, SequenceModel, StructuralError,
};
use rrail_layout::{LayoutEngine, LayoutMetrics};

use crate::resolver::PositionResolver;

/// What an applied edit did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
    /// The rung the edit landed on.
    pub rung: u32,
    /// Sequence position affected, when meaningful.
    pub position: Option<usize>,
    /// Branch created by the edit, when any.
    pub branch: Option<BranchId>,
    /// Rungs repositioned by the cascade, in order.
    pub repositioned: Vec<u32>,
    /// Human-readable status line.
    pub status: String,
}

/// Outcome of an edit request.
///
/// Rejections cover ordinary interaction outside any valid region or edits
/// that would be no-ops; the sequence model is left unchanged and the
/// reason is a user-facing status string. Invariant violations and lookup
/// misses surface as hard [`LadderError`]s instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied(EditReport),
    Rejected { reason: String },
}

impl EditOutcome {
    fn rejected(reason: &str) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
        }
    }

    /// True when the edit mutated the document.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Applies structural edits and keeps committed geometry consistent.
///
/// Every mutation goes through the host's [`SequenceModel`]s; the editor
/// then re-lays-out the affected rung and cascades the height change to the
/// rungs below it. Edits run to completion, cascade included, before the
/// next one is accepted — the editor is synchronous and single-threaded by
/// construction.
#[derive(Debug, Default)]
pub struct StructuralEditor {
    engine: LayoutEngine,
}

impl StructuralEditor {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            engine: LayoutEngine::new(metrics),
        }
    }

    /// Read access to committed geometry.
    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    /// Lay out a document from scratch.
    pub fn open<S: SequenceModel>(&mut self, rungs: &[S]) -> Result<(), LadderError> {
        self.engine.layout_document(rungs)
    }

    /// Insert an instruction at an explicit sequence position.
    pub fn insert<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        rung: u32,
        position: usize,
        instruction: Instruction,
    ) -> Result<EditOutcome, LadderError> {
        let status = format!("Inserted {instruction} at position {position} on rung {rung}");
        rung_mut(rungs, rung)?.add_instruction(instruction, position)?;
        let repositioned = self.cascade(rungs, rung)?;
        Ok(EditOutcome::Applied(EditReport {
            rung,
            position: Some(position),
            branch: None,
            repositioned,
            status,
        }))
    }

    /// Insert an instruction at a pointer coordinate.
    ///
    /// Clicks outside any rung or context are rejected with a status
    /// reason, not an error.
    pub fn insert_at<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        x: i32,
        y: i32,
        instruction: Instruction,
    ) -> Result<EditOutcome, LadderError> {
        let target = match PositionResolver::new(&self.engine).resolve(x, y) {
            Ok(target) => target,
            Err(_) => return Ok(EditOutcome::rejected("Invalid insertion position")),
        };
        self.insert(rungs, target.rung, target.position, instruction)
    }

    /// Delete the instruction at a sequence position.
    ///
    /// Positions are re-indexed by the underlying model; when the removed
    /// element was the last member of a branch leg, the branch's end
    /// bookkeeping follows on the next compile.
    pub fn delete<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        rung: u32,
        position: usize,
    ) -> Result<EditOutcome, LadderError> {
        rung_mut(rungs, rung)?.remove_instructions(position, position)?;
        let repositioned = self.cascade(rungs, rung)?;
        Ok(EditOutcome::Applied(EditReport {
            rung,
            position: Some(position),
            branch: None,
            repositioned,
            status: format!("Deleted element at position {position} on rung {rung}"),
        }))
    }

    /// Move an instruction, within a rung or across rungs.
    ///
    /// Moving to the element's current position, or to current-position + 1
    /// on the same rung, describes the identity arrangement and is rejected
    /// as a duplicate drop. Same-rung destinations beyond the source are
    /// decremented once to account for the removal shift, so the element
    /// lands exactly where the drop previewed it.
    pub fn move_element<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        src_rung: u32,
        src_position: usize,
        dst_rung: u32,
        dst_position: usize,
    ) -> Result<EditOutcome, LadderError> {
        if src_rung == dst_rung
            && (dst_position == src_position || dst_position == src_position + 1)
        {
            return Ok(EditOutcome::rejected("Duplicate drop position"));
        }

        if src_rung == dst_rung {
            let adjusted = if dst_position > src_position {
                dst_position - 1
            } else {
                dst_position
            };
            rung_mut(rungs, src_rung)?.move_instruction(src_position, adjusted)?;
            let repositioned = self.cascade(rungs, src_rung)?;
            return Ok(EditOutcome::Applied(EditReport {
                rung: src_rung,
                position: Some(adjusted),
                branch: None,
                repositioned,
                status: format!("Moved element to position {adjusted} on rung {src_rung}"),
            }));
        }

        let instruction = {
            let source = rung_ref(rungs, src_rung)?;
            let elements = source.elements()?;
            let element = elements
                .get(src_position)
                .ok_or(NotFoundError::Element {
                    rung: src_rung,
                    position: src_position,
                })?;
            element
                .instruction
                .clone()
                .ok_or(StructuralError::MarkerNotRemovable {
                    position: src_position,
                })?
        };

        rung_mut(rungs, src_rung)?.remove_instructions(src_position, src_position)?;
        let destination = rung_mut(rungs, dst_rung)?;
        let position = dst_position.min(destination.len());
        destination.add_instruction(instruction, position)?;

        // Cascade from the upper rung first so the lower one re-lays-out at
        // its settled top-Y.
        let (first, second) = if src_rung < dst_rung {
            (src_rung, dst_rung)
        } else {
            (dst_rung, src_rung)
        };
        let mut repositioned = self.cascade(rungs, first)?;
        repositioned.extend(self.cascade(rungs, second)?);
        repositioned.sort_unstable();
        repositioned.dedup();

        Ok(EditOutcome::Applied(EditReport {
            rung: dst_rung,
            position: Some(position),
            branch: None,
            repositioned,
            status: format!("Moved element to position {position} on rung {dst_rung}"),
        }))
    }

    /// Move the element under one pointer coordinate to another.
    pub fn move_to_point<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        src_rung: u32,
        src_position: usize,
        x: i32,
        y: i32,
    ) -> Result<EditOutcome, LadderError> {
        let target = match PositionResolver::new(&self.engine).resolve(x, y) {
            Ok(target) => target,
            Err(_) => return Ok(EditOutcome::rejected("Invalid drop position")),
        };
        self.move_element(rungs, src_rung, src_position, target.rung, target.position)
    }

    /// Wrap the inclusive element range `start..=end` in a new branch.
    pub fn create_branch<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        rung: u32,
        start: usize,
        end: usize,
    ) -> Result<EditOutcome, LadderError> {
        let branch = match rung_mut(rungs, rung)?.insert_branch(start, end) {
            Ok(branch) => branch,
            Err(LadderError::Structural(StructuralError::InvalidBranchRange { .. })) => {
                return Ok(EditOutcome::rejected("Invalid branch start position"));
            }
            Err(err) => return Err(err),
        };
        let repositioned = self.cascade(rungs, rung)?;
        Ok(EditOutcome::Applied(EditReport {
            rung,
            position: Some(start),
            branch: Some(branch),
            repositioned,
            status: format!("Branch created: {branch}"),
        }))
    }

    /// Create a branch spanning the elements between two pointer clicks.
    pub fn branch_between<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
    ) -> Result<EditOutcome, LadderError> {
        let resolver = PositionResolver::new(&self.engine);
        let (start, end) = match (resolver.resolve(start_x, start_y), resolver.resolve(end_x, end_y))
        {
            (Ok(a), Ok(b)) => (a, b),
            _ => return Ok(EditOutcome::rejected("Invalid branch start position")),
        };
        if start.rung != end.rung || end.position <= start.position {
            return Ok(EditOutcome::rejected("Invalid branch start position"));
        }
        // The second click names the insertion slot after the last wrapped
        // element.
        self.create_branch(rungs, start.rung, start.position, end.position - 1)
    }

    /// Remove a branch's markers, splicing its first leg into the enclosing
    /// context. Occupied sibling legs reject the deletion.
    pub fn delete_branch<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        rung: u32,
        branch: BranchId,
    ) -> Result<EditOutcome, LadderError> {
        let group = self.group_of(rung, branch)?;
        match rung_mut(rungs, rung)?.remove_branch(group) {
            Ok(()) => {}
            Err(LadderError::Structural(err @ StructuralError::BranchLegsNotEmpty { .. })) => {
                return Ok(EditOutcome::Rejected {
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
        let repositioned = self.cascade(rungs, rung)?;
        Ok(EditOutcome::Applied(EditReport {
            rung,
            position: None,
            branch: Some(group),
            repositioned,
            status: format!("Deleted branch: {group}"),
        }))
    }

    /// Append a new empty parallel leg to an existing branch.
    pub fn add_branch_leg<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        rung: u32,
        branch: BranchId,
    ) -> Result<EditOutcome, LadderError> {
        let group = self.group_of(rung, branch)?;
        rung_mut(rungs, rung)?.insert_branch_leg(group)?;
        let repositioned = self.cascade(rungs, rung)?;
        Ok(EditOutcome::Applied(EditReport {
            rung,
            position: None,
            branch: Some(group),
            repositioned,
            status: format!("Added leg to branch {group}"),
        }))
    }

    /// Replace a rung's comment and cascade the height change.
    pub fn set_rung_comment<S: SequenceModel>(
        &mut self,
        rungs: &mut [S],
        rung: u32,
        comment: &str,
    ) -> Result<EditOutcome, LadderError> {
        rung_mut(rungs, rung)?.set_comment(comment);
        let repositioned = self.cascade(rungs, rung)?;
        Ok(EditOutcome::Applied(EditReport {
            rung,
            position: None,
            branch: None,
            repositioned,
            status: format!("Updated comment on rung {rung}"),
        }))
    }

    /// Append a rung to the document and lay it out.
    pub fn append_rung<S: SequenceModel>(
        &mut self,
        rungs: &mut Vec<S>,
        rung: S,
    ) -> Result<u32, LadderError> {
        rungs.push(rung);
        self.engine.layout_document(rungs)?;
        Ok(rungs.len() as u32 - 1)
    }

    /// Delete a rung; following rungs renumber and reposition.
    pub fn delete_rung<S: SequenceModel>(
        &mut self,
        rungs: &mut Vec<S>,
        rung: u32,
    ) -> Result<(), LadderError> {
        if rung as usize >= rungs.len() {
            return Err(NotFoundError::Rung { number: rung }.into());
        }
        rungs.remove(rung as usize);
        self.engine.layout_document(rungs)
    }

    /// Set an element's selection flag.
    pub fn select(
        &mut self,
        rung: u32,
        position: usize,
        selected: bool,
    ) -> Result<(), LadderError> {
        self.engine.select(rung, position, selected)
    }

    /// Re-lay-out one rung and reposition everything below it.
    ///
    /// Repositioning never changes a repositioned rung's own height, so the
    /// cascade is bounded to a single translation of the contiguous suffix;
    /// rungs above the edited one are never touched.
    fn cascade<S: SequenceModel>(
        &mut self,
        rungs: &[S],
        rung: u32,
    ) -> Result<Vec<u32>, LadderError> {
        let model = rung_ref(rungs, rung)?;
        let delta = self.engine.relayout_rung(rung, model)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(rung, delta = delta.delta(), "rung relaid out");
        Ok(self.engine.translate_following(rung, delta.delta()))
    }

    /// Resolve a leg id from committed geometry to its owning group.
    fn group_of(&self, rung: u32, branch: BranchId) -> Result<BranchId, LadderError> {
        let geo = self
            .engine
            .rung(rung)
            .ok_or(NotFoundError::Rung { number: rung })?;
        if geo.branches.lookup(branch).is_none() {
            return Err(NotFoundError::Branch { branch }.into());
        }
        Ok(geo.branches.group_of(branch)?)
    }
}

fn rung_ref<S: SequenceModel>(rungs: &[S], rung: u32) -> Result<&S, LadderError> {
    rungs
        .get(rung as usize)
        .ok_or_else(|| NotFoundError::Rung { number: rung }.into())
}

fn rung_mut<S: SequenceModel>(rungs: &mut [S], rung: u32) -> Result<&mut S, LadderError> {
    rungs
        .get_mut(rung as usize)
        .ok_or_else(|| NotFoundError::Rung { number: rung }.into())
}
