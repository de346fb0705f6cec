//! Branch geometry arena.

use rrail_core::{BranchId, Rect, StructuralError};
use rustc_hash::FxHashMap;

/// Geometry record for one branch group or leg, scoped to a layout pass.
///
/// Parent/child relationships are expressed as id lists, never shared
/// references: a group's `children` holds its sibling legs in discovery
/// order (top-to-bottom in the rendered layout), and each leg's
/// `parent_branch_id` names the group. A branch group doubles as its own
/// first leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderBranch {
    pub branch_id: BranchId,
    pub root_branch_id: BranchId,
    /// Enclosing context for groups, owning group for legs. `None` at top
    /// level.
    pub parent_branch_id: Option<BranchId>,
    /// Sibling legs in discovery order. Empty on legs.
    pub children: Vec<BranchId>,
    pub rung: u32,
    pub branch_level: u32,
    /// X of the left rail connector column (center).
    pub start_x: i32,
    /// X of the right rail connector column (center); provisional until the
    /// group closes.
    pub end_x: i32,
    /// Top Y of the owning rung.
    pub main_y: i32,
    /// Top of this branch's region band.
    pub start_y: i32,
    /// The wire Y its elements sit on.
    pub branch_y: i32,
    /// Bottom of this branch's region band; resolved when the next sibling
    /// appears or the group closes.
    pub end_y: i32,
    /// Tallest content extent below `branch_y`.
    pub branch_height: i32,
    /// Sequence index range this branch owns.
    pub start_position: usize,
    pub end_position: usize,
}

impl LadderBranch {
    /// Bounding region used for pointer resolution.
    pub fn region(&self) -> Rect {
        Rect::new(
            self.start_x,
            self.start_y,
            (self.end_x - self.start_x).max(0),
            (self.end_y - self.start_y).max(0),
        )
    }

    /// Check if a point falls inside this branch's region.
    ///
    /// Half-open on the right and bottom, like [`Rect::contains`], so a
    /// point on a shared boundary belongs to exactly one branch.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.start_x <= x && x < self.end_x && self.start_y <= y && y < self.end_y
    }

    fn shift_y(&mut self, dy: i32) {
        self.main_y += dy;
        self.start_y += dy;
        self.branch_y += dy;
        self.end_y += dy;
    }
}

/// Arena of branch geometry keyed by branch id, scoped to one layout pass.
///
/// After a pass completes, every branch id referenced by any laid-out
/// element has an entry here; a miss is a programming error surfaced as
/// [`StructuralError::DanglingBranch`], never silently patched over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchGeometryStore {
    entries: FxHashMap<BranchId, LadderBranch>,
    order: Vec<BranchId>,
}

impl BranchGeometryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no branch has been recorded.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Record a new branch. Ids must be unique within the pass.
    pub fn create(&mut self, branch: LadderBranch) -> Result<(), StructuralError> {
        let id = branch.branch_id;
        if self.entries.contains_key(&id) {
            return Err(StructuralError::DuplicateBranch { branch: id });
        }
        self.entries.insert(id, branch);
        self.order.push(id);
        Ok(())
    }

    /// Look up a branch, failing on a dangling id.
    pub fn get(&self, id: BranchId) -> Result<&LadderBranch, StructuralError> {
        self.entries
            .get(&id)
            .ok_or(StructuralError::DanglingBranch { branch: id })
    }

    /// Mutable lookup, failing on a dangling id.
    pub fn get_mut(&mut self, id: BranchId) -> Result<&mut LadderBranch, StructuralError> {
        self.entries
            .get_mut(&id)
            .ok_or(StructuralError::DanglingBranch { branch: id })
    }

    /// Non-failing lookup for caller-supplied ids.
    pub fn lookup(&self, id: BranchId) -> Option<&LadderBranch> {
        self.entries.get(&id)
    }

    /// Records in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &LadderBranch> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// True when `id` names a sibling leg rather than a group.
    pub fn is_leg(&self, id: BranchId) -> bool {
        self.lookup(id)
            .and_then(|record| record.parent_branch_id)
            .and_then(|parent| self.lookup(parent))
            .is_some_and(|parent| parent.children.contains(&id))
    }

    /// Resolve a leg id to its owning group; group ids map to themselves.
    pub fn group_of(&self, id: BranchId) -> Result<BranchId, StructuralError> {
        let record = self.get(id)?;
        match record.parent_branch_id {
            Some(parent) if self.get(parent)?.children.contains(&id) => Ok(parent),
            _ => Ok(id),
        }
    }

    /// Push a closed group's resolved rail bounds down onto every leg.
    pub fn propagate_bounds(&mut self, group: BranchId) -> Result<(), StructuralError> {
        let (start_x, end_x, children) = {
            let record = self.get(group)?;
            (record.start_x, record.end_x, record.children.clone())
        };
        for child in children {
            let leg = self.get_mut(child)?;
            leg.start_x = start_x;
            leg.end_x = end_x;
        }
        Ok(())
    }

    /// Fix every non-last leg's bottom edge to abut its next sibling.
    ///
    /// A leg's true bottom is only known once the sibling below it exists;
    /// the last leg keeps its content-derived bottom.
    pub fn resolve_leg_ends(
        &mut self,
        group: BranchId,
        branch_spacing: i32,
    ) -> Result<(), StructuralError> {
        let children = self.get(group)?.children.clone();
        for pair in children.windows(2) {
            let next_top = self.get(pair[1])?.branch_y;
            let leg = self.get_mut(pair[0])?;
            leg.end_y = next_top - branch_spacing / 2;
        }
        Ok(())
    }

    pub(crate) fn shift_y(&mut self, dy: i32) {
        for record in self.entries.values_mut() {
            record.shift_y(dy);
        }
    }
}
