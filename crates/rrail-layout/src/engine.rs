//! The layout engine: sequence in, positioned geometry out.

use std::collections::BTreeMap;
use std::ops::Bound;

use rrail_core::{
    BranchId, CoordinateError, ElementKind, Instruction, LadderError, NotFoundError, Rect,
    SequenceModel, StructuralError, SymbolKind,
};

use crate::element::LadderElement;
use crate::metrics::LayoutMetrics;
use crate::store::{BranchGeometryStore, LadderBranch};
use crate::tracker::BranchTracker;

/// Old and new height of a re-laid-out rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightDelta {
    pub old: i32,
    pub new: i32,
}

impl HeightDelta {
    /// Signed height change.
    pub fn delta(&self) -> i32 {
        self.new - self.old
    }

    /// True when the rung's height actually changed.
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

/// All committed geometry for one rung: the output of one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RungGeometry {
    pub rung: u32,
    pub top_y: i32,
    /// Total height including the comment block and bottom padding.
    pub height: i32,
    /// Effective right power rail X for this rung.
    pub right_rail_x: i32,
    pub comment_height: i32,
    /// The main context wire line.
    pub centerline_y: i32,
    pub comment: String,
    /// One entry per sequence element, in position order.
    pub elements: Vec<LadderElement>,
    pub branches: BranchGeometryStore,
}

impl RungGeometry {
    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i32 {
        self.top_y + self.height
    }

    /// Whether `y` falls inside this rung's vertical span.
    pub fn contains_y(&self, y: i32) -> bool {
        self.top_y <= y && y < self.bottom()
    }

    /// Elements spaced in the given context, in position order.
    ///
    /// Branch start/end connectors belong to their enclosing context; leg
    /// connectors and instructions belong to their own leg.
    pub fn context_elements(&self, context: Option<BranchId>) -> Vec<&LadderElement> {
        self.elements
            .iter()
            .filter(|el| el.context_branch_id == context)
            .collect()
    }

    /// The first element whose box contains the point, if any.
    pub fn element_at(&self, x: i32, y: i32) -> Option<&LadderElement> {
        self.elements.iter().find(|el| el.rect.contains(x, y))
    }

    /// The element at a sequence position.
    pub fn element_at_position(&self, position: usize) -> Option<&LadderElement> {
        self.elements.iter().find(|el| el.position == position)
    }

    /// The deepest branch whose region contains the point.
    ///
    /// Ties at one level resolve to the record discovered later, which is
    /// the lower leg on screen.
    pub fn branch_at(&self, x: i32, y: i32) -> Option<&LadderBranch> {
        let mut best: Option<&LadderBranch> = None;
        for record in self.branches.iter() {
            if !record.contains(x, y) {
                continue;
            }
            match best {
                Some(current) if current.branch_level > record.branch_level => {}
                _ => best = Some(record),
            }
        }
        best
    }

    /// Set an element's selection flag. Returns false on a position miss.
    pub fn set_selected(&mut self, position: usize, selected: bool) -> bool {
        match self.elements.iter_mut().find(|el| el.position == position) {
            Some(el) => {
                el.selected = selected;
                true
            }
            None => false,
        }
    }

    fn shift_y(&mut self, dy: i32) {
        self.top_y += dy;
        self.centerline_y += dy;
        for el in &mut self.elements {
            el.rect.shift_y(dy);
            el.wire_y += dy;
        }
        self.branches.shift_y(dy);
    }
}

/// Per-context walk state for one layout pass.
#[derive(Debug, Clone, Copy)]
struct Frame {
    /// The leg elements are currently spaced in; `None` on the main rung.
    context: Option<BranchId>,
    /// The branch group the current leg belongs to.
    group: Option<BranchId>,
    /// Right edge of the last placed element in this context.
    cursor_x: i32,
    /// The wire line of this context.
    wire_y: i32,
    /// Rightmost edge within the current group's subtree.
    group_max_right: i32,
    /// Lowest content edge of the current leg, nested groups included.
    leg_bottom: i32,
    /// Lowest content edge over the group's already-finalized legs.
    group_bottom: i32,
}

/// Lays rungs out and owns the committed geometry.
///
/// The engine is the only writer of the per-rung geometry and the rung
/// top-Y table. Layout is build-then-swap: a failed pass leaves the prior
/// valid geometry for that rung untouched.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    metrics: LayoutMetrics,
    rungs: BTreeMap<u32, RungGeometry>,
}

impl LayoutEngine {
    /// Create an engine with the given metrics.
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            rungs: BTreeMap::new(),
        }
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Lay out every rung of a document, stacking top-Ys from
    /// [`LayoutMetrics::first_rung_y`]. Replaces all committed geometry,
    /// atomically: nothing is swapped in unless every rung succeeds.
    pub fn layout_document<S: SequenceModel>(&mut self, rungs: &[S]) -> Result<(), LadderError> {
        let mut built = BTreeMap::new();
        let mut top = self.metrics.first_rung_y;
        for (number, rung) in rungs.iter().enumerate() {
            let number = number as u32;
            let geo = self.layout_rung(number, top, rung)?;
            top = geo.bottom();
            built.insert(number, geo);
        }
        self.rungs = built;
        Ok(())
    }

    /// Re-lay-out one rung at its current top-Y. Swaps the new geometry in
    /// only on success and reports the height change for cascading.
    pub fn relayout_rung<S: SequenceModel>(
        &mut self,
        number: u32,
        rung: &S,
    ) -> Result<HeightDelta, LadderError> {
        let old = self
            .rungs
            .get(&number)
            .ok_or(NotFoundError::Rung { number })?;
        let top = old.top_y;
        let old_height = old.height;
        let geo = self.layout_rung(number, top, rung)?;
        let new_height = geo.height;
        self.rungs.insert(number, geo);
        Ok(HeightDelta {
            old: old_height,
            new: new_height,
        })
    }

    /// Shift every rung after `after` by `dy`. Returns the repositioned
    /// rung numbers; heights are unaffected by repositioning.
    pub fn translate_following(&mut self, after: u32, dy: i32) -> Vec<u32> {
        if dy == 0 {
            return Vec::new();
        }
        let mut moved = Vec::new();
        for (&number, geo) in self
            .rungs
            .range_mut((Bound::Excluded(after), Bound::Unbounded))
        {
            geo.shift_y(dy);
            moved.push(number);
        }
        moved
    }

    /// Committed geometry for one rung.
    pub fn rung(&self, number: u32) -> Option<&RungGeometry> {
        self.rungs.get(&number)
    }

    /// Entry of the rung top-Y table.
    pub fn rung_top(&self, number: u32) -> Option<i32> {
        self.rungs.get(&number).map(|geo| geo.top_y)
    }

    /// Number of committed rungs.
    pub fn rung_count(&self) -> usize {
        self.rungs.len()
    }

    /// Committed rungs in number order.
    pub fn iter(&self) -> impl Iterator<Item = &RungGeometry> {
        self.rungs.values()
    }

    /// The rung whose vertical span contains `y`.
    pub fn rung_at_y(&self, y: i32) -> Result<u32, CoordinateError> {
        self.rungs
            .values()
            .find(|geo| geo.contains_y(y))
            .map(|geo| geo.rung)
            .ok_or(CoordinateError::NoRungAtY { y })
    }

    /// Set an element's selection flag.
    pub fn select(&mut self, rung: u32, position: usize, selected: bool) -> Result<(), LadderError> {
        let geo = self
            .rungs
            .get_mut(&rung)
            .ok_or(NotFoundError::Rung { number: rung })?;
        if geo.set_selected(position, selected) {
            Ok(())
        } else {
            Err(NotFoundError::Element { rung, position }.into())
        }
    }

    /// Drop all committed geometry.
    pub fn clear(&mut self) {
        self.rungs.clear();
    }

    /// One layout pass over a rung's sequence. Pure with respect to
    /// committed state; callers swap the result in on success.
    pub fn layout_rung<S: SequenceModel>(
        &self,
        number: u32,
        top_y: i32,
        rung: &S,
    ) -> Result<RungGeometry, LadderError> {
        if top_y < 0 {
            return Err(CoordinateError::NegativeAnchor { y: top_y }.into());
        }

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("layout_rung", rung = number).entered();

        let m = &self.metrics;
        let spacing = m.element_spacing;
        let branch_spacing = m.branch_spacing;
        let r = m.connector_radius;

        let comment_height = m.comment_height(rung.comment_lines());
        let centerline = top_y + comment_height + m.rung_height / 2;

        let sequence = rung.elements()?;
        let mut tracker = BranchTracker::new();
        let mut store = BranchGeometryStore::new();
        let mut elements: Vec<LadderElement> = Vec::with_capacity(sequence.len());
        let mut frames: Vec<Frame> = vec![Frame {
            context: None,
            group: None,
            cursor_x: m.left_rail_x,
            wire_y: centerline,
            group_max_right: m.left_rail_x,
            leg_bottom: centerline,
            group_bottom: centerline,
        }];

        for (index, e) in sequence.iter().enumerate() {
            if e.position != index {
                return Err(StructuralError::MalformedTokens { position: index }.into());
            }
            match e.kind {
                ElementKind::Instruction => {
                    let instruction = e.instruction.as_ref().ok_or(
                        StructuralError::UnknownElementKind {
                            position: e.position,
                        },
                    )?;
                    let frame = last_frame_mut(&mut frames, e.position)?;
                    let (width, sym_h, extra_below, label_h) =
                        instruction_box(m, instruction);
                    let x = frame.cursor_x + spacing;
                    let sym_top = frame.wire_y - sym_h / 2;
                    let rect =
                        Rect::new(x, sym_top - label_h, width, label_h + sym_h + extra_below);
                    place(frame, rect);
                    elements.push(LadderElement {
                        kind: ElementKind::Instruction,
                        rect,
                        wire_y: frame.wire_y,
                        label_height: label_h,
                        rung: number,
                        branch_level: e.branch_level,
                        branch_id: e.branch_id,
                        root_branch_id: e.root_branch_id,
                        context_branch_id: e.branch_id,
                        position: e.position,
                        selected: false,
                        instruction: Some(instruction.clone()),
                    });
                }
                ElementKind::BranchStart => {
                    let context = tracker.on_start(e)?;
                    let group = context.group;
                    let frame = last_frame_mut(&mut frames, e.position)?;
                    let cx = frame.cursor_x + spacing + r;
                    let cy = frame.wire_y;
                    let rect = connector_rect(cx, cy, r);
                    place(frame, rect);
                    elements.push(LadderElement {
                        kind: ElementKind::BranchStart,
                        rect,
                        wire_y: cy,
                        label_height: 0,
                        rung: number,
                        branch_level: e.branch_level,
                        branch_id: Some(group),
                        root_branch_id: e.root_branch_id,
                        context_branch_id: e.parent_branch_id,
                        position: e.position,
                        selected: false,
                        instruction: None,
                    });
                    store.create(LadderBranch {
                        branch_id: group,
                        root_branch_id: e.root_branch_id.unwrap_or(group),
                        parent_branch_id: e.parent_branch_id,
                        children: Vec::new(),
                        rung: number,
                        branch_level: e.branch_level,
                        start_x: cx,
                        end_x: cx + spacing,
                        main_y: top_y,
                        start_y: cy - branch_spacing / 2,
                        branch_y: cy,
                        end_y: cy + r + branch_spacing / 2,
                        branch_height: 2 * r,
                        start_position: e.position,
                        end_position: e.position,
                    })?;
                    frames.push(Frame {
                        context: Some(group),
                        group: Some(group),
                        cursor_x: cx + r,
                        wire_y: cy,
                        group_max_right: cx + r,
                        leg_bottom: cy + r,
                        group_bottom: cy + r,
                    });
                }
                ElementKind::BranchNext => {
                    tracker.on_next(e)?;
                    let leg_frame = pop_branch_frame(&mut frames, e.position)?;
                    let group = leg_frame.group.ok_or(StructuralError::MalformedTokens {
                        position: e.position,
                    })?;
                    finalize_leg(&mut store, &leg_frame, branch_spacing)?;
                    if leg_frame.context != Some(group) {
                        if let Some(prev_leg) = leg_frame.context {
                            store.get_mut(prev_leg)?.end_position = e.position - 1;
                        }
                    }

                    let leg = e.branch_id.ok_or(StructuralError::MalformedTokens {
                        position: e.position,
                    })?;
                    let group_start = store.get(group)?.start_position;
                    let nesting = rung.internal_nesting_level(group_start)? as i32;
                    let (start_x, end_x, leg_y) = {
                        let g = store.get(group)?;
                        let leg_y = match g.children.last() {
                            Some(&last) => store.get(last)?.end_y + branch_spacing,
                            None => g.end_y + branch_spacing * nesting,
                        };
                        (g.start_x, g.end_x, leg_y)
                    };
                    store.create(LadderBranch {
                        branch_id: leg,
                        root_branch_id: e.root_branch_id.unwrap_or(leg),
                        parent_branch_id: Some(group),
                        children: Vec::new(),
                        rung: number,
                        branch_level: e.branch_level,
                        start_x,
                        end_x,
                        main_y: top_y,
                        start_y: leg_y - branch_spacing / 2,
                        branch_y: leg_y,
                        end_y: leg_y + r + branch_spacing / 2,
                        branch_height: 2 * r,
                        start_position: e.position,
                        end_position: e.position,
                    })?;
                    store.get_mut(group)?.children.push(leg);

                    let rect = connector_rect(start_x, leg_y, r);
                    elements.push(LadderElement {
                        kind: ElementKind::BranchNext,
                        rect,
                        wire_y: leg_y,
                        label_height: 0,
                        rung: number,
                        branch_level: e.branch_level,
                        branch_id: Some(leg),
                        root_branch_id: e.root_branch_id,
                        context_branch_id: Some(leg),
                        position: e.position,
                        selected: false,
                        instruction: None,
                    });
                    frames.push(Frame {
                        context: Some(leg),
                        group: Some(group),
                        cursor_x: start_x + r,
                        wire_y: leg_y,
                        group_max_right: leg_frame.group_max_right.max(start_x + r),
                        leg_bottom: leg_y + r,
                        group_bottom: leg_frame.group_bottom.max(leg_frame.leg_bottom),
                    });
                }
                ElementKind::BranchEnd => {
                    tracker.on_end(e)?;
                    let leg_frame = pop_branch_frame(&mut frames, e.position)?;
                    let group = leg_frame.group.ok_or(StructuralError::MalformedTokens {
                        position: e.position,
                    })?;
                    finalize_leg(&mut store, &leg_frame, branch_spacing)?;
                    if leg_frame.context != Some(group) {
                        if let Some(last_leg) = leg_frame.context {
                            store.get_mut(last_leg)?.end_position = e.position - 1;
                        }
                    }

                    let group_bottom = leg_frame.group_bottom.max(leg_frame.leg_bottom);
                    let cx = leg_frame.group_max_right + spacing + r;
                    let cy = {
                        let g = store.get_mut(group)?;
                        g.end_x = cx;
                        g.end_position = e.position;
                        g.branch_y
                    };
                    store.resolve_leg_ends(group, branch_spacing)?;
                    store.propagate_bounds(group)?;

                    let rect = connector_rect(cx, cy, r);
                    elements.push(LadderElement {
                        kind: ElementKind::BranchEnd,
                        rect,
                        wire_y: cy,
                        label_height: 0,
                        rung: number,
                        branch_level: e.branch_level,
                        branch_id: Some(group),
                        root_branch_id: e.root_branch_id,
                        context_branch_id: e.parent_branch_id,
                        position: e.position,
                        selected: false,
                        instruction: None,
                    });
                    let parent = last_frame_mut(&mut frames, e.position)?;
                    parent.cursor_x = cx + r;
                    parent.group_max_right = parent.group_max_right.max(cx + r);
                    parent.leg_bottom = parent.leg_bottom.max(group_bottom).max(cy + r);
                }
            }
        }

        tracker.finish()?;

        let max_el_bottom = elements.iter().map(|el| el.rect.bottom()).max();
        let content_bottom = max_el_bottom
            .unwrap_or(top_y)
            .max(top_y + comment_height);
        let height = (content_bottom - top_y).max(m.rung_height) + m.rung_padding;
        let right_rail_x = elements
            .iter()
            .map(|el| el.rect.right())
            .max()
            .unwrap_or(0)
            .max(m.right_rail_x);

        Ok(RungGeometry {
            rung: number,
            top_y,
            height,
            right_rail_x,
            comment_height,
            centerline_y: centerline,
            comment: rung.comment().to_string(),
            elements,
            branches: store,
        })
    }
}

fn last_frame_mut(frames: &mut [Frame], position: usize) -> Result<&mut Frame, LadderError> {
    frames
        .last_mut()
        .ok_or_else(|| StructuralError::MalformedTokens { position }.into())
}

fn pop_branch_frame(frames: &mut Vec<Frame>, position: usize) -> Result<Frame, LadderError> {
    // The bottom frame is the main rung and never pops; the tracker has
    // already rejected unmatched markers by the time this underflows.
    if frames.len() <= 1 {
        return Err(StructuralError::EndWithoutStart { position }.into());
    }
    frames
        .pop()
        .ok_or_else(|| StructuralError::EndWithoutStart { position }.into())
}

fn place(frame: &mut Frame, rect: Rect) {
    frame.cursor_x = rect.right();
    frame.group_max_right = frame.group_max_right.max(rect.right());
    frame.leg_bottom = frame.leg_bottom.max(rect.bottom());
}

fn connector_rect(cx: i32, cy: i32, r: i32) -> Rect {
    Rect::new(cx - r, cy - r, 2 * r, 2 * r)
}

/// Write a finished leg's content extent into its store record.
fn finalize_leg(
    store: &mut BranchGeometryStore,
    frame: &Frame,
    branch_spacing: i32,
) -> Result<(), LadderError> {
    if let Some(leg) = frame.context {
        let record = store.get_mut(leg)?;
        record.end_y = frame.leg_bottom + branch_spacing / 2;
        record.branch_height = frame.leg_bottom - record.branch_y;
    }
    Ok(())
}

/// Symbol box for an instruction: width, symbol height, extra rows below,
/// and the label band height above.
fn instruction_box(m: &LayoutMetrics, instruction: &Instruction) -> (i32, i32, i32, i32) {
    let label_h = instruction.label_lines() as i32 * m.char_height;
    match instruction.symbol_kind() {
        SymbolKind::Contact { .. } => (m.contact_width, m.contact_height, 0, label_h),
        SymbolKind::Coil { .. } => (m.coil_width, m.coil_height, 0, label_h),
        SymbolKind::Block => {
            let operands = instruction.operands();
            let widest = operands.iter().map(|op| op.len()).max().unwrap_or(0) as i32;
            // One column of single-letter parameter names, two spaces, then
            // the operand column, plus inner padding.
            let text_px = (1 + 2 + widest) * m.char_width + 40;
            let width = m.block_width.max(text_px);
            let extra_below = operands.len() as i32 * m.char_height;
            (width, m.block_height, extra_below, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrail_core::TokenRung;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(LayoutMetrics::default())
    }

    fn single(text: &str) -> Vec<TokenRung> {
        vec![TokenRung::parse(text)]
    }

    #[test]
    fn main_elements_sit_on_the_centerline() {
        let mut eng = engine();
        eng.layout_document(&single("XIC(A)XIC(B)OTE(C)")).unwrap();
        let geo = eng.rung(0).unwrap();
        let m = LayoutMetrics::default();
        let centerline = m.first_rung_y + m.rung_height / 2;
        assert_eq!(geo.centerline_y, centerline);
        for el in &geo.elements {
            assert_eq!(el.wire_y, centerline);
        }
        // Strictly increasing X with fixed spacing.
        let xs: Vec<i32> = geo.elements.iter().map(|el| el.rect.x).collect();
        assert_eq!(xs[0], m.left_rail_x + m.element_spacing);
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn horizontal_spacing_is_exact() {
        let mut eng = engine();
        eng.layout_document(&single("XIC(A)XIC(B)")).unwrap();
        let geo = eng.rung(0).unwrap();
        let m = LayoutMetrics::default();
        assert_eq!(
            geo.elements[1].rect.x,
            geo.elements[0].rect.right() + m.element_spacing
        );
    }

    #[test]
    fn branch_start_shares_anchor_wire() {
        let mut eng = engine();
        eng.layout_document(&single("XIC(A)[XIC(B),XIC(C)]OTE(D)"))
            .unwrap();
        let geo = eng.rung(0).unwrap();
        let start = &geo.elements[1];
        assert_eq!(start.kind, ElementKind::BranchStart);
        assert_eq!(start.wire_y, geo.centerline_y);

        // First leg elements sit on the group's wire; the sibling leg sits
        // strictly below the group's bottom edge.
        let group = geo.branches.get(start.branch_id.unwrap()).unwrap();
        assert_eq!(geo.elements[2].wire_y, group.branch_y);
        let leg = geo.branches.get(geo.elements[3].branch_id.unwrap()).unwrap();
        assert!(leg.branch_y > group.branch_y);
        assert_eq!(geo.elements[4].wire_y, leg.branch_y);
    }

    #[test]
    fn sibling_legs_stack_strictly_downward() {
        let mut eng = engine();
        eng.layout_document(&single("[XIC(A),XIC(B),XIC(C)]")).unwrap();
        let geo = eng.rung(0).unwrap();
        let group = geo.branches.get(geo.elements[0].branch_id.unwrap()).unwrap();
        let mut last_y = group.branch_y;
        for &child in &group.children {
            let leg = geo.branches.get(child).unwrap();
            assert!(leg.branch_y > last_y, "legs must stack downward");
            last_y = leg.branch_y;
        }
        assert_eq!(group.children.len(), 2);
    }

    #[test]
    fn group_bounds_propagate_to_legs() {
        let mut eng = engine();
        eng.layout_document(&single("[XIC(A),XIC(B)]")).unwrap();
        let geo = eng.rung(0).unwrap();
        let group = geo.branches.get(geo.elements[0].branch_id.unwrap()).unwrap();
        for &child in &group.children {
            let leg = geo.branches.get(child).unwrap();
            assert_eq!(leg.start_x, group.start_x);
            assert_eq!(leg.end_x, group.end_x);
        }
        // The end connector sits right of everything in the group.
        let end = geo
            .elements
            .iter()
            .find(|el| el.kind == ElementKind::BranchEnd)
            .unwrap();
        assert_eq!(end.rect.center_x(), group.end_x);
        for el in &geo.elements {
            if el.kind != ElementKind::BranchEnd {
                assert!(el.rect.right() <= group.end_x);
            }
        }
    }

    #[test]
    fn rung_height_honors_minimum_and_padding() {
        let mut eng = engine();
        eng.layout_document(&single("XIC(A)")).unwrap();
        let m = LayoutMetrics::default();
        let geo = eng.rung(0).unwrap();
        assert_eq!(geo.height, m.rung_height + m.rung_padding);
    }

    #[test]
    fn branches_grow_rung_height() {
        let mut eng = engine();
        eng.layout_document(&single("XIC(A)")).unwrap();
        let plain = eng.rung(0).unwrap().height;

        eng.layout_document(&single("XIC(A)[XIC(B),XIC(C)]")).unwrap();
        let branched = eng.rung(0).unwrap().height;
        assert!(branched > plain);
    }

    #[test]
    fn comment_shifts_content_and_grows_height() {
        let mut rung = TokenRung::parse("XIC(A)");
        rung.set_comment("line one\nline two\nline three");
        let mut eng = engine();
        eng.layout_document(&[rung]).unwrap();
        let m = LayoutMetrics::default();
        let geo = eng.rung(0).unwrap();
        assert_eq!(geo.comment_height, m.comment_height(3));
        assert_eq!(
            geo.centerline_y,
            geo.top_y + geo.comment_height + m.rung_height / 2
        );
    }

    #[test]
    fn negative_anchor_is_rejected() {
        let eng = engine();
        let rung = TokenRung::parse("XIC(A)");
        assert!(matches!(
            eng.layout_rung(0, -1, &rung),
            Err(LadderError::Coordinate(CoordinateError::NegativeAnchor { y: -1 }))
        ));
    }

    #[test]
    fn malformed_sequence_aborts_without_commit() {
        let mut eng = engine();
        eng.layout_document(&single("XIC(A)")).unwrap();
        let before = eng.rung(0).unwrap().clone();

        let bad = TokenRung::parse("XIC(A)[XIC(B)");
        assert!(eng.relayout_rung(0, &bad).is_err());
        assert_eq!(eng.rung(0).unwrap(), &before, "failed pass must not commit");
    }

    #[test]
    fn layout_is_idempotent() {
        let mut eng = engine();
        let rungs = single("XIC(A)[XIC(B),[XIC(C),XIC(D)]]OTE(E)");
        eng.layout_document(&rungs).unwrap();
        let first = eng.rung(0).unwrap().clone();
        let delta = eng.relayout_rung(0, &rungs[0]).unwrap();
        assert!(!delta.changed());
        assert_eq!(eng.rung(0).unwrap(), &first);
    }

    #[test]
    fn document_rungs_stack_exactly() {
        let mut eng = engine();
        let rungs = vec![
            TokenRung::parse("XIC(A)[XIC(B),XIC(C)]"),
            TokenRung::parse("XIC(D)OTE(E)"),
            TokenRung::parse("OTE(F)"),
        ];
        eng.layout_document(&rungs).unwrap();
        let g0 = eng.rung(0).unwrap();
        let g1 = eng.rung(1).unwrap();
        let g2 = eng.rung(2).unwrap();
        assert_eq!(g1.top_y, g0.bottom());
        assert_eq!(g2.top_y, g1.bottom());
    }

    #[test]
    fn translate_following_shifts_geometry() {
        let mut eng = engine();
        let rungs = vec![TokenRung::parse("XIC(A)"), TokenRung::parse("XIC(B)")];
        eng.layout_document(&rungs).unwrap();
        let before_top = eng.rung_top(1).unwrap();
        let moved = eng.translate_following(0, 35);
        assert_eq!(moved, vec![1]);
        assert_eq!(eng.rung_top(1).unwrap(), before_top + 35);
        assert_eq!(eng.rung_top(0).unwrap(), LayoutMetrics::default().first_rung_y);
    }

    #[test]
    fn rung_at_y_maps_spans() {
        let mut eng = engine();
        let rungs = vec![TokenRung::parse("XIC(A)"), TokenRung::parse("XIC(B)")];
        eng.layout_document(&rungs).unwrap();
        let g0 = eng.rung(0).unwrap();
        assert_eq!(eng.rung_at_y(g0.top_y).unwrap(), 0);
        assert_eq!(eng.rung_at_y(g0.bottom()).unwrap(), 1);
        assert!(matches!(
            eng.rung_at_y(100_000),
            Err(CoordinateError::NoRungAtY { .. })
        ));
    }

    #[test]
    fn block_width_grows_with_operands() {
        let mut eng = engine();
        eng.layout_document(&single("TON(VeryLongTimerTagName,1000,0)"))
            .unwrap();
        let geo = eng.rung(0).unwrap();
        let m = LayoutMetrics::default();
        let el = &geo.elements[0];
        assert!(el.rect.width > m.block_width);
        // Three operand rows extend below the block body.
        assert_eq!(
            el.rect.height,
            m.block_height + 3 * m.char_height
        );
    }

    #[test]
    fn labels_fold_into_the_element_box() {
        let mut eng = engine();
        let rung = vec![TokenRung::parse("XIC(A)")];
        eng.layout_document(&rung).unwrap();
        let m = LayoutMetrics::default();
        let el = eng.rung(0).unwrap().elements[0].clone();
        assert_eq!(el.label_height, m.char_height);
        assert_eq!(el.rect.height, m.char_height + m.contact_height);
        assert_eq!(el.symbol_rect().height, m.contact_height);
    }

    proptest::proptest! {
        #[test]
        fn main_rung_width_grows_one_element_at_a_time(count in 1usize..24) {
            let text: String = (0..count).map(|i| format!("XIC(T{i})")).collect();
            let mut eng = engine();
            eng.layout_document(&single(&text)).unwrap();
            let geo = eng.rung(0).unwrap();
            let m = LayoutMetrics::default();
            proptest::prop_assert_eq!(geo.elements.len(), count);
            let expected_right = m.left_rail_x
                + count as i32 * (m.element_spacing + m.contact_width);
            proptest::prop_assert_eq!(
                geo.elements.last().unwrap().rect.right(),
                expected_right
            );
        }

        #[test]
        fn appending_legs_grows_height_monotonically(legs in 1usize..6) {
            let mut eng = engine();
            let mut last_height = 0;
            for n in 1..=legs {
                let body = std::iter::repeat_n("XIC(A)", n).collect::<Vec<_>>().join(",");
                eng.layout_document(&single(&format!("[{body}]"))).unwrap();
                let height = eng.rung(0).unwrap().height;
                proptest::prop_assert!(height >= last_height);
                last_height = height;
            }
        }
    }
}
