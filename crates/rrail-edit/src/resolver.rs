//! Pointer-to-sequence resolution and its inverse.

use rrail_core::{BranchId, CoordinateError, LadderError, NotFoundError, Point};
use rrail_layout::{LadderElement, LayoutEngine, RungGeometry};

/// A resolved insertion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTarget {
    pub rung: u32,
    /// Branch context; `None` for the main rung.
    pub branch_id: Option<BranchId>,
    /// 0 on the main rung.
    pub branch_level: u32,
    /// Sequence index a new element would be inserted at.
    pub position: usize,
}

/// Hit-tests pointer coordinates against committed geometry.
///
/// Reads the engine's committed state only; never mutates it. The forward
/// mapping ([`resolve`](Self::resolve)) and the inverse
/// ([`insertion_point`](Self::insertion_point)) round-trip: resolving the
/// coordinate the inverse produces yields the same target.
#[derive(Debug, Clone, Copy)]
pub struct PositionResolver<'a> {
    engine: &'a LayoutEngine,
}

impl<'a> PositionResolver<'a> {
    pub fn new(engine: &'a LayoutEngine) -> Self {
        Self { engine }
    }

    /// Resolve a pointer coordinate to (rung, branch context, insertion
    /// index).
    ///
    /// The rung is the one whose vertical span contains `y`; the branch is
    /// the deepest one whose region contains the point; the index sits
    /// before or after the context element whose center is closest to `x`.
    /// An empty main context resolves to position 0, an empty branch leg to
    /// the slot just after its marker.
    pub fn resolve(&self, x: i32, y: i32) -> Result<HitTarget, CoordinateError> {
        let rung = self.engine.rung_at_y(y)?;
        let geo = self
            .engine
            .rung(rung)
            .ok_or(CoordinateError::NoRungAtY { y })?;
        if x < self.engine.metrics().left_rail_x {
            return Err(CoordinateError::OutsideContext { x, y });
        }

        let branch = geo.branch_at(x, y);
        let context = branch.map(|b| b.branch_id);
        let list = geo.context_elements(context);

        let position = if list.is_empty() {
            match branch {
                None => 0,
                Some(b) => b.start_position + 1,
            }
        } else {
            closest_insertion(&list, x)
        };

        Ok(HitTarget {
            rung,
            branch_id: context,
            branch_level: branch.map_or(0, |b| b.branch_level),
            position,
        })
    }

    /// Compute the coordinate where a new element at the target would land.
    ///
    /// Used to preview insertions before committing them; consistent with
    /// [`resolve`](Self::resolve).
    pub fn insertion_point(
        &self,
        rung: u32,
        position: usize,
        branch_id: Option<BranchId>,
    ) -> Result<Point, LadderError> {
        let geo = self
            .engine
            .rung(rung)
            .ok_or(NotFoundError::Rung { number: rung })?;
        let spacing = self.engine.metrics().element_spacing;

        let (anchor_x, wire_y) = match branch_id {
            None => (self.engine.metrics().left_rail_x, geo.centerline_y),
            Some(id) => {
                let branch = geo
                    .branches
                    .lookup(id)
                    .ok_or(NotFoundError::Branch { branch: id })?;
                (branch.start_x, branch.branch_y)
            }
        };

        let list = geo.context_elements(branch_id);
        let Some((first, last)) = list.first().zip(list.last()) else {
            return Ok(Point::new(anchor_x + spacing / 2, wire_y));
        };

        if position <= first.position {
            return Ok(Point::new(anchor_x + spacing / 2, wire_y));
        }
        if position > last.position {
            return Ok(Point::new(last.rect.right() + spacing, wire_y));
        }

        // Between two context elements: the midpoint of the wire run that
        // separates them.
        let mut previous = *first;
        for element in list.iter().skip(1) {
            if element.position >= position {
                let gap = element.rect.x - previous.rect.right();
                return Ok(Point::new(previous.rect.right() + gap / 2, wire_y));
            }
            previous = *element;
        }
        Ok(Point::new(last.rect.right() + spacing, wire_y))
    }

    /// The element whose box contains the point, with its rung number.
    pub fn element_at(&self, x: i32, y: i32) -> Option<(u32, &'a LadderElement)> {
        let rung = self.engine.rung_at_y(y).ok()?;
        let geo: &'a RungGeometry = self.engine.rung(rung)?;
        geo.element_at(x, y).map(|el| (rung, el))
    }
}

/// Position of the element whose center X is closest to `x`: before it when
/// the point is left of the center, after it otherwise.
fn closest_insertion(list: &[&LadderElement], x: i32) -> usize {
    let mut closest_index = 0;
    let mut min_distance = i32::MAX;
    for (index, element) in list.iter().enumerate() {
        let distance = (element.center_x() - x).abs();
        if distance < min_distance {
            min_distance = distance;
            closest_index = index;
        }
    }

    let closest = list[closest_index];
    if x < closest.center_x() {
        if closest_index > 0 {
            list[closest_index - 1].position + 1
        } else {
            closest.position
        }
    } else {
        closest.position + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrail_core::{SequenceModel, TokenRung};
    use rrail_layout::LayoutMetrics;

    fn engine_for(texts: &[&str]) -> (LayoutEngine, Vec<TokenRung>) {
        let rungs: Vec<TokenRung> = texts.iter().map(|t| TokenRung::parse(t)).collect();
        let mut engine = LayoutEngine::new(LayoutMetrics::default());
        engine.layout_document(&rungs).unwrap();
        (engine, rungs)
    }

    #[test]
    fn resolve_finds_rung_and_main_context() {
        let (engine, _) = engine_for(&["XIC(A)XIC(B)OTE(C)"]);
        let resolver = PositionResolver::new(&engine);
        let geo = engine.rung(0).unwrap();
        let target = resolver
            .resolve(geo.elements[0].center_x() + 1, geo.centerline_y)
            .unwrap();
        assert_eq!(target.rung, 0);
        assert_eq!(target.branch_id, None);
        assert_eq!(target.position, 1);
    }

    #[test]
    fn resolve_left_of_first_element_inserts_at_zero() {
        let (engine, _) = engine_for(&["XIC(A)XIC(B)"]);
        let resolver = PositionResolver::new(&engine);
        let geo = engine.rung(0).unwrap();
        let target = resolver
            .resolve(geo.elements[0].rect.x, geo.centerline_y)
            .unwrap();
        assert_eq!(target.position, 0);
    }

    #[test]
    fn resolve_below_last_rung_is_a_coordinate_error() {
        let (engine, _) = engine_for(&["XIC(A)"]);
        let resolver = PositionResolver::new(&engine);
        assert!(matches!(
            resolver.resolve(100, 50_000),
            Err(CoordinateError::NoRungAtY { .. })
        ));
    }

    #[test]
    fn resolve_left_of_rail_is_outside_context() {
        let (engine, _) = engine_for(&["XIC(A)"]);
        let resolver = PositionResolver::new(&engine);
        let geo = engine.rung(0).unwrap();
        assert!(matches!(
            resolver.resolve(10, geo.centerline_y),
            Err(CoordinateError::OutsideContext { .. })
        ));
    }

    #[test]
    fn resolve_inside_branch_leg() {
        let (engine, rungs) = engine_for(&["XIC(A)[XIC(B),XIC(C)]OTE(D)"]);
        let resolver = PositionResolver::new(&engine);
        let geo = engine.rung(0).unwrap();
        let elements = rungs[0].elements().unwrap();
        let leg_id = elements[4].branch_id.unwrap();
        let leg_el = geo.element_at_position(4).unwrap();
        let target = resolver
            .resolve(leg_el.center_x() + 1, leg_el.wire_y)
            .unwrap();
        assert_eq!(target.branch_id, Some(leg_id));
        assert_eq!(target.branch_level, 1);
        assert_eq!(target.position, 5);
    }

    #[test]
    fn empty_rung_resolves_to_position_zero() {
        let (engine, _) = engine_for(&[""]);
        let resolver = PositionResolver::new(&engine);
        let geo = engine.rung(0).unwrap();
        let target = resolver.resolve(200, geo.centerline_y).unwrap();
        assert_eq!(target.position, 0);
        assert_eq!(target.branch_id, None);
    }

    #[test]
    fn inverse_for_empty_rung_starts_at_the_rail() {
        let (engine, _) = engine_for(&[""]);
        let resolver = PositionResolver::new(&engine);
        let m = LayoutMetrics::default();
        let point = resolver.insertion_point(0, 0, None).unwrap();
        assert_eq!(point.x, m.left_rail_x + m.element_spacing / 2);
    }

    #[test]
    fn inverse_append_lands_after_last_element() {
        let (engine, _) = engine_for(&["XIC(A)XIC(B)"]);
        let resolver = PositionResolver::new(&engine);
        let geo = engine.rung(0).unwrap();
        let m = LayoutMetrics::default();
        let point = resolver.insertion_point(0, 2, None).unwrap();
        assert_eq!(point.x, geo.elements[1].rect.right() + m.element_spacing);
        assert_eq!(point.y, geo.centerline_y);
    }

    #[test]
    fn round_trip_on_main_context() {
        let (engine, _) = engine_for(&["XIC(A)XIC(B)OTE(C)"]);
        let resolver = PositionResolver::new(&engine);
        for position in 0..=3usize {
            let point = resolver.insertion_point(0, position, None).unwrap();
            let target = resolver.resolve(point.x, point.y).unwrap();
            assert_eq!(target.position, position, "main slot {position}");
            assert_eq!(target.branch_id, None);
        }
    }

    #[test]
    fn round_trip_inside_branch_legs() {
        let (engine, rungs) = engine_for(&["XIC(A)[XIC(B)XIC(C),XIC(D)]OTE(E)"]);
        let resolver = PositionResolver::new(&engine);
        let elements = rungs[0].elements().unwrap();

        // First leg slots: before 2, between 2 and 3, after 3.
        let first_leg = elements[2].branch_id.unwrap();
        for position in [2usize, 3, 4] {
            let point = resolver
                .insertion_point(0, position, Some(first_leg))
                .unwrap();
            let target = resolver.resolve(point.x, point.y).unwrap();
            assert_eq!(target.branch_id, Some(first_leg), "leg slot {position}");
            assert_eq!(target.position, position);
        }

        // Second leg slots: after the divider, after its element.
        let second_leg = elements[4].branch_id.unwrap();
        for position in [5usize, 6] {
            let point = resolver
                .insertion_point(0, position, Some(second_leg))
                .unwrap();
            let target = resolver.resolve(point.x, point.y).unwrap();
            assert_eq!(target.branch_id, Some(second_leg), "leg slot {position}");
            assert_eq!(target.position, position);
        }
    }

    #[test]
    fn element_hit_test() {
        let (engine, _) = engine_for(&["XIC(A)"]);
        let resolver = PositionResolver::new(&engine);
        let geo = engine.rung(0).unwrap();
        let el = &geo.elements[0];
        let hit = resolver.element_at(el.center_x(), el.wire_y).unwrap();
        assert_eq!(hit.0, 0);
        assert_eq!(hit.1.position, 0);
        assert!(resolver.element_at(5, 5).is_none());
    }
}
