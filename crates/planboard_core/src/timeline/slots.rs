//! Allocation slot packing for one member's timeline lane.
//!
//! Each lane is split into `slots_per_member` rows of `slot_percentage`
//! capacity. An assignment needs `ceil(percent / slot_percentage)` adjacent
//! rows; temporally overlapping assignments must not share a row.
//!
//! # Invariants
//! - Output is independent of input order (requests are sorted first).
//! - Every placement satisfies `slot + slots_needed <= slots_per_member`.
//! - Nothing is dropped: when no position fits, the assignment is forced to
//!   the last position that can hold it and flagged `forced`.

use crate::model::assignment::{Allocation, AssignmentId};
use chrono::NaiveDate;
use std::cmp::Ordering;

pub const SLOTS_PER_MEMBER: usize = 4;
pub const SLOT_PERCENTAGE: u8 = 25;
pub const SLOT_BASE_HEIGHT: f64 = 12.0;

/// Lane dimensions used by the packer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotLayout {
    pub slots_per_member: usize,
    pub slot_percentage: u8,
    pub base_height: f64,
}

impl Default for SlotLayout {
    fn default() -> Self {
        Self {
            slots_per_member: SLOTS_PER_MEMBER,
            slot_percentage: SLOT_PERCENTAGE,
            base_height: SLOT_BASE_HEIGHT,
        }
    }
}

impl SlotLayout {
    pub fn slots_needed(&self, allocation: Allocation) -> usize {
        let capacity = self.slots_per_member.max(1);
        allocation
            .slots_needed(self.slot_percentage)
            .clamp(1, capacity)
    }
}

/// One assignment reduced to what packing needs. Dates are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub id: AssignmentId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub allocation: Allocation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPlacement {
    pub id: AssignmentId,
    /// First (top) row, 0-based.
    pub slot: usize,
    pub slots_needed: usize,
    pub slot_height: f64,
    /// Placed over existing rows because no free position existed.
    pub forced: bool,
}

#[derive(Debug, Clone, Copy)]
struct Reserved {
    start: NaiveDate,
    end: NaiveDate,
}

/// Packs one member's assignments into lane rows, first fit.
///
/// Placements are returned in packing order: start date ascending, larger
/// allocation first on ties, then end date and id.
pub fn pack_slots(requests: &[SlotRequest], layout: &SlotLayout) -> Vec<SlotPlacement> {
    let capacity = layout.slots_per_member.max(1);
    let mut ordered: Vec<&SlotRequest> = requests.iter().collect();
    ordered.sort_by(|a, b| packing_order(a, b));

    let mut rows: Vec<Vec<Reserved>> = vec![Vec::new(); capacity];
    let mut placements = Vec::with_capacity(ordered.len());

    for request in ordered {
        let needed = layout.slots_needed(request.allocation);
        let span = Reserved {
            start: request.start,
            end: request.end,
        };

        let fitting = (0..=capacity - needed).find(|&position| {
            rows[position..position + needed]
                .iter()
                .all(|row| row.iter().all(|taken| !overlaps(&span, taken)))
        });
        let (slot, forced) = match fitting {
            Some(position) => (position, false),
            None => (capacity.saturating_sub(needed), true),
        };

        for row in &mut rows[slot..slot + needed] {
            row.push(span);
        }
        placements.push(SlotPlacement {
            id: request.id,
            slot,
            slots_needed: needed,
            slot_height: layout.base_height * needed as f64,
            forced,
        });
    }

    placements
}

fn packing_order(a: &SlotRequest, b: &SlotRequest) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| b.allocation.cmp(&a.allocation))
        .then_with(|| a.end.cmp(&b.end))
        .then_with(|| a.id.cmp(&b.id))
}

// Half-open interval test: `!(end <= other_start || start >= other_end)`.
// Inclusive ends: a span ending the day before another starts does not collide.
fn overlaps(a: &Reserved, b: &Reserved) -> bool {
    !(a.end < b.start || a.start > b.end)
}

#[cfg(test)]
mod tests {
    use super::{pack_slots, SlotLayout, SlotRequest};
    use crate::model::assignment::Allocation;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn request(start: NaiveDate, end: NaiveDate, percent: u8) -> SlotRequest {
        SlotRequest {
            id: Uuid::new_v4(),
            start,
            end,
            allocation: Allocation::new(percent).unwrap(),
        }
    }

    #[test]
    fn touching_ranges_share_a_day_and_conflict() {
        let first = request(d(1, 1), d(1, 15), 100);
        let second = request(d(1, 15), d(1, 31), 25);
        let placements = pack_slots(&[first, second], &SlotLayout::default());
        let second_placement = placements.iter().find(|p| p.id == second.id).unwrap();
        assert!(second_placement.forced);
        assert_eq!(second_placement.slot, 3);
    }

    #[test]
    fn back_to_back_ranges_reuse_rows() {
        let first = request(d(1, 1), d(1, 15), 100);
        let second = request(d(1, 16), d(1, 31), 100);
        let placements = pack_slots(&[second, first], &SlotLayout::default());
        assert!(placements.iter().all(|p| p.slot == 0 && !p.forced));
    }

    #[test]
    fn higher_allocation_picks_first_on_same_start() {
        let small = request(d(2, 1), d(2, 10), 25);
        let large = request(d(2, 1), d(2, 10), 75);
        let placements = pack_slots(&[small, large], &SlotLayout::default());
        assert_eq!(placements[0].id, large.id);
        assert_eq!(placements[0].slot, 0);
        assert_eq!(placements[1].slot, 3);
    }

    #[test]
    fn open_ended_range_at_calendar_limit_packs() {
        let last = request(d(3, 1), NaiveDate::MAX, 50);
        let other = request(d(4, 1), d(4, 30), 50);
        let placements = pack_slots(&[last, other], &SlotLayout::default());
        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].slot, 0);
        assert_eq!(placements[1].slot, 2);
        assert!(placements.iter().all(|p| !p.forced));
    }
}
