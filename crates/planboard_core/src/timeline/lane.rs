//! Member lane assembly: geometry plus slot packing.

use crate::config::TimelineConfig;
use crate::model::assignment::{AssignmentId, ProjectAssignment};
use crate::model::dates::DateRange;
use crate::model::project::{Project, ProjectId};
use crate::model::team::MemberId;
use crate::timeline::geometry::TimelineWindow;
use crate::timeline::slots::{pack_slots, SlotRequest};
use std::collections::HashMap;

/// One assignment of the member together with its project.
#[derive(Debug, Clone, Copy)]
pub struct LaneInput<'a> {
    pub assignment: &'a ProjectAssignment,
    pub project: &'a Project,
}

/// Render-ready bar for one assignment. Recomputed on every layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedAssignment {
    pub assignment_id: AssignmentId,
    pub project_id: ProjectId,
    pub member_id: MemberId,
    pub range: DateRange,
    pub left_pct: f64,
    pub width_pct: f64,
    pub slot: usize,
    pub slots_needed: usize,
    pub slot_height: f64,
    pub forced: bool,
}

/// Lays out one member's lane inside `window`.
///
/// All of the member's assignments are packed before clipping to the window,
/// so a bar keeps its row while the timeline scrolls. Bars outside the
/// window are omitted. Output is ordered by slot, then left edge.
pub fn build_member_lane(
    window: &TimelineWindow,
    inputs: &[LaneInput<'_>],
    config: &TimelineConfig,
) -> Vec<PositionedAssignment> {
    let layout = config.slot_layout();
    let resolved: HashMap<AssignmentId, (LaneInput<'_>, DateRange)> = inputs
        .iter()
        .map(|input| {
            (
                input.assignment.id,
                (*input, input.assignment.effective_range(input.project)),
            )
        })
        .collect();

    let requests: Vec<SlotRequest> = resolved
        .iter()
        .map(|(id, (input, range))| SlotRequest {
            id: *id,
            start: range.start(),
            end: range.end(),
            allocation: input.assignment.allocation,
        })
        .collect();

    let mut lane: Vec<PositionedAssignment> = pack_slots(&requests, &layout)
        .into_iter()
        .filter_map(|placement| {
            let (input, range) = resolved.get(&placement.id)?;
            let bar = window.bar_position(range, config.min_visible_width_pct)?;
            Some(PositionedAssignment {
                assignment_id: placement.id,
                project_id: input.project.id,
                member_id: input.assignment.member_id,
                range: *range,
                left_pct: bar.left_pct,
                width_pct: bar.width_pct,
                slot: placement.slot,
                slots_needed: placement.slots_needed,
                slot_height: placement.slot_height,
                forced: placement.forced,
            })
        })
        .collect();

    lane.sort_by(|a, b| {
        a.slot
            .cmp(&b.slot)
            .then_with(|| a.left_pct.total_cmp(&b.left_pct))
            .then_with(|| a.assignment_id.cmp(&b.assignment_id))
    });
    lane
}

#[cfg(test)]
mod tests {
    use super::{build_member_lane, LaneInput};
    use crate::config::TimelineConfig;
    use crate::model::assignment::{Allocation, ProjectAssignment};
    use crate::model::dates::DateRange;
    use crate::model::project::Project;
    use crate::timeline::geometry::TimelineWindow;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn slots_stay_stable_when_window_scrolls_past_earlier_work() {
        let team = Uuid::new_v4();
        let member = Uuid::new_v4();
        let early = Project::new(
            "Early",
            team,
            DateRange::new(d(2024, 1, 1), d(2024, 3, 31)).unwrap(),
        );
        let late = Project::new(
            "Late",
            team,
            DateRange::new(d(2024, 3, 1), d(2024, 6, 30)).unwrap(),
        );
        let early_assignment =
            ProjectAssignment::new(early.id, member, Allocation::new(50).unwrap());
        let late_assignment = ProjectAssignment::new(late.id, member, Allocation::new(50).unwrap());
        let inputs = [
            LaneInput {
                assignment: &early_assignment,
                project: &early,
            },
            LaneInput {
                assignment: &late_assignment,
                project: &late,
            },
        ];
        let config = TimelineConfig::default();

        let full = build_member_lane(
            &TimelineWindow::months(d(2024, 1, 1), d(2024, 6, 1)),
            &inputs,
            &config,
        );
        let scrolled = build_member_lane(
            &TimelineWindow::months(d(2024, 3, 1), d(2024, 8, 1)),
            &inputs,
            &config,
        );

        let late_full = full
            .iter()
            .find(|bar| bar.assignment_id == late_assignment.id)
            .unwrap();
        let late_scrolled = scrolled
            .iter()
            .find(|bar| bar.assignment_id == late_assignment.id)
            .unwrap();
        assert_eq!(late_full.slot, 2);
        assert_eq!(late_scrolled.slot, late_full.slot);
        assert_eq!(late_scrolled.left_pct, 0.0);

        let outside = build_member_lane(
            &TimelineWindow::months(d(2024, 9, 1), d(2024, 12, 1)),
            &inputs,
            &config,
        );
        assert!(outside.is_empty());
    }
}
