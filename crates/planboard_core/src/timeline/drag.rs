//! Drag and resize reconciler for timeline bars.
//!
//! # Responsibility
//! - Track one pointer gesture from pointer-down to pointer-up.
//! - Distinguish clicks from drags with a movement threshold.
//! - Produce a `DropPlan` with day-snapped dates clamped to the window.
//!
//! # Invariants
//! - At most one gesture is tracked at a time; every terminal call returns
//!   the reconciler to `DragState::Idle`.
//! - A committed move never pushes a bar further outside the window than it
//!   started; a purely vertical move keeps the dates.
//! - A resize never leaves an assignment shorter than two calendar days.
//! - Rejections carry no mutation; the caller only reports them.

use crate::config::TimelineConfig;
use crate::model::assignment::{Allocation, AssignmentId};
use crate::model::dates::{add_days, DateRange};
use crate::model::project::ProjectId;
use crate::model::team::MemberId;
use crate::timeline::geometry::{day_offset, TimelineWindow};
use log::debug;
use std::fmt::{Display, Formatter};

pub const DEFAULT_DRAG_THRESHOLD_PX: f64 = 5.0;

/// Pointer coordinates relative to the track's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Part of the bar the gesture started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragHandle {
    Body,
    StartEdge,
    EndEdge,
}

/// The bar under the pointer when the gesture began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragTarget {
    pub assignment_id: AssignmentId,
    pub project_id: ProjectId,
    pub member_id: MemberId,
    /// Effective range of the assignment at gesture start.
    pub range: DateRange,
    pub allocation: Allocation,
    pub handle: DragHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    /// Pointer is down but has not crossed the threshold.
    Pending {
        target: DragTarget,
        origin: PointerPosition,
    },
    Dragging {
        target: DragTarget,
        origin: PointerPosition,
        current: PointerPosition,
        hovered_member: Option<MemberId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropMode {
    Move,
    ResizeStart,
    ResizeEnd,
}

impl From<DragHandle> for DropMode {
    fn from(handle: DragHandle) -> Self {
        match handle {
            DragHandle::Body => Self::Move,
            DragHandle::StartEdge => Self::ResizeStart,
            DragHandle::EndEdge => Self::ResizeEnd,
        }
    }
}

/// Reschedule request produced by a completed gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropPlan {
    pub assignment_id: AssignmentId,
    pub project_id: ProjectId,
    pub from_member: MemberId,
    pub to_member: MemberId,
    pub original: DateRange,
    pub new_range: DateRange,
    pub allocation: Allocation,
    pub mode: DropMode,
}

impl DropPlan {
    pub fn dates_changed(&self) -> bool {
        self.original != self.new_range
    }

    pub fn member_changed(&self) -> bool {
        self.from_member != self.to_member
    }

    pub fn is_noop(&self) -> bool {
        !self.dates_changed() && !self.member_changed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    /// Bar was released outside any member row.
    NoDropTarget,
    /// Pointer was released outside the track.
    OutOfBounds,
    Cancelled,
}

impl Display for DropRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDropTarget => write!(f, "dropped outside any team member row"),
            Self::OutOfBounds => write!(f, "drop position is outside the visible timeline"),
            Self::Cancelled => write!(f, "drag cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Event did not belong to an active gesture.
    Ignored,
    Click(AssignmentId),
    Committed(DropPlan),
    Rejected(DropRejection),
}

/// Pointer gesture state machine bound to one timeline window.
#[derive(Debug, Clone)]
pub struct DragReconciler {
    window: TimelineWindow,
    track_width_px: f64,
    threshold_px: f64,
    state: DragState,
}

impl DragReconciler {
    pub fn new(window: TimelineWindow, track_width_px: f64, threshold_px: f64) -> Self {
        Self {
            window,
            track_width_px: track_width_px.max(0.0),
            threshold_px: threshold_px.max(0.0),
            state: DragState::Idle,
        }
    }

    /// Reconciler using the configured track width and threshold.
    pub fn from_config(window: TimelineWindow, config: &TimelineConfig) -> Self {
        Self::new(window, config.track_width_px, config.drag_threshold_px)
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn window(&self) -> &TimelineWindow {
        &self.window
    }

    /// Starts a gesture. Returns `false` while another gesture is active.
    pub fn pointer_down(&mut self, target: DragTarget, at: PointerPosition) -> bool {
        if self.state != DragState::Idle {
            return false;
        }
        self.state = DragState::Pending { target, origin: at };
        true
    }

    /// Feeds pointer movement. Returns `true` while the gesture is a drag.
    pub fn pointer_move(&mut self, at: PointerPosition, hovered_member: Option<MemberId>) -> bool {
        match self.state {
            DragState::Idle => false,
            DragState::Pending { target, origin } => {
                if !self.exceeds_threshold(origin, at) {
                    return false;
                }
                debug!(
                    "event=drag_start module=timeline status=ok assignment_id={} handle={:?}",
                    target.assignment_id, target.handle
                );
                self.state = DragState::Dragging {
                    target,
                    origin,
                    current: at,
                    hovered_member,
                };
                true
            }
            DragState::Dragging { target, origin, .. } => {
                self.state = DragState::Dragging {
                    target,
                    origin,
                    current: at,
                    hovered_member,
                };
                true
            }
        }
    }

    /// Ends the gesture and returns what it amounted to.
    pub fn pointer_up(
        &mut self,
        at: PointerPosition,
        hovered_member: Option<MemberId>,
    ) -> GestureOutcome {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        match state {
            DragState::Idle => GestureOutcome::Ignored,
            DragState::Pending { target, origin } => {
                if self.exceeds_threshold(origin, at) {
                    self.finish(target, origin, at, hovered_member)
                } else {
                    GestureOutcome::Click(target.assignment_id)
                }
            }
            DragState::Dragging {
                target,
                origin,
                hovered_member: recorded,
                ..
            } => self.finish(target, origin, at, hovered_member.or(recorded)),
        }
    }

    /// Aborts the active gesture without producing a plan.
    pub fn cancel(&mut self) -> GestureOutcome {
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Idle => GestureOutcome::Ignored,
            _ => GestureOutcome::Rejected(DropRejection::Cancelled),
        }
    }

    /// Plan the gesture would commit if released now, for ghost rendering.
    pub fn preview(&self) -> Option<DropPlan> {
        match self.state {
            DragState::Dragging {
                target,
                origin,
                current,
                hovered_member,
            } => self.plan(target, origin, current, hovered_member).ok(),
            _ => None,
        }
    }

    fn exceeds_threshold(&self, origin: PointerPosition, at: PointerPosition) -> bool {
        (at.x - origin.x).abs() > self.threshold_px || (at.y - origin.y).abs() > self.threshold_px
    }

    fn finish(
        &self,
        target: DragTarget,
        origin: PointerPosition,
        at: PointerPosition,
        hovered_member: Option<MemberId>,
    ) -> GestureOutcome {
        match self.plan(target, origin, at, hovered_member) {
            Ok(plan) => {
                debug!(
                    "event=drag_commit module=timeline status=ok assignment_id={} mode={:?} start={} end={}",
                    plan.assignment_id,
                    plan.mode,
                    plan.new_range.start(),
                    plan.new_range.end()
                );
                GestureOutcome::Committed(plan)
            }
            Err(rejection) => {
                debug!(
                    "event=drag_commit module=timeline status=rejected assignment_id={} reason={rejection:?}",
                    target.assignment_id
                );
                GestureOutcome::Rejected(rejection)
            }
        }
    }

    fn plan(
        &self,
        target: DragTarget,
        origin: PointerPosition,
        at: PointerPosition,
        hovered_member: Option<MemberId>,
    ) -> Result<DropPlan, DropRejection> {
        if !at.x.is_finite() || at.x < 0.0 || at.x > self.track_width_px {
            return Err(DropRejection::OutOfBounds);
        }
        let days = day_offset(
            at.x - origin.x,
            self.window.pixels_per_day(self.track_width_px),
        );
        let mode = DropMode::from(target.handle);
        let (new_range, to_member) = match mode {
            DropMode::Move => {
                let to_member = hovered_member.ok_or(DropRejection::NoDropTarget)?;
                (self.moved_range(&target.range, days), to_member)
            }
            DropMode::ResizeStart => (self.resized_start(&target.range, days), target.member_id),
            DropMode::ResizeEnd => (self.resized_end(&target.range, days), target.member_id),
        };
        Ok(DropPlan {
            assignment_id: target.assignment_id,
            project_id: target.project_id,
            from_member: target.member_id,
            to_member,
            original: target.range,
            new_range,
            allocation: target.allocation,
            mode,
        })
    }

    // Keeps the duration; the shift stops at the window edge it heads for.
    fn moved_range(&self, range: &DateRange, days: i64) -> DateRange {
        let days = if days > 0 {
            days.min((self.window.end() - range.end()).num_days().max(0))
        } else {
            days.max(-(range.start() - self.window.start()).num_days().max(0))
        };
        range.shift_days(days)
    }

    fn resized_start(&self, range: &DateRange, days: i64) -> DateRange {
        let latest = add_days(range.end(), -1);
        let start = self
            .window
            .clamp_date(add_days(range.start(), days))
            .min(latest);
        DateRange::spanning(start, range.end())
    }

    fn resized_end(&self, range: &DateRange, days: i64) -> DateRange {
        let earliest = add_days(range.start(), 1);
        let end = self
            .window
            .clamp_date(add_days(range.end(), days))
            .max(earliest);
        DateRange::spanning(range.start(), end)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DragHandle, DragReconciler, DragState, DragTarget, DropMode, DropRejection,
        GestureOutcome, PointerPosition,
    };
    use crate::model::assignment::Allocation;
    use crate::model::dates::{add_days, DateRange};
    use crate::timeline::geometry::TimelineWindow;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    // Jan..Apr 2024 is 121 days; 10 px per day.
    fn reconciler() -> DragReconciler {
        DragReconciler::new(TimelineWindow::months(d(1, 1), d(4, 1)), 1210.0, 5.0)
    }

    fn target(range: DateRange, handle: DragHandle) -> DragTarget {
        DragTarget {
            assignment_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            range,
            allocation: Allocation::new(50).unwrap(),
            handle,
        }
    }

    #[test]
    fn small_movement_is_a_click() {
        let mut drag = reconciler();
        let bar = target(DateRange::new(d(2, 1), d(2, 10)).unwrap(), DragHandle::Body);
        assert!(drag.pointer_down(bar, PointerPosition::new(400.0, 10.0)));
        assert!(!drag.pointer_move(PointerPosition::new(404.0, 14.0), None));
        let outcome = drag.pointer_up(PointerPosition::new(405.0, 10.0), None);
        assert_eq!(outcome, GestureOutcome::Click(bar.assignment_id));
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn move_onto_another_member_shifts_by_snapped_days() {
        let mut drag = reconciler();
        let bar = target(DateRange::new(d(2, 1), d(2, 10)).unwrap(), DragHandle::Body);
        let other_member = Uuid::new_v4();
        drag.pointer_down(bar, PointerPosition::new(400.0, 10.0));
        assert!(drag.pointer_move(PointerPosition::new(430.0, 40.0), Some(other_member)));
        let preview = drag.preview().unwrap();
        assert_eq!(preview.new_range.start(), d(2, 4));

        let GestureOutcome::Committed(plan) =
            drag.pointer_up(PointerPosition::new(451.0, 40.0), Some(other_member))
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.mode, DropMode::Move);
        assert_eq!(plan.new_range, DateRange::new(d(2, 6), d(2, 15)).unwrap());
        assert_eq!(plan.to_member, other_member);
        assert_eq!(plan.allocation, bar.allocation);
        assert!(plan.dates_changed() && plan.member_changed());
    }

    #[test]
    fn move_stops_at_window_edge() {
        let mut drag = reconciler();
        let bar = target(DateRange::new(d(1, 5), d(1, 14)).unwrap(), DragHandle::Body);
        drag.pointer_down(bar, PointerPosition::new(100.0, 0.0));
        drag.pointer_move(PointerPosition::new(0.0, 0.0), Some(bar.member_id));
        let GestureOutcome::Committed(plan) =
            drag.pointer_up(PointerPosition::new(0.0, 0.0), Some(bar.member_id))
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.new_range, DateRange::new(d(1, 1), d(1, 10)).unwrap());
        assert!(!plan.member_changed());
    }

    #[test]
    fn resize_end_moves_only_the_dragged_edge() {
        let mut drag = reconciler();
        let bar = target(DateRange::new(d(3, 1), d(3, 10)).unwrap(), DragHandle::EndEdge);
        drag.pointer_down(bar, PointerPosition::new(700.0, 0.0));
        drag.pointer_move(PointerPosition::new(680.0, 0.0), None);
        let GestureOutcome::Committed(plan) = drag.pointer_up(PointerPosition::new(680.0, 0.0), None)
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.new_range, DateRange::new(d(3, 1), d(3, 8)).unwrap());
        assert_eq!(plan.to_member, bar.member_id);

        drag.pointer_down(bar, PointerPosition::new(700.0, 0.0));
        drag.pointer_move(PointerPosition::new(500.0, 0.0), None);
        let GestureOutcome::Committed(plan) = drag.pointer_up(PointerPosition::new(500.0, 0.0), None)
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.new_range, DateRange::new(d(3, 1), d(3, 2)).unwrap());
    }

    #[test]
    fn resize_start_keeps_end_and_minimum_duration() {
        let mut drag = reconciler();
        let bar = target(
            DateRange::new(d(3, 1), d(3, 10)).unwrap(),
            DragHandle::StartEdge,
        );
        drag.pointer_down(bar, PointerPosition::new(600.0, 0.0));
        drag.pointer_move(PointerPosition::new(900.0, 0.0), None);
        let GestureOutcome::Committed(plan) = drag.pointer_up(PointerPosition::new(900.0, 0.0), None)
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.new_range, DateRange::new(d(3, 9), d(3, 10)).unwrap());
    }

    #[test]
    fn rejections_leave_reconciler_idle() {
        let mut drag = reconciler();
        let bar = target(DateRange::new(d(2, 1), d(2, 10)).unwrap(), DragHandle::Body);

        drag.pointer_down(bar, PointerPosition::new(400.0, 0.0));
        drag.pointer_move(PointerPosition::new(450.0, 0.0), None);
        assert_eq!(
            drag.pointer_up(PointerPosition::new(450.0, 0.0), None),
            GestureOutcome::Rejected(DropRejection::NoDropTarget)
        );
        assert_eq!(drag.state(), &DragState::Idle);

        drag.pointer_down(bar, PointerPosition::new(400.0, 0.0));
        drag.pointer_move(PointerPosition::new(1300.0, 0.0), Some(bar.member_id));
        assert_eq!(
            drag.pointer_up(PointerPosition::new(1300.0, 0.0), Some(bar.member_id)),
            GestureOutcome::Rejected(DropRejection::OutOfBounds)
        );

        drag.pointer_down(bar, PointerPosition::new(400.0, 0.0));
        drag.pointer_move(PointerPosition::new(450.0, 0.0), Some(bar.member_id));
        assert_eq!(
            drag.cancel(),
            GestureOutcome::Rejected(DropRejection::Cancelled)
        );
        assert_eq!(drag.cancel(), GestureOutcome::Ignored);
        assert_eq!(
            drag.pointer_up(PointerPosition::new(450.0, 0.0), None),
            GestureOutcome::Ignored
        );
    }

    #[test]
    fn vertical_move_of_straddling_bar_keeps_dates() {
        let mut drag = reconciler();
        let straddling = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            d(1, 20),
        )
        .unwrap();
        let bar = target(straddling, DragHandle::Body);
        let other_member = Uuid::new_v4();
        drag.pointer_down(bar, PointerPosition::new(100.0, 10.0));
        drag.pointer_move(PointerPosition::new(100.0, 60.0), Some(other_member));
        let GestureOutcome::Committed(plan) =
            drag.pointer_up(PointerPosition::new(100.0, 60.0), Some(other_member))
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.new_range, straddling);
        assert!(!plan.dates_changed());
        assert!(plan.member_changed());

        // Moving further left cannot push it further out of the window.
        drag.pointer_down(bar, PointerPosition::new(100.0, 10.0));
        drag.pointer_move(PointerPosition::new(20.0, 10.0), Some(bar.member_id));
        let GestureOutcome::Committed(plan) =
            drag.pointer_up(PointerPosition::new(20.0, 10.0), Some(bar.member_id))
        else {
            panic!("expected a committed plan");
        };
        assert!(plan.is_noop());

        drag.pointer_down(bar, PointerPosition::new(100.0, 10.0));
        drag.pointer_move(PointerPosition::new(150.0, 10.0), Some(bar.member_id));
        let GestureOutcome::Committed(plan) =
            drag.pointer_up(PointerPosition::new(150.0, 10.0), Some(bar.member_id))
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.new_range, straddling.shift_days(5));
    }

    #[test]
    fn bar_longer_than_window_can_change_member() {
        let mut drag = reconciler();
        let long = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 10, 1).unwrap(),
            d(12, 31),
        )
        .unwrap();
        let bar = target(long, DragHandle::Body);
        let other_member = Uuid::new_v4();
        drag.pointer_down(bar, PointerPosition::new(600.0, 10.0));
        drag.pointer_move(PointerPosition::new(640.0, 60.0), Some(other_member));
        let GestureOutcome::Committed(plan) =
            drag.pointer_up(PointerPosition::new(640.0, 60.0), Some(other_member))
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.new_range, long);
        assert_eq!(plan.to_member, other_member);
    }

    #[test]
    fn release_without_row_uses_last_hovered_member() {
        let mut drag = reconciler();
        let bar = target(DateRange::new(d(2, 1), d(2, 10)).unwrap(), DragHandle::Body);
        let other_member = Uuid::new_v4();
        drag.pointer_down(bar, PointerPosition::new(400.0, 10.0));
        drag.pointer_move(PointerPosition::new(400.0, 60.0), Some(other_member));
        let GestureOutcome::Committed(plan) = drag.pointer_up(PointerPosition::new(400.0, 60.0), None)
        else {
            panic!("expected a committed plan");
        };
        assert_eq!(plan.to_member, other_member);
        assert_eq!(plan.new_range, bar.range);
    }

    #[test]
    fn second_pointer_down_is_ignored_while_active() {
        let mut drag = reconciler();
        let bar = target(DateRange::new(d(2, 1), d(2, 10)).unwrap(), DragHandle::Body);
        assert!(drag.pointer_down(bar, PointerPosition::new(10.0, 0.0)));
        assert!(!drag.pointer_down(bar, PointerPosition::new(20.0, 0.0)));
    }
}
