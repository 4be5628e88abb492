//! Core domain logic for Planboard.
//! This crate is the single source of truth for planning invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod service;
pub mod timeline;

pub use config::{ConfigError, LoggingConfig, PlanboardConfig, TimelineConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::assignment::{Allocation, AssignmentId, NewAssignment, ProjectAssignment};
pub use model::dates::{add_months, month_end, month_start, DateRange};
pub use model::profile::{Profile, ProfileId, UserRole};
pub use model::project::{Product, ProductId, Project, ProjectId, ProjectStatus, Visibility};
pub use model::team::{
    MemberId, MembershipId, Role, RoleId, Team, TeamId, TeamIdealSize, TeamMember, TeamMembership,
};
pub use model::ModelValidationError;
pub use repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
pub use repo::changes::{ChangeEvent, ChangeFeed, ChangeKind, EntityKind, SubscriptionId};
pub use repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
pub use repo::project_repo::{ProjectListQuery, ProjectRepository, SqliteProjectRepository};
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use repo::{RepoError, RepoResult};
pub use report::assignments::{
    AssignmentReportRow, AssignmentReports, MemberUtilization, ReportFilter, StaffingGap,
};
pub use report::export::{
    assignment_report_schema, project_schema, ExportError, ExportField, ExportRecord,
    ExportSchema, ExportTable, ExportValue, ReferenceIndex,
};
pub use service::membership_service::{MembershipError, MembershipService};
pub use service::project_service::{NewProject, ProjectService, ProjectServiceError};
pub use service::schedule_service::{ScheduleError, ScheduleOutcome, ScheduleService};
pub use timeline::drag::{
    DragHandle, DragReconciler, DragState, DragTarget, DropMode, DropPlan, DropRejection,
    GestureOutcome, PointerPosition,
};
pub use timeline::geometry::{BarPosition, MonthColumn, TimelineWindow};
pub use timeline::lane::{build_member_lane, LaneInput, PositionedAssignment};
pub use timeline::slots::{pack_slots, SlotLayout, SlotPlacement, SlotRequest};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
