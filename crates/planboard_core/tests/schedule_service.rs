use chrono::NaiveDate;
use planboard_core::db::open_db_in_memory;
use planboard_core::{
    Allocation, AssignmentRepository, DateRange, DragHandle, DragReconciler, DragTarget,
    DropMode, DropPlan, GestureOutcome, PointerPosition, Project, ProjectAssignment,
    ProjectRepository, ScheduleError, ScheduleOutcome, ScheduleService,
    SqliteAssignmentRepository, SqliteProjectRepository, SqliteTeamRepository, Team, TeamMember,
    TeamRepository, TimelineWindow,
};
use rusqlite::Connection;
use uuid::Uuid;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange::new(start, end).unwrap()
}

struct Board {
    team: Team,
    member_a: TeamMember,
    member_b: TeamMember,
}

fn seed_board(conn: &Connection) -> Board {
    let teams = SqliteTeamRepository::new(conn);
    let team = Team::new("Roadmap");
    teams.create_team(&team).unwrap();
    let member_a = TeamMember::new("Avery").with_team(team.id);
    let member_b = TeamMember::new("Blake").with_team(team.id);
    teams.create_member(&member_a).unwrap();
    teams.create_member(&member_b).unwrap();
    Board {
        team,
        member_a,
        member_b,
    }
}

fn seed_project(
    conn: &Connection,
    team_id: Uuid,
    dates: DateRange,
    members: &[(Uuid, u8)],
) -> (Project, Vec<ProjectAssignment>) {
    let project = Project::new("Checkout", team_id, dates);
    SqliteProjectRepository::new(conn)
        .create_project(&project)
        .unwrap();
    let assignments: Vec<ProjectAssignment> = members
        .iter()
        .map(|(member, percent)| {
            ProjectAssignment::new(project.id, *member, Allocation::new(*percent).unwrap())
        })
        .collect();
    SqliteAssignmentRepository::new(conn)
        .replace_project_assignments(project.id, &assignments)
        .unwrap();
    (project, assignments)
}

fn service(
    conn: &Connection,
) -> ScheduleService<SqliteProjectRepository<'_>, SqliteAssignmentRepository<'_>, SqliteTeamRepository<'_>>
{
    ScheduleService::new(
        SqliteProjectRepository::new(conn),
        SqliteAssignmentRepository::new(conn),
        SqliteTeamRepository::new(conn),
    )
}

// Jan..Apr 2024 at 10 px per day.
fn reconciler() -> DragReconciler {
    DragReconciler::new(TimelineWindow::months(d(1, 1), d(4, 1)), 1210.0, 5.0)
}

fn target_for(
    project: &Project,
    assignment: &ProjectAssignment,
    handle: DragHandle,
) -> DragTarget {
    DragTarget {
        assignment_id: assignment.id,
        project_id: project.id,
        member_id: assignment.member_id,
        range: assignment.effective_range(project),
        allocation: assignment.allocation,
        handle,
    }
}

fn committed(outcome: GestureOutcome) -> DropPlan {
    match outcome {
        GestureOutcome::Committed(plan) => plan,
        other => panic!("expected a committed plan, got {other:?}"),
    }
}

#[test]
fn dragging_onto_another_member_moves_the_assignment() {
    let conn = open_db_in_memory().unwrap();
    let board = seed_board(&conn);
    let (project, assignments) = seed_project(
        &conn,
        board.team.id,
        range(d(2, 1), d(2, 10)),
        &[(board.member_a.id, 75)],
    );

    let mut drag = reconciler();
    let bar = target_for(&project, &assignments[0], DragHandle::Body);
    drag.pointer_down(bar, PointerPosition::new(400.0, 20.0));
    drag.pointer_move(PointerPosition::new(425.0, 60.0), Some(board.member_b.id));
    let plan = committed(drag.pointer_up(PointerPosition::new(450.0, 60.0), Some(board.member_b.id)));
    assert_eq!(plan.new_range, range(d(2, 6), d(2, 15)));

    let outcome = service(&conn).apply_drop(&plan).unwrap();
    assert_eq!(
        outcome,
        ScheduleOutcome::Applied {
            dates_changed: true,
            member_changed: true
        }
    );

    let stored_project = SqliteProjectRepository::new(&conn)
        .get_project(project.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored_project.range(), range(d(2, 6), d(2, 15)));

    let assignment_repo = SqliteAssignmentRepository::new(&conn);
    assert!(assignment_repo.list_for_member(board.member_a.id).unwrap().is_empty());
    let moved = assignment_repo.list_for_member(board.member_b.id).unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].allocation.percent(), 75);
    assert_eq!(moved[0].start_date, Some(d(2, 6)));
    assert_eq!(moved[0].end_date, Some(d(2, 15)));
}

#[test]
fn resizing_the_end_edge_keeps_the_start() {
    let conn = open_db_in_memory().unwrap();
    let board = seed_board(&conn);
    let (project, assignments) = seed_project(
        &conn,
        board.team.id,
        range(d(3, 1), d(3, 10)),
        &[(board.member_a.id, 50)],
    );

    let mut drag = reconciler();
    let bar = target_for(&project, &assignments[0], DragHandle::EndEdge);
    drag.pointer_down(bar, PointerPosition::new(700.0, 0.0));
    drag.pointer_move(PointerPosition::new(690.0, 0.0), None);
    let plan = committed(drag.pointer_up(PointerPosition::new(680.0, 0.0), None));
    assert_eq!(plan.mode, DropMode::ResizeEnd);

    let outcome = service(&conn).apply_drop(&plan).unwrap();
    assert_eq!(
        outcome,
        ScheduleOutcome::Applied {
            dates_changed: true,
            member_changed: false
        }
    );
    let stored = SqliteAssignmentRepository::new(&conn)
        .get_assignment(assignments[0].id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.start_date, Some(d(3, 1)));
    assert_eq!(stored.end_date, Some(d(3, 8)));
    assert_eq!(stored.member_id, board.member_a.id);

    let mut drag = reconciler();
    let bar = DragTarget {
        range: range(d(3, 1), d(3, 8)),
        ..bar
    };
    drag.pointer_down(bar, PointerPosition::new(700.0, 0.0));
    let plan = committed(drag.pointer_up(PointerPosition::new(300.0, 0.0), None));
    assert_eq!(plan.new_range, range(d(3, 1), d(3, 2)));
}

#[test]
fn dropping_onto_an_already_assigned_member_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let board = seed_board(&conn);
    let dates = range(d(2, 1), d(2, 10));
    let (project, assignments) = seed_project(
        &conn,
        board.team.id,
        dates,
        &[(board.member_a.id, 50), (board.member_b.id, 25)],
    );

    let plan = DropPlan {
        assignment_id: assignments[0].id,
        project_id: project.id,
        from_member: board.member_a.id,
        to_member: board.member_b.id,
        original: dates,
        new_range: range(d(2, 3), d(2, 12)),
        allocation: assignments[0].allocation,
        mode: DropMode::Move,
    };
    let err = service(&conn).apply_drop(&plan).unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::MemberAlreadyAssigned { member_id, .. } if member_id == board.member_b.id
    ));

    let stored_project = SqliteProjectRepository::new(&conn)
        .get_project(project.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored_project.range(), dates);
    let mut stored = SqliteAssignmentRepository::new(&conn)
        .list_for_project(project.id)
        .unwrap();
    stored.sort_by_key(|item| item.id);
    let mut expected = assignments.clone();
    expected.sort_by_key(|item| item.id);
    assert_eq!(stored, expected);
}

#[test]
fn unchanged_plan_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let board = seed_board(&conn);
    let dates = range(d(1, 8), d(1, 12));
    let (project, assignments) =
        seed_project(&conn, board.team.id, dates, &[(board.member_a.id, 100)]);

    let plan = DropPlan {
        assignment_id: assignments[0].id,
        project_id: project.id,
        from_member: board.member_a.id,
        to_member: board.member_a.id,
        original: dates,
        new_range: dates,
        allocation: assignments[0].allocation,
        mode: DropMode::Move,
    };
    assert_eq!(service(&conn).apply_drop(&plan).unwrap(), ScheduleOutcome::NoChange);
    let stored = SqliteAssignmentRepository::new(&conn)
        .get_assignment(assignments[0].id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.start_date, None);
}

#[test]
fn missing_rows_are_reported_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let board = seed_board(&conn);
    let dates = range(d(1, 8), d(1, 12));
    let (project, assignments) =
        seed_project(&conn, board.team.id, dates, &[(board.member_a.id, 50)]);
    let base = DropPlan {
        assignment_id: assignments[0].id,
        project_id: project.id,
        from_member: board.member_a.id,
        to_member: board.member_a.id,
        original: dates,
        new_range: range(d(1, 9), d(1, 13)),
        allocation: assignments[0].allocation,
        mode: DropMode::Move,
    };

    let ghost = Uuid::new_v4();
    assert!(matches!(
        service(&conn).apply_drop(&DropPlan { project_id: ghost, ..base }),
        Err(ScheduleError::ProjectNotFound(id)) if id == ghost
    ));
    assert!(matches!(
        service(&conn).apply_drop(&DropPlan { to_member: ghost, ..base }),
        Err(ScheduleError::MemberNotFound(id)) if id == ghost
    ));
    assert!(matches!(
        service(&conn).apply_drop(&DropPlan { assignment_id: ghost, ..base }),
        Err(ScheduleError::AssignmentNotFound(id)) if id == ghost
    ));

    let stored_project = SqliteProjectRepository::new(&conn)
        .get_project(project.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored_project.range(), dates);
}

#[test]
fn failed_assignment_write_keeps_project_dates() {
    let conn = open_db_in_memory().unwrap();
    let board = seed_board(&conn);
    let dates = range(d(2, 1), d(2, 10));
    let (project, assignments) =
        seed_project(&conn, board.team.id, dates, &[(board.member_a.id, 50)]);
    conn.execute_batch(
        "CREATE TRIGGER assignees_locked BEFORE INSERT ON project_assignees
         BEGIN
            SELECT RAISE(ABORT, 'assignees locked');
         END;",
    )
    .unwrap();

    let plan = DropPlan {
        assignment_id: assignments[0].id,
        project_id: project.id,
        from_member: board.member_a.id,
        to_member: board.member_a.id,
        original: dates,
        new_range: dates.shift_days(5),
        allocation: assignments[0].allocation,
        mode: DropMode::Move,
    };
    assert!(matches!(
        service(&conn).apply_drop(&plan),
        Err(ScheduleError::Repo(_))
    ));

    let stored_project = SqliteProjectRepository::new(&conn)
        .get_project(project.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored_project.range(), dates);
    let stored = SqliteAssignmentRepository::new(&conn)
        .list_for_project(project.id)
        .unwrap();
    assert_eq!(stored, assignments);
}

#[test]
fn moving_one_bar_shifts_co_assignees_on_the_project_range() {
    let conn = open_db_in_memory().unwrap();
    let board = seed_board(&conn);
    let dates = range(d(3, 1), d(3, 10));
    let (project, assignments) = seed_project(
        &conn,
        board.team.id,
        dates,
        &[(board.member_a.id, 50), (board.member_b.id, 25)],
    );
    let dragged = assignments
        .iter()
        .find(|item| item.member_id == board.member_a.id)
        .unwrap();

    let plan = DropPlan {
        assignment_id: dragged.id,
        project_id: project.id,
        from_member: board.member_a.id,
        to_member: board.member_a.id,
        original: dates,
        new_range: dates.shift_days(7),
        allocation: dragged.allocation,
        mode: DropMode::Move,
    };
    service(&conn).apply_drop(&plan).unwrap();

    let stored_project = SqliteProjectRepository::new(&conn)
        .get_project(project.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored_project.range(), range(d(3, 8), d(3, 17)));

    let assignment_repo = SqliteAssignmentRepository::new(&conn);
    let moved = &assignment_repo.list_for_member(board.member_a.id).unwrap()[0];
    assert_eq!(moved.start_date, Some(d(3, 8)));

    // The co-assignee keeps inheriting, so it follows the project.
    let co_assignee = &assignment_repo.list_for_member(board.member_b.id).unwrap()[0];
    assert_eq!(co_assignee.start_date, None);
    assert_eq!(co_assignee.end_date, None);
    assert_eq!(
        co_assignee.effective_range(&stored_project),
        range(d(3, 8), d(3, 17))
    );
}
