use chrono::NaiveDate;
use planboard_core::db::open_db_in_memory;
use planboard_core::{
    ChangeEvent, ChangeFeed, ChangeKind, DateRange, EntityKind, Profile, ProfileRepository,
    Project, ProjectRepository, SqliteProfileRepository, SqliteProjectRepository,
    SqliteTeamRepository, Team, TeamRepository, UserRole,
};
use std::sync::{Arc, Mutex};

fn recorder(feed: &ChangeFeed, entity: EntityKind) -> Arc<Mutex<Vec<ChangeEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    feed.subscribe(entity, move |event| sink.lock().unwrap().push(*event));
    seen
}

#[test]
fn committed_writes_reach_subscribers_of_that_table_only() {
    let conn = open_db_in_memory().unwrap();
    let feed = ChangeFeed::new();
    let project_events = recorder(&feed, EntityKind::Projects);
    let team_events = recorder(&feed, EntityKind::Teams);

    let teams = SqliteTeamRepository::new(&conn).with_feed(&feed);
    let projects = SqliteProjectRepository::new(&conn).with_feed(&feed);

    let team = Team::new("Platform");
    teams.create_team(&team).unwrap();
    let range = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
    .unwrap();
    let project = Project::new("Feed", team.id, range);
    projects.create_project(&project).unwrap();
    projects.update_project_dates(project.id, range).unwrap();
    projects.delete_project(project.id).unwrap();

    let kinds: Vec<ChangeKind> = project_events
        .lock()
        .unwrap()
        .iter()
        .map(|event| event.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
    );
    assert!(project_events
        .lock()
        .unwrap()
        .iter()
        .all(|event| event.id == project.id));
    assert_eq!(team_events.lock().unwrap().len(), 1);
}

#[test]
fn failed_writes_and_unsubscribed_listeners_are_silent() {
    let conn = open_db_in_memory().unwrap();
    let feed = ChangeFeed::new();
    let seen = recorder(&feed, EntityKind::Profiles);
    let extra = feed.subscribe(EntityKind::Profiles, |_| panic!("unsubscribed listener ran"));
    assert_eq!(feed.listener_count(EntityKind::Profiles), 2);
    assert!(feed.unsubscribe(extra));
    assert!(!feed.unsubscribe(extra));

    let profiles = SqliteProfileRepository::new(&conn).with_feed(&feed);
    let profile = Profile::new("Ana@Example.com", "Ana", UserRole::Planner);
    profiles.create_profile(&profile).unwrap();
    assert!(profiles
        .create_profile(&Profile::new("ana@example.com", "Ana 2", UserRole::Viewer))
        .is_err());
    profiles.set_active(profile.id, false).unwrap();

    assert_eq!(seen.lock().unwrap().len(), 2);
    let stored = profiles.find_by_email("ANA@example.com").unwrap().unwrap();
    assert_eq!(stored.email, "ana@example.com");
    assert!(!stored.is_active);
    assert!(profiles.list_profiles(false).unwrap().is_empty());
    assert_eq!(profiles.list_profiles(true).unwrap().len(), 1);
}
