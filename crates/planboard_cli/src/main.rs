//! `planboard` command-line entry point.
//!
//! # Responsibility
//! - Load config, start logging and open the planning database.
//! - Expose lane layout and CSV export for scripting and sanity checks.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use planboard_core::db::{open_db, schema_status};
use planboard_core::{
    assignment_report_schema, build_member_lane, init_from_config, project_schema,
    AssignmentReports, AssignmentRepository, LaneInput, PlanboardConfig, ProjectListQuery,
    ProjectRepository, ReferenceIndex, ReportFilter, SqliteAssignmentRepository,
    SqliteProjectRepository, SqliteTeamRepository, TeamRepository, TimelineWindow,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "planboard", version, about = "Team capacity and roadmap planning")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overriding the config value.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core linkage info.
    Ping,
    /// Create or migrate the database.
    Init,
    /// Print one member's packed timeline lane.
    Lanes {
        #[arg(long)]
        member: Uuid,
        /// First month, YYYY-MM.
        #[arg(long, value_parser = parse_month)]
        from: NaiveDate,
        /// Last month, YYYY-MM.
        #[arg(long, value_parser = parse_month)]
        to: NaiveDate,
    },
    /// Write a report as CSV.
    Export {
        #[arg(long, value_enum)]
        report: ReportKind,
        /// Comma-separated column keys; defaults to every column.
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        include_tentative: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportKind {
    Projects,
    Assignments,
}

fn parse_month(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM, got `{value}`: {err}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => PlanboardConfig::load(path)?,
        None => PlanboardConfig::default(),
    };
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    init_from_config(&config.logging)?;

    match cli.command {
        Command::Ping => {
            println!("planboard_core ping={}", planboard_core::ping());
            println!("planboard_core version={}", planboard_core::core_version());
            Ok(())
        }
        Command::Init => {
            let conn = open_db(&config.database_path)?;
            let status = schema_status(&conn)?;
            info!(
                "event=cli_init module=cli status=ok path={} schema_version={}",
                config.database_path.display(),
                status.current
            );
            println!(
                "database ready at {} (schema v{})",
                config.database_path.display(),
                status.current
            );
            Ok(())
        }
        Command::Lanes { member, from, to } => print_lane(&config, member, from, to),
        Command::Export {
            report,
            fields,
            output,
            include_tentative,
        } => export(&config, report, &fields, output, include_tentative),
    }
}

fn print_lane(
    config: &PlanboardConfig,
    member_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> CliResult<()> {
    let conn = open_db(&config.database_path)?;
    let teams = SqliteTeamRepository::new(&conn);
    let projects = SqliteProjectRepository::new(&conn);
    let assignments = SqliteAssignmentRepository::new(&conn);

    let member = teams
        .get_member(member_id)?
        .ok_or_else(|| format!("team member not found: {member_id}"))?;
    let member_assignments = assignments.list_for_member(member_id)?;
    let mut member_projects = Vec::with_capacity(member_assignments.len());
    for assignment in &member_assignments {
        if let Some(project) = projects.get_project(assignment.project_id)? {
            member_projects.push(project);
        }
    }
    let inputs: Vec<LaneInput<'_>> = member_assignments
        .iter()
        .filter_map(|assignment| {
            member_projects
                .iter()
                .find(|project| project.id == assignment.project_id)
                .map(|project| LaneInput {
                    assignment,
                    project,
                })
        })
        .collect();

    let window = TimelineWindow::months(from, to);
    let lane = build_member_lane(&window, &inputs, &config.timeline);
    println!(
        "{} {} .. {} ({} bars)",
        member.name,
        window.start(),
        window.end(),
        lane.len()
    );
    for bar in &lane {
        let project_name = member_projects
            .iter()
            .find(|project| project.id == bar.project_id)
            .map_or("?", |project| project.name.as_str());
        println!(
            "slot={} span={} left={:.2}% width={:.2}% {} {}..{}{}",
            bar.slot,
            bar.slots_needed,
            bar.left_pct,
            bar.width_pct,
            project_name,
            bar.range.start(),
            bar.range.end(),
            if bar.forced { " (forced)" } else { "" }
        );
    }
    Ok(())
}

fn export(
    config: &PlanboardConfig,
    report: ReportKind,
    fields: &[String],
    output: Option<PathBuf>,
    include_tentative: bool,
) -> CliResult<()> {
    let conn = open_db(&config.database_path)?;
    let teams = SqliteTeamRepository::new(&conn);
    let projects = SqliteProjectRepository::new(&conn);
    let keys: Vec<&str> = fields.iter().map(String::as_str).collect();

    let mut references: ReferenceIndex = teams
        .list_teams()?
        .into_iter()
        .map(|team| (team.id, team.name))
        .collect();
    for product in projects.list_products()? {
        references.insert(product.id, product.name);
    }

    let table = match report {
        ReportKind::Projects => {
            let rows: Vec<_> = projects
                .list_projects(&ProjectListQuery::default())?
                .into_iter()
                .filter(|project| include_tentative || !project.is_tentative())
                .collect();
            project_schema().build_table(&rows, &keys, &references)
        }
        ReportKind::Assignments => {
            let reports = AssignmentReports::new(
                SqliteProjectRepository::new(&conn),
                SqliteAssignmentRepository::new(&conn),
                SqliteTeamRepository::new(&conn),
            );
            let rows = reports.assignment_report(&ReportFilter {
                include_tentative,
                ..ReportFilter::default()
            })?;
            assignment_report_schema().build_table(&rows, &keys, &references)
        }
    };

    match output {
        Some(path) => {
            table.write_csv(std::fs::File::create(&path)?)?;
            info!(
                "event=cli_export module=cli status=ok report={report:?} rows={} path={}",
                table.rows.len(),
                path.display()
            );
        }
        None => table.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}
