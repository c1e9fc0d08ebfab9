//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `rollcall_core` linkage, configuration and storage bootstrap.
//! - `rollcall demo` drives one meeting through its lifecycle and prints
//!   the resulting records as JSON.

use log::info;
use rollcall_core::{
    init_logging, now_epoch_ms, open_db, open_db_in_memory, CoreConfig, DisabledNotifier,
    Location, LogNotificationSink, MeetingDraft, MeetingGateway, MeetingNotifier,
    NotificationDispatcher, SqliteMeetingRepository, SqliteMembershipRepository, Team, TeamRole,
};
use rusqlite::Connection;
use std::error::Error;
use std::process::ExitCode;
use uuid::Uuid;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rollcall: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    init_logging(config.log_level, config.log_dir.as_deref())?;

    let conn = match &config.db_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    println!("rollcall_core ping={}", rollcall_core::ping());
    println!("rollcall_core version={}", rollcall_core::core_version());
    println!(
        "rollcall_core schema={}",
        rollcall_core::db::migrations::schema_version(&conn)?
    );

    if std::env::args().nth(1).as_deref() == Some("demo") {
        let dispatcher = if config.notifications_enabled {
            Some(NotificationDispatcher::spawn(LogNotificationSink)?)
        } else {
            None
        };
        let notifier: &dyn MeetingNotifier = match &dispatcher {
            Some(dispatcher) => dispatcher,
            None => &DisabledNotifier,
        };
        run_demo(&conn, notifier)?;

        if let Some(dispatcher) = dispatcher {
            let stats = dispatcher.shutdown();
            println!(
                "notifications delivered={} failed={}",
                stats.delivered, stats.failed
            );
        }
    }

    Ok(())
}

fn run_demo(conn: &Connection, notifier: &dyn MeetingNotifier) -> Result<(), Box<dyn Error>> {
    let owner = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let on_time_member = Uuid::new_v4();
    let late_member = Uuid::new_v4();

    let membership = SqliteMembershipRepository::new(conn);
    let team = membership.create_team(&Team::new("Demo team", now_epoch_ms()), owner)?;
    membership.add_member(team.id, admin, TeamRole::Admin)?;
    membership.add_member(team.id, on_time_member, TeamRole::Member)?;
    membership.add_member(team.id, late_member, TeamRole::Member)?;

    let gateway = MeetingGateway::new(SqliteMeetingRepository::new(conn), membership, notifier);

    let draft = MeetingDraft {
        title: "Weekly sync".to_string(),
        description: "Status round and blockers".to_string(),
        venue: "Room 4".to_string(),
        location: Location::default(),
        start_time: now_epoch_ms() + 60 * 60 * 1000,
    };
    let meeting = gateway.create_meeting(owner, team.id, &draft)?;
    info!("event=demo module=cli status=ok meeting_id={}", meeting.id);

    gateway.start_meeting(admin, team.id, meeting.id)?;
    gateway.start_attendance(admin, team.id, meeting.id)?;
    gateway.mark_attendance(on_time_member, team.id, meeting.id)?;
    gateway.end_attendance(admin, team.id, meeting.id)?;
    gateway.mark_attendance(late_member, team.id, meeting.id)?;
    let meeting = gateway.end_meeting(admin, team.id, meeting.id)?;

    let attendance = gateway.attendance_for_meeting(admin, team.id, meeting.id, None)?;
    println!("{}", serde_json::to_string_pretty(&meeting)?);
    println!("{}", serde_json::to_string_pretty(&attendance)?);
    Ok(())
}
