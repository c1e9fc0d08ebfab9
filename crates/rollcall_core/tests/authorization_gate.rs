mod common;

use common::{draft, fixed_clock, seed_team, NOW, ONE_HOUR_MS};
use rollcall_core::db::open_db_in_memory;
use rollcall_core::{
    AuthorizationGate, DisabledNotifier, GateError, MeetingAction, MeetingGateway,
    MeetingListQuery, MeetingRepository, MeetingServiceError, MeetingState,
    SqliteMeetingRepository, SqliteMembershipRepository, TeamRole,
};

#[test]
fn gate_resolves_roles_from_the_membership_store() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Lab");
    let gate = AuthorizationGate::new(SqliteMembershipRepository::new(&conn));

    assert_eq!(
        gate.authorize(fixture.team_id, fixture.owner, MeetingAction::CreateMeeting)
            .unwrap(),
        TeamRole::SuperAdmin
    );
    assert_eq!(
        gate.authorize(fixture.team_id, fixture.admin, MeetingAction::ViewAttendance)
            .unwrap(),
        TeamRole::Admin
    );
    assert_eq!(
        gate.authorize(fixture.team_id, fixture.member, MeetingAction::MarkAttendance)
            .unwrap(),
        TeamRole::Member
    );

    match gate
        .authorize(fixture.team_id, fixture.member, MeetingAction::EndMeeting)
        .unwrap_err()
    {
        GateError::Denied(denied) => {
            assert_eq!(denied.required, TeamRole::Admin);
            assert_eq!(denied.actual, Some(TeamRole::Member));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn denied_callers_never_reach_the_engine() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Lab");
    let gateway = MeetingGateway::new(
        SqliteMeetingRepository::new(&conn),
        SqliteMembershipRepository::new(&conn),
        DisabledNotifier,
    )
    .with_clock(fixed_clock);

    let err = gateway
        .create_meeting(fixture.admin, fixture.team_id, &draft("Nope", NOW + ONE_HOUR_MS))
        .unwrap_err();
    assert!(matches!(err, MeetingServiceError::Unauthorized(_)));
    assert!(SqliteMeetingRepository::new(&conn)
        .list_meetings(&MeetingListQuery::for_team(fixture.team_id))
        .unwrap()
        .is_empty());

    let meeting = gateway
        .create_meeting(fixture.owner, fixture.team_id, &draft("Real", NOW + ONE_HOUR_MS))
        .unwrap();

    for result in [
        gateway.start_meeting(fixture.member, fixture.team_id, meeting.id),
        gateway.start_attendance(fixture.member, fixture.team_id, meeting.id),
        gateway.end_attendance(fixture.member, fixture.team_id, meeting.id),
        gateway.end_meeting(fixture.member, fixture.team_id, meeting.id),
    ] {
        assert!(matches!(result, Err(MeetingServiceError::Unauthorized(_))));
    }
    assert!(matches!(
        gateway.attendance_for_meeting(fixture.member, fixture.team_id, meeting.id, None),
        Err(MeetingServiceError::Unauthorized(_))
    ));

    let stored = SqliteMeetingRepository::new(&conn)
        .get_meeting(meeting.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, MeetingState::Scheduled);
}

#[test]
fn outsiders_cannot_even_read() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Lab");
    let gateway = MeetingGateway::new(
        SqliteMeetingRepository::new(&conn),
        SqliteMembershipRepository::new(&conn),
        DisabledNotifier,
    )
    .with_clock(fixed_clock);
    let meeting = gateway
        .create_meeting(fixture.owner, fixture.team_id, &draft("Private", NOW + ONE_HOUR_MS))
        .unwrap();

    let err = gateway
        .get_meeting(fixture.outsider, fixture.team_id, meeting.id)
        .unwrap_err();
    match err {
        MeetingServiceError::Unauthorized(denied) => {
            assert_eq!(denied.action, MeetingAction::ViewMeeting);
            assert_eq!(denied.actual, None);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        gateway.list_meetings(fixture.outsider, &MeetingListQuery::for_team(fixture.team_id)),
        Err(MeetingServiceError::Unauthorized(_))
    ));
    assert!(matches!(
        gateway.mark_attendance(fixture.outsider, fixture.team_id, meeting.id),
        Err(MeetingServiceError::Unauthorized(_))
    ));
}

#[test]
fn higher_roles_inherit_lower_privileges() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Lab");
    let gateway = MeetingGateway::new(
        SqliteMeetingRepository::new(&conn),
        SqliteMembershipRepository::new(&conn),
        DisabledNotifier,
    )
    .with_clock(fixed_clock);
    let meeting = gateway
        .create_meeting(fixture.owner, fixture.team_id, &draft("Open", NOW + ONE_HOUR_MS))
        .unwrap();

    gateway
        .start_meeting(fixture.owner, fixture.team_id, meeting.id)
        .unwrap();
    gateway
        .start_attendance(fixture.owner, fixture.team_id, meeting.id)
        .unwrap();
    let record = gateway
        .mark_attendance(fixture.admin, fixture.team_id, meeting.id)
        .unwrap();
    assert!(record.on_time);
    let listed = gateway
        .list_meetings(fixture.admin, &MeetingListQuery::for_team(fixture.team_id))
        .unwrap();
    assert_eq!(listed.len(), 1);
}
