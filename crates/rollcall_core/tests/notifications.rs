mod common;

use common::{draft, fixed_clock, seed_team, NOW, ONE_HOUR_MS};
use rollcall_core::db::open_db_in_memory;
use rollcall_core::{
    MeetingGateway, MeetingListQuery, MeetingNotice, MeetingNotifier, NotificationDispatcher,
    NotificationError, NotificationSink, SqliteMeetingRepository, SqliteMembershipRepository,
};
use std::cell::RefCell;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<MeetingNotice>>>);

impl NotificationSink for RecordingSink {
    fn deliver(&self, notice: &MeetingNotice) -> Result<(), NotificationError> {
        self.0.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

struct FailingSink;

impl NotificationSink for FailingSink {
    fn deliver(&self, _notice: &MeetingNotice) -> Result<(), NotificationError> {
        Err(NotificationError::Delivery("mail relay rejected".to_string()))
    }
}

/// Notifier that refuses every notice at enqueue time.
#[derive(Default)]
struct RefusingNotifier {
    attempts: RefCell<u32>,
}

impl MeetingNotifier for RefusingNotifier {
    fn notify_meeting_created(&self, _notice: MeetingNotice) -> Result<(), NotificationError> {
        *self.attempts.borrow_mut() += 1;
        Err(NotificationError::DispatcherClosed)
    }
}

#[test]
fn created_meeting_is_announced_to_the_whole_roster() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Design guild");
    let sink = RecordingSink::default();
    let dispatcher = NotificationDispatcher::spawn(sink.clone()).unwrap();

    let meeting = {
        let gateway = MeetingGateway::new(
            SqliteMeetingRepository::new(&conn),
            SqliteMembershipRepository::new(&conn),
            &dispatcher,
        )
        .with_clock(fixed_clock);
        gateway
            .create_meeting(fixture.owner, fixture.team_id, &draft("Critique", NOW + ONE_HOUR_MS))
            .unwrap()
    };

    let stats = dispatcher.shutdown();
    assert_eq!(stats.delivered, 1);

    let notices = sink.0.lock().unwrap();
    assert_eq!(notices.len(), 1);
    let notice = &notices[0];
    assert_eq!(notice.meeting, meeting);
    assert_eq!(notice.team_name, "Design guild");
    assert_eq!(notice.recipients.len(), 4);
    for user in [
        fixture.owner,
        fixture.admin,
        fixture.member,
        fixture.second_member,
    ] {
        assert!(notice.recipients.contains(&user));
    }
    assert!(!notice.recipients.contains(&fixture.outsider));
    assert!(notice
        .body()
        .starts_with("A new meeting Critique has been scheduled for the team Design guild"));
}

#[test]
fn delivery_failure_does_not_fail_creation() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Design guild");
    let dispatcher = NotificationDispatcher::spawn(FailingSink).unwrap();

    {
        let gateway = MeetingGateway::new(
            SqliteMeetingRepository::new(&conn),
            SqliteMembershipRepository::new(&conn),
            &dispatcher,
        )
        .with_clock(fixed_clock);
        gateway
            .create_meeting(fixture.owner, fixture.team_id, &draft("Critique", NOW + ONE_HOUR_MS))
            .unwrap();
    }

    let stats = dispatcher.shutdown();
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, 1);
}

#[test]
fn enqueue_failure_does_not_fail_creation() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Design guild");
    let notifier = RefusingNotifier::default();
    let gateway = MeetingGateway::new(
        SqliteMeetingRepository::new(&conn),
        SqliteMembershipRepository::new(&conn),
        &notifier,
    )
    .with_clock(fixed_clock);

    let meeting = gateway
        .create_meeting(fixture.owner, fixture.team_id, &draft("Critique", NOW + ONE_HOUR_MS))
        .unwrap();

    assert_eq!(*notifier.attempts.borrow(), 1);
    let listed = gateway
        .list_meetings(fixture.member, &MeetingListQuery::for_team(fixture.team_id))
        .unwrap();
    assert_eq!(listed, vec![meeting]);
}

#[test]
fn rejected_creation_sends_nothing() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Design guild");
    let notifier = RefusingNotifier::default();
    let gateway = MeetingGateway::new(
        SqliteMeetingRepository::new(&conn),
        SqliteMembershipRepository::new(&conn),
        &notifier,
    )
    .with_clock(fixed_clock);

    assert!(gateway
        .create_meeting(fixture.owner, fixture.team_id, &draft("Critique", NOW - ONE_HOUR_MS))
        .is_err());
    assert!(gateway
        .create_meeting(fixture.member, fixture.team_id, &draft("Critique", NOW + ONE_HOUR_MS))
        .is_err());
    assert_eq!(*notifier.attempts.borrow(), 0);
}
