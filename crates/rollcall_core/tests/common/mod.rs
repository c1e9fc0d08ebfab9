#![allow(dead_code)]

use rollcall_core::{
    Location, MeetingDraft, SqliteMembershipRepository, Team, TeamId, TeamRole, UserId,
};
use rusqlite::Connection;
use uuid::Uuid;

/// Fixed clock reading shared by every test file.
pub const NOW: i64 = 1_700_000_000_000;
pub const ONE_HOUR_MS: i64 = 60 * 60 * 1000;

pub fn fixed_clock() -> i64 {
    NOW
}

/// One team with a member of every role, plus a user outside it.
pub struct TeamFixture {
    pub team_id: TeamId,
    pub owner: UserId,
    pub admin: UserId,
    pub member: UserId,
    pub second_member: UserId,
    pub outsider: UserId,
}

pub fn seed_team(conn: &Connection, name: &str) -> TeamFixture {
    let membership = SqliteMembershipRepository::new(conn);
    let owner = Uuid::new_v4();
    let team = membership.create_team(&Team::new(name, NOW), owner).unwrap();

    let admin = Uuid::new_v4();
    let member = Uuid::new_v4();
    let second_member = Uuid::new_v4();
    membership.add_member(team.id, admin, TeamRole::Admin).unwrap();
    membership.add_member(team.id, member, TeamRole::Member).unwrap();
    membership
        .add_member(team.id, second_member, TeamRole::Member)
        .unwrap();

    TeamFixture {
        team_id: team.id,
        owner,
        admin,
        member,
        second_member,
        outsider: Uuid::new_v4(),
    }
}

pub fn draft(title: &str, start_time: i64) -> MeetingDraft {
    MeetingDraft {
        title: title.to_string(),
        description: "agenda to follow".to_string(),
        venue: "Main hall".to_string(),
        location: Location {
            latitude: 52.52,
            longitude: 13.405,
            altitude: 34.0,
        },
        start_time,
    }
}
