mod common;

use common::{seed_team, NOW};
use rollcall_core::db::open_db_in_memory;
use rollcall_core::{
    MembershipAuthority, MembershipRepoError, SqliteMembershipRepository, Team, TeamRole,
};
use uuid::Uuid;

#[test]
fn create_team_installs_its_super_admin() {
    let conn = open_db_in_memory().unwrap();
    let membership = SqliteMembershipRepository::new(&conn);
    let owner = Uuid::new_v4();

    let team = membership
        .create_team(&Team::new("  Robotics club ", NOW), owner)
        .unwrap();

    assert_eq!(team.name, "Robotics club");
    assert_eq!(
        membership.role_of(team.id, owner).unwrap(),
        Some(TeamRole::SuperAdmin)
    );
}

#[test]
fn blank_team_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let membership = SqliteMembershipRepository::new(&conn);

    let err = membership
        .create_team(&Team::new("   ", NOW), Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, MembershipRepoError::InvalidTeamName));
}

#[test]
fn non_member_role_is_none_not_error() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Chess");
    let membership = SqliteMembershipRepository::new(&conn);

    assert_eq!(membership.role_of(fixture.team_id, fixture.outsider).unwrap(), None);
    assert_eq!(membership.role_of(Uuid::new_v4(), fixture.owner).unwrap(), None);
}

#[test]
fn add_member_rejects_duplicates_second_super_admin_and_unknown_team() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Chess");
    let membership = SqliteMembershipRepository::new(&conn);

    let err = membership
        .add_member(fixture.team_id, fixture.member, TeamRole::Admin)
        .unwrap_err();
    assert!(matches!(err, MembershipRepoError::AlreadyMember { .. }));

    let err = membership
        .add_member(fixture.team_id, Uuid::new_v4(), TeamRole::SuperAdmin)
        .unwrap_err();
    assert!(matches!(err, MembershipRepoError::SuperAdminTaken(id) if id == fixture.team_id));

    let missing_team = Uuid::new_v4();
    let err = membership
        .add_member(missing_team, Uuid::new_v4(), TeamRole::Member)
        .unwrap_err();
    assert!(matches!(err, MembershipRepoError::TeamNotFound(id) if id == missing_team));
}

#[test]
fn roster_lists_highest_role_first() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_team(&conn, "Chess");
    let membership = SqliteMembershipRepository::new(&conn);

    let roster = membership.roster(fixture.team_id).unwrap();
    let roles: Vec<TeamRole> = roster.iter().map(|member| member.role).collect();
    assert_eq!(
        roles,
        vec![
            TeamRole::SuperAdmin,
            TeamRole::Admin,
            TeamRole::Member,
            TeamRole::Member
        ]
    );
    assert_eq!(roster[0].user_id, fixture.owner);
    assert_eq!(roster[1].user_id, fixture.admin);
}

#[test]
fn roles_are_scoped_to_one_team() {
    let conn = open_db_in_memory().unwrap();
    let first = seed_team(&conn, "First");
    let second = seed_team(&conn, "Second");
    let membership = SqliteMembershipRepository::new(&conn);

    assert_eq!(membership.role_of(second.team_id, first.owner).unwrap(), None);
    assert_eq!(
        membership.team(second.team_id).unwrap().map(|team| team.name),
        Some("Second".to_string())
    );
}
