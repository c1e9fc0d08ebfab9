//! Membership authority contracts and SQLite implementation.
//!
//! # Responsibility
//! - Resolve a principal's role within one team.
//! - Provide the team roster used for meeting notifications.
//! - Offer minimal bootstrap writes (team creation, member enrolment).
//!
//! # Invariants
//! - "Not a member" is `Ok(None)`, never an error.
//! - Exactly one super-admin per team: `create_team` installs it and
//!   `add_member` refuses a second one.

use crate::db::DbError;
use crate::model::team::{parse_team_role, Team, TeamId, TeamMember, TeamRole, UserId};
use crate::repo::parse_uuid;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MembershipResult<T> = Result<T, MembershipRepoError>;

/// Errors from membership reads and bootstrap writes.
#[derive(Debug)]
pub enum MembershipRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Team name is blank after trim.
    InvalidTeamName,
    /// Target team does not exist.
    TeamNotFound(TeamId),
    /// User is already enrolled in the team.
    AlreadyMember { team_id: TeamId, user_id: UserId },
    /// The team already has its super-admin.
    SuperAdminTaken(TeamId),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for MembershipRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidTeamName => write!(f, "team name must not be blank"),
            Self::TeamNotFound(id) => write!(f, "team not found: {id}"),
            Self::AlreadyMember { team_id, user_id } => {
                write!(f, "user {user_id} is already a member of team {team_id}")
            }
            Self::SuperAdminTaken(id) => write!(f, "team {id} already has a super admin"),
            Self::InvalidData(message) => write!(f, "invalid membership data: {message}"),
        }
    }
}

impl Error for MembershipRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for MembershipRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for MembershipRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read contract for role resolution and rosters.
pub trait MembershipAuthority {
    /// Role of `user_id` in `team_id`, or `None` when not a member.
    fn role_of(&self, team_id: TeamId, user_id: UserId) -> MembershipResult<Option<TeamRole>>;
    /// Every member of the team, highest role first.
    fn roster(&self, team_id: TeamId) -> MembershipResult<Vec<TeamMember>>;
    fn team(&self, team_id: TeamId) -> MembershipResult<Option<Team>>;
}

impl<M: MembershipAuthority + ?Sized> MembershipAuthority for &M {
    fn role_of(&self, team_id: TeamId, user_id: UserId) -> MembershipResult<Option<TeamRole>> {
        (**self).role_of(team_id, user_id)
    }

    fn roster(&self, team_id: TeamId) -> MembershipResult<Vec<TeamMember>> {
        (**self).roster(team_id)
    }

    fn team(&self, team_id: TeamId) -> MembershipResult<Option<Team>> {
        (**self).team(team_id)
    }
}

/// SQLite-backed membership authority.
#[derive(Clone, Copy)]
pub struct SqliteMembershipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMembershipRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates a team together with its single super-admin.
    pub fn create_team(&self, team: &Team, super_admin: UserId) -> MembershipResult<Team> {
        let name = team.name.trim();
        if name.is_empty() {
            return Err(MembershipRepoError::InvalidTeamName);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO teams (uuid, name, created_at) VALUES (?1, ?2, ?3);",
            params![team.id.to_string(), name, team.created_at],
        )?;
        insert_member(&tx, team.id, super_admin, TeamRole::SuperAdmin)?;
        tx.commit()?;

        self.team(team.id)?
            .ok_or(MembershipRepoError::TeamNotFound(team.id))
    }

    /// Enrolls one user with `role`.
    pub fn add_member(
        &self,
        team_id: TeamId,
        user_id: UserId,
        role: TeamRole,
    ) -> MembershipResult<TeamMember> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !team_exists(&tx, team_id)? {
            return Err(MembershipRepoError::TeamNotFound(team_id));
        }
        if lookup_role(&tx, team_id, user_id)?.is_some() {
            return Err(MembershipRepoError::AlreadyMember { team_id, user_id });
        }
        if role == TeamRole::SuperAdmin && has_super_admin(&tx, team_id)? {
            return Err(MembershipRepoError::SuperAdminTaken(team_id));
        }
        insert_member(&tx, team_id, user_id, role)?;
        tx.commit()?;

        Ok(TeamMember {
            team_id,
            user_id,
            role,
        })
    }
}

impl MembershipAuthority for SqliteMembershipRepository<'_> {
    fn role_of(&self, team_id: TeamId, user_id: UserId) -> MembershipResult<Option<TeamRole>> {
        lookup_role(self.conn, team_id, user_id)
    }

    fn roster(&self, team_id: TeamId) -> MembershipResult<Vec<TeamMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT team_uuid, user_uuid, role
             FROM team_members
             WHERE team_uuid = ?1
             ORDER BY
                CASE role
                    WHEN 'super_admin' THEN 0
                    WHEN 'admin' THEN 1
                    ELSE 2
                END ASC,
                user_uuid ASC;",
        )?;
        let mut rows = stmt.query([team_id.to_string()])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn team(&self, team_id: TeamId) -> MembershipResult<Option<Team>> {
        let row = self
            .conn
            .query_row(
                "SELECT uuid, name, created_at FROM teams WHERE uuid = ?1;",
                [team_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((id_text, name, created_at)) => Ok(Some(Team {
                id: parse_uuid(&id_text, "teams.uuid").map_err(MembershipRepoError::InvalidData)?,
                name,
                created_at,
            })),
        }
    }
}

fn lookup_role(
    conn: &Connection,
    team_id: TeamId,
    user_id: UserId,
) -> MembershipResult<Option<TeamRole>> {
    let role_text: Option<String> = conn
        .query_row(
            "SELECT role
             FROM team_members
             WHERE team_uuid = ?1
               AND user_uuid = ?2;",
            params![team_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    role_text
        .map(|value| {
            parse_team_role(&value).map_err(|err| {
                MembershipRepoError::InvalidData(format!("{err} in team_members.role"))
            })
        })
        .transpose()
}

fn team_exists(conn: &Connection, team_id: TeamId) -> MembershipResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM teams WHERE uuid = ?1);",
        [team_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn has_super_admin(conn: &Connection, team_id: TeamId) -> MembershipResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM team_members
            WHERE team_uuid = ?1
              AND role = 'super_admin'
        );",
        [team_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn insert_member(
    conn: &Connection,
    team_id: TeamId,
    user_id: UserId,
    role: TeamRole,
) -> MembershipResult<()> {
    conn.execute(
        "INSERT INTO team_members (team_uuid, user_uuid, role) VALUES (?1, ?2, ?3);",
        params![team_id.to_string(), user_id.to_string(), role.as_str()],
    )?;
    Ok(())
}

fn parse_member_row(row: &Row<'_>) -> MembershipResult<TeamMember> {
    let team_text: String = row.get("team_uuid")?;
    let user_text: String = row.get("user_uuid")?;
    let role_text: String = row.get("role")?;

    Ok(TeamMember {
        team_id: parse_uuid(&team_text, "team_members.team_uuid")
            .map_err(MembershipRepoError::InvalidData)?,
        user_id: parse_uuid(&user_text, "team_members.user_uuid")
            .map_err(MembershipRepoError::InvalidData)?,
        role: parse_team_role(&role_text).map_err(|err| {
            MembershipRepoError::InvalidData(format!("{err} in team_members.role"))
        })?,
    })
}
