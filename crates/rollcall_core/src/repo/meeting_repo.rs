//! Meeting store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `meetings` and append/read over `meeting_attendance`.
//! - Translate the in-memory `MeetingState` to and from four flag columns.
//! - Offer a unit of work so one read-modify-write runs in one transaction.
//!
//! # Invariants
//! - Write paths call `Meeting::validate()` before SQL mutations.
//! - Read paths reject unreachable flag combinations instead of masking them.
//! - A `(meeting, user)` attendance pair is inserted at most once; the
//!   `UNIQUE` constraint surfaces as `DuplicateAttendance`.

use crate::db::DbError;
use crate::model::attendance::AttendanceRecord;
use crate::model::lifecycle::{LifecycleFlags, MeetingState};
use crate::model::meeting::{Location, Meeting, MeetingId, MeetingValidationError};
use crate::model::team::{TeamId, UserId};
use crate::repo::{bool_to_int, int_to_bool, parse_uuid};
use rusqlite::types::Value;
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode, Row, Transaction};
use rusqlite::{OptionalExtension, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MEETING_SELECT_SQL: &str = "SELECT
    m.uuid AS uuid,
    m.team_uuid AS team_uuid,
    m.title AS title,
    m.description AS description,
    m.venue AS venue,
    m.latitude AS latitude,
    m.longitude AS longitude,
    m.altitude AS altitude,
    m.start_time AS start_time,
    m.meeting_active AS meeting_active,
    m.attendance_active AS attendance_active,
    m.meeting_closed AS meeting_closed,
    m.attendance_closed AS attendance_closed,
    m.created_at AS created_at,
    m.updated_at AS updated_at
FROM meetings m";

const ATTENDANCE_SELECT_SQL: &str = "SELECT
    user_uuid,
    meeting_uuid,
    marked_at,
    on_time
FROM meeting_attendance";

pub type MeetingRepoResult<T> = Result<T, MeetingRepoError>;

/// Errors from meeting store operations.
#[derive(Debug)]
pub enum MeetingRepoError {
    /// Meeting fields failed validation before a write.
    Validation(MeetingValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target meeting does not exist.
    MeetingNotFound(MeetingId),
    /// An attendance record already exists for this pair.
    DuplicateAttendance {
        user_id: UserId,
        meeting_id: MeetingId,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for MeetingRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MeetingNotFound(id) => write!(f, "meeting not found: {id}"),
            Self::DuplicateAttendance {
                user_id,
                meeting_id,
            } => write!(
                f,
                "attendance already marked for user {user_id} in meeting {meeting_id}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted meeting data: {message}"),
        }
    }
}

impl Error for MeetingRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MeetingValidationError> for MeetingRepoError {
    fn from(value: MeetingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for MeetingRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for MeetingRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Sort order for meeting listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeetingOrder {
    /// Earliest start time first.
    #[default]
    StartTimeAsc,
    /// Latest start time first.
    StartTimeDesc,
}

/// Filter options for listing one team's meetings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingListQuery {
    pub team_id: TeamId,
    /// `Some(true)` keeps only ended meetings, `Some(false)` only open ones.
    pub over: Option<bool>,
    pub order: MeetingOrder,
}

impl MeetingListQuery {
    /// All meetings of one team, earliest first.
    pub fn for_team(team_id: TeamId) -> Self {
        Self {
            team_id,
            over: None,
            order: MeetingOrder::default(),
        }
    }
}

/// Persistence contract consumed by the lifecycle engine.
pub trait MeetingRepository {
    fn create_meeting(&self, meeting: &Meeting) -> MeetingRepoResult<Meeting>;
    fn get_meeting(&self, id: MeetingId) -> MeetingRepoResult<Option<Meeting>>;
    /// Persists every mutable field, including lifecycle flags.
    fn update_meeting(&self, meeting: &Meeting) -> MeetingRepoResult<Meeting>;
    fn delete_meeting(&self, id: MeetingId) -> MeetingRepoResult<()>;
    fn list_meetings(&self, query: &MeetingListQuery) -> MeetingRepoResult<Vec<Meeting>>;
    /// Not-yet-ended meetings across every team the user belongs to.
    fn list_upcoming_meetings_for_user(&self, user_id: UserId) -> MeetingRepoResult<Vec<Meeting>>;
    fn create_attendance(&self, record: &AttendanceRecord) -> MeetingRepoResult<()>;
    fn get_attendance(
        &self,
        user_id: UserId,
        meeting_id: MeetingId,
    ) -> MeetingRepoResult<Option<AttendanceRecord>>;
    fn list_attendance_by_meeting(
        &self,
        meeting_id: MeetingId,
        on_time: Option<bool>,
    ) -> MeetingRepoResult<Vec<AttendanceRecord>>;
    fn list_attendance_by_user(&self, user_id: UserId) -> MeetingRepoResult<Vec<AttendanceRecord>>;

    /// Runs `work` as one unit of work against the store.
    ///
    /// Everything `work` does through the passed repository commits together
    /// when it returns `Ok` and is discarded when it returns `Err`. Not
    /// reentrant: `work` must not call `atomically` again.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<MeetingRepoError>;
}

/// SQLite-backed meeting store.
#[derive(Clone, Copy)]
pub struct SqliteMeetingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeetingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MeetingRepository for SqliteMeetingRepository<'_> {
    fn create_meeting(&self, meeting: &Meeting) -> MeetingRepoResult<Meeting> {
        meeting.validate()?;
        let flags = meeting.flags();

        self.conn.execute(
            "INSERT INTO meetings (
                uuid,
                team_uuid,
                title,
                description,
                venue,
                latitude,
                longitude,
                altitude,
                start_time,
                meeting_active,
                attendance_active,
                meeting_closed,
                attendance_closed,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
            params![
                meeting.id.to_string(),
                meeting.team_id.to_string(),
                meeting.title.as_str(),
                meeting.description.as_str(),
                meeting.venue.as_str(),
                meeting.location.latitude,
                meeting.location.longitude,
                meeting.location.altitude,
                meeting.start_time,
                bool_to_int(flags.meeting_active),
                bool_to_int(flags.attendance_active),
                bool_to_int(flags.meeting_closed),
                bool_to_int(flags.attendance_closed),
                meeting.created_at,
                meeting.updated_at,
            ],
        )?;

        load_required_meeting(self.conn, meeting.id)
    }

    fn get_meeting(&self, id: MeetingId) -> MeetingRepoResult<Option<Meeting>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEETING_SELECT_SQL} WHERE m.uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_meeting_row(row)?));
        }
        Ok(None)
    }

    fn update_meeting(&self, meeting: &Meeting) -> MeetingRepoResult<Meeting> {
        meeting.validate()?;
        let flags = meeting.flags();

        let changed = self.conn.execute(
            "UPDATE meetings
             SET
                title = ?2,
                description = ?3,
                venue = ?4,
                latitude = ?5,
                longitude = ?6,
                altitude = ?7,
                start_time = ?8,
                meeting_active = ?9,
                attendance_active = ?10,
                meeting_closed = ?11,
                attendance_closed = ?12,
                updated_at = ?13
             WHERE uuid = ?1;",
            params![
                meeting.id.to_string(),
                meeting.title.as_str(),
                meeting.description.as_str(),
                meeting.venue.as_str(),
                meeting.location.latitude,
                meeting.location.longitude,
                meeting.location.altitude,
                meeting.start_time,
                bool_to_int(flags.meeting_active),
                bool_to_int(flags.attendance_active),
                bool_to_int(flags.meeting_closed),
                bool_to_int(flags.attendance_closed),
                meeting.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(MeetingRepoError::MeetingNotFound(meeting.id));
        }

        load_required_meeting(self.conn, meeting.id)
    }

    fn delete_meeting(&self, id: MeetingId) -> MeetingRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM meetings WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(MeetingRepoError::MeetingNotFound(id));
        }
        Ok(())
    }

    fn list_meetings(&self, query: &MeetingListQuery) -> MeetingRepoResult<Vec<Meeting>> {
        let mut sql = format!("{MEETING_SELECT_SQL} WHERE m.team_uuid = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(query.team_id.to_string())];

        if let Some(over) = query.over {
            sql.push_str(" AND m.meeting_closed = ?");
            bind_values.push(Value::Integer(bool_to_int(over)));
        }

        sql.push_str(match query.order {
            MeetingOrder::StartTimeAsc => " ORDER BY m.start_time ASC, m.uuid ASC",
            MeetingOrder::StartTimeDesc => " ORDER BY m.start_time DESC, m.uuid ASC",
        });

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut meetings = Vec::new();
        while let Some(row) = rows.next()? {
            meetings.push(parse_meeting_row(row)?);
        }
        Ok(meetings)
    }

    fn list_upcoming_meetings_for_user(&self, user_id: UserId) -> MeetingRepoResult<Vec<Meeting>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEETING_SELECT_SQL}
             INNER JOIN team_members tm ON tm.team_uuid = m.team_uuid
             WHERE tm.user_uuid = ?1
               AND m.meeting_closed = 0
             ORDER BY m.start_time ASC, m.uuid ASC;"
        ))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut meetings = Vec::new();
        while let Some(row) = rows.next()? {
            meetings.push(parse_meeting_row(row)?);
        }
        Ok(meetings)
    }

    fn create_attendance(&self, record: &AttendanceRecord) -> MeetingRepoResult<()> {
        let inserted = self.conn.execute(
            "INSERT INTO meeting_attendance (
                meeting_uuid,
                user_uuid,
                marked_at,
                on_time
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                record.meeting_id.to_string(),
                record.user_id.to_string(),
                record.marked_at,
                bool_to_int(record.on_time),
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(MeetingRepoError::DuplicateAttendance {
                user_id: record.user_id,
                meeting_id: record.meeting_id,
            }),
            Err(err) if is_foreign_key_violation(&err) => {
                Err(MeetingRepoError::MeetingNotFound(record.meeting_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_attendance(
        &self,
        user_id: UserId,
        meeting_id: MeetingId,
    ) -> MeetingRepoResult<Option<AttendanceRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{ATTENDANCE_SELECT_SQL} WHERE user_uuid = ?1 AND meeting_uuid = ?2;"),
                params![user_id.to_string(), meeting_id.to_string()],
                |row| Ok(parse_attendance_row(row)),
            )
            .optional()?;
        record.transpose()
    }

    fn list_attendance_by_meeting(
        &self,
        meeting_id: MeetingId,
        on_time: Option<bool>,
    ) -> MeetingRepoResult<Vec<AttendanceRecord>> {
        let mut sql = format!("{ATTENDANCE_SELECT_SQL} WHERE meeting_uuid = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(meeting_id.to_string())];
        if let Some(on_time) = on_time {
            sql.push_str(" AND on_time = ?");
            bind_values.push(Value::Integer(bool_to_int(on_time)));
        }
        sql.push_str(" ORDER BY marked_at ASC, user_uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_attendance_row(row)?);
        }
        Ok(records)
    }

    fn list_attendance_by_user(&self, user_id: UserId) -> MeetingRepoResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTENDANCE_SELECT_SQL}
             WHERE user_uuid = ?1
             ORDER BY marked_at DESC, meeting_uuid ASC;"
        ))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_attendance_row(row)?);
        }
        Ok(records)
    }

    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<MeetingRepoError>,
    {
        // IMMEDIATE takes the write lock up front, so two units of work on
        // the same database never interleave their reads and writes.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(MeetingRepoError::from)?;
        let value = work(self)?;
        tx.commit().map_err(MeetingRepoError::from)?;
        Ok(value)
    }
}

fn load_required_meeting(conn: &Connection, id: MeetingId) -> MeetingRepoResult<Meeting> {
    let mut stmt = conn.prepare(&format!("{MEETING_SELECT_SQL} WHERE m.uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_meeting_row(row);
    }
    Err(MeetingRepoError::MeetingNotFound(id))
}

fn parse_meeting_row(row: &Row<'_>) -> MeetingRepoResult<Meeting> {
    let id_text: String = row.get("uuid")?;
    let id = parse_uuid(&id_text, "meetings.uuid").map_err(MeetingRepoError::InvalidData)?;
    let team_text: String = row.get("team_uuid")?;
    let team_id =
        parse_uuid(&team_text, "meetings.team_uuid").map_err(MeetingRepoError::InvalidData)?;

    let flags = LifecycleFlags::new(
        read_flag(row, "meeting_active")?,
        read_flag(row, "attendance_active")?,
        read_flag(row, "meeting_closed")?,
        read_flag(row, "attendance_closed")?,
    );
    let state = MeetingState::from_flags(flags)
        .map_err(|err| MeetingRepoError::InvalidData(format!("meeting {id}: {err}")))?;

    let meeting = Meeting {
        id,
        team_id,
        title: row.get("title")?,
        description: row.get("description")?,
        venue: row.get("venue")?,
        location: Location {
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            altitude: row.get("altitude")?,
        },
        start_time: row.get("start_time")?,
        state,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    meeting.validate()?;
    Ok(meeting)
}

fn parse_attendance_row(row: &Row<'_>) -> MeetingRepoResult<AttendanceRecord> {
    let user_text: String = row.get("user_uuid")?;
    let meeting_text: String = row.get("meeting_uuid")?;
    let on_time_value: i64 = row.get("on_time")?;

    Ok(AttendanceRecord {
        user_id: parse_uuid(&user_text, "meeting_attendance.user_uuid")
            .map_err(MeetingRepoError::InvalidData)?,
        meeting_id: parse_uuid(&meeting_text, "meeting_attendance.meeting_uuid")
            .map_err(MeetingRepoError::InvalidData)?,
        marked_at: row.get("marked_at")?,
        on_time: int_to_bool(on_time_value, "meeting_attendance.on_time")
            .map_err(MeetingRepoError::InvalidData)?,
    })
}

fn read_flag(row: &Row<'_>, column: &'static str) -> MeetingRepoResult<bool> {
    let value: i64 = row.get(column)?;
    int_to_bool(value, column).map_err(MeetingRepoError::InvalidData)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}
