//! SQLite-based store implementation

use chrono::{DateTime, Local, SecondsFormat, Utc};
use oche_api::{Attendee, GameMode, Match, Participant, Player, TrainingSession};
use oche_util::{parse_timestamp, AttendeeId, Cents, GameModeId, MatchId, PlayerId, SessionId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, CascadeSummary, Store, StoreError, StoreResult};

const PLAYER_COLUMNS: &str = "id, name, email, nickname, created_at";
const GAME_MODE_COLUMNS: &str = "id, name, description, rules_json, is_active, created_at";
const SESSION_COLUMNS: &str =
    "id, name, description, scheduled_at, cost_cents, status, created_by, created_at, updated_at";
const ATTENDEE_COLUMNS: &str = "id, session_id, player_id, guest_name, attended, created_at";
const MATCH_COLUMNS: &str = "id, session_id, game_mode_id, p1_player_id, p1_guest_name, \
     p2_player_id, p2_guest_name, player1_score, player2_score, status, winner, completed_at, \
     created_at";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- Team directory
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                nickname TEXT,
                created_at TEXT NOT NULL
            );

            -- Game mode catalog
            CREATE TABLE IF NOT EXISTS game_modes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                rules_json TEXT NOT NULL DEFAULT '{}',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Sessions are deleted logically
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                scheduled_at TEXT NOT NULL,
                cost_cents INTEGER NOT NULL CHECK (cost_cents >= 0),
                status TEXT NOT NULL
                    CHECK (status IN ('planned', 'active', 'completed', 'cancelled')),
                created_by TEXT REFERENCES players(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            );

            -- Roster: exactly one of player_id / guest_name
            CREATE TABLE IF NOT EXISTS attendees (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES sessions(id),
                player_id TEXT REFERENCES players(id),
                guest_name TEXT,
                attended INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                CHECK ((player_id IS NULL) <> (guest_name IS NULL))
            );

            -- Matches: each slot holds exactly one of player / guest
            CREATE TABLE IF NOT EXISTS matches (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES sessions(id),
                game_mode_id TEXT NOT NULL REFERENCES game_modes(id),
                p1_player_id TEXT REFERENCES players(id),
                p1_guest_name TEXT,
                p2_player_id TEXT REFERENCES players(id),
                p2_guest_name TEXT,
                player1_score INTEGER NOT NULL DEFAULT 0,
                player2_score INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL
                    CHECK (status IN ('pending', 'playing', 'completed', 'cancelled')),
                winner TEXT CHECK (winner IS NULL OR winner IN ('player1', 'player2', 'draw')),
                completed_at TEXT,
                created_at TEXT NOT NULL,
                CHECK ((p1_player_id IS NULL) <> (p1_guest_name IS NULL)),
                CHECK ((p2_player_id IS NULL) <> (p2_guest_name IS NULL))
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_sessions_scheduled ON sessions(scheduled_at);
            CREATE INDEX IF NOT EXISTS idx_attendees_session ON attendees(session_id);
            CREATE INDEX IF NOT EXISTS idx_matches_session ON matches(session_id);
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

/// Timestamps are stored in UTC with fixed precision so that text order is
/// chronological order.
fn ts(dt: &DateTime<Local>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_err(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}

fn get_parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| conversion_err(idx, e))
}

fn get_parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let s: Option<String> = row.get(idx)?;
    s.map(|s| s.parse().map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let s: String = row.get(idx)?;
    parse_timestamp(&s).ok_or_else(|| conversion_err(idx, format!("invalid timestamp '{s}'")))
}

fn get_timestamp_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Local>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        parse_timestamp(&s).ok_or_else(|| conversion_err(idx, format!("invalid timestamp '{s}'")))
    })
    .transpose()
}

fn get_participant(
    row: &Row<'_>,
    player_idx: usize,
    guest_idx: usize,
) -> rusqlite::Result<Participant> {
    let player_id: Option<PlayerId> = get_parsed_opt(row, player_idx)?;
    let guest_name: Option<String> = row.get(guest_idx)?;
    Participant::from_parts(player_id, guest_name)
        .ok_or_else(|| conversion_err(player_idx, "participant must be a player or a guest"))
}

fn participant_columns(p: &Participant) -> (Option<String>, Option<&str>) {
    (p.player_id().map(|id| id.to_string()), p.guest_name())
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: get_parsed(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        nickname: row.get(3)?,
        created_at: get_timestamp(row, 4)?,
    })
}

fn game_mode_from_row(row: &Row<'_>) -> rusqlite::Result<GameMode> {
    let rules_json: String = row.get(3)?;
    Ok(GameMode {
        id: get_parsed(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        rules: serde_json::from_str(&rules_json).map_err(|e| conversion_err(3, e))?,
        is_active: row.get(4)?,
        created_at: get_timestamp(row, 5)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<TrainingSession> {
    Ok(TrainingSession {
        id: get_parsed(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        scheduled_at: get_timestamp(row, 3)?,
        cost_per_attendee: Cents::new(row.get(4)?),
        status: get_parsed(row, 5)?,
        created_by: get_parsed_opt(row, 6)?,
        created_at: get_timestamp(row, 7)?,
        updated_at: get_timestamp(row, 8)?,
    })
}

fn attendee_from_row(row: &Row<'_>) -> rusqlite::Result<Attendee> {
    Ok(Attendee {
        id: get_parsed(row, 0)?,
        session_id: get_parsed(row, 1)?,
        participant: get_participant(row, 2, 3)?,
        attended: row.get(4)?,
        created_at: get_timestamp(row, 5)?,
    })
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<Match> {
    Ok(Match {
        id: get_parsed(row, 0)?,
        session_id: get_parsed(row, 1)?,
        game_mode_id: get_parsed(row, 2)?,
        player1: get_participant(row, 3, 4)?,
        player2: get_participant(row, 5, 6)?,
        player1_score: row.get(7)?,
        player2_score: row.get(8)?,
        status: get_parsed(row, 9)?,
        winner: get_parsed_opt(row, 10)?,
        completed_at: get_timestamp_opt(row, 11)?,
        created_at: get_timestamp(row, 12)?,
    })
}

fn insert_attendee_row(conn: &Connection, attendee: &Attendee) -> rusqlite::Result<usize> {
    let (player_id, guest_name) = participant_columns(&attendee.participant);
    conn.execute(
        "INSERT INTO attendees (id, session_id, player_id, guest_name, attended, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            attendee.id.to_string(),
            attendee.session_id.to_string(),
            player_id,
            guest_name,
            attendee.attended,
            ts(&attendee.created_at),
        ],
    )
}

fn insert_match_row(conn: &Connection, m: &Match) -> rusqlite::Result<usize> {
    let (p1_player, p1_guest) = participant_columns(&m.player1);
    let (p2_player, p2_guest) = participant_columns(&m.player2);
    conn.execute(
        &format!(
            "INSERT INTO matches ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            MATCH_COLUMNS
        ),
        params![
            m.id.to_string(),
            m.session_id.to_string(),
            m.game_mode_id.to_string(),
            p1_player,
            p1_guest,
            p2_player,
            p2_guest,
            m.player1_score,
            m.player2_score,
            m.status.as_str(),
            m.winner.map(|w| w.as_str()),
            m.completed_at.as_ref().map(ts),
            ts(&m.created_at),
        ],
    )
}

fn query_player_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<Player>> {
    conn.query_row(
        &format!("SELECT {} FROM players WHERE email = ?", PLAYER_COLUMNS),
        [email],
        player_from_row,
    )
    .optional()
}

fn query_game_mode_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<GameMode>> {
    conn.query_row(
        &format!("SELECT {} FROM game_modes WHERE name = ?", GAME_MODE_COLUMNS),
        [name],
        game_mode_from_row,
    )
    .optional()
}

impl Store for SqliteStore {
    fn list_players(&self) -> StoreResult<Vec<Player>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM players ORDER BY name COLLATE NOCASE",
            PLAYER_COLUMNS
        ))?;
        let players = stmt
            .query_map([], player_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(players)
    }

    fn get_player(&self, id: &PlayerId) -> StoreResult<Option<Player>> {
        let conn = self.conn()?;
        let player = conn
            .query_row(
                &format!("SELECT {} FROM players WHERE id = ?", PLAYER_COLUMNS),
                [id.to_string()],
                player_from_row,
            )
            .optional()?;
        Ok(player)
    }

    fn get_player_by_email(&self, email: &str) -> StoreResult<Option<Player>> {
        let conn = self.conn()?;
        Ok(query_player_by_email(&conn, email)?)
    }

    fn insert_player(&self, player: &Player) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO players (id, name, email, nickname, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                player.id.to_string(),
                player.name,
                player.email,
                player.nickname,
                ts(&player.created_at),
            ],
        )?;
        debug!(player_id = %player.id, "Player inserted");
        Ok(())
    }

    fn upsert_player(
        &self,
        name: &str,
        email: &str,
        nickname: Option<&str>,
    ) -> StoreResult<Player> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO players (id, name, email, nickname, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email)
            DO UPDATE SET name = excluded.name, nickname = excluded.nickname
            "#,
            params![
                PlayerId::new().to_string(),
                name,
                email,
                nickname,
                ts(&oche_util::now()),
            ],
        )?;

        query_player_by_email(&conn, email)?
            .ok_or_else(|| StoreError::NotFound(format!("Player {}", email)))
    }

    fn list_game_modes(&self, active_only: bool) -> StoreResult<Vec<GameMode>> {
        let conn = self.conn()?;
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM game_modes {} ORDER BY rowid",
            GAME_MODE_COLUMNS, filter
        ))?;
        let modes = stmt
            .query_map([], game_mode_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(modes)
    }

    fn get_game_mode(&self, id: &GameModeId) -> StoreResult<Option<GameMode>> {
        let conn = self.conn()?;
        let mode = conn
            .query_row(
                &format!("SELECT {} FROM game_modes WHERE id = ?", GAME_MODE_COLUMNS),
                [id.to_string()],
                game_mode_from_row,
            )
            .optional()?;
        Ok(mode)
    }

    fn upsert_game_mode(
        &self,
        name: &str,
        description: Option<&str>,
        rules: &serde_json::Value,
        is_active: bool,
    ) -> StoreResult<GameMode> {
        let conn = self.conn()?;
        let rules_json = serde_json::to_string(rules)?;
        conn.execute(
            r#"
            INSERT INTO game_modes (id, name, description, rules_json, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(name)
            DO UPDATE SET description = excluded.description,
                          rules_json = excluded.rules_json,
                          is_active = excluded.is_active
            "#,
            params![
                GameModeId::new().to_string(),
                name,
                description,
                rules_json,
                is_active,
                ts(&oche_util::now()),
            ],
        )?;

        query_game_mode_by_name(&conn, name)?
            .ok_or_else(|| StoreError::NotFound(format!("Game mode {}", name)))
    }

    fn create_session_with_roster(
        &self,
        session: &TrainingSession,
        roster: &[Attendee],
    ) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO sessions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                SESSION_COLUMNS
            ),
            params![
                session.id.to_string(),
                session.name,
                session.description,
                ts(&session.scheduled_at),
                session.cost_per_attendee.as_cents(),
                session.status.as_str(),
                session.created_by.map(|id| id.to_string()),
                ts(&session.created_at),
                ts(&session.updated_at),
            ],
        )?;

        for attendee in roster {
            insert_attendee_row(&tx, attendee)?;
        }

        tx.commit()?;
        debug!(session_id = %session.id, roster_size = roster.len(), "Session inserted");
        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> StoreResult<Option<TrainingSession>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                &format!(
                    "SELECT {} FROM sessions WHERE id = ? AND deleted_at IS NULL",
                    SESSION_COLUMNS
                ),
                [id.to_string()],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn list_sessions(&self) -> StoreResult<Vec<TrainingSession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE deleted_at IS NULL \
             ORDER BY scheduled_at DESC, rowid DESC",
            SESSION_COLUMNS
        ))?;
        let sessions = stmt
            .query_map([], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn update_session(&self, session: &TrainingSession) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE sessions
            SET name = ?, description = ?, scheduled_at = ?, cost_cents = ?,
                status = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
            params![
                session.name,
                session.description,
                ts(&session.scheduled_at),
                session.cost_per_attendee.as_cents(),
                session.status.as_str(),
                ts(&session.updated_at),
                session.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound("Training session".into()));
        }
        debug!(session_id = %session.id, status = %session.status, "Session updated");
        Ok(())
    }

    fn delete_session_cascade(
        &self,
        id: &SessionId,
        deleted_at: DateTime<Local>,
    ) -> StoreResult<CascadeSummary> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id_str = id.to_string();

        let matches_removed =
            tx.execute("DELETE FROM matches WHERE session_id = ?", [&id_str])?;
        let attendees_removed =
            tx.execute("DELETE FROM attendees WHERE session_id = ?", [&id_str])?;
        let marked = tx.execute(
            "UPDATE sessions SET deleted_at = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL",
            params![ts(&deleted_at), ts(&deleted_at), id_str],
        )?;

        // Dropping the transaction rolls back the deletes above
        if marked == 0 {
            return Err(StoreError::NotFound("Training session".into()));
        }

        tx.commit()?;
        debug!(
            session_id = %id,
            matches_removed,
            attendees_removed,
            "Session deleted"
        );
        Ok(CascadeSummary {
            matches_removed,
            attendees_removed,
        })
    }

    fn insert_attendee(&self, attendee: &Attendee) -> StoreResult<()> {
        let conn = self.conn()?;
        insert_attendee_row(&conn, attendee)?;
        debug!(attendee_id = %attendee.id, session_id = %attendee.session_id, "Attendee inserted");
        Ok(())
    }

    fn get_attendee(&self, id: &AttendeeId) -> StoreResult<Option<Attendee>> {
        let conn = self.conn()?;
        let attendee = conn
            .query_row(
                &format!("SELECT {} FROM attendees WHERE id = ?", ATTENDEE_COLUMNS),
                [id.to_string()],
                attendee_from_row,
            )
            .optional()?;
        Ok(attendee)
    }

    fn list_attendees(&self, session_id: &SessionId) -> StoreResult<Vec<Attendee>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM attendees WHERE session_id = ? ORDER BY rowid",
            ATTENDEE_COLUMNS
        ))?;
        let attendees = stmt
            .query_map([session_id.to_string()], attendee_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attendees)
    }

    fn set_attended(&self, id: &AttendeeId, attended: bool) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE attendees SET attended = ? WHERE id = ?",
            params![attended, id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound("Attendee".into()));
        }
        Ok(())
    }

    fn delete_attendee(&self, id: &AttendeeId) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM attendees WHERE id = ?", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound("Attendee".into()));
        }
        debug!(attendee_id = %id, "Attendee deleted");
        Ok(())
    }

    fn insert_matches(
        &self,
        session_id: &SessionId,
        matches: &[Match],
        reject_existing: bool,
    ) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if reject_existing {
            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM matches WHERE session_id = ?",
                [session_id.to_string()],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Err(StoreError::Conflict(format!(
                    "session already has {} matches",
                    existing
                )));
            }
        }

        for m in matches {
            insert_match_row(&tx, m)?;
        }

        tx.commit()?;
        debug!(session_id = %session_id, count = matches.len(), "Matches inserted");
        Ok(())
    }

    fn get_match(&self, id: &MatchId) -> StoreResult<Option<Match>> {
        let conn = self.conn()?;
        let m = conn
            .query_row(
                &format!("SELECT {} FROM matches WHERE id = ?", MATCH_COLUMNS),
                [id.to_string()],
                match_from_row,
            )
            .optional()?;
        Ok(m)
    }

    fn list_matches(&self, session_id: &SessionId) -> StoreResult<Vec<Match>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM matches WHERE session_id = ? ORDER BY rowid",
            MATCH_COLUMNS
        ))?;
        let matches = stmt
            .query_map([session_id.to_string()], match_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    fn update_match(&self, m: &Match) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE matches
            SET player1_score = ?, player2_score = ?, status = ?, winner = ?, completed_at = ?
            WHERE id = ?
            "#,
            params![
                m.player1_score,
                m.player2_score,
                m.status.as_str(),
                m.winner.map(|w| w.as_str()),
                m.completed_at.as_ref().map(ts),
                m.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound("Match".into()));
        }
        debug!(match_id = %m.id, status = %m.status, "Match updated");
        Ok(())
    }

    fn delete_match(&self, id: &MatchId) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM matches WHERE id = ?", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound("Match".into()));
        }
        debug!(match_id = %id, "Match deleted");
        Ok(())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![ts(&event.timestamp), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = parse_timestamp(&timestamp_str).unwrap_or_else(oche_util::now);
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditEventType;
    use oche_api::{MatchStatus, SessionStatus, Winner};
    use serde_json::json;

    fn player(store: &SqliteStore, name: &str) -> Player {
        store
            .upsert_player(name, &format!("{}@example.com", name.to_lowercase()), None)
            .unwrap()
    }

    fn game_mode(store: &SqliteStore) -> GameMode {
        store
            .upsert_game_mode("Cricket", None, &json!({ "type": "standard" }), true)
            .unwrap()
    }

    fn session(status: SessionStatus) -> TrainingSession {
        let now = oche_util::now();
        TrainingSession {
            id: SessionId::new(),
            name: "Tuesday practice".into(),
            description: None,
            scheduled_at: now,
            cost_per_attendee: Cents::new(500),
            status,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn attendee(session_id: SessionId, participant: Participant) -> Attendee {
        Attendee {
            id: AttendeeId::new(),
            session_id,
            participant,
            attended: true,
            created_at: oche_util::now(),
        }
    }

    fn pending_match(
        session_id: SessionId,
        mode: GameModeId,
        p1: Participant,
        p2: Participant,
    ) -> Match {
        Match {
            id: MatchId::new(),
            session_id,
            game_mode_id: mode,
            player1: p1,
            player2: p2,
            player1_score: 0,
            player2_score: 0,
            status: MatchStatus::Pending,
            winner: None,
            completed_at: None,
            created_at: oche_util::now(),
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        let event = AuditEvent::new(AuditEventType::ServiceStarted);
        store.append_audit(event).unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, AuditEventType::ServiceStarted));
    }

    #[test]
    fn test_upsert_player_keyed_by_email() {
        let store = SqliteStore::in_memory().unwrap();

        let first = store
            .upsert_player("Alice", "alice@example.com", None)
            .unwrap();
        let second = store
            .upsert_player("Alice Smith", "ALICE@example.com", Some("Ace"))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Alice Smith");
        assert_eq!(second.nickname.as_deref(), Some("Ace"));
        assert_eq!(store.list_players().unwrap().len(), 1);
    }

    #[test]
    fn test_game_mode_catalog() {
        let store = SqliteStore::in_memory().unwrap();
        let cricket = game_mode(&store);
        store
            .upsert_game_mode("Shanghai", None, &json!({}), false)
            .unwrap();

        let loaded = store.get_game_mode(&cricket.id).unwrap().unwrap();
        assert_eq!(loaded.rules["type"], "standard");

        assert_eq!(store.list_game_modes(true).unwrap().len(), 1);
        assert_eq!(store.list_game_modes(false).unwrap().len(), 2);
    }

    #[test]
    fn test_session_roster_keeps_insertion_order() {
        let store = SqliteStore::in_memory().unwrap();
        let players: Vec<_> = ["Carol", "Alice", "Bob"]
            .iter()
            .map(|n| player(&store, n))
            .collect();

        let s = session(SessionStatus::Planned);
        let roster: Vec<_> = players
            .iter()
            .map(|p| attendee(s.id, Participant::player(p.id)))
            .collect();
        store.create_session_with_roster(&s, &roster).unwrap();

        let guest = attendee(s.id, Participant::guest("Dave").unwrap());
        store.insert_attendee(&guest).unwrap();

        let loaded = store.get_session(&s.id).unwrap().unwrap();
        assert_eq!(loaded, s);

        let ids: Vec<_> = store
            .list_attendees(&s.id)
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        let mut expected: Vec<_> = roster.iter().map(|a| a.id).collect();
        expected.push(guest.id);
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_failed_roster_insert_leaves_no_session() {
        let store = SqliteStore::in_memory().unwrap();
        let s = session(SessionStatus::Planned);

        // Unknown player violates the foreign key
        let roster = vec![attendee(s.id, Participant::player(PlayerId::new()))];
        assert!(store.create_session_with_roster(&s, &roster).is_err());
        assert!(store.get_session(&s.id).unwrap().is_none());
    }

    #[test]
    fn test_insert_matches_rejects_existing() {
        let store = SqliteStore::in_memory().unwrap();
        let mode = game_mode(&store);
        let s = session(SessionStatus::Planned);
        store.create_session_with_roster(&s, &[]).unwrap();

        let a = Participant::guest("A").unwrap();
        let b = Participant::guest("B").unwrap();
        let batch = vec![pending_match(s.id, mode.id, a.clone(), b.clone())];
        store.insert_matches(&s.id, &batch, true).unwrap();

        let again = vec![pending_match(s.id, mode.id, a.clone(), b.clone())];
        let err = store.insert_matches(&s.id, &again, true).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_matches(&s.id).unwrap().len(), 1);

        store.insert_matches(&s.id, &again, false).unwrap();
        assert_eq!(store.list_matches(&s.id).unwrap().len(), 2);
    }

    #[test]
    fn test_update_match_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let mode = game_mode(&store);
        let alice = player(&store, "Alice");
        let s = session(SessionStatus::Active);
        store.create_session_with_roster(&s, &[]).unwrap();

        let mut m = pending_match(
            s.id,
            mode.id,
            Participant::player(alice.id),
            Participant::guest("Zoe").unwrap(),
        );
        store.insert_matches(&s.id, std::slice::from_ref(&m), true).unwrap();

        m.player1_score = 3;
        m.player2_score = 1;
        m.status = MatchStatus::Completed;
        m.winner = Some(Winner::Player1);
        m.completed_at = Some(oche_util::now());
        store.update_match(&m).unwrap();

        assert_eq!(store.get_match(&m.id).unwrap().unwrap(), m);

        let missing = pending_match(
            s.id,
            mode.id,
            Participant::guest("X").unwrap(),
            Participant::guest("Y").unwrap(),
        );
        assert!(matches!(
            store.update_match(&missing),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_session_cascade() {
        let store = SqliteStore::in_memory().unwrap();
        let mode = game_mode(&store);
        let s = session(SessionStatus::Planned);
        let a = Participant::guest("A").unwrap();
        let b = Participant::guest("B").unwrap();
        let roster = vec![attendee(s.id, a.clone()), attendee(s.id, b.clone())];
        store.create_session_with_roster(&s, &roster).unwrap();
        store
            .insert_matches(&s.id, &[pending_match(s.id, mode.id, a, b)], true)
            .unwrap();

        let summary = store
            .delete_session_cascade(&s.id, oche_util::now())
            .unwrap();
        assert_eq!(summary.matches_removed, 1);
        assert_eq!(summary.attendees_removed, 2);

        assert!(store.get_session(&s.id).unwrap().is_none());
        assert!(store.list_sessions().unwrap().is_empty());
        assert!(store.list_attendees(&s.id).unwrap().is_empty());
        assert!(store.list_matches(&s.id).unwrap().is_empty());

        assert!(matches!(
            store.delete_session_cascade(&s.id, oche_util::now()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_sessions_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        let mut older = session(SessionStatus::Planned);
        older.scheduled_at = oche_util::now() - chrono::Duration::days(7);
        let newer = session(SessionStatus::Planned);
        store.create_session_with_roster(&older, &[]).unwrap();
        store.create_session_with_roster(&newer, &[]).unwrap();

        let ids: Vec<_> = store.list_sessions().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oche.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            player(&store, "Alice").id
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_player(&id).unwrap().unwrap().name, "Alice");
    }
}
