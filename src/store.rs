use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::aggregate::{MatchOutcome, PerformanceRecord};
use crate::error::{SimError, SimResult};
use crate::model::{MatchId, PlayerId, TeamId, Venue};
use crate::squad::{LineupKey, LineupSource, ManualLineup};

/// Receives finished matches. Implementations must tolerate concurrent calls
/// from the worker pool.
pub trait RecordSink: Sync {
    fn persist_match(&self, outcome: &MatchOutcome) -> SimResult<()>;

    fn record_day(&self, _run: &DayRun) -> SimResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DayRun {
    pub day: u32,
    pub started_at: String,
    pub finished_at: String,
    pub matches_total: usize,
    pub matches_succeeded: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    lineups: Mutex<HashMap<LineupKey, ManualLineup>>,
    outcomes: Mutex<Vec<MatchOutcome>>,
    days: Mutex<Vec<DayRun>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_lineup(&self, lineup: ManualLineup) -> SimResult<()> {
        lock(&self.lineups)?.insert(lineup.key, lineup);
        Ok(())
    }

    pub fn lineup_count(&self) -> usize {
        lock(&self.lineups).map(|l| l.len()).unwrap_or(0)
    }

    pub fn outcomes(&self) -> Vec<MatchOutcome> {
        lock(&self.outcomes).map(|o| o.clone()).unwrap_or_default()
    }

    pub fn day_runs(&self) -> Vec<DayRun> {
        lock(&self.days).map(|d| d.clone()).unwrap_or_default()
    }
}

impl LineupSource for MemoryStore {
    fn lineup(&self, key: &LineupKey) -> SimResult<Option<ManualLineup>> {
        Ok(lock(&self.lineups)?.get(key).cloned())
    }
}

impl RecordSink for MemoryStore {
    fn persist_match(&self, outcome: &MatchOutcome) -> SimResult<()> {
        let mut outcomes = lock(&self.outcomes)?;
        outcomes.retain(|o| o.match_id != outcome.match_id);
        outcomes.push(outcome.clone());
        Ok(())
    }

    fn record_day(&self, run: &DayRun) -> SimResult<()> {
        lock(&self.days)?.push(run.clone());
        Ok(())
    }
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> SimResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn submit_lineup(&self, lineup: &ManualLineup) -> SimResult<()> {
        let players = serde_json::to_string(&lineup.players)
            .map_err(|e| SimError::Store(format!("encode lineup: {e}")))?;
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO manual_lineups (match_id, team_id, venue, players_json, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(match_id, team_id, venue) DO UPDATE SET
                players_json = excluded.players_json,
                submitted_at = excluded.submitted_at
            "#,
            params![
                lineup.key.match_id.0 as i64,
                lineup.key.team_id.0 as i64,
                lineup.key.venue.as_str(),
                players,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn lineup_count(&self) -> SimResult<usize> {
        let conn = lock(&self.conn)?;
        let n = conn.query_row("SELECT COUNT(*) FROM manual_lineups", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(n.max(0) as usize)
    }

    pub fn load_performances(&self, match_id: MatchId) -> SimResult<Vec<PerformanceRecord>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT team_id, player_id, slot, venue,
                   s1, s2, s3, s4, total, full_pins, clearing, errors,
                   set_points, match_points
            FROM performances
            WHERE match_id = ?1
            ORDER BY slot ASC, venue DESC
            "#,
        )?;
        let rows = stmt.query_map(params![match_id.0 as i64], |row| {
            let venue: String = row.get(3)?;
            Ok(PerformanceRecord {
                match_id,
                team_id: TeamId(row.get::<_, u32>(0)?),
                player_id: row.get::<_, Option<u32>>(1)?.map(PlayerId),
                slot: row.get::<_, u8>(2)?,
                venue: venue_from_str(&venue),
                sections: [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?],
                total: row.get(8)?,
                full_pins: row.get(9)?,
                clearing: row.get(10)?,
                errors: row.get(11)?,
                set_points: row.get(12)?,
                match_points: row.get(13)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn day_runs(&self) -> SimResult<Vec<DayRun>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT day, started_at, finished_at, matches_total, matches_succeeded, errors_json
            FROM day_runs
            ORDER BY run_id ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let errors_json: String = row.get(5)?;
            Ok(DayRun {
                day: row.get(0)?,
                started_at: row.get(1)?,
                finished_at: row.get(2)?,
                matches_total: row.get::<_, i64>(3)?.max(0) as usize,
                matches_succeeded: row.get::<_, i64>(4)?.max(0) as usize,
                errors: serde_json::from_str(&errors_json).unwrap_or_default(),
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn team_points(&self, team_id: TeamId) -> SimResult<i64> {
        let conn = lock(&self.conn)?;
        let points = conn.query_row(
            "SELECT COALESCE(SUM(league_points), 0) FROM team_results WHERE team_id = ?1",
            params![team_id.0 as i64],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(points)
    }
}

impl LineupSource for SqliteStore {
    fn lineup(&self, key: &LineupKey) -> SimResult<Option<ManualLineup>> {
        let conn = lock(&self.conn)?;
        let raw = conn
            .query_row(
                "SELECT players_json FROM manual_lineups WHERE match_id = ?1 AND team_id = ?2 AND venue = ?3",
                params![key.match_id.0 as i64, key.team_id.0 as i64, key.venue.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let players = serde_json::from_str::<Vec<PlayerId>>(&raw)
            .map_err(|e| SimError::Store(format!("decode lineup: {e}")))?;
        Ok(Some(ManualLineup { key: *key, players }))
    }
}

impl RecordSink for SqliteStore {
    fn persist_match(&self, outcome: &MatchOutcome) -> SimResult<()> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        for team in [&outcome.home, &outcome.away] {
            tx.execute(
                r#"
                INSERT INTO team_results (
                    match_id, team_id, day, competition, venue, total, full_pins, clearing,
                    errors, set_points, match_points, league_points, substitutes, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ON CONFLICT(match_id, team_id) DO UPDATE SET
                    day = excluded.day,
                    competition = excluded.competition,
                    venue = excluded.venue,
                    total = excluded.total,
                    full_pins = excluded.full_pins,
                    clearing = excluded.clearing,
                    errors = excluded.errors,
                    set_points = excluded.set_points,
                    match_points = excluded.match_points,
                    league_points = excluded.league_points,
                    substitutes = excluded.substitutes,
                    updated_at = excluded.updated_at
                "#,
                params![
                    outcome.match_id.0 as i64,
                    team.team_id.0 as i64,
                    outcome.day as i64,
                    outcome.competition.as_str(),
                    team.venue.as_str(),
                    team.total as i64,
                    team.full_pins as i64,
                    team.clearing as i64,
                    team.errors as i64,
                    team.set_points,
                    team.match_points,
                    team.league_points as i64,
                    team.substitutes as i64,
                    now,
                ],
            )?;
        }

        for r in &outcome.records {
            tx.execute(
                r#"
                INSERT INTO performances (
                    match_id, team_id, slot, venue, player_id,
                    s1, s2, s3, s4, total, full_pins, clearing, errors,
                    set_points, match_points
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                ON CONFLICT(match_id, team_id, slot) DO UPDATE SET
                    venue = excluded.venue,
                    player_id = excluded.player_id,
                    s1 = excluded.s1,
                    s2 = excluded.s2,
                    s3 = excluded.s3,
                    s4 = excluded.s4,
                    total = excluded.total,
                    full_pins = excluded.full_pins,
                    clearing = excluded.clearing,
                    errors = excluded.errors,
                    set_points = excluded.set_points,
                    match_points = excluded.match_points
                "#,
                params![
                    r.match_id.0 as i64,
                    r.team_id.0 as i64,
                    r.slot as i64,
                    r.venue.as_str(),
                    r.player_id.map(|p| p.0 as i64),
                    r.sections[0] as i64,
                    r.sections[1] as i64,
                    r.sections[2] as i64,
                    r.sections[3] as i64,
                    r.total as i64,
                    r.full_pins as i64,
                    r.clearing as i64,
                    r.errors as i64,
                    r.set_points,
                    r.match_points,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn record_day(&self, run: &DayRun) -> SimResult<()> {
        let errors_json = serde_json::to_string(&run.errors).unwrap_or_else(|_| "[]".to_string());
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO day_runs (day, started_at, finished_at, matches_total, matches_succeeded, errors_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                run.day as i64,
                run.started_at,
                run.finished_at,
                run.matches_total as i64,
                run.matches_succeeded as i64,
                errors_json,
            ],
        )?;
        Ok(())
    }
}

pub fn init_schema(conn: &Connection) -> SimResult<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS manual_lineups (
            match_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            venue TEXT NOT NULL,
            players_json TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            PRIMARY KEY (match_id, team_id, venue)
        );

        CREATE TABLE IF NOT EXISTS team_results (
            match_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            day INTEGER NOT NULL,
            competition TEXT NOT NULL,
            venue TEXT NOT NULL,
            total INTEGER NOT NULL,
            full_pins INTEGER NOT NULL,
            clearing INTEGER NOT NULL,
            errors INTEGER NOT NULL,
            set_points REAL NOT NULL,
            match_points REAL NOT NULL,
            league_points INTEGER NOT NULL,
            substitutes INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (match_id, team_id)
        );
        CREATE INDEX IF NOT EXISTS idx_team_results_day ON team_results(day);

        CREATE TABLE IF NOT EXISTS performances (
            match_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            slot INTEGER NOT NULL,
            venue TEXT NOT NULL,
            player_id INTEGER NULL,
            s1 INTEGER NOT NULL,
            s2 INTEGER NOT NULL,
            s3 INTEGER NOT NULL,
            s4 INTEGER NOT NULL,
            total INTEGER NOT NULL,
            full_pins INTEGER NOT NULL,
            clearing INTEGER NOT NULL,
            errors INTEGER NOT NULL,
            set_points REAL NOT NULL,
            match_points REAL NOT NULL,
            PRIMARY KEY (match_id, team_id, slot)
        );
        CREATE INDEX IF NOT EXISTS idx_performances_player ON performances(player_id);

        CREATE TABLE IF NOT EXISTS day_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            day INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            matches_total INTEGER NOT NULL,
            matches_succeeded INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn venue_from_str(raw: &str) -> Venue {
    if raw.eq_ignore_ascii_case("away") {
        Venue::Away
    } else {
        Venue::Home
    }
}

fn lock<T>(m: &Mutex<T>) -> SimResult<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| SimError::Store("store lock poisoned".to_string()))
}
