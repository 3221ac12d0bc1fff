use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{MatchOutcome, MatchSetup, play_match};
use crate::availability::{ClubAvailability, ClubDay, club_fixture_context, resolve_availability};
use crate::config::SimConfig;
use crate::day_context::DayContext;
use crate::error::{SimError, SimResult};
use crate::form;
use crate::model::{AttributeStore, ClubId, CompetitionKind, MatchId, TeamId, Venue, World};
use crate::squad::{
    AssignmentResult, LineupSource, SquadAssignment, TeamFixture, assign_club_day,
};
use crate::store::{DayRun, RecordSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub match_id: MatchId,
    pub competition: CompetitionKind,
    pub home_team: TeamId,
    pub away_team: TeamId,
    #[serde(default)]
    pub home_advantage: Option<bool>,
}

pub trait FixtureSource {
    fn fixtures_for_day(&self, day: u32) -> Option<Vec<Fixture>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub days: BTreeMap<u32, Vec<Fixture>>,
}

impl Schedule {
    pub fn add(&mut self, day: u32, fixture: Fixture) {
        self.days.entry(day).or_default().push(fixture);
    }

    pub fn ensure_day(&mut self, day: u32) {
        self.days.entry(day).or_default();
    }
}

impl FixtureSource for Schedule {
    fn fixtures_for_day(&self, day: u32) -> Option<Vec<Fixture>> {
        self.days.get(&day).cloned()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchFailure {
    pub match_id: MatchId,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Shortfall {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub day: u32,
    pub outcomes: Vec<MatchOutcome>,
    pub failures: Vec<MatchFailure>,
    pub shortfalls: Vec<Shortfall>,
    pub availability: Vec<ClubAvailability>,
    pub assignments: Vec<SquadAssignment>,
}

impl DayReport {
    pub fn matches_total(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }
}

struct MatchJob {
    setup: MatchSetup,
    home: SquadAssignment,
    away: SquadAssignment,
    seed: u64,
}

pub fn prepare_day<R: Rng + ?Sized>(
    world: &mut World,
    day: u32,
    fixtures: &[Fixture],
    cfg: &SimConfig,
    rng: &mut R,
) -> (DayContext, Vec<ClubAvailability>) {
    let advanced = form::advance_all(world.players_mut(), rng);
    info!(day, players = advanced, "form advanced");

    let store: &World = world;
    let mut playing_by_club: BTreeMap<ClubId, HashSet<TeamId>> = BTreeMap::new();
    for fixture in fixtures {
        for team_id in [fixture.home_team, fixture.away_team] {
            match store.team(team_id) {
                Some(team) => {
                    playing_by_club.entry(team.club_id).or_default().insert(team_id);
                }
                None => warn!(team = %team_id, match_id = %fixture.match_id, "fixture references unknown team"),
            }
        }
    }

    let clubs = playing_by_club
        .iter()
        .map(|(club_id, playing)| ClubDay {
            club_id: *club_id,
            context: club_fixture_context(store, *club_id, playing),
        })
        .collect::<Vec<_>>();

    let mut ctx = DayContext::new(day);
    let availability = resolve_availability(store, &mut ctx, &clubs, cfg, rng);
    (ctx, availability)
}

pub fn assign_day<S, L, R>(
    store: &S,
    ctx: &mut DayContext,
    fixtures: &[Fixture],
    lineups: &L,
    cfg: &SimConfig,
    rng: &mut R,
) -> HashMap<(MatchId, TeamId), AssignmentResult>
where
    S: AttributeStore + ?Sized,
    L: LineupSource + ?Sized,
    R: Rng + ?Sized,
{
    let mut by_club: BTreeMap<ClubId, Vec<TeamFixture>> = BTreeMap::new();
    for fixture in fixtures {
        for (team_id, venue) in [(fixture.home_team, Venue::Home), (fixture.away_team, Venue::Away)] {
            let Some(team) = store.team(team_id) else {
                continue;
            };
            by_club.entry(team.club_id).or_default().push(TeamFixture {
                match_id: fixture.match_id,
                team_id,
                competition: fixture.competition,
                venue,
            });
        }
    }

    let mut out = HashMap::new();
    for (club_id, team_fixtures) in by_club {
        for (fixture, result) in
            assign_club_day(store, ctx, club_id, &team_fixtures, lineups, cfg.slot_strategy, rng)
        {
            out.insert((fixture.match_id, fixture.team_id), result);
        }
    }
    out
}

/// Simulates one calendar day end to end. A failing match is reported in the
/// day report and does not stop the others.
pub fn simulate_day<F, L, K, R>(
    world: &mut World,
    schedule: &F,
    day: u32,
    lineups: &L,
    sink: &K,
    cfg: &SimConfig,
    rng: &mut R,
) -> SimResult<DayReport>
where
    F: FixtureSource + ?Sized,
    L: LineupSource + ?Sized,
    K: RecordSink + ?Sized,
    R: Rng + ?Sized,
{
    let fixtures = schedule
        .fixtures_for_day(day)
        .ok_or(SimError::DayNotScheduled(day))?;
    let started_at = Utc::now().to_rfc3339();
    info!(day, fixtures = fixtures.len(), "simulating match day");

    let (mut ctx, availability) = prepare_day(world, day, &fixtures, cfg, rng);
    let store: &World = world;
    let mut assignments = assign_day(store, &mut ctx, &fixtures, lineups, cfg, rng);

    let mut failures = Vec::new();
    let mut jobs = Vec::with_capacity(fixtures.len());
    let mut fielded = Vec::new();
    let mut shortfalls = Vec::new();
    for fixture in &fixtures {
        match build_job(store, day, fixture, &mut assignments, cfg, rng) {
            Ok(job) => {
                for side in [&job.home, &job.away] {
                    if side.shortfall() > 0 {
                        shortfalls.push(Shortfall {
                            match_id: fixture.match_id,
                            team_id: side.team_id,
                            missing: side.shortfall(),
                        });
                    }
                    fielded.push(side.clone());
                }
                jobs.push(job);
            }
            Err(err) => {
                warn!(match_id = %fixture.match_id, error = %err, "match skipped");
                failures.push(MatchFailure {
                    match_id: fixture.match_id,
                    error: err.to_string(),
                });
            }
        }
    }

    let results = with_sim_pool(cfg.worker_threads, || {
        jobs.par_iter()
            .map(|job| (job.setup.match_id, run_job(store, job, sink, cfg)))
            .collect::<Vec<_>>()
    });

    let mut outcomes = Vec::with_capacity(results.len());
    for (match_id, result) in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                warn!(match_id = %match_id, error = %err, "match failed");
                failures.push(MatchFailure {
                    match_id,
                    error: err.to_string(),
                });
            }
        }
    }
    outcomes.sort_by_key(|o| o.match_id);
    failures.sort_by_key(|f| f.match_id);

    for outcome in &outcomes {
        for record in &outcome.records {
            if let Some(player) = record.player_id {
                ctx.mark_played(player, outcome.competition);
            }
        }
    }
    let committed = world.commit_day(&ctx);

    let run = DayRun {
        day,
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        matches_total: outcomes.len() + failures.len(),
        matches_succeeded: outcomes.len(),
        errors: failures
            .iter()
            .map(|f| format!("{}: {}", f.match_id, f.error))
            .collect(),
    };
    if let Err(err) = sink.record_day(&run) {
        warn!(day, error = %err, "day run not recorded");
    }

    info!(
        day,
        played = outcomes.len(),
        failed = failures.len(),
        players = committed,
        "match day complete"
    );

    Ok(DayReport {
        day,
        outcomes,
        failures,
        shortfalls,
        availability,
        assignments: fielded,
    })
}

fn build_job<S, R>(
    store: &S,
    day: u32,
    fixture: &Fixture,
    assignments: &mut HashMap<(MatchId, TeamId), AssignmentResult>,
    cfg: &SimConfig,
    rng: &mut R,
) -> SimResult<MatchJob>
where
    S: AttributeStore + ?Sized,
    R: Rng + ?Sized,
{
    let home_team = store.require_team(fixture.home_team)?;
    store.require_team(fixture.away_team)?;
    let home_club = store.require_club(home_team.club_id)?;

    let mut take = |team_id: TeamId| {
        assignments
            .remove(&(fixture.match_id, team_id))
            .unwrap_or(Err(SimError::UnknownTeam(team_id)))
    };
    let home = take(fixture.home_team)?;
    let away = take(fixture.away_team)?;

    Ok(MatchJob {
        setup: MatchSetup {
            match_id: fixture.match_id,
            competition: fixture.competition,
            day,
            tier: home_team.tier(),
            lane_quality: home_club.lane_quality,
            home_advantage: fixture.home_advantage.unwrap_or(cfg.home_advantage),
        },
        home,
        away,
        seed: rng.next_u64(),
    })
}

fn run_job<S, K>(store: &S, job: &MatchJob, sink: &K, cfg: &SimConfig) -> SimResult<MatchOutcome>
where
    S: AttributeStore + Sync + ?Sized,
    K: RecordSink + ?Sized,
{
    let mut rng = StdRng::seed_from_u64(job.seed);
    let outcome = play_match(store, &job.setup, &job.home, &job.away, cfg, &mut rng)?;
    sink.persist_match(&outcome)?;
    Ok(outcome)
}

fn with_sim_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if threads == 0 {
        return action();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}
