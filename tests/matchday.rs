use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use kegel_matchday::aggregate::MatchOutcome;
use kegel_matchday::error::SimResult;
use kegel_matchday::matchday::{Fixture, FixtureSource, Schedule, simulate_day};
use kegel_matchday::model::{AttributeStore, CompetitionKind, MatchId, TeamId, Venue, World};
use kegel_matchday::squad::{LineupKey, ManualLineup};
use kegel_matchday::store::{DayRun, MemoryStore, RecordSink};
use kegel_matchday::synthetic::{self, LeagueShape};
use kegel_matchday::{SimConfig, SimError};

fn league(seed: u64) -> (World, Schedule) {
    let mut rng = StdRng::seed_from_u64(seed);
    let world = synthetic::build_world(
        LeagueShape {
            clubs: 6,
            teams_per_club: 2,
            players_per_club: 14,
        },
        &mut rng,
    );
    let schedule = synthetic::round_robin(&world, 1);
    (world, schedule)
}

/// Rejects one match, forwards everything else.
struct FlakySink {
    inner: MemoryStore,
    reject: MatchId,
}

impl RecordSink for FlakySink {
    fn persist_match(&self, outcome: &MatchOutcome) -> SimResult<()> {
        if outcome.match_id == self.reject {
            return Err(SimError::Store("disk full".to_string()));
        }
        self.inner.persist_match(outcome)
    }

    fn record_day(&self, run: &DayRun) -> SimResult<()> {
        self.inner.record_day(run)
    }
}

#[test]
fn full_day_produces_consistent_outcomes() {
    let (mut world, schedule) = league(1);
    let store = MemoryStore::new();
    let cfg = SimConfig::default();
    let mut rng = StdRng::seed_from_u64(100);

    let fixtures = schedule.fixtures_for_day(1).unwrap();
    let report = simulate_day(&mut world, &schedule, 1, &store, &store, &cfg, &mut rng).unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.outcomes.len(), fixtures.len());
    assert_eq!(store.outcomes().len(), fixtures.len());
    assert_eq!(report.availability.len(), 6);

    let mut fielded = HashSet::new();
    for outcome in &report.outcomes {
        assert_eq!(outcome.day, 1);
        assert_eq!(outcome.records.len(), 12);
        let points = outcome.home.match_points + outcome.away.match_points;
        assert!((points - 8.0).abs() < 1e-9);
        assert_eq!(outcome.home.league_points + outcome.away.league_points, 2);
        assert_eq!(outcome.home.venue, Venue::Home);

        for record in &outcome.records {
            if let Some(player) = record.player_id {
                assert!(fielded.insert(player), "{player} fielded twice");
                let p = world.player(player).unwrap();
                assert_eq!(p.last_played_day, Some(1));
                let team = world.team(record.team_id).unwrap();
                assert_eq!(p.club_id, team.club_id);
            }
        }
    }

    let runs = store.day_runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].matches_succeeded, fixtures.len());
    assert!(runs[0].errors.is_empty());
}

#[test]
fn unscheduled_day_is_rejected() {
    let (mut world, schedule) = league(2);
    let store = MemoryStore::new();
    let mut rng = StdRng::seed_from_u64(1);
    let err = simulate_day(
        &mut world,
        &schedule,
        99,
        &store,
        &store,
        &SimConfig::default(),
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, SimError::DayNotScheduled(99)));
    assert!(store.day_runs().is_empty());
    assert!(world.players.values().all(|p| p.last_played_day.is_none()));
}

#[test]
fn one_failing_match_does_not_stop_the_day() {
    let (mut world, mut schedule) = league(3);
    let fixtures = schedule.fixtures_for_day(1).unwrap();
    schedule.add(
        1,
        Fixture {
            match_id: MatchId(9_001),
            competition: CompetitionKind::Cup,
            home_team: TeamId(7_777),
            away_team: fixtures[0].home_team,
            home_advantage: None,
        },
    );
    let sink = FlakySink {
        inner: MemoryStore::new(),
        reject: fixtures[1].match_id,
    };
    let mut rng = StdRng::seed_from_u64(4);
    let report = simulate_day(
        &mut world,
        &schedule,
        1,
        &sink.inner,
        &sink,
        &SimConfig::default(),
        &mut rng,
    )
    .unwrap();

    let failed = report.failures.iter().map(|f| f.match_id).collect::<HashSet<_>>();
    assert_eq!(failed.len(), 2);
    assert!(failed.contains(&MatchId(9_001)));
    assert!(failed.contains(&fixtures[1].match_id));
    assert_eq!(report.outcomes.len(), fixtures.len() - 1);
    assert_eq!(sink.inner.outcomes().len(), fixtures.len() - 1);

    let runs = sink.inner.day_runs();
    assert_eq!(runs[0].matches_total, fixtures.len() + 1);
    assert_eq!(runs[0].errors.len(), 2);
}

#[test]
fn invalid_manual_lineup_fails_only_its_match() {
    let (mut world, schedule) = league(5);
    let fixtures = schedule.fixtures_for_day(1).unwrap();
    let target = fixtures[0];
    let store = MemoryStore::new();
    store
        .submit_lineup(ManualLineup {
            key: LineupKey {
                match_id: target.match_id,
                team_id: target.home_team,
                venue: Venue::Home,
            },
            players: Vec::new(),
        })
        .unwrap();

    let mut rng = StdRng::seed_from_u64(6);
    let report = simulate_day(
        &mut world,
        &schedule,
        1,
        &store,
        &store,
        &SimConfig::default(),
        &mut rng,
    )
    .unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].match_id, target.match_id);
    assert!(report.failures[0].error.contains("invalid manual lineup"));
    assert_eq!(report.outcomes.len(), fixtures.len() - 1);
}

#[test]
fn results_do_not_depend_on_worker_count() {
    let run = |threads: usize| {
        let (mut world, schedule) = league(7);
        let store = MemoryStore::new();
        let cfg = SimConfig {
            worker_threads: threads,
            ..SimConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(77);
        let mut totals = Vec::new();
        for day in 1..=3 {
            let report =
                simulate_day(&mut world, &schedule, day, &store, &store, &cfg, &mut rng).unwrap();
            totals.extend(report.outcomes.iter().map(|o| (o.match_id, o.home.total, o.away.total)));
        }
        totals
    };
    assert_eq!(run(1), run(4));
}

#[test]
fn forced_shortfall_brings_in_substitutes() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut world = synthetic::build_world(
        LeagueShape {
            clubs: 2,
            teams_per_club: 1,
            players_per_club: 4,
        },
        &mut rng,
    );
    let schedule = synthetic::round_robin(&world, 1);
    let store = MemoryStore::new();
    let report = simulate_day(
        &mut world,
        &schedule,
        1,
        &store,
        &store,
        &SimConfig::default(),
        &mut rng,
    )
    .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert!(outcome.home.substitutes >= 2);
    assert!(outcome.away.substitutes >= 2);
    let subs = outcome.records.iter().filter(|r| r.is_substitute()).count();
    assert_eq!(subs, outcome.home.substitutes + outcome.away.substitutes);
    assert_eq!(report.shortfalls.len(), 2);
}
