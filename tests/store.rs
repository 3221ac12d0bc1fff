use rand::SeedableRng;
use rand::rngs::StdRng;

use kegel_matchday::SimConfig;
use kegel_matchday::matchday::{FixtureSource, simulate_day};
use kegel_matchday::model::{MatchId, PlayerId, TeamId, Venue};
use kegel_matchday::squad::{LineupKey, LineupSource, ManualLineup};
use kegel_matchday::store::{MemoryStore, RecordSink, SqliteStore};
use kegel_matchday::synthetic::{self, LeagueShape};

fn key() -> LineupKey {
    LineupKey {
        match_id: MatchId(3),
        team_id: TeamId(101),
        venue: Venue::Away,
    }
}

#[test]
fn sqlite_lineup_upsert_replaces_previous_submission() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert!(store.lineup(&key()).unwrap().is_none());

    let first = ManualLineup {
        key: key(),
        players: (1..=6).map(PlayerId).collect(),
    };
    store.submit_lineup(&first).unwrap();
    store.submit_lineup(&first).unwrap();
    assert_eq!(store.lineup_count().unwrap(), 1);

    let second = ManualLineup {
        key: key(),
        players: vec![6, 5, 4, 3, 2, 1].into_iter().map(PlayerId).collect(),
    };
    store.submit_lineup(&second).unwrap();
    assert_eq!(store.lineup_count().unwrap(), 1);
    assert_eq!(store.lineup(&key()).unwrap(), Some(second));

    let home_key = LineupKey {
        venue: Venue::Home,
        ..key()
    };
    assert!(store.lineup(&home_key).unwrap().is_none());
}

#[test]
fn memory_lineups_overwrite_by_key() {
    let store = MemoryStore::new();
    for n in 0..3u32 {
        store
            .submit_lineup(ManualLineup {
                key: key(),
                players: (1..=6).map(|i| PlayerId(i + n)).collect(),
            })
            .unwrap();
    }
    assert_eq!(store.lineup_count(), 1);
    let stored = store.lineup(&key()).unwrap().unwrap();
    assert_eq!(stored.players[0], PlayerId(3));
}

#[test]
fn simulated_day_round_trips_through_sqlite() {
    let mut rng = StdRng::seed_from_u64(12);
    let mut world = synthetic::build_world(
        LeagueShape {
            clubs: 4,
            teams_per_club: 1,
            players_per_club: 10,
        },
        &mut rng,
    );
    let schedule = synthetic::round_robin(&world, 1);
    let store = SqliteStore::open_in_memory().unwrap();
    let cfg = SimConfig::default();

    let report = simulate_day(&mut world, &schedule, 1, &store, &store, &cfg, &mut rng).unwrap();
    assert_eq!(report.outcomes.len(), schedule.fixtures_for_day(1).unwrap().len());

    for outcome in &report.outcomes {
        let stored = store.load_performances(outcome.match_id).unwrap();
        assert_eq!(stored.len(), 12);
        for record in &stored {
            let original = outcome
                .records
                .iter()
                .find(|r| r.team_id == record.team_id && r.slot == record.slot)
                .unwrap();
            assert_eq!(record.player_id, original.player_id);
            assert_eq!(record.sections, original.sections);
            assert_eq!(record.total, original.total);
            assert_eq!(record.venue, original.venue);
            assert_eq!(record.match_points, original.match_points);
        }
        assert_eq!(
            store.team_points(outcome.home.team_id).unwrap(),
            i64::from(outcome.home.league_points)
        );
    }

    let runs = store.day_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].day, 1);
    assert_eq!(runs[0].matches_succeeded, report.outcomes.len());
}

#[test]
fn persisting_the_same_match_twice_keeps_one_row_set() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut world = synthetic::build_world(
        LeagueShape {
            clubs: 2,
            teams_per_club: 1,
            players_per_club: 8,
        },
        &mut rng,
    );
    let schedule = synthetic::round_robin(&world, 1);
    let store = SqliteStore::open_in_memory().unwrap();
    let report = simulate_day(
        &mut world,
        &schedule,
        1,
        &MemoryStore::new(),
        &store,
        &SimConfig::default(),
        &mut rng,
    )
    .unwrap();
    let outcome = &report.outcomes[0];

    store.persist_match(outcome).unwrap();
    assert_eq!(store.load_performances(outcome.match_id).unwrap().len(), 12);
    assert_eq!(
        store.team_points(outcome.away.team_id).unwrap(),
        i64::from(outcome.away.league_points)
    );
}
