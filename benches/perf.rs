use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

use kegel_matchday::SimConfig;
use kegel_matchday::day_context::DayContext;
use kegel_matchday::matchday::simulate_day;
use kegel_matchday::model::{
    Attributes, ClubId, CompetitionKind, MatchId, Player, PlayerId, Slot, TeamId, Venue,
};
use kegel_matchday::scoring::{ScoringContext, simulate_game};
use kegel_matchday::squad::{SlotStrategy, TeamFixture, assign_club_day};
use kegel_matchday::store::MemoryStore;
use kegel_matchday::synthetic::{self, LeagueShape};

fn bench_scoring(c: &mut Criterion) {
    let cfg = SimConfig::default();
    let player = Player::new(PlayerId(1), ClubId(1), "bench", Attributes::uniform(70));
    let ctx = ScoringContext {
        slot: Slot::new(5).unwrap(),
        venue: Venue::Away,
        home_advantage: true,
        lane_quality: 1.0,
        tier: 2,
    };
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("simulate_game", |b| {
        b.iter(|| simulate_game(black_box(&player), &ctx, &cfg, &mut rng))
    });
}

fn bench_assignment(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let world = synthetic::build_world(
        LeagueShape {
            clubs: 1,
            teams_per_club: 4,
            players_per_club: 30,
        },
        &mut rng,
    );
    let fixtures = (1..=4u32)
        .map(|t| TeamFixture {
            match_id: MatchId(t),
            team_id: TeamId(100 + t),
            competition: CompetitionKind::League,
            venue: Venue::Home,
        })
        .collect::<Vec<_>>();
    let lineups = MemoryStore::new();

    c.bench_function("assign_club_day_best_fit", |b| {
        b.iter(|| {
            let mut ctx = DayContext::new(1);
            for id in world.players.keys() {
                ctx.set_available(*id, true);
            }
            assign_club_day(
                &world,
                &mut ctx,
                ClubId(1),
                black_box(&fixtures),
                &lineups,
                SlotStrategy::BestFit,
                &mut rng,
            )
        })
    });
}

fn bench_full_day(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let world = synthetic::build_world(
        LeagueShape {
            clubs: 16,
            teams_per_club: 3,
            players_per_club: 24,
        },
        &mut rng,
    );
    let schedule = synthetic::round_robin(&world, 1);
    let cfg = SimConfig::default();

    c.bench_function("simulate_day_48_teams", |b| {
        b.iter(|| {
            let mut day_world = world.clone();
            let store = MemoryStore::new();
            simulate_day(&mut day_world, &schedule, 1, &store, &store, &cfg, &mut rng)
        })
    });
}

criterion_group!(benches, bench_scoring, bench_assignment, bench_full_day);
criterion_main!(benches);
