use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use kegel_matchday::aggregate::MatchOutcome;
use kegel_matchday::matchday::{self, FixtureSource};
use kegel_matchday::model::{AttributeStore, TeamId, World};
use kegel_matchday::squad::LineupSource;
use kegel_matchday::store::{MemoryStore, RecordSink, SqliteStore};
use kegel_matchday::synthetic::{self, LeagueShape};
use kegel_matchday::{SimConfig, SimError};

#[derive(Debug, Default, Clone, Copy)]
struct TableRow {
    played: u32,
    league_points: u32,
    match_points: f64,
    pins: u64,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = SimConfig::from_env().context("load config")?;
    let seed = parse_u64_arg("--seed").unwrap_or(20_240_901);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut world = synthetic::build_world(LeagueShape::default(), &mut rng);
    let schedule = synthetic::round_robin(&world, 1);
    let days = parse_u64_arg("--days")
        .map(|d| d as u32)
        .unwrap_or_else(|| schedule.days.len() as u32)
        .max(1);

    let db_path = parse_db_path_arg().or_else(|| cfg.db_path.clone());
    let sqlite = match &db_path {
        Some(path) => Some(
            SqliteStore::open(path)
                .with_context(|| format!("open sqlite store {}", path.display()))?,
        ),
        None => None,
    };
    let memory = MemoryStore::new();
    let lineups: &dyn LineupSource = match &sqlite {
        Some(store) => store,
        None => &memory,
    };
    let sink: &dyn RecordSink = match &sqlite {
        Some(store) => store,
        None => &memory,
    };

    let mut table: HashMap<TeamId, TableRow> = HashMap::new();
    let mut failed = 0usize;
    for day in 1..=days {
        if schedule.fixtures_for_day(day).is_none() {
            warn!(day, "no fixtures generated, stopping");
            break;
        }
        let report = match matchday::simulate_day(
            &mut world, &schedule, day, lineups, sink, &cfg, &mut rng,
        ) {
            Ok(report) => report,
            Err(SimError::DayNotScheduled(day)) => {
                warn!(day, "day not scheduled");
                break;
            }
            Err(err) => return Err(err).with_context(|| format!("simulate day {day}")),
        };
        failed += report.failures.len();
        for outcome in &report.outcomes {
            tally(&mut table, outcome);
        }
        println!(
            "day {}: {} matches, {} failed, {} shortfalls",
            report.day,
            report.outcomes.len(),
            report.failures.len(),
            report.shortfalls.len()
        );
    }

    print_standings(&world, &table);
    if failed > 0 {
        println!("failed matches: {failed}");
    }
    if let Some(path) = db_path {
        println!("DB: {}", path.display());
    }
    Ok(())
}

fn tally(table: &mut HashMap<TeamId, TableRow>, outcome: &MatchOutcome) {
    for side in [&outcome.home, &outcome.away] {
        let row = table.entry(side.team_id).or_default();
        row.played += 1;
        row.league_points += u32::from(side.league_points);
        row.match_points += side.match_points;
        row.pins += u64::from(side.total);
    }
}

fn print_standings(world: &World, table: &HashMap<TeamId, TableRow>) {
    let mut tiers = table
        .keys()
        .filter_map(|id| world.team(*id).map(|t| t.tier()))
        .collect::<Vec<_>>();
    tiers.sort_unstable();
    tiers.dedup();

    for tier in tiers {
        println!();
        println!("Tier {tier}");
        let mut rows = table
            .iter()
            .filter_map(|(id, row)| {
                let team = world.team(*id)?;
                (team.tier() == tier).then_some((team.name.as_str(), *row))
            })
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| {
            b.1.league_points
                .cmp(&a.1.league_points)
                .then(b.1.match_points.total_cmp(&a.1.match_points))
                .then(b.1.pins.cmp(&a.1.pins))
        });
        for (pos, (name, row)) in rows.iter().enumerate() {
            let avg = if row.played == 0 {
                0.0
            } else {
                row.pins as f64 / f64::from(row.played)
            };
            println!(
                "{:>2}. {:<14} P{:>3}  Pts{:>3}  MP{:>6.1}  avg {:>7.1}",
                pos + 1,
                name,
                row.played,
                row.league_points,
                row.match_points,
                avg
            );
        }
    }
}

fn parse_db_path_arg() -> Option<PathBuf> {
    parse_value_arg("--db").map(PathBuf::from)
}

fn parse_u64_arg(flag: &str) -> Option<u64> {
    parse_value_arg(flag).and_then(|v| v.parse::<u64>().ok())
}

fn parse_value_arg(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
