use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;

use kegel_matchday::SimConfig;
use kegel_matchday::model::{Attributes, ClubId, Player, PlayerId, Slot, Venue};
use kegel_matchday::scoring::{ScoringContext, simulate_game, tier_profile};

const DEFAULT_TRIALS: usize = 20_000;

struct Summary {
    mean: f64,
    stddev: f64,
    errors: f64,
    full_pin_share: f64,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let cfg = SimConfig::from_env().context("load config")?;
    let trials = parse_trials_arg().unwrap_or(DEFAULT_TRIALS).max(100);
    let skill = parse_skill_arg().unwrap_or(70);

    let player = Player::new(PlayerId(1), ClubId(1), "calibration", Attributes::uniform(skill));
    let slot = Slot::new(3).context("slot 3")?;

    println!("Score calibration: skill={skill} trials={trials}");
    println!(
        "{:<5} {:<5} {:>8} {:>7} {:>7} {:>7}",
        "tier", "venue", "mean", "sd", "errors", "full%"
    );
    for tier in 1..=4u8 {
        let mut means = Vec::with_capacity(2);
        for venue in [Venue::Home, Venue::Away] {
            let ctx = ScoringContext {
                slot,
                venue,
                home_advantage: true,
                lane_quality: 1.0,
                tier,
            };
            let summary = run(&player, &ctx, &cfg, trials, u64::from(tier) * 31 + venue as u64);
            println!(
                "{:<5} {:<5} {:>8.1} {:>7.1} {:>7.2} {:>6.1}%",
                tier,
                venue.as_str(),
                summary.mean,
                summary.stddev,
                summary.errors,
                summary.full_pin_share * 100.0
            );
            means.push(summary.mean);
        }
        let profile = tier_profile(tier);
        println!(
            "      home/away {:.4}  band {:.0}-{:.0} per section",
            means[0] / means[1],
            profile.section_floor,
            profile.section_ceiling
        );
    }
    Ok(())
}

fn run(player: &Player, ctx: &ScoringContext, cfg: &SimConfig, trials: usize, seed: u64) -> Summary {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut totals = Vec::with_capacity(trials);
    let mut errors = 0u64;
    let mut full = 0u64;
    for _ in 0..trials {
        let score = simulate_game(player, ctx, cfg, &mut rng);
        totals.push(f64::from(score.total));
        errors += u64::from(score.errors);
        full += u64::from(score.full_pins);
    }
    let n = totals.len() as f64;
    let mean = totals.iter().sum::<f64>() / n;
    let var = totals.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
    Summary {
        mean,
        stddev: var.sqrt(),
        errors: errors as f64 / n,
        full_pin_share: full as f64 / totals.iter().sum::<f64>().max(1.0),
    }
}

fn parse_trials_arg() -> Option<usize> {
    std::env::args()
        .skip(1)
        .find_map(|arg| arg.strip_prefix("--trials=").and_then(|v| v.trim().parse().ok()))
}

fn parse_skill_arg() -> Option<u8> {
    std::env::args()
        .skip(1)
        .find_map(|arg| arg.strip_prefix("--skill=").and_then(|v| v.trim().parse().ok()))
}
