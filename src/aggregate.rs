use rand::Rng;
use serde::Serialize;

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::model::{
    AttributeStore, CompetitionKind, MatchId, PlayerId, SQUAD_SIZE, Slot, TeamId, Venue,
};
use crate::scoring::{
    Bowler, EmergencySubstitute, GameScore, SECTIONS, ScoreablePlayer, ScoringContext,
    simulate_game,
};
use crate::squad::SquadAssignment;

pub const TEAM_TOTAL_BONUS: f64 = 2.0;

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRecord {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub player_id: Option<PlayerId>,
    pub slot: u8,
    pub venue: Venue,
    pub sections: [u32; SECTIONS],
    pub total: u32,
    pub full_pins: u32,
    pub clearing: u32,
    pub errors: u32,
    pub set_points: f64,
    pub match_points: f64,
}

impl PerformanceRecord {
    pub fn is_substitute(&self) -> bool {
        self.player_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamResult {
    pub team_id: TeamId,
    pub venue: Venue,
    pub total: u32,
    pub full_pins: u32,
    pub clearing: u32,
    pub errors: u32,
    pub set_points: f64,
    pub match_points: f64,
    pub league_points: u8,
    pub substitutes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub match_id: MatchId,
    pub competition: CompetitionKind,
    pub day: u32,
    pub home: TeamResult,
    pub away: TeamResult,
    pub records: Vec<PerformanceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuelPoints {
    pub set_points: (f64, f64),
    pub match_points: (f64, f64),
}

/// Sections decide set points (ties split); more set points take the match
/// point, then the higher total, then it is split.
pub fn duel_points(a: &GameScore, b: &GameScore) -> DuelPoints {
    let mut sp_a = 0.0;
    let mut sp_b = 0.0;
    for (x, y) in a.sections.iter().zip(b.sections.iter()) {
        if x > y {
            sp_a += 1.0;
        } else if x < y {
            sp_b += 1.0;
        } else {
            sp_a += 0.5;
            sp_b += 0.5;
        }
    }

    let mp = if sp_a > sp_b {
        (1.0, 0.0)
    } else if sp_a < sp_b {
        (0.0, 1.0)
    } else if a.total > b.total {
        (1.0, 0.0)
    } else if a.total < b.total {
        (0.0, 1.0)
    } else {
        (0.5, 0.5)
    };

    DuelPoints {
        set_points: (sp_a, sp_b),
        match_points: mp,
    }
}

pub fn field_bowlers<'a, S: AttributeStore + ?Sized>(
    store: &'a S,
    assignment: &SquadAssignment,
) -> SimResult<[Bowler<'a>; SQUAD_SIZE]> {
    let mut out = [Bowler::Substitute(EmergencySubstitute); SQUAD_SIZE];
    for (bowler, slot) in out.iter_mut().zip(assignment.slots.iter()) {
        if let Some(id) = slot {
            let player = store.player(*id).ok_or(SimError::UnknownPlayer(*id))?;
            *bowler = Bowler::Real(player);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
pub struct MatchSetup {
    pub match_id: MatchId,
    pub competition: CompetitionKind,
    pub day: u32,
    pub tier: u8,
    pub lane_quality: f64,
    pub home_advantage: bool,
}

pub fn play_match<S, R>(
    store: &S,
    setup: &MatchSetup,
    home: &SquadAssignment,
    away: &SquadAssignment,
    cfg: &SimConfig,
    rng: &mut R,
) -> SimResult<MatchOutcome>
where
    S: AttributeStore + ?Sized,
    R: Rng + ?Sized,
{
    let home_bowlers = field_bowlers(store, home)?;
    let away_bowlers = field_bowlers(store, away)?;

    let mut home_scores = [GameScore::default(); SQUAD_SIZE];
    let mut away_scores = [GameScore::default(); SQUAD_SIZE];
    for slot in Slot::all() {
        let i = slot.index();
        let ctx = |venue| ScoringContext {
            slot,
            venue,
            home_advantage: setup.home_advantage,
            lane_quality: setup.lane_quality,
            tier: setup.tier,
        };
        home_scores[i] = simulate_game(&home_bowlers[i], &ctx(Venue::Home), cfg, rng);
        away_scores[i] = simulate_game(&away_bowlers[i], &ctx(Venue::Away), cfg, rng);
    }

    Ok(aggregate_scores(
        setup,
        (home.team_id, &home_bowlers, &home_scores),
        (away.team_id, &away_bowlers, &away_scores),
    ))
}

type Side<'s, 'a> = (TeamId, &'s [Bowler<'a>; SQUAD_SIZE], &'s [GameScore; SQUAD_SIZE]);

pub fn aggregate_scores(setup: &MatchSetup, home: Side<'_, '_>, away: Side<'_, '_>) -> MatchOutcome {
    let mut records = Vec::with_capacity(SQUAD_SIZE * 2);
    let mut home_mp = 0.0;
    let mut away_mp = 0.0;
    let mut home_sp = 0.0;
    let mut away_sp = 0.0;

    for slot in Slot::all() {
        let i = slot.index();
        let points = duel_points(&home.2[i], &away.2[i]);
        home_sp += points.set_points.0;
        away_sp += points.set_points.1;
        home_mp += points.match_points.0;
        away_mp += points.match_points.1;

        records.push(record(
            setup,
            home.0,
            Venue::Home,
            slot,
            &home.1[i],
            &home.2[i],
            points.set_points.0,
            points.match_points.0,
        ));
        records.push(record(
            setup,
            away.0,
            Venue::Away,
            slot,
            &away.1[i],
            &away.2[i],
            points.set_points.1,
            points.match_points.1,
        ));
    }

    let home_total = home.2.iter().map(|s| s.total).sum::<u32>();
    let away_total = away.2.iter().map(|s| s.total).sum::<u32>();
    if home_total > away_total {
        home_mp += TEAM_TOTAL_BONUS;
    } else if home_total < away_total {
        away_mp += TEAM_TOTAL_BONUS;
    } else {
        home_mp += TEAM_TOTAL_BONUS / 2.0;
        away_mp += TEAM_TOTAL_BONUS / 2.0;
    }

    let (home_lp, away_lp) = if home_mp > away_mp {
        (2, 0)
    } else if home_mp < away_mp {
        (0, 2)
    } else {
        (1, 1)
    };

    MatchOutcome {
        match_id: setup.match_id,
        competition: setup.competition,
        day: setup.day,
        home: team_result(home, Venue::Home, home_sp, home_mp, home_lp),
        away: team_result(away, Venue::Away, away_sp, away_mp, away_lp),
        records,
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    setup: &MatchSetup,
    team_id: TeamId,
    venue: Venue,
    slot: Slot,
    bowler: &Bowler<'_>,
    score: &GameScore,
    set_points: f64,
    match_points: f64,
) -> PerformanceRecord {
    PerformanceRecord {
        match_id: setup.match_id,
        team_id,
        player_id: bowler.player_id(),
        slot: slot.number(),
        venue,
        sections: score.sections,
        total: score.total,
        full_pins: score.full_pins,
        clearing: score.clearing,
        errors: score.errors,
        set_points,
        match_points,
    }
}

fn team_result(
    side: Side<'_, '_>,
    venue: Venue,
    set_points: f64,
    match_points: f64,
    league_points: u8,
) -> TeamResult {
    let (team_id, bowlers, scores) = side;
    TeamResult {
        team_id,
        venue,
        total: scores.iter().map(|s| s.total).sum(),
        full_pins: scores.iter().map(|s| s.full_pins).sum(),
        clearing: scores.iter().map(|s| s.clearing).sum(),
        errors: scores.iter().map(|s| s.errors).sum(),
        set_points,
        match_points,
        league_points,
        substitutes: bowlers.iter().filter(|b| b.is_substitute()).count(),
    }
}
