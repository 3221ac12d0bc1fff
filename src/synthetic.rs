use rand::Rng;

use crate::matchday::{Fixture, Schedule};
use crate::model::{
    Attributes, Club, ClubId, CompetitionKind, League, MatchId, Player, PlayerId, Team, TeamId,
    World,
};

#[derive(Debug, Clone, Copy)]
pub struct LeagueShape {
    pub clubs: u32,
    pub teams_per_club: u32,
    pub players_per_club: u32,
}

impl Default for LeagueShape {
    fn default() -> Self {
        Self {
            clubs: 8,
            teams_per_club: 2,
            players_per_club: 16,
        }
    }
}

fn player_attributes<R: Rng + ?Sized>(base: u8, rng: &mut R) -> Attributes {
    let mut roll = || {
        let delta = rng.gen_range(-12i16..=12);
        (i16::from(base) + delta).clamp(1, 99) as u8
    };
    Attributes {
        strength: roll(),
        consistency: roll(),
        pressure_resistance: roll(),
        full_pins: roll(),
        clearing: roll(),
        endurance: roll(),
        safety: roll(),
        away_performance: roll(),
        start_skill: roll(),
        mid_skill: roll(),
        end_skill: roll(),
    }
}

pub fn build_world<R: Rng + ?Sized>(shape: LeagueShape, rng: &mut R) -> World {
    let mut world = World::new();
    let mut next_player = 1u32;

    for c in 0..shape.clubs {
        let club_id = ClubId(c + 1);
        world.insert_club(Club {
            id: club_id,
            name: format!("KSV {}", c + 1),
            lane_quality: rng.gen_range(0.98..=1.02),
            teams: Vec::new(),
        });

        for t in 0..shape.teams_per_club {
            let tier = (t + 1) as u8;
            world.insert_team(Team {
                id: TeamId(club_id.0 * 100 + t + 1),
                club_id,
                name: format!("KSV {} {}", c + 1, roman(t + 1)),
                league: League {
                    id: t + 1,
                    name: format!("Liga {tier}"),
                    tier,
                },
                roster: Vec::new(),
            });
        }

        let club_base = rng.gen_range(45u8..=70);
        for _ in 0..shape.players_per_club {
            let id = PlayerId(next_player);
            next_player += 1;
            let attrs = player_attributes(club_base, rng);
            world.insert_player(Player::new(id, club_id, format!("Spieler {}", id.0), attrs));
        }
    }
    world
}

fn roman(n: u32) -> &'static str {
    match n {
        1 => "I",
        2 => "II",
        3 => "III",
        4 => "IV",
        _ => "V",
    }
}

/// Single round robin per tier (circle method), one round per day starting at
/// `first_day`. Home rights alternate by round.
pub fn round_robin(world: &World, first_day: u32) -> Schedule {
    let mut by_tier = std::collections::BTreeMap::<u8, Vec<TeamId>>::new();
    for team in world.teams.values() {
        by_tier.entry(team.tier()).or_default().push(team.id);
    }

    let mut schedule = Schedule::default();
    let mut next_match = 1u32;
    for teams in by_tier.values_mut() {
        teams.sort_unstable();
        let mut ring = teams.iter().copied().map(Some).collect::<Vec<_>>();
        if ring.len() % 2 == 1 {
            ring.push(None);
        }
        let n = ring.len();
        if n < 2 {
            continue;
        }
        for round in 0..n - 1 {
            let day = first_day + round as u32;
            schedule.ensure_day(day);
            for i in 0..n / 2 {
                let (Some(a), Some(b)) = (ring[i], ring[n - 1 - i]) else {
                    continue;
                };
                let (home_team, away_team) = if round % 2 == 0 { (a, b) } else { (b, a) };
                schedule.add(
                    day,
                    Fixture {
                        match_id: MatchId(next_match),
                        competition: CompetitionKind::League,
                        home_team,
                        away_team,
                        home_advantage: None,
                    },
                );
                next_match += 1;
            }
            let last = ring.remove(n - 1);
            ring.insert(1, last);
        }
    }
    schedule
}
