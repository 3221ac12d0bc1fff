use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::day_context::DayContext;
use crate::error::SimError;
use crate::form::FormState;

pub const SQUAD_SIZE: usize = 6;
pub const ATTR_MIN: u8 = 1;
pub const ATTR_MAX: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClubId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(pub u32);

macro_rules! display_id {
    ($($ty:ident => $prefix:literal),* $(,)?) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        })*
    };
}

display_id!(PlayerId => "player#", TeamId => "team#", ClubId => "club#", MatchId => "match#");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub fn as_str(self) -> &'static str {
        match self {
            Venue::Home => "home",
            Venue::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompetitionKind {
    League,
    Cup,
}

impl CompetitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompetitionKind::League => "league",
            CompetitionKind::Cup => "cup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotPair {
    Start,
    Middle,
    End,
}

impl SlotPair {
    pub const ALL: [SlotPair; 3] = [SlotPair::Start, SlotPair::Middle, SlotPair::End];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot(u8);

impl Slot {
    pub fn new(number: u8) -> Option<Self> {
        (1..=SQUAD_SIZE as u8).contains(&number).then_some(Self(number))
    }

    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index + 1).ok().and_then(Self::new)
    }

    pub fn all() -> impl Iterator<Item = Slot> {
        (1..=SQUAD_SIZE as u8).map(Slot)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn pair(self) -> SlotPair {
        match self.0 {
            1 | 2 => SlotPair::Start,
            3 | 4 => SlotPair::Middle,
            _ => SlotPair::End,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: u8,
    pub consistency: u8,
    pub pressure_resistance: u8,
    pub full_pins: u8,
    pub clearing: u8,
    pub endurance: u8,
    pub safety: u8,
    pub away_performance: u8,
    pub start_skill: u8,
    pub mid_skill: u8,
    pub end_skill: u8,
}

impl Attributes {
    pub fn neutral() -> Self {
        Self::uniform(50)
    }

    pub fn uniform(value: u8) -> Self {
        let v = value.clamp(ATTR_MIN, ATTR_MAX);
        Self {
            strength: v,
            consistency: v,
            pressure_resistance: v,
            full_pins: v,
            clearing: v,
            endurance: v,
            safety: v,
            away_performance: v,
            start_skill: v,
            mid_skill: v,
            end_skill: v,
        }
    }

    /// Selection rating: 50% strength, 10% consistency, 10% pressure resistance,
    /// 15% full pins, 15% clearing.
    pub fn weighted_rating(&self) -> f64 {
        0.50 * f64::from(self.strength)
            + 0.10 * f64::from(self.consistency)
            + 0.10 * f64::from(self.pressure_resistance)
            + 0.15 * f64::from(self.full_pins)
            + 0.15 * f64::from(self.clearing)
    }

    pub fn phase_skill(&self, pair: SlotPair) -> u8 {
        match pair {
            SlotPair::Start => self.start_skill,
            SlotPair::Middle => self.mid_skill,
            SlotPair::End => self.end_skill,
        }
    }

    pub fn clamped(mut self) -> Self {
        for v in [
            &mut self.strength,
            &mut self.consistency,
            &mut self.pressure_resistance,
            &mut self.full_pins,
            &mut self.clearing,
            &mut self.endurance,
            &mut self.safety,
            &mut self.away_performance,
            &mut self.start_skill,
            &mut self.mid_skill,
            &mut self.end_skill,
        ] {
            *v = (*v).clamp(ATTR_MIN, ATTR_MAX);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub club_id: ClubId,
    pub name: String,
    pub attributes: Attributes,
    #[serde(default)]
    pub form: FormState,
    #[serde(default)]
    pub retired: bool,
    #[serde(default)]
    pub last_played_day: Option<u32>,
}

impl Player {
    pub fn new(id: PlayerId, club_id: ClubId, name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id,
            club_id,
            name: name.into(),
            attributes: attributes.clamped(),
            form: FormState::default(),
            retired: false,
            last_played_day: None,
        }
    }

    pub fn rating(&self) -> f64 {
        self.attributes.weighted_rating()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    pub id: u32,
    pub name: String,
    pub tier: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub club_id: ClubId,
    pub name: String,
    pub league: League,
    #[serde(default)]
    pub roster: Vec<PlayerId>,
}

impl Team {
    pub fn tier(&self) -> u8 {
        self.league.tier
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub id: ClubId,
    pub name: String,
    pub lane_quality: f64,
    pub teams: Vec<TeamId>,
}

pub trait AttributeStore {
    fn club(&self, id: ClubId) -> Option<&Club>;
    fn team(&self, id: TeamId) -> Option<&Team>;
    fn player(&self, id: PlayerId) -> Option<&Player>;
    fn club_players(&self, id: ClubId) -> Vec<&Player>;

    fn require_team(&self, id: TeamId) -> Result<&Team, SimError> {
        self.team(id).ok_or(SimError::UnknownTeam(id))
    }

    fn require_club(&self, id: ClubId) -> Result<&Club, SimError> {
        self.club(id).ok_or(SimError::UnknownClub(id))
    }

    fn teams_by_tier(&self, id: ClubId) -> Vec<&Team> {
        let Some(club) = self.club(id) else {
            return Vec::new();
        };
        let mut teams = club
            .teams
            .iter()
            .filter_map(|team_id| self.team(*team_id))
            .collect::<Vec<_>>();
        teams.sort_by(|a, b| a.tier().cmp(&b.tier()).then(a.id.cmp(&b.id)));
        teams
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    pub clubs: HashMap<ClubId, Club>,
    pub teams: HashMap<TeamId, Team>,
    pub players: HashMap<PlayerId, Player>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_club(&mut self, club: Club) {
        self.clubs.insert(club.id, club);
    }

    pub fn insert_team(&mut self, team: Team) {
        if let Some(club) = self.clubs.get_mut(&team.club_id)
            && !club.teams.contains(&team.id)
        {
            club.teams.push(team.id);
        }
        self.teams.insert(team.id, team);
    }

    pub fn insert_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Players in id order, so seeded runs consume randomness reproducibly.
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        let mut players = self.players.values_mut().collect::<Vec<_>>();
        players.sort_by_key(|p| p.id);
        players.into_iter()
    }

    pub fn commit_day(&mut self, ctx: &DayContext) -> usize {
        let mut updated = 0usize;
        for id in ctx.played_players() {
            if let Some(player) = self.players.get_mut(&id) {
                player.last_played_day = Some(ctx.day);
                updated += 1;
            }
        }
        updated
    }
}

impl AttributeStore for World {
    fn club(&self, id: ClubId) -> Option<&Club> {
        self.clubs.get(&id)
    }

    fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    fn club_players(&self, id: ClubId) -> Vec<&Player> {
        let mut out = self
            .players
            .values()
            .filter(|p| p.club_id == id && !p.retired)
            .collect::<Vec<_>>();
        out.sort_by_key(|p| p.id);
        out
    }
}
