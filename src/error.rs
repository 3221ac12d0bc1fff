use thiserror::Error;

use crate::model::{ClubId, MatchId, PlayerId, TeamId, Venue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineupRejection {
    WrongSize { found: usize },
    DuplicatePlayer(PlayerId),
    NotInClub(PlayerId),
    Unavailable(PlayerId),
    AlreadyClaimed { player: PlayerId, by_team: TeamId },
}

impl std::fmt::Display for LineupRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineupRejection::WrongSize { found } => {
                write!(f, "expected 6 players, found {found}")
            }
            LineupRejection::DuplicatePlayer(id) => write!(f, "{id} listed twice"),
            LineupRejection::NotInClub(id) => write!(f, "{id} does not belong to the club"),
            LineupRejection::Unavailable(id) => write!(f, "{id} is unavailable today"),
            LineupRejection::AlreadyClaimed { player, by_team } => {
                write!(f, "{player} already fielded by {by_team}")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid manual lineup for {match_id} ({team_id}, {venue:?}): {reason}")]
    InvalidManualLineup {
        match_id: MatchId,
        team_id: TeamId,
        venue: Venue,
        reason: LineupRejection,
    },

    #[error("{player_id} of {club_id} claimed by {claimed_by} and {requested_by} on the same day")]
    ConcurrencyViolation {
        player_id: PlayerId,
        club_id: ClubId,
        claimed_by: TeamId,
        requested_by: TeamId,
    },

    #[error("unknown team {0}")]
    UnknownTeam(TeamId),

    #[error("unknown club {0}")]
    UnknownClub(ClubId),

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("no fixtures generated for day {0}")]
    DayNotScheduled(u32),

    #[error("store error: {0}")]
    Store(String),
}

impl From<rusqlite::Error> for SimError {
    fn from(err: rusqlite::Error) -> Self {
        SimError::Store(err.to_string())
    }
}

pub type SimResult<T> = std::result::Result<T, SimError>;
