//! Tournament, settings and team data models.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{TournamentError, TournamentResult};
use crate::table::models::TableId;

/// Tournament ID type
pub type TournamentId = i64;

/// Team ID type (unique within a tournament)
pub type TeamId = i64;

/// Player ID type
pub type PlayerId = i64;

/// Identity of a caller (director, submitter)
pub type UserId = i64;

/// Lowest skill rating accepted in a chip band
pub const MIN_SKILL_RATING: i32 = -100;

/// Highest skill rating accepted in a chip band
pub const MAX_SKILL_RATING: i32 = 900;

/// Upper bound on starting chips per team
pub const MAX_STARTING_CHIPS: u32 = 100;

/// Upper bound on the race length of a single game
pub const MAX_RACE_TO_WINS: u32 = 10;

/// Upper bound on any single fee or added-money amount, in cents
pub const MAX_FEE_CENTS: i64 = 100_000_000;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Registering teams, nothing in play
    Setup,
    /// Games are being played
    InProgress,
    /// Play suspended by a director
    Paused,
    /// One team left, or a director ended the event
    Completed,
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentStatus::Setup => write!(f, "setup"),
            TournamentStatus::InProgress => write!(f, "in_progress"),
            TournamentStatus::Paused => write!(f, "paused"),
            TournamentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// How the initial queue is ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BracketOrdering {
    /// Uniform shuffle
    #[default]
    Random,
    /// Highest rated against lowest rated
    Seeded,
    /// Director-assigned seeds, unseeded teams last
    Manual,
}

/// Fixed payout structures for places-based mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutPlaces {
    WinnerTakeAll,
    Top2,
    Top3,
    Top4,
    Top6,
    Top8,
    /// Choose by entrant count
    Automatic,
}

/// Payout computation mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PayoutMode {
    Places(PayoutPlaces),
    /// Pay this percentage of the field (10..=50)
    Percentage(u32),
}

impl Default for PayoutMode {
    fn default() -> Self {
        PayoutMode::Places(PayoutPlaces::Automatic)
    }
}

/// Skill-rating band mapping to a starting chip count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipBand {
    pub min_rating: i32,
    pub max_rating: i32,
    pub chips: u32,
}

impl ChipBand {
    pub fn new(min_rating: i32, max_rating: i32, chips: u32) -> Self {
        Self {
            min_rating,
            max_rating,
            chips,
        }
    }

    pub fn contains(&self, rating: i32) -> bool {
        rating >= self.min_rating && rating <= self.max_rating
    }

    fn overlaps(&self, other: &ChipBand) -> bool {
        self.min_rating <= other.max_rating && other.min_rating <= self.max_rating
    }
}

/// Per-tournament configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentSettings {
    /// Games are a race to this many racks
    pub race_to_wins: u32,
    /// Chips moved from loser to winner per game
    pub chips_per_game: u32,
    /// Starting chips when no band matches
    pub default_chips_per_team: u32,
    pub chip_bands: Vec<ChipBand>,
    pub bracket_ordering: BracketOrdering,
    /// Tables are refilled automatically after every game
    pub autopilot: bool,
    /// Prefer opponents the anchored team has played least
    pub avoid_repeat_matchups: bool,
    /// Queue may be reshuffled between rounds
    pub random_reorder_per_round: bool,
    /// Winner keeps its seat at the table
    pub winner_stays: bool,
    /// Submitted scores complete the game without director approval
    pub auto_accept_scores: bool,
    pub max_teams: Option<usize>,
    /// Entry fee per team, in cents
    pub entry_fee: i64,
    /// Portion of the entry fee kept by the house, in cents
    pub admin_fee: i64,
    /// Money added to the pool by the venue, in cents
    pub added_money: i64,
    pub payout_mode: PayoutMode,
    /// Explicit payout percentages by place, overriding `payout_mode`
    pub custom_payouts: Option<Vec<f64>>,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            race_to_wins: 1,
            chips_per_game: 1,
            default_chips_per_team: 3,
            chip_bands: Vec::new(),
            bracket_ordering: BracketOrdering::Random,
            autopilot: true,
            avoid_repeat_matchups: true,
            random_reorder_per_round: false,
            winner_stays: true,
            auto_accept_scores: false,
            max_teams: None,
            entry_fee: 0,
            admin_fee: 0,
            added_money: 0,
            payout_mode: PayoutMode::default(),
            custom_payouts: None,
        }
    }
}

impl TournamentSettings {
    pub fn with_fees(mut self, entry_fee: i64, admin_fee: i64, added_money: i64) -> Self {
        self.entry_fee = entry_fee;
        self.admin_fee = admin_fee;
        self.added_money = added_money;
        self
    }

    pub fn with_chip_bands(mut self, bands: Vec<ChipBand>) -> Self {
        self.chip_bands = bands;
        self
    }

    pub fn with_race_to(mut self, race_to_wins: u32) -> Self {
        self.race_to_wins = race_to_wins;
        self
    }

    pub fn with_autopilot(mut self, autopilot: bool) -> Self {
        self.autopilot = autopilot;
        self
    }

    pub fn with_ordering(mut self, ordering: BracketOrdering) -> Self {
        self.bracket_ordering = ordering;
        self
    }

    pub fn with_payout_mode(mut self, mode: PayoutMode) -> Self {
        self.payout_mode = mode;
        self
    }

    /// Validate settings before a tournament is created
    ///
    /// # Errors
    ///
    /// Returns `TournamentError::Validation` describing the first bad field
    pub fn validate(&self) -> TournamentResult<()> {
        if self.race_to_wins == 0 || self.race_to_wins > MAX_RACE_TO_WINS {
            return Err(TournamentError::validation(format!(
                "race_to_wins must be between 1 and {MAX_RACE_TO_WINS}"
            )));
        }
        if self.chips_per_game == 0 || self.chips_per_game > MAX_STARTING_CHIPS {
            return Err(TournamentError::validation(format!(
                "chips_per_game must be between 1 and {MAX_STARTING_CHIPS}"
            )));
        }
        if self.default_chips_per_team == 0 || self.default_chips_per_team > MAX_STARTING_CHIPS {
            return Err(TournamentError::validation(format!(
                "default_chips_per_team must be between 1 and {MAX_STARTING_CHIPS}"
            )));
        }
        if self.entry_fee < 0 || self.admin_fee < 0 || self.added_money < 0 {
            return Err(TournamentError::validation("fees cannot be negative"));
        }
        if self.entry_fee > MAX_FEE_CENTS
            || self.admin_fee > MAX_FEE_CENTS
            || self.added_money > MAX_FEE_CENTS
        {
            return Err(TournamentError::validation(format!(
                "fees and added money cannot exceed {MAX_FEE_CENTS} cents"
            )));
        }
        if self.admin_fee > self.entry_fee {
            return Err(TournamentError::validation(
                "admin fee cannot exceed entry fee",
            ));
        }
        if self.max_teams.is_some_and(|max| max < 2) {
            return Err(TournamentError::validation("max_teams must be at least 2"));
        }
        if let PayoutMode::Percentage(pct) = self.payout_mode {
            if !(10..=50).contains(&pct) {
                return Err(TournamentError::validation(
                    "payout percentage must be between 10 and 50",
                ));
            }
        }
        if let Some(custom) = &self.custom_payouts {
            if custom.is_empty() || custom.iter().any(|p| *p <= 0.0) {
                return Err(TournamentError::validation(
                    "custom payouts must be non-empty and positive",
                ));
            }
            let total: f64 = custom.iter().sum();
            if (total - 100.0).abs() > 0.01 {
                return Err(TournamentError::validation(format!(
                    "custom payouts must sum to 100, got {total}"
                )));
            }
        }
        self.validate_chip_bands()
    }

    fn validate_chip_bands(&self) -> TournamentResult<()> {
        for (i, band) in self.chip_bands.iter().enumerate() {
            if band.min_rating < MIN_SKILL_RATING || band.max_rating > MAX_SKILL_RATING {
                return Err(TournamentError::validation(format!(
                    "chip band {} must lie within {MIN_SKILL_RATING}..={MAX_SKILL_RATING}",
                    i + 1
                )));
            }
            if band.min_rating >= band.max_rating {
                return Err(TournamentError::validation(format!(
                    "chip band {}: min rating must be below max rating",
                    i + 1
                )));
            }
            if band.chips == 0 || band.chips > MAX_STARTING_CHIPS {
                return Err(TournamentError::validation(format!(
                    "chip band {}: chips must be between 1 and {MAX_STARTING_CHIPS}",
                    i + 1
                )));
            }
            if let Some(j) = self.chip_bands[..i].iter().position(|b| b.overlaps(band)) {
                return Err(TournamentError::validation(format!(
                    "chip bands {} and {} overlap",
                    j + 1,
                    i + 1
                )));
            }
        }
        Ok(())
    }
}

/// Calendar birthday (year is irrelevant for the bonus)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Birthday {
    pub month: u32,
    pub day: u32,
}

impl Birthday {
    pub fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    pub fn falls_on(&self, date: NaiveDate) -> bool {
        self.month == date.month() && self.day == date.day()
    }
}

/// A roster member, with its tournament-scoped birthday flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub player_id: PlayerId,
    pub display_name: String,
    pub birthday: Option<Birthday>,
    pub skill_rating: Option<i32>,
    /// Set once the member's birthday chip has been paid in this tournament
    pub received_birthday_chip: bool,
}

impl TeamMember {
    pub fn new(player_id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
            birthday: None,
            skill_rating: None,
            received_birthday_chip: false,
        }
    }

    pub fn with_birthday(mut self, month: u32, day: u32) -> Self {
        self.birthday = Some(Birthday::new(month, day));
        self
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.skill_rating = Some(rating);
        self
    }
}

/// Registration payload for a new team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeam {
    pub name: String,
    pub members: Vec<TeamMember>,
    /// Combined rating; summed from members when absent
    pub combined_rating: Option<i32>,
    pub seed: Option<u32>,
}

impl NewTeam {
    pub fn new(name: impl Into<String>, members: Vec<TeamMember>) -> Self {
        Self {
            name: name.into(),
            members,
            combined_rating: None,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.combined_rating = Some(rating);
        self
    }
}

/// Team competitive status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamStatus {
    Active,
    Eliminated,
}

/// A registered team and its chip counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub members: Vec<TeamMember>,
    pub combined_rating: Option<i32>,
    pub seed: Option<u32>,
    pub current_chips: u32,
    pub initial_chips: u32,
    pub total_chips_won: u32,
    pub total_chips_lost: u32,
    pub status: TeamStatus,
    pub is_queued: bool,
    /// 1-based queue position while queued
    pub queue_position: Option<usize>,
    pub current_table_id: Option<TableId>,
    pub manual_chip_override: bool,
    pub registered_at: DateTime<Utc>,
    pub eliminated_at: Option<DateTime<Utc>>,
}

impl Team {
    pub fn new(id: TeamId, new_team: NewTeam) -> Self {
        let combined_rating = new_team.combined_rating.or_else(|| {
            let ratings: Vec<i32> = new_team
                .members
                .iter()
                .filter_map(|m| m.skill_rating)
                .collect();
            (!ratings.is_empty()).then(|| ratings.iter().sum())
        });

        Self {
            id,
            name: new_team.name,
            members: new_team.members,
            combined_rating,
            seed: new_team.seed,
            current_chips: 0,
            initial_chips: 0,
            total_chips_won: 0,
            total_chips_lost: 0,
            status: TeamStatus::Active,
            is_queued: false,
            queue_position: None,
            current_table_id: None,
            manual_chip_override: false,
            registered_at: Utc::now(),
            eliminated_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TeamStatus::Active
    }

    /// Active, not seated and not waiting in the queue
    pub fn is_idle(&self) -> bool {
        self.is_active() && !self.is_queued && self.current_table_id.is_none()
    }
}

/// Summary row for standings output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: usize,
    pub team_id: TeamId,
    pub name: String,
    pub status: TeamStatus,
    pub current_chips: u32,
    pub total_chips_won: u32,
    pub total_chips_lost: u32,
}
