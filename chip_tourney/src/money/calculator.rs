//! Prize pool, payout structure and final payout assignment.

use chrono::Utc;

use super::models::{
    MoneyBreakdown, MoneySummary, NewPayoutSplit, Payout, PayoutId, PayoutPlace, PayoutSplit,
    SplitId, SplitRecipient,
};
use crate::errors::{TournamentError, TournamentResult};
use crate::tournament::models::{
    PayoutMode, PayoutPlaces, Team, TeamId, TournamentSettings, UserId,
};
use crate::tournament::record::TournamentRecord;

/// Preset place percentages, smallest structure first
const PRESETS: [&[f64]; 6] = [
    &[100.0],
    &[60.0, 40.0],
    &[50.0, 30.0, 20.0],
    &[40.0, 25.0, 20.0, 15.0],
    &[35.0, 25.0, 15.0, 12.0, 8.0, 5.0],
    &[30.0, 20.0, 15.0, 12.0, 10.0, 6.0, 4.0, 3.0],
];

/// Base share of first place in percentage mode, before the field bonus
const FIRST_PLACE_BASE: f64 = 40.0;
const FIRST_PLACE_BONUS: f64 = 20.0;

/// Pool figures for a number of registered teams
///
/// Totals saturate at `i64::MAX`; validated settings keep them far below it.
pub fn tournament_money(settings: &TournamentSettings, registered: usize) -> MoneyBreakdown {
    let teams = i64::try_from(registered).unwrap_or(i64::MAX);
    MoneyBreakdown {
        entrants: registered,
        total_entry_fees: settings.entry_fee.saturating_mul(teams),
        total_admin_fees: settings.admin_fee.saturating_mul(teams),
        added_money: settings.added_money,
        total_payout: (settings.entry_fee - settings.admin_fee)
            .saturating_mul(teams)
            .saturating_add(settings.added_money),
    }
}

fn preset_index(places: PayoutPlaces, entrants: usize) -> usize {
    match places {
        PayoutPlaces::WinnerTakeAll => 0,
        PayoutPlaces::Top2 => 1,
        PayoutPlaces::Top3 => 2,
        PayoutPlaces::Top4 => 3,
        PayoutPlaces::Top6 => 4,
        PayoutPlaces::Top8 => 5,
        PayoutPlaces::Automatic => match entrants {
            0..=4 => 0,
            5..=8 => 1,
            9..=16 => 2,
            17..=24 => 3,
            25..=31 => 4,
            _ => 5,
        },
    }
}

/// Percentages for a places-based structure
///
/// A preset paying more places than there are entrants falls back to the
/// largest preset that fits, so the percentages always sum to 100.
pub fn place_percentages(places: PayoutPlaces, entrants: usize) -> Vec<f64> {
    if entrants == 0 {
        return Vec::new();
    }
    let mut idx = preset_index(places, entrants);
    while idx > 0 && PRESETS[idx].len() > entrants {
        idx -= 1;
    }
    PRESETS[idx].to_vec()
}

/// Percentages when a share of the field is paid
///
/// First place gets `40 + 20 / places` (rounded) and the rest is split
/// evenly among the other places.
pub fn field_percentages(entrants: usize, percent_of_field: u32) -> Vec<f64> {
    if entrants == 0 {
        return Vec::new();
    }
    let places = ((entrants as f64 * percent_of_field as f64 / 100.0).round() as usize)
        .clamp(1, entrants);
    if places == 1 {
        return vec![100.0];
    }

    let first = (FIRST_PLACE_BASE + FIRST_PLACE_BONUS / places as f64).round();
    let rest = (100.0 - first) / (places - 1) as f64;
    std::iter::once(first)
        .chain(std::iter::repeat_n(rest, places - 1))
        .collect()
}

fn ordinal(position: usize) -> String {
    let suffix = match (position % 10, position % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{position}{suffix} Place")
}

/// Turn percentages into cent amounts
///
/// Each place is rounded to the nearest cent; whatever rounding leaves over
/// (positive or negative) is credited to first place so the amounts always
/// add up to `total_payout`.
pub fn amounts_for(percentages: &[f64], total_payout: i64) -> Vec<PayoutPlace> {
    if total_payout <= 0 || percentages.is_empty() {
        return Vec::new();
    }
    let mut places: Vec<PayoutPlace> = percentages
        .iter()
        .enumerate()
        .map(|(idx, pct)| PayoutPlace {
            position: idx + 1,
            percentage: *pct,
            amount: (total_payout as f64 * pct / 100.0).round() as i64,
            description: ordinal(idx + 1),
        })
        .collect();

    let residue = total_payout - places.iter().map(|p| p.amount).sum::<i64>();
    places[0].amount += residue;
    places
}

/// Payout places for a pool under a payout mode
pub fn automatic_payouts(entrants: usize, total_payout: i64, mode: PayoutMode) -> Vec<PayoutPlace> {
    let percentages = match mode {
        PayoutMode::Places(places) => place_percentages(places, entrants),
        PayoutMode::Percentage(pct) => field_percentages(entrants, pct),
    };
    amounts_for(&percentages, total_payout)
}

/// Structure for a tournament: custom percentages win over the automatic mode
pub fn payout_structure(settings: &TournamentSettings, breakdown: &MoneyBreakdown) -> Vec<PayoutPlace> {
    match &settings.custom_payouts {
        Some(custom) => amounts_for(custom, breakdown.total_payout),
        None => automatic_payouts(breakdown.entrants, breakdown.total_payout, settings.payout_mode),
    }
}

/// Teams in finishing order
///
/// Surviving teams first, then chips held, chips won, later elimination,
/// and finally registration order.
pub fn rank_teams(record: &TournamentRecord) -> Vec<&Team> {
    let mut teams: Vec<&Team> = record.teams.values().collect();
    teams.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then(b.current_chips.cmp(&a.current_chips))
            .then(b.total_chips_won.cmp(&a.total_chips_won))
            .then(b.eliminated_at.cmp(&a.eliminated_at))
            .then(a.id.cmp(&b.id))
    });
    teams
}

/// Build payout records from the structure and assign them in finishing order
pub fn final_payouts(record: &mut TournamentRecord) -> TournamentResult<&[Payout]> {
    if record.payouts.iter().any(|p| p.is_paid) {
        return Err(TournamentError::Payment(
            "payouts already paid cannot be recalculated".to_string(),
        ));
    }
    let breakdown = tournament_money(&record.settings, record.teams.len());
    let structure = payout_structure(&record.settings, &breakdown);
    let ranked: Vec<TeamId> = rank_teams(record).iter().map(|t| t.id).collect();

    record.payouts.clear();
    record.payout_splits.clear();
    for (idx, place) in structure.into_iter().enumerate() {
        let id = record.sequences.next_payout();
        record.payouts.push(Payout {
            id,
            position: place.position,
            percentage: place.percentage,
            amount: place.amount,
            original_amount: place.amount,
            description: place.description,
            team_id: ranked.get(idx).copied(),
            is_split: false,
            is_paid: false,
            paid_at: None,
            paid_by: None,
        });
    }
    Ok(&record.payouts)
}

fn ensure_unpaid(payout: &Payout) -> TournamentResult<()> {
    if payout.is_paid {
        return Err(TournamentError::Payment(format!(
            "payout {} has already been paid",
            payout.id
        )));
    }
    Ok(())
}

/// Divide a single payout among several recipients
///
/// # Errors
///
/// Fails if the payout is paid or already split, a share is not positive,
/// a team recipient is unknown, or the shares do not add up to the payout
pub fn create_payout_split(
    record: &mut TournamentRecord,
    request: NewPayoutSplit,
    director: UserId,
) -> TournamentResult<SplitId> {
    for share in &request.shares {
        if share.amount <= 0 {
            return Err(TournamentError::Payment(
                "split shares must be positive".to_string(),
            ));
        }
        if let SplitRecipient::Team(team_id) = share.recipient {
            record.team(team_id)?;
        }
    }
    let total: i64 = request.shares.iter().map(|s| s.amount).sum();

    let payout = record.payout_mut(request.payout_id)?;
    ensure_unpaid(payout)?;
    if payout.is_split {
        return Err(TournamentError::Payment(format!(
            "payout {} is already split",
            payout.id
        )));
    }
    if request.shares.len() < 2 {
        return Err(TournamentError::Payment(
            "a split needs at least two shares".to_string(),
        ));
    }
    if total != payout.amount {
        return Err(TournamentError::InvalidSplit {
            expected: payout.amount,
            actual: total,
        });
    }
    payout.is_split = true;

    let id = record.sequences.next_split();
    record.payout_splits.push(PayoutSplit {
        id,
        payout_id: request.payout_id,
        name: request.name,
        description: request.description,
        shares: request.shares,
        total_amount: total,
        created_by: director,
        created_at: Utc::now(),
    });
    Ok(id)
}

/// Director override of a payout's amount or recipient
pub fn manual_payout(
    record: &mut TournamentRecord,
    payout_id: PayoutId,
    team_id: Option<TeamId>,
    amount: i64,
) -> TournamentResult<()> {
    if amount < 0 {
        return Err(TournamentError::Payment(
            "payout amount cannot be negative".to_string(),
        ));
    }
    if let Some(team_id) = team_id {
        record.team(team_id)?;
    }
    let payout = record.payout_mut(payout_id)?;
    ensure_unpaid(payout)?;
    if payout.is_split {
        return Err(TournamentError::Payment(format!(
            "payout {payout_id} has been split"
        )));
    }
    payout.amount = amount;
    if team_id.is_some() {
        payout.team_id = team_id;
    }
    Ok(())
}

pub fn mark_payout_paid(
    record: &mut TournamentRecord,
    payout_id: PayoutId,
    paid_by: UserId,
) -> TournamentResult<()> {
    let payout = record.payout_mut(payout_id)?;
    ensure_unpaid(payout)?;
    if payout.team_id.is_none() && !payout.is_split {
        return Err(TournamentError::Payment(format!(
            "payout {payout_id} has no recipient"
        )));
    }
    payout.is_paid = true;
    payout.paid_at = Some(Utc::now());
    payout.paid_by = Some(paid_by);
    Ok(())
}

/// Everything money-related in one view
pub fn money_summary(record: &TournamentRecord) -> MoneySummary {
    let breakdown = tournament_money(&record.settings, record.teams.len());
    MoneySummary {
        projected_payouts: payout_structure(&record.settings, &breakdown),
        breakdown,
        payouts: record.payouts.clone(),
        splits: record.payout_splits.clone(),
        side_pots: record.side_pots.clone(),
        total_side_pot_money: record.side_pots.iter().map(|p| p.total_pot).sum(),
    }
}
