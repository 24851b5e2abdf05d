//! Pricing and delivery computations
//!
//! Totals are always derived from catalog ids. A total submitted by a client
//! is never stored or trusted: every read path recomputes it from the pack,
//! the selected options and the deposit percent.

use crate::catalog::{get_option, get_pack, DEFAULT_TIMELINE_DAYS};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

/// Deposit percent applied when none is provided
pub const DEFAULT_DEPOSIT_PERCENT: u8 = 30;

/// Derived amounts for a pack + options selection (whole euros)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingDetails {
    pub pack_price: u32,
    pub options_price: u32,
    pub total_price: u32,
    pub deposit_amount: u32,
    pub remaining_amount: u32,
}

/// Compute the price breakdown of a selection.
///
/// An unknown pack prices at zero and unknown option ids are skipped; neither
/// is an error. Percents above 100 are clamped.
pub fn calculate_pricing<S: AsRef<str>>(
    pack_id: &str,
    option_ids: &[S],
    deposit_percent: u8,
) -> PricingDetails {
    let pack_price = get_pack(pack_id).map_or(0, |pack| pack.base_price);

    let options_price = option_ids
        .iter()
        .filter_map(|id| get_option(id.as_ref()))
        .map(|option| option.price)
        .sum::<u32>();

    let total_price = pack_price + options_price;
    let deposit_amount = percent_of(total_price, deposit_percent);

    PricingDetails {
        pack_price,
        options_price,
        total_price,
        deposit_amount,
        remaining_amount: total_price - deposit_amount,
    }
}

/// `round(amount * percent / 100)`, halves rounded up
fn percent_of(amount: u32, percent: u8) -> u32 {
    let percent = u64::from(percent.min(100));
    ((u64::from(amount) * percent + 50) / 100) as u32
}

/// Delivery delay of a pack in days
pub fn timeline_days(pack_id: &str) -> u32 {
    get_pack(pack_id).map_or(DEFAULT_TIMELINE_DAYS, |pack| pack.default_timeline_days)
}

/// Estimated delivery date when work starts on `start`
pub fn calculate_delivery_date(pack_id: &str, start: NaiveDate) -> NaiveDate {
    add_days(start, timeline_days(pack_id))
}

/// Last day a proposal created on `from` can be accepted
pub fn compute_valid_until(from: NaiveDate, validity_days: u32) -> NaiveDate {
    add_days(from, validity_days)
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// One milestone of the delivery timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    pub title: &'static str,
    pub description: &'static str,
    pub day_offset: u32,
}

impl TimelineStep {
    /// "J+3" style label
    pub fn label(&self) -> String {
        format!("J+{}", self.day_offset)
    }
}

/// Brief, build and launch milestones for a pack
pub fn timeline(pack_id: &str) -> Vec<TimelineStep> {
    let days = timeline_days(pack_id);
    vec![
        TimelineStep {
            title: "Brief",
            description: "Échange & validation du projet",
            day_offset: 0,
        },
        TimelineStep {
            title: "Création",
            description: "Design & développement",
            day_offset: days / 2,
        },
        TimelineStep {
            title: "Mise en ligne",
            description: "Livraison & formation",
            day_offset: days,
        },
    ]
}

/// Format whole euros the fr-FR way: `1 680 €`
pub fn format_price(amount: u32) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + 8);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('\u{202f}');
        }
        grouped.push(c);
    }
    grouped.push_str("\u{a0}€");
    grouped
}

const MONTHS_FR: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];

/// Long French date: `11 janvier 2024`
pub fn format_date_fr(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_FR[date.month0() as usize],
        date.year()
    )
}

/// Short French date: `11/01/2024`
pub fn format_date_short(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
