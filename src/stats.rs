//! Summary metrics over a subset of listings.
//!
//! Every helper is total: an empty subset yields `None` (or an empty
//! collection) rather than a zero that could be mistaken for real data.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use serde::Serialize;

use crate::data::model::Listing;
use crate::geo::GeoPoint;

/// Quantile of already-sorted values using linear interpolation between the
/// two nearest ranks (NumPy's default method). `q` is clamped to `[0, 1]`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;

    if lower == upper {
        Some(sorted[lower])
    } else {
        Some(sorted[lower] * (1.0 - frac) + sorted[upper] * frac)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean nightly price.
pub fn mean_price(subset: &[&Listing]) -> Option<f64> {
    mean(subset.iter().map(|l| l.price))
}

/// Estimated cost of a stay at `mean_price` per night.
pub fn projected_cost(mean_price: f64, nights: NonZeroU32) -> f64 {
    mean_price * f64::from(nights.get())
}

/// Mean security index over listings that carry one. `None` when the subset
/// is empty or the source had no `security_index` column.
pub fn mean_security(subset: &[&Listing]) -> Option<f64> {
    mean(subset.iter().filter_map(|l| l.security_index))
}

/// The `n` most reviewed listings, descending; ties keep subset order.
pub fn top_by_reviews<'a>(subset: &[&'a Listing], n: usize) -> Vec<&'a Listing> {
    let mut sorted = subset.to_vec();
    sorted.sort_by(|a, b| b.number_of_reviews.cmp(&a.number_of_reviews));
    sorted.truncate(n);
    sorted
}

// ---------------------------------------------------------------------------
// Grouped distributions (box-plot statistics)
// ---------------------------------------------------------------------------

/// Categorical column used to group listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupColumn {
    Neighbourhood,
    RoomType,
}

impl GroupColumn {
    pub fn key<'a>(&self, listing: &'a Listing) -> &'a str {
        match self {
            GroupColumn::Neighbourhood => &listing.neighbourhood,
            GroupColumn::RoomType => &listing.room_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

/// Price distribution of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDistribution {
    pub count: usize,
    /// Lowest price inside the lower fence.
    pub min: f64,
    /// Highest price inside the upper fence.
    pub max: f64,
    pub quartiles: Quartiles,
    /// `q1 - 1.5 * IQR`
    pub lower_fence: f64,
    /// `q3 + 1.5 * IQR`
    pub upper_fence: f64,
    /// Prices outside the fences, ascending.
    pub outliers: Vec<f64>,
}

impl PriceDistribution {
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        let mut sorted = prices.to_vec();
        sorted.sort_by(f64::total_cmp);

        let quartiles = Quartiles {
            q1: quantile(&sorted, 0.25)?,
            median: quantile(&sorted, 0.5)?,
            q3: quantile(&sorted, 0.75)?,
        };
        let iqr = quartiles.q3 - quartiles.q1;
        let lower_fence = quartiles.q1 - 1.5 * iqr;
        let upper_fence = quartiles.q3 + 1.5 * iqr;

        let (inside, outliers): (Vec<f64>, Vec<f64>) = sorted
            .iter()
            .copied()
            .partition(|p| (lower_fence..=upper_fence).contains(p));

        // Q1..Q3 always lie inside the fences, so `inside` is never empty.
        let min = inside.first().copied().unwrap_or(quartiles.q1);
        let max = inside.last().copied().unwrap_or(quartiles.q3);

        Some(PriceDistribution {
            count: sorted.len(),
            min,
            max,
            quartiles,
            lower_fence,
            upper_fence,
            outliers,
        })
    }
}

/// Price distribution per group value.
pub fn grouped_price_stats(
    subset: &[&Listing],
    group_by: GroupColumn,
) -> BTreeMap<String, PriceDistribution> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for listing in subset {
        groups
            .entry(group_by.key(listing))
            .or_default()
            .push(listing.price);
    }

    groups
        .into_iter()
        .filter_map(|(key, prices)| {
            PriceDistribution::from_prices(&prices).map(|d| (key.to_string(), d))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dashboard helpers
// ---------------------------------------------------------------------------

/// Lowest and highest price, used to bound a price range selection.
pub fn price_bounds(subset: &[&Listing]) -> Option<(f64, f64)> {
    subset.iter().map(|l| l.price).fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
    })
}

/// Mean coordinate of the subset, used to centre a map.
pub fn map_center(subset: &[&Listing]) -> Option<GeoPoint> {
    let latitude = mean(subset.iter().map(|l| l.latitude))?;
    let longitude = mean(subset.iter().map(|l| l.longitude))?;
    Some(GeoPoint::new(latitude, longitude))
}

/// Split a subset into one group per neighbourhood.
///
/// Groups follow `selected` when it is non-empty (zones with no listings are
/// skipped), otherwise first appearance in `subset`.
pub fn partition_by_neighbourhood<'a>(
    subset: &[&'a Listing],
    selected: &[String],
) -> Vec<(String, Vec<&'a Listing>)> {
    let order: Vec<String> = if selected.is_empty() {
        let mut seen: Vec<String> = Vec::new();
        for listing in subset {
            if !seen.contains(&listing.neighbourhood) {
                seen.push(listing.neighbourhood.clone());
            }
        }
        seen
    } else {
        selected.to_vec()
    };

    order
        .into_iter()
        .filter_map(|zone| {
            let rows: Vec<&Listing> = subset
                .iter()
                .copied()
                .filter(|l| l.neighbourhood == zone)
                .collect();
            (!rows.is_empty()).then_some((zone, rows))
        })
        .collect()
}

/// Headline figures for a filtered subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub options: usize,
    pub mean_price: Option<f64>,
    pub nights: u32,
    pub projected_cost: Option<f64>,
    pub mean_security: Option<f64>,
}

impl Summary {
    pub fn compute(subset: &[&Listing], nights: NonZeroU32) -> Self {
        let mean_price = mean_price(subset);
        Summary {
            options: subset.len(),
            mean_price,
            nights: nights.get(),
            projected_cost: mean_price.map(|m| projected_cost(m, nights)),
            mean_security: mean_security(subset),
        }
    }
}
