use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::{CanonicalDataset, Listing};
use crate::stats::price_bounds;

// ---------------------------------------------------------------------------
// Filter predicate
// ---------------------------------------------------------------------------

/// The user's selection. A listing passes when every clause holds:
///
/// * `locations` – empty means "no restriction", otherwise the listing's
///   neighbourhood must be selected
/// * `price_min <= price <= price_max`
/// * `number_of_reviews >= min_reviews`
/// * `room_types` – the listing's room type must be selected; an empty set
///   matches nothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub locations: BTreeSet<String>,
    pub price_min: f64,
    pub price_max: f64,
    pub min_reviews: u64,
    pub room_types: BTreeSet<String>,
}

impl Criteria {
    /// Criteria that every listing of `dataset` satisfies.
    pub fn permissive(dataset: &CanonicalDataset) -> Self {
        let all: Vec<&Listing> = dataset.listings().iter().collect();
        let (price_min, price_max) = price_bounds(&all).unwrap_or((0.0, f64::INFINITY));
        Criteria {
            locations: BTreeSet::new(),
            price_min,
            price_max,
            min_reviews: 0,
            room_types: dataset.room_types().iter().cloned().collect(),
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        (self.locations.is_empty() || self.locations.contains(&listing.neighbourhood))
            && self.price_min <= listing.price
            && listing.price <= self.price_max
            && listing.number_of_reviews >= self.min_reviews
            && self.room_types.contains(&listing.room_type)
    }
}

/// Listings passing `criteria`, in input order. Works on the full dataset or
/// on an already filtered subset.
pub fn filter_listings<'a>(
    rows: impl IntoIterator<Item = &'a Listing>,
    criteria: &Criteria,
) -> Vec<&'a Listing> {
    rows.into_iter().filter(|l| criteria.matches(l)).collect()
}

/// Positions in [`CanonicalDataset::listings`] of rows passing `criteria`.
pub fn filtered_indices(dataset: &CanonicalDataset, criteria: &Criteria) -> Vec<usize> {
    dataset
        .listings()
        .iter()
        .enumerate()
        .filter(|(_, l)| criteria.matches(l))
        .map(|(i, _)| i)
        .collect()
}

impl CanonicalDataset {
    pub fn filter(&self, criteria: &Criteria) -> Vec<&Listing> {
        filter_listings(self.listings(), criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::CleaningReport;
    use crate::data::testutil::listing;
    use crate::geo::LANDMARK;

    fn dataset() -> CanonicalDataset {
        let listings = vec![
            listing(0, "Roma", "Entire home/apt", 900.0, 12),
            listing(1, "Condesa", "Private room", 450.0, 3),
            listing(2, "Roma", "Private room", 300.0, 0),
            listing(3, "Coyoacán", "Entire home/apt", 1500.0, 40),
            listing(4, "Roma", "Shared room", 150.0, 7),
            listing(5, "Polanco", "Entire home/apt", 2500.0, 1),
        ];
        CanonicalDataset::from_listings(listings, true, false, LANDMARK, CleaningReport::default())
    }

    fn ids(rows: &[&Listing]) -> Vec<usize> {
        rows.iter().map(|l| l.id).collect()
    }

    #[test]
    fn single_location_selects_only_that_neighbourhood() {
        let ds = dataset();
        let criteria = Criteria {
            locations: ["Roma".to_string()].into(),
            price_min: 0.0,
            price_max: 99999.0,
            min_reviews: 0,
            room_types: ds.room_types().iter().cloned().collect(),
        };
        let subset = ds.filter(&criteria);
        assert_eq!(ids(&subset), vec![0, 2, 4]);
        assert!(subset.iter().all(|l| l.neighbourhood == "Roma"));
    }

    #[test]
    fn empty_locations_equals_all_locations() {
        let ds = dataset();
        let none = Criteria::permissive(&ds);
        let all = Criteria {
            locations: ds.neighbourhoods().iter().cloned().collect(),
            ..none.clone()
        };
        assert_eq!(ids(&ds.filter(&none)), ids(&ds.filter(&all)));
        assert_eq!(ds.filter(&none).len(), ds.len());
    }

    #[test]
    fn every_clause_applies() {
        let ds = dataset();
        let criteria = Criteria {
            locations: ["Roma".to_string(), "Coyoacán".to_string()].into(),
            price_min: 200.0,
            price_max: 1500.0,
            min_reviews: 5,
            room_types: ["Entire home/apt".to_string(), "Shared room".to_string()].into(),
        };
        assert_eq!(ids(&ds.filter(&criteria)), vec![0, 3]);
        assert_eq!(filtered_indices(&ds, &criteria), vec![0, 3]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let ds = dataset();
        let criteria = Criteria {
            price_min: 300.0,
            price_max: 2000.0,
            ..Criteria::permissive(&ds)
        };
        let once = ds.filter(&criteria);
        let twice = filter_listings(once.iter().copied(), &criteria);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_result_and_empty_room_types() {
        let ds = dataset();
        let criteria = Criteria {
            min_reviews: 1000,
            ..Criteria::permissive(&ds)
        };
        assert!(ds.filter(&criteria).is_empty());

        let no_rooms = Criteria {
            room_types: BTreeSet::new(),
            ..Criteria::permissive(&ds)
        };
        assert!(ds.filter(&no_rooms).is_empty());
        assert_eq!(ds.len(), 6);
    }
}
