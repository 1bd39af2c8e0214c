use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::data::filter::{filtered_indices, Criteria};
use crate::data::model::{CanonicalDataset, Listing};
use crate::stats::Summary;

// ---------------------------------------------------------------------------
// Explorer state
// ---------------------------------------------------------------------------

/// Session state independent of any rendering: the loaded dataset, the
/// current selection and the rows it lets through.
pub struct ExplorerState {
    /// Loaded dataset (None until a file is loaded).
    pub dataset: Option<Arc<CanonicalDataset>>,

    /// Current filter selection.
    pub criteria: Option<Criteria>,

    /// Indices of listings passing the current criteria (cached).
    pub visible_indices: Vec<usize>,

    /// Length of stay used for the trip cost estimate.
    pub nights: NonZeroU32,

    default_location_count: usize,
    default_price_range: (f64, f64),
}

impl Default for ExplorerState {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl ExplorerState {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            dataset: None,
            criteria: None,
            visible_indices: Vec::new(),
            nights: NonZeroU32::new(config.default_nights).unwrap_or(NonZeroU32::MIN),
            default_location_count: config.default_location_count,
            default_price_range: config.default_price_range,
        }
    }

    /// Ingest a newly loaded dataset and seed the selection: the first few
    /// neighbourhoods, every room type and the default price range inside
    /// the dataset's whole-peso bounds.
    pub fn set_dataset(&mut self, dataset: Arc<CanonicalDataset>) {
        let mut criteria = Criteria::permissive(&dataset);
        criteria.locations = dataset
            .neighbourhoods()
            .iter()
            .take(self.default_location_count)
            .cloned()
            .collect();
        if !dataset.is_empty() {
            let (lo, hi) = (criteria.price_min.trunc(), criteria.price_max.trunc());
            let (want_lo, want_hi) = self.default_price_range;
            criteria.price_min = want_lo.clamp(lo, hi);
            criteria.price_max = want_hi.clamp(lo, hi);
        }

        self.criteria = Some(criteria);
        self.dataset = Some(dataset);
        self.refilter();
    }

    /// Recompute `visible_indices` after a selection change.
    pub fn refilter(&mut self) {
        self.visible_indices = match (&self.dataset, &self.criteria) {
            (Some(ds), Some(criteria)) => filtered_indices(ds, criteria),
            _ => Vec::new(),
        };
    }

    /// Listings passing the current selection, in source order.
    pub fn visible(&self) -> Vec<&Listing> {
        let Some(ds) = &self.dataset else {
            return Vec::new();
        };
        let listings = ds.listings();
        self.visible_indices
            .iter()
            .filter_map(|&i| listings.get(i))
            .collect()
    }

    /// Headline figures for the visible rows.
    pub fn summary(&self) -> Summary {
        Summary::compute(&self.visible(), self.nights)
    }

    pub fn set_nights(&mut self, nights: NonZeroU32) {
        self.nights = nights;
    }

    /// Replace the whole selection.
    pub fn set_criteria(&mut self, criteria: Criteria) {
        self.criteria = Some(criteria);
        self.refilter();
    }

    fn update(&mut self, f: impl FnOnce(&mut Criteria)) {
        if let Some(criteria) = self.criteria.as_mut() {
            f(criteria);
            self.refilter();
        }
    }

    /// Toggle a single neighbourhood in the location selection.
    pub fn toggle_location(&mut self, name: &str) {
        self.update(|c| toggle(&mut c.locations, name));
    }

    /// Toggle a single room type.
    pub fn toggle_room_type(&mut self, name: &str) {
        self.update(|c| toggle(&mut c.room_types, name));
    }

    /// Clear the location selection, which lifts the location restriction.
    pub fn clear_locations(&mut self) {
        self.update(|c| c.locations.clear());
    }

    /// Select every room type present in the dataset.
    pub fn select_all_room_types(&mut self) {
        let Some(all) = self
            .dataset
            .as_ref()
            .map(|ds| ds.room_types().iter().cloned().collect::<BTreeSet<_>>())
        else {
            return;
        };
        self.update(|c| c.room_types = all);
    }

    /// Deselect all room types; nothing will match until one is selected.
    pub fn select_no_room_types(&mut self) {
        self.update(|c| c.room_types.clear());
    }

    pub fn set_price_range(&mut self, min: f64, max: f64) {
        self.update(|c| {
            c.price_min = min;
            c.price_max = max;
        });
    }

    pub fn set_min_reviews(&mut self, min_reviews: u64) {
        self.update(|c| c.min_reviews = min_reviews);
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}
