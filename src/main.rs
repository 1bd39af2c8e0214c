use std::num::NonZeroU32;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use listing_explorer::data::model::{CanonicalDataset, Listing};
use listing_explorer::state::ExplorerState;
use listing_explorer::stats::{
    grouped_price_stats, map_center, top_by_reviews, GroupColumn, PriceDistribution, Summary,
};
use listing_explorer::{Criteria, DatasetLoader, GeoPoint, PipelineConfig};

#[derive(Parser)]
#[command(name = "listing-explorer")]
#[command(about = "Clean, filter and summarise a city's short-term rental listings", long_about = None)]
struct Cli {
    /// Listings file (.csv, .json or .parquet)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// JSON file overriding landmark, outlier quantile and defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Neighbourhood to include (repeatable); none means all
    #[arg(short, long = "location")]
    locations: Vec<String>,

    /// Room type to include (repeatable); none means all
    #[arg(short, long = "room-type")]
    room_types: Vec<String>,

    /// Lowest nightly price (defaults to the cheapest listing)
    #[arg(long)]
    price_min: Option<f64>,

    /// Highest nightly price (defaults to the most expensive listing)
    #[arg(long)]
    price_max: Option<f64>,

    /// Minimum number of reviews
    #[arg(long, default_value_t = 0)]
    min_reviews: u64,

    /// Nights used for the trip cost estimate
    #[arg(short, long)]
    nights: Option<NonZeroU32>,

    /// How many of the most reviewed listings to show
    #[arg(long)]
    top: Option<usize>,

    /// Column used for the price distribution breakdown
    #[arg(long, value_enum, default_value_t = GroupBy::Neighbourhood)]
    group_by: GroupBy,

    /// Print one JSON document instead of the text report
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    Neighbourhood,
    RoomType,
}

impl From<GroupBy> for GroupColumn {
    fn from(g: GroupBy) -> Self {
        match g {
            GroupBy::Neighbourhood => GroupColumn::Neighbourhood,
            GroupBy::RoomType => GroupColumn::RoomType,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    file: &'a PathBuf,
    cleaning: &'a listing_explorer::data::clean::CleaningReport,
    summary: Summary,
    map_center: Option<GeoPoint>,
    top_by_reviews: Vec<&'a Listing>,
    price_distribution: std::collections::BTreeMap<String, PriceDistribution>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let loader = DatasetLoader::new(config.clone());
    let dataset = loader
        .load(&cli.file)
        .with_context(|| format!("loading {}", cli.file.display()))?;

    let mut state = ExplorerState::new(&config);
    state.set_dataset(dataset.clone());
    if let Some(nights) = cli.nights {
        state.set_nights(nights);
    }

    state.set_criteria(selection(&cli, &dataset));

    let visible = state.visible();
    let report = Report {
        file: &cli.file,
        cleaning: dataset.report(),
        summary: state.summary(),
        map_center: map_center(&visible),
        top_by_reviews: top_by_reviews(&visible, cli.top.unwrap_or(config.top_n)),
        price_distribution: grouped_price_stats(&visible, cli.group_by.into()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, dataset.has_review_counts());
    }
    Ok(())
}

/// Start from "everything" and narrow by what was asked for. Repeated
/// flags select a value once.
fn selection(cli: &Cli, dataset: &CanonicalDataset) -> Criteria {
    let everything = Criteria::permissive(dataset);
    Criteria {
        locations: cli.locations.iter().cloned().collect(),
        price_min: cli.price_min.unwrap_or(everything.price_min),
        price_max: cli.price_max.unwrap_or(everything.price_max),
        min_reviews: cli.min_reviews,
        room_types: if cli.room_types.is_empty() {
            everything.room_types
        } else {
            cli.room_types.iter().cloned().collect()
        },
    }
}

fn money(v: Option<f64>) -> String {
    v.map(|v| format!("${v:.0} MXN"))
        .unwrap_or_else(|| "N/A".to_string())
}

fn print_report(report: &Report<'_>, has_reviews: bool) {
    let c = report.cleaning;
    println!("--- Cleaning: {} ---", report.file.display());
    println!("Rows in:          {}", c.rows_in);
    println!("Rows retained:    {}", c.rows_retained);
    if let Some(ratio) = c.retained_ratio() {
        println!("Retained:         {:.2}%", ratio * 100.0);
    }
    if let Some(t) = c.price_threshold {
        println!("Outlier cut:      ${t:.0} ({} rows removed)", c.outliers);
    }
    println!(
        "Dropped prices:   {} missing, {} unparsable, {} non-positive",
        c.missing_prices, c.unparsable_prices, c.non_positive_prices
    );
    println!("Invalid rows:     {}", c.invalid_rows);
    if !has_reviews {
        println!("(no review counts in source; all treated as 0)");
    }

    let s = &report.summary;
    println!();
    println!("--- Summary ---");
    println!("Options:          {}", s.options);
    if s.options == 0 {
        println!("No listings match the current filters.");
        return;
    }
    println!("Mean price:       {}", money(s.mean_price));
    println!("Cost x {} nights: {}", s.nights, money(s.projected_cost));
    match s.mean_security {
        Some(v) => println!("Mean security:    {v:.2}"),
        None => println!("Mean security:    N/A"),
    }
    if let Some(center) = report.map_center {
        println!(
            "Map center:       {:.4}, {:.4}",
            center.latitude, center.longitude
        );
    }

    println!();
    println!("--- Most reviewed ---");
    for l in &report.top_by_reviews {
        println!(
            "{:>6}  {:<40}  {:<20}  ${:>8.0}  {:>5.1} km",
            l.number_of_reviews, l.name, l.neighbourhood, l.price, l.distance_to_landmark_km
        );
    }

    println!();
    println!("--- Price distribution ---");
    for (group, d) in &report.price_distribution {
        println!(
            "{group:<24} n={:<5} min={:<8.0} q1={:<8.0} median={:<8.0} q3={:<8.0} max={:<8.0} outliers={}",
            d.count,
            d.min,
            d.quartiles.q1,
            d.quartiles.median,
            d.quartiles.q3,
            d.max,
            d.outliers.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_explorer::data::clean::CleaningReport;
    use listing_explorer::LANDMARK;

    fn dataset() -> CanonicalDataset {
        let rows = [
            ("Roma", "Entire home/apt", 900.0),
            ("Condesa", "Private room", 450.0),
            ("Roma", "Private room", 300.0),
            ("Polanco", "Shared room", 2500.0),
        ];
        let listings = rows
            .iter()
            .enumerate()
            .map(|(id, &(hood, room, price))| Listing {
                id,
                name: format!("listing {id}"),
                neighbourhood: hood.to_string(),
                room_type: room.to_string(),
                latitude: 19.42,
                longitude: -99.16,
                price,
                number_of_reviews: 5,
                security_index: None,
                distance_to_landmark_km: 0.0,
            })
            .collect();
        CanonicalDataset::from_listings(listings, true, false, LANDMARK, CleaningReport::default())
    }

    fn ids(ds: &CanonicalDataset, criteria: &Criteria) -> Vec<usize> {
        ds.filter(criteria).iter().map(|l| l.id).collect()
    }

    #[test]
    fn repeated_flags_select_once() {
        let ds = dataset();
        let cli = Cli::parse_from([
            "listing-explorer",
            "listings.csv",
            "-l",
            "Roma",
            "-l",
            "Roma",
            "-r",
            "Private room",
            "-r",
            "Private room",
        ]);
        assert_eq!(ids(&ds, &selection(&cli, &ds)), vec![2]);
    }

    #[test]
    fn no_flags_select_everything() {
        let ds = dataset();
        let cli = Cli::parse_from(["listing-explorer", "listings.csv"]);
        assert_eq!(ids(&ds, &selection(&cli, &ds)), vec![0, 1, 2, 3]);

        let cli = Cli::parse_from(["listing-explorer", "listings.csv", "--price-max", "1000"]);
        assert_eq!(ids(&ds, &selection(&cli, &ds)), vec![0, 1, 2]);
    }
}
