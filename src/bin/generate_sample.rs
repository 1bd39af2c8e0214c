use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::{Parser, ValueEnum};
use parquet::arrow::ArrowWriter;

/// (name, centre latitude, centre longitude, price multiplier, security)
const NEIGHBOURHOODS: [(&str, f64, f64, f64, f64); 8] = [
    ("Cuauhtémoc", 19.4326, -99.1500, 1.15, 6.2),
    ("Miguel Hidalgo", 19.4320, -99.1950, 1.45, 7.4),
    ("Benito Juárez", 19.3800, -99.1600, 1.05, 7.0),
    ("Coyoacán", 19.3500, -99.1620, 0.95, 7.1),
    ("Álvaro Obregón", 19.3600, -99.2000, 0.90, 5.9),
    ("Tlalpan", 19.2900, -99.1700, 0.75, 5.5),
    ("Iztapalapa", 19.3550, -99.0600, 0.55, 3.8),
    ("Gustavo A. Madero", 19.4800, -99.1100, 0.60, 4.1),
];

/// (room type, base nightly price in MXN, relative frequency)
const ROOM_TYPES: [(&str, f64, f64); 4] = [
    ("Entire home/apt", 1400.0, 0.62),
    ("Private room", 650.0, 0.33),
    ("Hotel room", 1800.0, 0.03),
    ("Shared room", 300.0, 0.02),
];

const ADJECTIVES: [&str; 6] = ["Cozy", "Bright", "Modern", "Quiet", "Colonial", "Rooftop"];
const NOUNS: [&str; 5] = ["loft", "studio", "suite", "apartment", "casita"];

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Parquet,
}

#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(about = "Write a synthetic listings file for trying out listing-explorer")]
struct Args {
    /// Output path; extension is not inferred
    #[arg(short, long, default_value = "sample_listings.csv")]
    output: PathBuf,

    /// Number of listings to generate
    #[arg(short, long, default_value_t = 5000)]
    rows: usize,

    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Row {
    name: String,
    neighbourhood: &'static str,
    room_type: &'static str,
    latitude: f64,
    longitude: f64,
    price: Option<String>,
    number_of_reviews: Option<i64>,
    security_index: f64,
}

/// `1234.5` → `"$1,234.50"`
fn currency(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}.{:02}", cents % 100)
}

fn pick_room_type(rng: &mut SimpleRng) -> (&'static str, f64) {
    let mut roll = rng.next_f64();
    for &(name, base, weight) in &ROOM_TYPES {
        if roll < weight {
            return (name, base);
        }
        roll -= weight;
    }
    (ROOM_TYPES[0].0, ROOM_TYPES[0].1)
}

fn generate_row(i: usize, rng: &mut SimpleRng) -> Row {
    let (neighbourhood, lat, lon, multiplier, security) =
        NEIGHBOURHOODS[rng.below(NEIGHBOURHOODS.len())];
    let (room_type, base) = pick_room_type(rng);

    let nightly = (base * multiplier * rng.gauss(0.0, 0.35).exp()).max(150.0);
    let roll = rng.next_f64();
    let price = if roll < 0.005 {
        None
    } else if roll < 0.015 {
        Some("$0.00".to_string())
    } else if roll < 0.025 {
        Some(currency(nightly * 40.0))
    } else {
        Some(currency(nightly))
    };

    let number_of_reviews = if rng.next_f64() < 0.03 {
        None
    } else {
        Some((rng.gauss(0.0, 1.2).exp() * 15.0) as i64)
    };

    Row {
        name: format!(
            "{} {} #{i}",
            ADJECTIVES[rng.below(ADJECTIVES.len())],
            NOUNS[rng.below(NOUNS.len())]
        ),
        neighbourhood,
        room_type,
        latitude: lat + rng.gauss(0.0, 0.012),
        longitude: lon + rng.gauss(0.0, 0.012),
        price,
        number_of_reviews,
        security_index: (security + rng.gauss(0.0, 0.6)).clamp(0.0, 10.0),
    }
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "name",
        "neighbourhood",
        "room_type",
        "latitude",
        "longitude",
        "price",
        "number_of_reviews",
        "security_index",
    ])?;
    for r in rows {
        writer.write_record([
            r.name.clone(),
            r.neighbourhood.to_string(),
            r.room_type.to_string(),
            format!("{:.6}", r.latitude),
            format!("{:.6}", r.longitude),
            r.price.clone().unwrap_or_default(),
            r.number_of_reviews.map(|n| n.to_string()).unwrap_or_default(),
            format!("{:.2}", r.security_index),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("neighbourhood", DataType::Utf8, false),
        Field::new("room_type", DataType::Utf8, false),
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
        Field::new("price", DataType::Utf8, true),
        Field::new("number_of_reviews", DataType::Int64, true),
        Field::new("security_index", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.name.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.neighbourhood))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.room_type))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.latitude))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.longitude))),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.price.as_deref()).collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.number_of_reviews).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.security_index))),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = SimpleRng::new(args.seed);
    let rows: Vec<Row> = (0..args.rows).map(|i| generate_row(i, &mut rng)).collect();

    match args.format {
        Format::Csv => write_csv(&args.output, &rows)?,
        Format::Parquet => write_parquet(&args.output, &rows)?,
    }

    log::info!("wrote {} listings to {}", rows.len(), args.output.display());
    println!("Wrote {} listings to {}", rows.len(), args.output.display());
    Ok(())
}
