//! Writes a deterministic sample of job postings as parquet, csv and json.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "generate_sample", about = "Write a sample job postings dataset")]
struct Cli {
    /// Number of postings to generate.
    #[arg(long, default_value_t = 2000)]
    rows: usize,

    /// Directory the sample files are written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,
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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Index drawn with probability proportional to `weights`.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut r = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if r < *w {
                return i;
            }
            r -= w;
        }
        weights.len() - 1
    }
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// (title, base salary in USD)
const TITLES: [(&str, f64); 8] = [
    ("Data Analyst", 72_000.0),
    ("Data Engineer", 112_000.0),
    ("Data Scientist", 118_000.0),
    ("Machine Learning Engineer", 135_000.0),
    ("Analytics Manager", 128_000.0),
    ("BI Developer", 88_000.0),
    ("Research Scientist", 142_000.0),
    ("Data Architect", 150_000.0),
];

/// (level, weight, salary multiplier)
const LEVELS: [(&str, f64, f64); 4] = [
    ("Entry-level", 0.25, 0.7),
    ("Mid-level", 0.38, 1.0),
    ("Senior-level", 0.30, 1.35),
    ("Executive-level", 0.07, 1.8),
];

const EMPLOYMENT: [(&str, f64); 4] = [
    ("Full-time", 0.82),
    ("Contract", 0.09),
    ("Part-time", 0.05),
    ("Freelance", 0.04),
];

/// (location, weight, salary multiplier)
const LOCATIONS: [(&str, f64, f64); 10] = [
    ("San Francisco", 0.14, 1.35),
    ("New York", 0.15, 1.25),
    ("Austin", 0.10, 1.05),
    ("London", 0.12, 0.95),
    ("Berlin", 0.09, 0.85),
    ("Toronto", 0.08, 0.88),
    ("Bangalore", 0.11, 0.35),
    ("Singapore", 0.07, 0.95),
    ("Lagos", 0.05, 0.3),
    ("Remote", 0.09, 1.0),
];

/// (industry, weight, seasonal phase in months)
const INDUSTRIES: [(&str, f64, f64); 7] = [
    ("Technology", 0.30, 0.0),
    ("Finance", 0.18, 2.0),
    ("Healthcare", 0.14, 4.0),
    ("Retail", 0.12, 9.0),
    ("Manufacturing", 0.10, 6.0),
    ("Energy", 0.08, 3.0),
    ("Education", 0.08, 7.0),
];

const DAYS: i64 = 540;
const MISSING_SALARY_RATE: f64 = 0.06;

#[derive(Debug, Serialize)]
struct SamplePosting {
    job_title: String,
    experience_level: String,
    employment_type: String,
    location: String,
    industry: String,
    salary_usd: Option<f64>,
    posted_date: NaiveDate,
}

fn generate(rows: usize, rng: &mut SimpleRng) -> Vec<SamplePosting> {
    let first_day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
    let level_w: Vec<f64> = LEVELS.iter().map(|l| l.1).collect();
    let emp_w: Vec<f64> = EMPLOYMENT.iter().map(|e| e.1).collect();
    let loc_w: Vec<f64> = LOCATIONS.iter().map(|l| l.1).collect();
    let ind_w: Vec<f64> = INDUSTRIES.iter().map(|i| i.1).collect();

    let mut out = Vec::with_capacity(rows);
    while out.len() < rows {
        let day = (rng.next_f64() * DAYS as f64) as i64;
        let (industry, _, phase) = INDUSTRIES[rng.weighted(&ind_w)];

        // Seasonal hiring: reject some draws away from the industry's peak,
        // and let volume grow slowly over the period.
        let month = day as f64 / 30.4;
        let season = 0.5 + 0.5 * (2.0 * std::f64::consts::PI * (month - phase) / 12.0).cos();
        let growth = 0.6 + 0.4 * day as f64 / DAYS as f64;
        if rng.next_f64() > (0.35 + 0.65 * season) * growth {
            continue;
        }

        let (title, base) = TITLES[(rng.next_f64() * TITLES.len() as f64) as usize % TITLES.len()];
        let (level, _, level_mult) = LEVELS[rng.weighted(&level_w)];
        let (employment, _) = EMPLOYMENT[rng.weighted(&emp_w)];
        let (location, _, loc_mult) = LOCATIONS[rng.weighted(&loc_w)];

        let salary = if rng.next_f64() < MISSING_SALARY_RATE {
            None
        } else {
            let s = rng.gauss(base * level_mult * loc_mult, base * 0.12);
            Some((s.max(12_000.0) / 500.0).round() * 500.0)
        };

        out.push(SamplePosting {
            job_title: title.to_string(),
            experience_level: level.to_string(),
            employment_type: employment.to_string(),
            location: location.to_string(),
            industry: industry.to_string(),
            salary_usd: salary,
            posted_date: first_day + Duration::days(day),
        });
    }
    out.sort_by_key(|p| p.posted_date);
    out
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn write_parquet(postings: &[SamplePosting], path: &Path) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let text = |f: fn(&SamplePosting) -> &str| {
        StringArray::from(postings.iter().map(f).collect::<Vec<_>>())
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("job_title", DataType::Utf8, false),
        Field::new("experience_level", DataType::Utf8, false),
        Field::new("employment_type", DataType::Utf8, false),
        Field::new("location", DataType::Utf8, false),
        Field::new("industry", DataType::Utf8, false),
        Field::new("salary_usd", DataType::Float64, true),
        Field::new("posted_date", DataType::Date32, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(text(|p| p.job_title.as_str())),
            Arc::new(text(|p| p.experience_level.as_str())),
            Arc::new(text(|p| p.employment_type.as_str())),
            Arc::new(text(|p| p.location.as_str())),
            Arc::new(text(|p| p.industry.as_str())),
            Arc::new(Float64Array::from(
                postings.iter().map(|p| p.salary_usd).collect::<Vec<_>>(),
            )),
            Arc::new(Date32Array::from(
                postings
                    .iter()
                    .map(|p| (p.posted_date - epoch).num_days() as i32)
                    .collect::<Vec<_>>(),
            )),
        ],
    )
    .context("Failed to create RecordBatch")?;

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn write_csv(postings: &[SamplePosting], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for p in postings {
        writer.serialize(p)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(postings: &[SamplePosting], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, postings)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut rng = SimpleRng::new(cli.seed);
    let postings = generate(cli.rows, &mut rng);

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("Failed to create {}", cli.out_dir.display()))?;
    let parquet_path = cli.out_dir.join("sample_postings.parquet");
    let csv_path = cli.out_dir.join("sample_postings.csv");
    let json_path = cli.out_dir.join("sample_postings.json");

    write_parquet(&postings, &parquet_path)?;
    write_csv(&postings, &csv_path)?;
    write_json(&postings, &json_path)?;

    println!(
        "Wrote {} postings to {}, {} and {}",
        postings.len(),
        parquet_path.display(),
        csv_path.display(),
        json_path.display()
    );
    Ok(())
}
