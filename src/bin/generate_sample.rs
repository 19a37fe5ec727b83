use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{BooleanArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use varsity_shifts::data::export::{bool_literal, write_csv};
use varsity_shifts::stoplight::{EraLights, Light, StoplightDocument, change_pct};

#[derive(Debug, Parser)]
#[command(
    name = "generate_sample",
    about = "Write a synthetic copy of every dashboard dataset"
)]
struct Cli {
    #[arg(value_name = "DIR", default_value = "data", help = "Output directory")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 42, help = "Seed for the synthetic counts")]
    seed: u64,
}

/// Seeded xoshiro256** stream for reproducible transfer counts.
struct PortalRng {
    s: [u64; 4],
}

impl PortalRng {
    /// Expand `seed` into the four state words with splitmix64.
    fn seeded(seed: u64) -> Self {
        let mut z = seed;
        let s = std::array::from_fn(|_| {
            z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut x = z;
            x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            x ^ (x >> 31)
        });
        PortalRng { s }
    }

    fn next_word(&mut self) -> u64 {
        let [a, b, c, d] = self.s;
        let out = b.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = b << 17;
        let c = c ^ a;
        let d = d ^ b;
        let b = b ^ c;
        let a = a ^ d;
        self.s = [a, b, c ^ t, d.rotate_left(45)];
        out
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_word() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Transfer count around `mean`, ±35%.
    fn count(&mut self, mean: f64) -> i64 {
        let jitter = 0.65 + 0.7 * self.unit();
        (mean * jitter).round().max(0.0) as i64
    }
}

const POSITIONS: [(&str, f64); 9] = [
    ("WR", 9.0),
    ("DB", 8.5),
    ("DL", 7.0),
    ("OL", 6.5),
    ("LB", 6.0),
    ("RB", 4.5),
    ("QB", 3.5),
    ("TE", 2.5),
    ("K", 0.8),
];

const SPORTS: [(&str, f64); 6] = [
    ("Baseball", 1400.0),
    ("Football", 3600.0),
    ("Men's Basketball", 1100.0),
    ("Soccer", 1300.0),
    ("Softball", 700.0),
    ("Women's Basketball", 900.0),
];

/// Portal entries cluster around the winter and spring windows.
fn seasonal(month: u32) -> f64 {
    match month {
        12 | 1 => 2.2,
        4 | 5 => 1.6,
        _ => 0.7,
    }
}

fn is_post_nil(year: i32, month: u32) -> bool {
    (year, month) >= (2021, 7)
}

fn light(
    class_year: &str,
    position: u32,
    color: &str,
    count: u64,
    total: u64,
    description: &str,
) -> Light {
    let rate = (count as f64 / total as f64 * 100.0).round() / 100.0;
    Light {
        class_year: class_year.to_string(),
        position,
        base_color: color.to_string(),
        count,
        rate,
        intensity: rate,
        description: description.to_string(),
        change_from_pre: None,
        highlight: false,
    }
}

fn stoplight_document() -> StoplightDocument {
    let colors = ["#dc3545", "#fd7e14", "#ffc107", "#28a745"];
    let pre = [
        ("Freshman", 180, "Rare transfers - adjustment period"),
        ("Sophomore", 350, "Limited transfers - building experience"),
        ("Junior", 520, "Peak transfer year - seeking playing time"),
        ("Senior", 450, "Graduate transfers for final season"),
    ];
    let post = [
        ("Freshman", 420, "NIL allows earlier career mobility"),
        ("Sophomore", 890, "Significant jump - prime NIL opportunity"),
        ("Junior", 680, "High transfers but overshadowed by sophomores"),
        ("Senior", 350, "Reduced - most transfers happen earlier now"),
    ];
    let pre_total: u64 = pre.iter().map(|p| p.1).sum();
    let post_total: u64 = post.iter().map(|p| p.1).sum();

    let pre_lights: Vec<Light> = pre
        .iter()
        .enumerate()
        .map(|(i, (cy, n, d))| light(cy, i as u32, colors[i], *n, pre_total, d))
        .collect();
    let post_lights: Vec<Light> = post
        .iter()
        .enumerate()
        .map(|(i, (cy, n, d))| {
            let mut l = light(cy, i as u32, colors[i], *n, post_total, d);
            l.change_from_pre = change_pct(pre[i].1 as f64, *n as f64);
            l.highlight = matches!(*cy, "Sophomore" | "Junior");
            l
        })
        .collect();

    StoplightDocument {
        pre_nil: EraLights {
            era: "Pre-NIL (2019-2021)".into(),
            total_transfers: Some(pre_total),
            lights: pre_lights,
        },
        post_nil: EraLights {
            era: "Post-NIL (2021-2024)".into(),
            total_transfers: Some(post_total),
            lights: post_lights,
        },
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let out_dir = cli.out_dir;
    std::fs::create_dir_all(&out_dir).expect("Failed to create output directory");

    let mut rng = PortalRng::seeded(cli.seed);

    // ---- Position-level monthly counts, 2018-01 .. 2024-06 ----
    let months: Vec<(i32, u32)> = (2018..=2024)
        .flat_map(|y| (1..=12).map(move |m| (y, m)))
        .filter(|&ym| ym <= (2024, 6))
        .collect();

    let mut position_rows = Vec::new();
    let mut monthly_totals: BTreeMap<(i32, u32), i64> = BTreeMap::new();
    for (position, base) in POSITIONS {
        for &(y, m) in &months {
            let boost = if is_post_nil(y, m) { 1.8 } else { 1.0 };
            let n = rng.count(base * seasonal(m) * boost);
            if n == 0 {
                continue;
            }
            *monthly_totals.entry((y, m)).or_insert(0) += n;
            position_rows.push(vec![
                format!("{y:04}-{m:02}"),
                position.to_string(),
                bool_literal(is_post_nil(y, m)).to_string(),
                n.to_string(),
            ]);
        }
    }
    write_csv(
        &out_dir.join("cfp_position_monthly_transfers.csv"),
        &["month", "position", "post_nil", "transfer_count"],
        position_rows.iter().cloned(),
    )
    .expect("Failed to write CSV");

    let monthly_rows: Vec<Vec<String>> = monthly_totals
        .iter()
        .map(|(&(y, m), n)| {
            vec![
                format!("{y:04}-{m:02}"),
                bool_literal(is_post_nil(y, m)).to_string(),
                n.to_string(),
            ]
        })
        .collect();
    write_csv(
        &out_dir.join("cfp_monthly_transfers.csv"),
        &["month", "post_nil", "transfer_count"],
        monthly_rows.iter().cloned(),
    )
    .expect("Failed to write CSV");

    // ---- Same monthly aggregate as Parquet ----
    let schema = Arc::new(Schema::new(vec![
        Field::new("month", DataType::Utf8, false),
        Field::new("post_nil", DataType::Boolean, false),
        Field::new("transfer_count", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                monthly_totals
                    .keys()
                    .map(|(y, m)| format!("{y:04}-{m:02}"))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(BooleanArray::from(
                monthly_totals
                    .keys()
                    .map(|&(y, m)| is_post_nil(y, m))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(monthly_totals.values().copied().collect::<Vec<_>>())),
        ],
    )
    .expect("Failed to create RecordBatch");
    let file = std::fs::File::create(out_dir.join("cfp_monthly_transfers.parquet"))
        .expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    // ---- NCAA sport-level and overall yearly totals ----
    let mut sport_rows = Vec::new();
    let mut yearly_totals: BTreeMap<i32, i64> = BTreeMap::new();
    for (sport, base) in SPORTS {
        for year in 2019..=2024 {
            let boost = if year >= 2021 { 1.0 + 0.25 * (year - 2020) as f64 } else { 1.0 };
            let n = rng.count(base * boost);
            *yearly_totals.entry(year).or_insert(0) += n;
            sport_rows.push(vec![sport.to_string(), year.to_string(), n.to_string()]);
        }
    }
    write_csv(
        &out_dir.join("ncaa_sport_yearly_transfers.csv"),
        &["Sport", "year", "total_transfers"],
        sport_rows.iter().cloned(),
    )
    .expect("Failed to write CSV");
    let yearly_rows: Vec<Vec<String>> = yearly_totals
        .iter()
        .map(|(y, n)| vec![y.to_string(), n.to_string()])
        .collect();
    write_csv(
        &out_dir.join("ncaa_yearly_transfers.csv"),
        &["year", "total_transfers"],
        yearly_rows.iter().cloned(),
    )
    .expect("Failed to write CSV");

    // ---- Class-year counts by era and the stoplight document ----
    let doc = stoplight_document();
    let class_rows: Vec<Vec<String>> = [("Pre-NIL", &doc.pre_nil), ("Post-NIL", &doc.post_nil)]
        .iter()
        .flat_map(|(period, era)| {
            era.lights
                .iter()
                .map(move |l| vec![period.to_string(), l.class_year.clone(), l.count.to_string()])
        })
        .collect();
    write_csv(
        &out_dir.join("class_year_transfers.csv"),
        &["period", "class_year", "transfer_count"],
        class_rows.iter().cloned(),
    )
    .expect("Failed to write CSV");

    let json = serde_json::to_string_pretty(&doc).expect("Failed to serialise stoplight data");
    std::fs::write(out_dir.join("stoplight_class_year_data.json"), json)
        .expect("Failed to write stoplight data");

    println!(
        "Wrote {} position-month rows, {} months, {} sport-year rows to {}",
        position_rows.len(),
        monthly_rows.len(),
        sport_rows.len(),
        out_dir.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_counts() {
        let mut a = PortalRng::seeded(7);
        let mut b = PortalRng::seeded(7);
        let xs: Vec<i64> = (0..32).map(|_| a.count(10.0)).collect();
        let ys: Vec<i64> = (0..32).map(|_| b.count(10.0)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|&n| (6..=17).contains(&n)));

        let mut c = PortalRng::seeded(8);
        let zs: Vec<i64> = (0..32).map(|_| c.count(10.0)).collect();
        assert_ne!(xs, zs);
    }

    #[test]
    fn unit_stays_in_range() {
        let mut rng = PortalRng::seeded(0);
        assert!((0..1000).map(|_| rng.unit()).all(|u| (0.0..1.0).contains(&u)));
    }

    #[test]
    fn output_dir_defaults_to_data() {
        let cli = Cli::try_parse_from(["generate_sample"]).unwrap();
        assert_eq!(cli.out_dir, PathBuf::from("data"));
        assert_eq!(cli.seed, 42);

        let cli = Cli::try_parse_from(["generate_sample", "out", "--seed", "9"]).unwrap();
        assert_eq!(cli.out_dir, PathBuf::from("out"));
        assert_eq!(cli.seed, 9);
    }
}
