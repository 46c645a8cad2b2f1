use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }

    /// Index drawn with the given relative weights.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut target = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                return i;
            }
            target -= w;
        }
        weights.len() - 1
    }
}

// ---------------------------------------------------------------------------
// Coffee sales
// ---------------------------------------------------------------------------

const COFFEES: [(&str, f64, f64); 8] = [
    ("Americano", 28.9, 1.0),
    ("Americano with Milk", 33.8, 1.6),
    ("Cappuccino", 38.7, 1.2),
    ("Cocoa", 38.7, 0.3),
    ("Cortado", 28.9, 0.6),
    ("Espresso", 23.0, 0.3),
    ("Hot Chocolate", 38.7, 0.5),
    ("Latte", 38.7, 1.8),
];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn time_of_day(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Morning",
        12..=16 => "Afternoon",
        _ => "Night",
    }
}

fn write_coffee(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "hour_of_day",
        "cash_type",
        "money",
        "coffee_name",
        "Time_of_Day",
        "Weekday",
        "Month_name",
        "Weekdaysort",
        "Monthsort",
        "Date",
        "Time",
    ])?;

    let first = NaiveDate::from_ymd_opt(2024, 3, 1).context("start date")?;
    let weights: Vec<f64> = COFFEES.iter().map(|c| c.2).collect();
    let mut written = 0;
    for day in 0..153 {
        let date = first + Duration::days(day);
        let weekday = date.weekday().num_days_from_monday() as usize;
        let sales = 4 + rng.below(if weekday >= 5 { 6 } else { 10 });
        let mut hours: Vec<u32> = (0..sales)
            .map(|_| rng.gauss(14.0, 3.8).round().clamp(7.0, 22.0) as u32)
            .collect();
        hours.sort_unstable();
        for hour in hours {
            let (name, price, _) = COFFEES[rng.weighted(&weights)];
            let minute = rng.below(60);
            let second = rng.below(60);
            let month = date.month0() as usize;
            writer.write_record([
                hour.to_string(),
                "card".to_string(),
                format!("{price:.2}"),
                name.to_string(),
                time_of_day(hour).to_string(),
                WEEKDAYS[weekday].to_string(),
                MONTHS[month].to_string(),
                (weekday + 1).to_string(),
                (month + 1).to_string(),
                date.format("%Y-%m-%d").to_string(),
                format!("{hour:02}:{minute:02}:{second:02}.000000"),
            ])?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

// ---------------------------------------------------------------------------
// Student performance
// ---------------------------------------------------------------------------

const LEVELS: [&str; 3] = ["Low", "Medium", "High"];

fn level_bonus(level: &str) -> f64 {
    match level {
        "Low" => -1.0,
        "High" => 1.0,
        _ => 0.0,
    }
}

fn write_students(path: &Path, rng: &mut SimpleRng, count: usize) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "Hours_Studied",
        "Attendance",
        "Parental_Involvement",
        "Access_to_Resources",
        "Extracurricular_Activities",
        "Sleep_Hours",
        "Previous_Scores",
        "Motivation_Level",
        "Internet_Access",
        "Tutoring_Sessions",
        "Family_Income",
        "Teacher_Quality",
        "School_Type",
        "Peer_Influence",
        "Physical_Activity",
        "Learning_Disabilities",
        "Parental_Education_Level",
        "Distance_from_Home",
        "Gender",
        "Exam_Score",
    ])?;

    for _ in 0..count {
        let hours = rng.gauss(20.0, 6.0).round().clamp(1.0, 44.0);
        let attendance = (60.0 + rng.next_f64() * 40.0).round();
        let parental = rng.pick(&LEVELS);
        let resources = rng.pick(&LEVELS);
        let sleep = rng.gauss(7.0, 1.4).round().clamp(4.0, 10.0);
        let motivation = rng.pick(&LEVELS);
        let internet = if rng.next_f64() < 0.92 { "Yes" } else { "No" };
        let income = rng.pick(&LEVELS);
        let activity = rng.below(7) as f64;
        let score = (55.0
            + 0.3 * hours
            + 0.2 * (attendance - 60.0)
            + level_bonus(parental)
            + level_bonus(resources)
            + 0.5 * level_bonus(motivation)
            + 0.2 * activity
            + rng.gauss(0.0, 2.5))
        .round()
        .clamp(55.0, 100.0);

        writer.write_record([
            hours.to_string(),
            attendance.to_string(),
            parental.to_string(),
            resources.to_string(),
            rng.pick(&["Yes", "No"]).to_string(),
            sleep.to_string(),
            (50 + rng.below(51)).to_string(),
            motivation.to_string(),
            internet.to_string(),
            rng.below(5).to_string(),
            income.to_string(),
            rng.pick(&LEVELS).to_string(),
            rng.pick(&["Public", "Public", "Private"]).to_string(),
            rng.pick(&["Positive", "Neutral", "Negative"]).to_string(),
            activity.to_string(),
            rng.pick(&["No", "No", "No", "Yes"]).to_string(),
            rng.pick(&["High School", "College", "Postgraduate"]).to_string(),
            rng.pick(&["Near", "Moderate", "Far"]).to_string(),
            rng.pick(&["Male", "Female"]).to_string(),
            score.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(count)
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let out = Path::new("data");
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let coffee_path = out.join("Coffee_sales.csv");
    let sales = write_coffee(&coffee_path, &mut rng)?;
    println!("Wrote {sales} transactions to {}", coffee_path.display());

    let student_path = out.join("StudentPerformanceFactors.csv");
    let students = write_students(&student_path, &mut rng, 1000)?;
    println!("Wrote {students} students to {}", student_path.display());
    Ok(())
}
