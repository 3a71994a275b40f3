//! Counter benchmark for tally
//!
//! Measures:
//! - Increment fan-out cost at each lowest resolution
//! - Sequential vs parallel fan-out
//! - Range reads over growing windows
//! - Decomposed totals vs bucket-by-bucket totals

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tally::{
    CalendarTime, FanOut, MemoryStore, Resolution, Tally, TallyBuilder, bucket_key_chain,
};

const WARMUP_ITERATIONS: usize = 1;
const BENCHMARK_ITERATIONS: usize = 3;
const METRIC: &str = "bench.events";

/// Formats a per-operation latency, picking the unit that keeps it above 1.
fn per_op(duration: Duration, ops: usize) -> String {
    let nanos = duration.as_nanos() as f64 / ops.max(1) as f64;
    match nanos {
        n if n < 1_000.0 => format!("{n:.0}ns/op"),
        n if n < 1_000_000.0 => format!("{:.2}µs/op", n / 1_000.0),
        n => format!("{:.2}ms/op", n / 1_000_000.0),
    }
}

fn print_section(title: &str, last_column: &str) {
    println!("\n{title}");
    println!("  {:<44} {:>14}  {:>14}", "Case", "Latency", last_column);
    println!("  {}", "-".repeat(76));
}

/// Prints one row: total time spread over `ops`, plus a case-specific figure.
fn print_row(name: &str, duration: Duration, ops: usize, extra: impl std::fmt::Display) {
    println!("  {:<44} {:>14}  {:>14}", name, per_op(duration, ops), extra);
}

fn base_time() -> CalendarTime {
    CalendarTime::from_ymd_hms(2015, 1, 1, 0, 0, 0).unwrap()
}

/// Runs `f` for the warmup and measured iterations and returns the mean measured time.
fn measure(mut f: impl FnMut() -> Duration) -> Duration {
    let mut durations = Vec::new();
    for i in 0..WARMUP_ITERATIONS + BENCHMARK_ITERATIONS {
        let duration = f();
        if i >= WARMUP_ITERATIONS {
            durations.push(duration);
        }
    }
    durations.iter().sum::<Duration>() / durations.len() as u32
}

/// Increments `count` random instants spread over one year.
fn populate(tally: &Tally<MemoryStore>, count: usize, lowest: Resolution) -> Duration {
    let mut rng = StdRng::seed_from_u64(12345);
    let start = base_time();
    let span = start.units_between(&start.add(1, Resolution::Year), Resolution::Second);
    let instants: Vec<CalendarTime> = (0..count)
        .map(|_| start.add(rng.random_range(0..span), Resolution::Second))
        .collect();

    let begin = Instant::now();
    for at in instants {
        tally.increment(METRIC, at, 1, lowest).unwrap();
    }
    begin.elapsed()
}

fn benchmark_increment(count: usize, lowest: Resolution, fan_out: FanOut) -> Duration {
    let tally = TallyBuilder::new()
        .fan_out(fan_out)
        .build(MemoryStore::new());
    populate(&tally, count, lowest)
}

fn benchmark_range(tally: &Tally<MemoryStore>, days: i64, resolution: Resolution) -> Duration {
    let start = base_time().add(3, Resolution::Day);
    let end = start.add(days, Resolution::Day);
    let begin = Instant::now();
    let points = tally.get_range(METRIC, start, end, resolution).unwrap();
    let elapsed = begin.elapsed();
    assert!(!points.is_empty());
    elapsed
}

/// Mean number of buckets read per query since the last counter reset.
fn buckets_per_query(tally: &Tally<MemoryStore>) -> usize {
    tally.store().fields_read() / (WARMUP_ITERATIONS + BENCHMARK_ITERATIONS)
}

fn main() {
    let _ = env_logger::try_init();

    println!("\nTALLY COUNTER BENCHMARK (in-memory store, one year of synthetic events)");

    // 1. Increment fan-out
    print_section("1. Increment fan-out (sequential)", "Buckets/op");
    for lowest in [Resolution::Day, Resolution::Minute, Resolution::Second] {
        let count = 100_000;
        let duration = measure(|| benchmark_increment(count, lowest, FanOut::Sequential));
        let buckets = bucket_key_chain(&base_time(), lowest).len();
        print_row(&format!("{count} increments down to {lowest}"), duration, count, buckets);
    }

    // 2. Sequential vs parallel
    print_section("2. Sequential vs parallel fan-out", "Buckets/op");
    for fan_out in [FanOut::Sequential, FanOut::Parallel] {
        let count = 10_000;
        let duration = measure(|| benchmark_increment(count, Resolution::Second, fan_out));
        print_row(&format!("{count} increments ({fan_out:?})"), duration, count, 7);
    }

    let tally = Tally::new(MemoryStore::new());
    populate(&tally, 100_000, Resolution::Minute);

    // 3. Range reads
    print_section("3. Range reads (100K events)", "Buckets read");
    for (days, resolution) in [
        (1, Resolution::Minute),
        (7, Resolution::Hour),
        (30, Resolution::Hour),
        (300, Resolution::Day),
    ] {
        tally.store().reset_counters();
        let duration = measure(|| benchmark_range(&tally, days, resolution));
        let buckets = buckets_per_query(&tally);
        print_row(&format!("{days} days at {resolution}"), duration, 1, buckets);
    }

    // 4. Totals
    print_section("4. Decomposed vs bucket-by-bucket totals", "Buckets read");
    let start = CalendarTime::from_ymd_hms(2015, 1, 17, 6, 30, 0).unwrap();
    let end = CalendarTime::from_ymd_hms(2015, 11, 4, 18, 15, 0).unwrap();
    for min in [Resolution::Minute, Resolution::Hour, Resolution::Day] {
        tally.store().reset_counters();
        let duration = measure(|| {
            let begin = Instant::now();
            tally.get_total(METRIC, start, end, min).unwrap();
            begin.elapsed()
        });
        let buckets = buckets_per_query(&tally);
        print_row(&format!("get_total at {min}"), duration, 1, buckets);

        tally.store().reset_counters();
        let duration = measure(|| {
            let begin = Instant::now();
            tally.basic_total(METRIC, start, end, min).unwrap();
            begin.elapsed()
        });
        let buckets = buckets_per_query(&tally);
        print_row(&format!("basic_total at {min}"), duration, 1, buckets);
    }

    println!();
}
