use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tally::{CalendarTime, MemoryStore, Resolution, Tally, build_plan, strategy::DEFAULT_MAX_DEPTH};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> CalendarTime {
    CalendarTime::from_ymd_hms(y, mo, d, h, mi, s).unwrap()
}

fn random_time(rng: &mut StdRng, from: CalendarTime, span_seconds: i64) -> CalendarTime {
    from.add(rng.random_range(0..span_seconds), Resolution::Second)
}

fn random_resolution(rng: &mut StdRng, choices: &[Resolution]) -> Resolution {
    choices[rng.random_range(0..choices.len())]
}

fn length_seconds(start: CalendarTime, end_exclusive: CalendarTime) -> i64 {
    start.units_between(&end_exclusive, Resolution::Second)
}

#[test]
fn test_plans_tile_random_windows() {
    let mut rng = StdRng::seed_from_u64(7);
    let origin = at(2012, 1, 1, 0, 0, 0);
    let span = length_seconds(origin, at(2018, 1, 1, 0, 0, 0));

    for _ in 0..2_000 {
        let a = random_time(&mut rng, origin, span);
        let b = random_time(&mut rng, origin, span);
        let min = random_resolution(&mut rng, &Resolution::ALL);

        let plan = build_plan(a, b, min, DEFAULT_MAX_DEPTH).unwrap();
        let (start, end_exclusive) = plan.window();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        assert_eq!(start, lo.start_of(min));
        assert_eq!(end_exclusive, hi.start_of(min).add(1, min));
        assert!(plan.covers(), "{a} {b} {min}: {plan:?}");

        let mut covered = 0;
        let mut cursor = start;
        for period in &plan {
            assert_eq!(period.start(), cursor, "gap or overlap at {period}");
            assert!(period.resolution().tiles(min));
            covered += length_seconds(period.start(), period.end_exclusive());
            cursor = period.end_exclusive();
        }
        assert_eq!(covered, length_seconds(start, end_exclusive));
        assert_eq!(plan, build_plan(b, a, min, DEFAULT_MAX_DEPTH).unwrap());
    }
}

#[test]
fn test_plans_cover_exact_seconds() {
    let mut rng = StdRng::seed_from_u64(11);
    let origin = at(2014, 12, 31, 22, 0, 0);
    let span = length_seconds(origin, at(2015, 1, 1, 2, 0, 0));

    for _ in 0..200 {
        let a = random_time(&mut rng, origin, span);
        let b = random_time(&mut rng, origin, span);
        let min = random_resolution(&mut rng, &[Resolution::Second, Resolution::Minute]);
        let plan = build_plan(a, b, min, DEFAULT_MAX_DEPTH).unwrap();

        let mut seconds = BTreeSet::new();
        for period in &plan {
            let mut t = period.start();
            while t < period.end_exclusive() {
                assert!(seconds.insert(t), "second {t} covered twice");
                t = t.add(1, Resolution::Second);
            }
        }

        let (start, end_exclusive) = plan.window();
        let mut expected = BTreeSet::new();
        let mut t = start;
        while t < end_exclusive {
            expected.insert(t);
            t = t.add(1, Resolution::Second);
        }
        assert_eq!(seconds, expected);
    }
}

#[test]
fn test_plans_are_small() {
    let mut rng = StdRng::seed_from_u64(13);
    let origin = at(2000, 1, 1, 0, 0, 0);
    let span = length_seconds(origin, at(2030, 1, 1, 0, 0, 0));

    for _ in 0..500 {
        let a = random_time(&mut rng, origin, span);
        let b = random_time(&mut rng, origin, span);
        let plan = build_plan(a, b, Resolution::Second, DEFAULT_MAX_DEPTH).unwrap();
        // At most 30 years in the middle, and on each edge fewer than one period of
        // each finer resolution: 11 months, 4 weeks, 6 days, 23 hours, 59 minutes and
        // 59 seconds (plus days on both sides of a straddling week).
        assert!(plan.len() <= 30 + 2 * (11 + 4 + 12 + 23 + 59 + 59), "{}", plan.len());
    }
}

#[test]
fn test_optimized_total_matches_basic_total() {
    let tally = Tally::new(MemoryStore::new());
    let mut rng = StdRng::seed_from_u64(42);
    let origin = at(2014, 11, 1, 0, 0, 0);
    let span = length_seconds(origin, at(2015, 5, 1, 0, 0, 0));

    for _ in 0..5_000 {
        let t = random_time(&mut rng, origin, span);
        tally
            .increment("m", t, rng.random_range(-3..=10), Resolution::Minute)
            .unwrap();
    }

    let coarse = [
        Resolution::Day,
        Resolution::Week,
        Resolution::Month,
        Resolution::Year,
    ];
    for _ in 0..200 {
        let min = random_resolution(&mut rng, &coarse);
        let a = random_time(&mut rng, at(2014, 6, 1, 0, 0, 0), span * 2);
        let b = random_time(&mut rng, at(2014, 6, 1, 0, 0, 0), span * 2);
        assert_eq!(
            tally.get_total("m", a, b, min).unwrap(),
            tally.basic_total("m", a, b, min).unwrap(),
            "{a} {b} {min}"
        );
    }

    let fine = [Resolution::Minute, Resolution::Hour];
    for _ in 0..100 {
        let min = random_resolution(&mut rng, &fine);
        let a = random_time(&mut rng, origin, span);
        let b = a.add(rng.random_range(-72..=72), Resolution::Hour);
        assert_eq!(
            tally.get_total("m", a, b, min).unwrap(),
            tally.basic_total("m", a, b, min).unwrap(),
            "{a} {b} {min}"
        );
    }
}

#[test]
fn test_optimized_total_reads_less() {
    let tally = Tally::new(MemoryStore::new());
    let start = at(2014, 3, 17, 0, 0, 0);
    let end = at(2016, 8, 2, 0, 0, 0);

    tally.get_total("m", start, end, Resolution::Day).unwrap();
    let optimized = tally.store().fields_read();
    tally.store().reset_counters();
    tally.basic_total("m", start, end, Resolution::Day).unwrap();
    let basic = tally.store().fields_read();

    assert_eq!(basic, 870);
    assert!(optimized < 30, "{optimized}");
}
