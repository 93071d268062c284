//! Randomized properties of the time model and the background tag index.
//!
//! Nearest-tag answers are checked against a brute-force scan over every tag.

use its_bkg_study::tagging::{BackgroundTagIndex, NearestTags, TagInsert};
use its_bkg_study::{distance, Timestamp, CYCLE_LENGTH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_ts(rng: &mut StdRng, cycles: std::ops::Range<u64>) -> Timestamp {
    Timestamp::new(rng.gen_range(cycles), rng.gen_range(0..CYCLE_LENGTH)).unwrap()
}

fn brute_force(tags: &[Timestamp], query: Timestamp) -> NearestTags {
    let distances: Vec<i64> = tags.iter().map(|&t| distance(query, t)).collect();
    NearestTags {
        before: distances.iter().copied().filter(|&d| d <= 0).max(),
        after: distances.iter().copied().filter(|&d| d >= 0).min(),
    }
}

#[test]
fn distance_is_antisymmetric() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..5_000 {
        let a = random_ts(&mut rng, 0..u64::MAX);
        let b = random_ts(&mut rng, 0..u64::MAX);
        assert_eq!(distance(a, b), -distance(b, a), "{a} vs {b}");
    }
}

#[test]
fn distance_is_additive_on_short_spans() {
    let mut rng = StdRng::seed_from_u64(43);
    for _ in 0..5_000 {
        let a = random_ts(&mut rng, 1_000..1_100);
        let b = random_ts(&mut rng, 1_000..1_100);
        let c = random_ts(&mut rng, 1_000..1_100);
        assert_eq!(distance(a, b) + distance(b, c), distance(a, c));
    }
}

#[test]
fn cycle_wrap_example() {
    let a = Timestamp::new(5, 3560).unwrap();
    let b = Timestamp::new(6, 4).unwrap();
    assert_eq!(distance(a, b), 8);
}

#[test]
fn nearest_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(7);
    for round in 0..50 {
        let mut index = BackgroundTagIndex::new();
        let mut tags = Vec::new();
        for _ in 0..rng.gen_range(1..200) {
            let t = random_ts(&mut rng, 500..540);
            if index.insert(t) == TagInsert::New {
                tags.push(t);
            }
        }
        assert_eq!(index.len(), tags.len());

        for _ in 0..200 {
            let q = random_ts(&mut rng, 490..550);
            let got = index.nearest_around(q);
            assert_eq!(got, brute_force(&tags, q), "round {round}, query {q}");
        }
    }
}

#[test]
fn nearest_bracket_holds() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut index = BackgroundTagIndex::new();
    let mut tags = Vec::new();
    for _ in 0..300 {
        let t = random_ts(&mut rng, 0..64);
        index.insert(t);
        tags.push(t);
    }

    for _ in 0..1_000 {
        let q = random_ts(&mut rng, 0..64);
        let NearestTags { before, after } = index.nearest_around(q);
        if let (Some(b), Some(a)) = (before, after) {
            assert!(b <= 0 && 0 <= a, "before {b}, after {a}");
        }
        for &t in &tags {
            let d = distance(q, t);
            if let Some(b) = before {
                assert!(!(b < d && d < 0), "tag at {d} is closer than before={b}");
            }
            if let Some(a) = after {
                assert!(!(0 < d && d < a), "tag at {d} is closer than after={a}");
            }
        }
    }
}

#[test]
fn tag_on_query_is_on_both_sides() {
    let mut index = BackgroundTagIndex::new();
    let t = Timestamp::new(12, 345).unwrap();
    index.insert(t);
    assert_eq!(
        index.nearest_around(t),
        NearestTags {
            before: Some(0),
            after: Some(0)
        }
    );
}

#[test]
fn empty_index_gives_sentinels() {
    let index = BackgroundTagIndex::new();
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..100 {
        let q = random_ts(&mut rng, 0..u64::MAX);
        assert_eq!(index.nearest_around(q).sentinel_pair(), (999_999, -999_999));
    }
}

#[test]
fn duplicate_insert_is_reported_and_idempotent() {
    let mut rng = StdRng::seed_from_u64(10);
    let mut index = BackgroundTagIndex::new();
    let tags: Vec<Timestamp> = (0..50).map(|_| random_ts(&mut rng, 0..1_000)).collect();
    for &t in &tags {
        index.insert(t);
    }
    let before: Vec<Timestamp> = index.iter().collect();

    for &t in &tags {
        assert_eq!(index.insert(t), TagInsert::Duplicate);
        assert!(index.contains(t));
    }
    let after: Vec<Timestamp> = index.iter().collect();
    assert_eq!(before, after);
    assert_eq!(index.len(), before.len());
}
