// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use fastquantile::gk::Stream;
use fastquantile::gk::Summary;
use fastquantile::gk::Tuple;
use googletest::assert_that;
use googletest::prelude::gt;
use googletest::prelude::le;

struct XorShift64(u64);

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

fn shuffled(n: usize, seed: u64) -> Vec<f64> {
    let mut values: Vec<usize> = (0..n).collect();
    let mut rng = XorShift64::new(seed);
    for i in (1..n).rev() {
        let j = (rng.next_u64() % (i as u64 + 1)) as usize;
        values.swap(i, j);
    }
    values.into_iter().map(|v| v as f64).collect()
}

fn stream_summary(epsilon: f64, n: u64, values: &[f64]) -> Summary {
    let mut stream = Stream::new(epsilon, n).unwrap();
    for &value in values {
        stream.update(value);
    }
    stream.finish();
    stream.summary().unwrap().clone()
}

/// Summaries of consecutive `chunk`-sized slices of `values`.
fn chunk_summaries(values: &[f64], chunk: usize) -> Vec<Summary> {
    values
        .chunks(chunk)
        .map(|part| stream_summary(0.01, chunk as u64, part))
        .collect()
}

/// Asserts each tuple's `[rmin, rmax]` is consistent with the true ranks of
/// its value in `values`, and that `rmin` strictly increases.
fn assert_tuple_bounds(summary: &Summary, values: &[f64]) {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut rmin = 0;
    for tuple in summary.tuples() {
        let previous = rmin;
        rmin += tuple.g();
        let rmax = rmin + tuple.delta();
        assert_that!(rmin, gt(previous));

        let first = sorted.partition_point(|&v| v < tuple.value()) as u64 + 1;
        let last = sorted.partition_point(|&v| v <= tuple.value()) as u64;
        assert_that!(first, le(last));
        if tuple.is_run() {
            // Every rank in the interval holds the value.
            assert_that!(first, le(rmin));
            assert_that!(rmax, le(last));
        } else {
            // Some occurrence lies in the interval.
            assert_that!(first, le(rmax));
            assert_that!(rmin, le(last));
        }
    }
    assert_eq!(summary.size(), values.len() as u64);
}

fn summary_of(tuples: &[(f64, u64, u64)]) -> Summary {
    Summary::from_tuples(tuples.iter().map(|&(v, g, d)| Tuple::new(v, g, d)).collect())
}

fn parts(summary: &Summary) -> Vec<(f64, u64, u64)> {
    summary
        .tuples()
        .iter()
        .map(|t| (t.value(), t.g(), t.delta()))
        .collect()
}

#[test]
fn test_empty() {
    let summary = Summary::new();
    assert!(summary.is_empty());
    assert_eq!(summary.size(), 0);
    assert!(summary.min_value().is_none());
    assert!(summary.max_value().is_none());
    assert!(summary.value_at_rank(1, 0).is_none());
    assert!(summary.quantile(0.5, 0.01).is_none());
}

#[test]
fn test_from_values() {
    let summary = Summary::from_values([2.0, 1.0, 2.0, f64::NAN, 3.0]);
    assert_eq!(parts(&summary), vec![(1.0, 1, 0), (2.0, 1, 1), (3.0, 2, 0)]);
    assert_eq!(summary.size(), 4);
}

#[test]
fn test_from_tuples_orders_by_value() {
    let summary = summary_of(&[(3.0, 1, 0), (1.0, 1, 0), (2.0, 1, 0)]);
    assert_eq!(summary.min_value(), Some(1.0));
    assert_eq!(summary.max_value(), Some(3.0));
    assert_eq!(summary.size(), 3);
}

#[test]
fn test_size_counts_last_delta() {
    let summary = summary_of(&[(1.0, 1, 0), (2.0, 3, 2), (3.0, 4, 5)]);
    assert_eq!(summary.size(), 13);
}

#[test]
fn test_merge_duplicate_values() {
    let mut summary = summary_of(&[
        (1.0, 1, 0),
        (1.0, 1, 0),
        (1.0, 1, 0),
        (2.0, 1, 0),
        (3.0, 1, 0),
        (3.0, 1, 0),
    ]);
    summary.merge_duplicate_values();
    assert_eq!(parts(&summary), vec![(1.0, 1, 2), (2.0, 3, 0), (3.0, 1, 1)]);
    assert_eq!(summary.size(), 6);
    let runs: Vec<bool> = summary.tuples().iter().map(Tuple::is_run).collect();
    assert_eq!(runs, vec![true, false, true]);

    let once = summary.clone();
    summary.merge_duplicate_values();
    assert_eq!(summary, once);
}

#[test]
fn test_merge_interleaved() {
    let left = summary_of(&[(0.0, 1, 0), (20.0, 99, 0)]);
    let right = summary_of(&[(10.0, 1, 0), (30.0, 49, 0)]);
    let merged = left.merge(&right);
    assert_eq!(
        parts(&merged),
        vec![
            (0.0, 1, 0),
            (10.0, 1, 98),
            (20.0, 99, 48),
            (30.0, 49, 0)
        ]
    );
    assert_eq!(merged.size(), left.size() + right.size());
}

#[test]
fn test_merge_with_empty() {
    let summary = Summary::from_values([1.0, 2.0, 3.0]);
    assert_eq!(summary.merge(&Summary::new()), summary);
    assert_eq!(Summary::new().merge(&summary), summary);
    assert!(Summary::new().merge(&Summary::new()).is_empty());
}

#[test]
fn test_merge_exact_summaries() {
    let evens = Summary::from_values((0..50).map(|i| (2 * i) as f64));
    let odds = Summary::from_values((0..50).map(|i| (2 * i + 1) as f64));
    let merged = evens.merge(&odds);
    assert_eq!(merged.len(), 100);
    assert_eq!(merged.size(), 100);
    assert_eq!(merged.min_value(), Some(0.0));
    assert_eq!(merged.max_value(), Some(99.0));
    assert!(
        merged
            .tuples()
            .windows(2)
            .all(|pair| pair[0].value() < pair[1].value())
    );
}

#[test]
fn test_merge_same_values() {
    let left = Summary::from_values([5.0]);
    let right = Summary::from_values([5.0]);
    let merged = left.merge(&right);
    assert_eq!(parts(&merged), vec![(5.0, 1, 1)]);
    assert_eq!(merged.size(), 2);
}

#[test]
fn test_prune_exact() {
    let exact = Summary::from_values((1..=100).map(f64::from));
    let pruned = exact.prune(10, 0.0, 0);

    let mut expected = vec![(1.0, 1, 0), (10.0, 9, 0)];
    expected.extend((2..=10).map(|i| ((i * 10) as f64, 10, 0)));
    assert_eq!(parts(&pruned), expected);
    assert_eq!(pruned.size(), 100);
}

#[test]
fn test_prune_keeps_rank_bounds_on_duplicates() {
    let summary = summary_of(&[(0.0, 1, 24), (1.0, 25, 24), (2.0, 25, 24), (3.0, 25, 24)]);
    let pruned = summary.prune(10, 0.0, 0);
    assert_eq!(
        parts(&pruned),
        vec![(0.0, 1, 0), (1.0, 25, 24), (2.0, 25, 24), (3.0, 25, 24)]
    );
    assert_eq!(pruned.size(), summary.size());
}

#[test]
fn test_prune_small_summaries() {
    let single = Summary::from_values([4.0]);
    assert_eq!(single.prune(3, 0.1, 1), single);
    assert!(Summary::new().prune(3, 0.1, 1).is_empty());
}

#[test]
fn test_prune_bounds_length() {
    let exact = Summary::from_values((0..1000).map(f64::from));
    for target in [2, 7, 50, 999, 2000] {
        let pruned = exact.prune(target, 0.01, 1);
        assert_that!(pruned.len(), le(target + 1));
        assert_eq!(pruned.size(), 1000);
        assert_eq!(pruned.min_value(), Some(0.0));
        assert_eq!(pruned.max_value(), Some(999.0));
    }
}

#[test]
fn test_value_at_rank() {
    let exact = Summary::from_values((1..=100).map(f64::from));
    assert_eq!(exact.value_at_rank(0, 0), Some(1.0));
    assert_eq!(exact.value_at_rank(1, 0), Some(1.0));
    assert_eq!(exact.value_at_rank(37, 0), Some(37.0));
    assert_eq!(exact.value_at_rank(100, 0), Some(100.0));
    assert_eq!(exact.value_at_rank(500, 0), Some(100.0));
}

#[test]
fn test_value_at_rank_falls_back_to_closest() {
    let sparse = summary_of(&[(0.0, 1, 0), (10.0, 10, 0), (20.0, 10, 0)]);
    // Ranks 1, 11 and 21; nothing lies within 0 of 18 or 14.
    assert_eq!(sparse.value_at_rank(18, 0), Some(20.0));
    assert_eq!(sparse.value_at_rank(14, 0), Some(10.0));
    assert_eq!(sparse.value_at_rank(18, 3), Some(20.0));
    assert_eq!(sparse.value_at_rank(15, 6), Some(10.0));
}

#[test]
fn test_quantile() {
    let exact = Summary::from_values((1..=100).map(f64::from));
    assert_eq!(exact.quantile(0.0, 0.0), Some(1.0));
    assert_eq!(exact.quantile(0.5, 0.0), Some(50.0));
    assert_eq!(exact.quantile(1.0, 0.0), Some(100.0));
}

#[test]
#[should_panic(expected = "quantile must be in [0.0, 1.0]")]
fn test_quantile_out_of_range_panics() {
    Summary::from_values([1.0]).quantile(-0.5, 0.01);
}

#[test]
fn test_merge_is_commutative() {
    let distinct = shuffled(20_000, 5);
    let duplicates: Vec<f64> = shuffled(20_000, 8)
        .into_iter()
        .map(|v| (v as u64 % 13) as f64)
        .collect();
    for values in [distinct, duplicates] {
        let summaries = chunk_summaries(&values, 10_000);
        let forward = summaries[0].merge(&summaries[1]);
        assert_eq!(forward, summaries[1].merge(&summaries[0]));
        assert_tuple_bounds(&forward, &values);
    }
}

#[test]
fn test_merge_is_associative() {
    let distinct = shuffled(30_000, 11);
    let duplicates: Vec<f64> = shuffled(30_000, 12)
        .into_iter()
        .map(|v| (v as u64 % 7) as f64)
        .collect();
    for values in [distinct, duplicates] {
        let summaries = chunk_summaries(&values, 10_000);
        let left = summaries[0].merge(&summaries[1]).merge(&summaries[2]);
        let right = summaries[0].merge(&summaries[1].merge(&summaries[2]));
        assert_eq!(left, right);
        assert_eq!(left.size(), 30_000);
        assert_tuple_bounds(&left, &values);
    }
}

#[test]
fn test_stream_tuples_bracket_true_ranks() {
    let distinct = shuffled(50_000, 13);
    let duplicates: Vec<f64> = shuffled(50_000, 14)
        .into_iter()
        .map(|v| (v as u64 % 37) as f64)
        .collect();
    for values in [distinct, duplicates] {
        let summary = stream_summary(0.01, 50_000, &values);
        assert_tuple_bounds(&summary, &values);
    }
}

#[test]
fn test_prune_merged_summary() {
    let values = shuffled(20_000, 21);
    let summaries = chunk_summaries(&values, 10_000);
    let merged = summaries[0].merge(&summaries[1]);
    assert!(merged.tuples().iter().any(|t| t.delta() > 0));

    for (target, epsilon) in [(10, 0.0), (100, 0.01), (500, 0.005), (5000, 0.0)] {
        let pruned = merged.prune(target, epsilon, 1);
        assert_that!(pruned.len(), le(target + 1));
        assert_eq!(pruned.min_value(), Some(0.0));
        assert_eq!(pruned.max_value(), Some(19_999.0));
        assert_tuple_bounds(&pruned, &values);
    }
}
