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

use std::cmp::Ordering;

/// One retained value together with the bounds of its rank.
///
/// Within a [`Summary`], `rmin` of a tuple is the sum of `g` over it and every
/// tuple before it, and `rmax` is `rmin + delta`. Some occurrence of the value
/// has a rank in `[rmin, rmax]`. When [`Tuple::is_run`] is true the bounds are
/// tighter: every rank in `[rmin, rmax]` holds the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuple {
    value: f64,
    g: u64,
    delta: u64,
    run: bool,
}

impl Tuple {
    /// Creates a tuple from its raw parts.
    pub fn new(value: f64, g: u64, delta: u64) -> Self {
        Self {
            value,
            g,
            delta,
            run: false,
        }
    }

    pub(crate) fn observation(value: f64) -> Self {
        Self::new(value, 1, 0)
    }

    /// Returns the retained value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns the rank gap between this tuple and its predecessor.
    pub fn g(&self) -> u64 {
        self.g
    }

    /// Returns the width of this tuple's rank bounds.
    pub fn delta(&self) -> u64 {
        self.delta
    }

    /// Returns true if every rank in this tuple's bounds holds its value, as
    /// for a run of equal observations.
    pub fn is_run(&self) -> bool {
        self.run
    }
}

/// Absolute rank bounds of one retained value.
///
/// The value first occurs at a rank no greater than `first` and last occurs at
/// a rank no less than `last`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Span {
    pub value: f64,
    pub first: u64,
    pub last: u64,
}

impl Span {
    /// Distance from `rank` to the ranks this value is known to reach.
    pub fn miss(&self, rank: u64) -> u64 {
        self.first
            .saturating_sub(rank)
            .max(rank.saturating_sub(self.last))
    }
}

/// A value-ordered sequence of [`Tuple`]s summarizing a stream of
/// observations.
///
/// An empty summary represents no observations. Merging with an empty
/// summary returns the other operand unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    tuples: Vec<Tuple>,
}

impl Summary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an exact summary of a batch of observations.
    ///
    /// NaN values are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fastquantile::gk::Summary;
    /// let summary = Summary::from_values([3.0, 1.0, 2.0, 2.0]);
    /// assert_eq!(summary.size(), 4);
    /// assert_eq!(summary.len(), 3);
    /// assert_eq!(summary.min_value(), Some(1.0));
    /// ```
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let tuples = values
            .into_iter()
            .filter(|value| !value.is_nan())
            .map(Tuple::observation)
            .collect();
        let mut summary = Self { tuples };
        summary.sort_by_value();
        summary.merge_duplicate_values();
        summary
    }

    /// Creates a summary from tuples, ordering them by value.
    ///
    /// The `g` and `delta` of each tuple are taken as given; they must describe
    /// a valid summary for rank queries to be meaningful.
    pub fn from_tuples(tuples: Vec<Tuple>) -> Self {
        let mut summary = Self { tuples };
        summary.sort_by_value();
        summary
    }

    /// Returns the retained tuples in value order.
    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    /// Returns the number of retained tuples.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Returns true if the summary retains no tuples.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Returns the number of observations this summary represents: the sum of
    /// all `g` plus the `delta` of the last tuple.
    pub fn size(&self) -> u64 {
        match self.tuples.last() {
            None => 0,
            Some(last) => self.tuples.iter().map(|t| t.g).sum::<u64>() + last.delta,
        }
    }

    /// Returns the smallest retained value.
    pub fn min_value(&self) -> Option<f64> {
        self.tuples.first().map(|t| t.value)
    }

    /// Returns the largest retained value.
    pub fn max_value(&self) -> Option<f64> {
        self.tuples.last().map(|t| t.value)
    }

    /// Collapses adjacent tuples that share a value into one tuple.
    ///
    /// The surviving tuple keeps the tightest bounds of the run: the lowest
    /// first rank and the highest last rank any of its tuples vouch for. The
    /// `g` of the next distinct tuple absorbs the folded tuples, so `size()` is
    /// unchanged. Applying it twice is the same as applying it once.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fastquantile::gk::Summary;
    /// # use fastquantile::gk::Tuple;
    /// let mut summary = Summary::from_tuples(vec![
    ///     Tuple::new(1.0, 1, 0),
    ///     Tuple::new(1.0, 1, 0),
    ///     Tuple::new(2.0, 1, 0),
    /// ]);
    /// summary.merge_duplicate_values();
    /// assert_eq!(summary.len(), 2);
    /// assert!(summary.tuples()[0].is_run());
    /// assert_eq!(summary.size(), 3);
    /// ```
    pub fn merge_duplicate_values(&mut self) {
        if self.tuples.len() < 2 {
            return;
        }
        *self = Summary::from_spans(fold_spans(self.spans()));
    }

    /// Merges two summaries of disjoint streams into a summary of their union.
    ///
    /// Each value's rank bounds in the union add the other side's bounds around
    /// that value: its last rank grows by the last rank of the other side's
    /// greatest smaller value, its first rank by the first rank of the other
    /// side's next value minus one (or by the other side's whole size once
    /// that side is exhausted). Ties take the tuple from `self` first and are
    /// then folded by [`Summary::merge_duplicate_values`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use fastquantile::gk::Summary;
    /// let left = Summary::from_values([1.0, 3.0, 5.0]);
    /// let right = Summary::from_values([2.0, 4.0]);
    /// let merged = left.merge(&right);
    /// assert_eq!(merged.size(), 5);
    /// assert_eq!(left.merge(&Summary::new()), left);
    /// ```
    pub fn merge(&self, other: &Summary) -> Summary {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let left = self.spans();
        let right = other.spans();
        let (left_size, right_size) = (self.size(), other.size());
        let mut merged = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() || j < right.len() {
            let take_left = j == right.len() || (i < left.len() && left[i].value <= right[j].value);
            let span = if take_left {
                i += 1;
                interleave(left[i - 1], &right, j, right_size)
            } else {
                j += 1;
                interleave(right[j - 1], &left, i, left_size)
            };
            merged.push(span);
        }

        Summary::from_spans(fold_spans(merged))
    }

    /// Returns the value whose known ranks come within `eps_n` of `rank`, or
    /// `None` if the summary is empty.
    ///
    /// Rank 1 (or below) answers the minimum and a rank at or past `size()`
    /// answers the maximum. When no tuple is close enough the closest one is
    /// returned.
    pub fn value_at_rank(&self, rank: u64, eps_n: u64) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let spans = self.spans();
        let index = locate_rank(&spans, rank, eps_n, self.size(), 0);
        Some(spans[index].value)
    }

    /// Returns the approximate value at the given quantile fraction.
    ///
    /// The fraction is converted to the rank `floor(fraction * size())` and
    /// answered within `floor(epsilon * size())` ranks.
    ///
    /// # Panics
    ///
    /// Panics if fraction is not in [0.0, 1.0].
    pub fn quantile(&self, fraction: f64, epsilon: f64) -> Option<f64> {
        assert!(
            (0.0..=1.0).contains(&fraction),
            "quantile must be in [0.0, 1.0], got {fraction}"
        );
        if self.is_empty() {
            return None;
        }
        let size = self.size() as f64;
        let rank = (fraction * size).floor() as u64;
        let eps_n = (epsilon * size).floor() as u64;
        self.value_at_rank(rank, eps_n)
    }

    pub(crate) fn push(&mut self, tuple: Tuple) {
        self.tuples.push(tuple);
    }

    pub(crate) fn sort_by_value(&mut self) {
        self.tuples.sort_by(compare_values);
    }

    /// Expands the tuples into absolute rank bounds.
    pub(crate) fn spans(&self) -> Vec<Span> {
        let mut rmin = 0u64;
        self.tuples
            .iter()
            .map(|t| {
                rmin += t.g;
                let rmax = rmin + t.delta;
                let (first, last) = if t.run { (rmin, rmax) } else { (rmax, rmin) };
                Span {
                    value: t.value,
                    first,
                    last,
                }
            })
            .collect()
    }

    /// Encodes absolute rank bounds as tuples, tightening them against their
    /// neighbors first.
    ///
    /// The spans must be ordered by value and describe one stream: the first
    /// holds its minimum and the last its maximum.
    pub(crate) fn from_spans(mut spans: Vec<Span>) -> Summary {
        tighten(&mut spans);
        let mut previous = 0u64;
        let tuples = spans
            .iter()
            .map(|span| {
                let rmin = span.first.min(span.last);
                let rmax = span.first.max(span.last);
                let tuple = Tuple {
                    value: span.value,
                    g: rmin.saturating_sub(previous),
                    delta: rmax - rmin,
                    run: span.first < span.last,
                };
                previous = rmin;
                tuple
            })
            .collect();
        Summary { tuples }
    }
}

fn compare_values(a: &Tuple, b: &Tuple) -> Ordering {
    a.value.total_cmp(&b.value)
}

fn fold_spans(spans: Vec<Span>) -> Vec<Span> {
    let mut folded: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match folded.last_mut() {
            Some(head) if head.value == span.value => {
                head.first = head.first.min(span.first);
                head.last = head.last.max(span.last);
            }
            _ => folded.push(span),
        }
    }
    folded
}

/// Distinct values have strictly increasing first and last ranks; the stream
/// minimum first occurs at rank 1 and its maximum last occurs at its size.
fn tighten(spans: &mut [Span]) {
    let Some(end) = spans.last() else {
        return;
    };
    let size = end.first.max(end.last);
    for i in (0..spans.len() - 1).rev() {
        spans[i].first = spans[i].first.min(spans[i + 1].first.saturating_sub(1));
    }
    for i in 1..spans.len() {
        spans[i].last = spans[i].last.max(spans[i - 1].last + 1);
    }
    spans[0].first = 1;
    if let Some(end) = spans.last_mut() {
        end.last = size;
    }
}

/// Moves a span into the union with `other`, of which the first `consumed`
/// spans hold values already emitted.
fn interleave(span: Span, other: &[Span], consumed: usize, other_size: u64) -> Span {
    let first = match other.get(consumed) {
        Some(next) => span.first + next.first.saturating_sub(1),
        None => span.first + other_size,
    };
    let last = match consumed.checked_sub(1) {
        Some(previous) => span.last + other[previous].last,
        None => span.last,
    };
    Span {
        value: span.value,
        first,
        last,
    }
}

/// Scans forward from `start` for the span within `eps_n` of `rank`.
///
/// Falls back to the closest span scanned when none is within `eps_n`.
/// `spans` must not be empty and `size` must be the size of the summary.
pub(crate) fn locate_rank(
    spans: &[Span],
    rank: u64,
    eps_n: u64,
    size: u64,
    start: usize,
) -> usize {
    debug_assert!(!spans.is_empty(), "lookup on an empty summary");
    if rank <= 1 {
        return 0;
    }
    if rank >= size {
        return spans.len() - 1;
    }

    let mut best = start;
    let mut best_miss = spans[start].miss(rank);
    for (index, span) in spans.iter().enumerate().skip(start) {
        let miss = span.miss(rank);
        if miss <= eps_n {
            return index;
        }
        if miss < best_miss {
            best = index;
            best_miss = miss;
        }
        // First ranks only grow from here on.
        if span.first.saturating_sub(rank) > best_miss {
            break;
        }
    }
    best
}
