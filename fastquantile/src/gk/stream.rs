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

use std::f64::consts::E;
use std::mem;

use tracing::debug;
use tracing::trace;

use super::summary::Summary;
use super::summary::Tuple;
use crate::error::Error;

/// Single-pass quantile estimator over a stream of `f64` observations.
///
/// Observations are buffered into blocks of [`Stream::block_size`] values.
/// Each full block is compressed and carried up a ladder of levels like a
/// binary counter, so memory stays sublinear in the number of observations.
/// After [`Stream::finish`] all levels are merged into one summary that
/// answers [`Stream::query`] within `epsilon * n()` ranks.
///
/// # Examples
///
/// ```
/// # use fastquantile::gk::Stream;
/// let mut stream = Stream::new(0.01, 100).unwrap();
/// for value in 1..=100 {
///     stream.update(value as f64);
/// }
/// assert_eq!(stream.query(0.5), None);
/// stream.finish();
/// let median = stream.query(0.5).unwrap();
/// assert!((49.0..=51.0).contains(&median));
/// ```
#[derive(Debug, Clone)]
pub struct Stream {
    epsilon: f64,
    expected_n: u64,
    block_size: usize,
    n: u64,
    levels: Vec<Summary>,
    finished: bool,
}

impl Stream {
    /// Creates a stream that answers within `epsilon * n` ranks for up to
    /// about `n` observations.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`] if `epsilon` is not in (0, 1), if
    /// `n` is zero, or if `epsilon * n < 1` so no block of observations could
    /// be summarized at that accuracy.
    ///
    /// [`ErrorKind::ConfigInvalid`]: crate::error::ErrorKind::ConfigInvalid
    pub fn new(epsilon: f64, n: u64) -> Result<Self, Error> {
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(Error::config_invalid("epsilon must be in (0, 1)")
                .with_context("epsilon", epsilon));
        }
        if n == 0 {
            return Err(Error::config_invalid("n must be positive").with_context("n", n));
        }

        let block_size = block_size(epsilon, n)?;
        debug!(epsilon, n, block_size, "created quantile stream");
        Ok(Self {
            epsilon,
            expected_n: n,
            block_size,
            n: 0,
            levels: vec![Summary::new()],
            finished: false,
        })
    }

    /// Returns the configured rank error fraction.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the configured number of expected observations.
    pub fn expected_n(&self) -> u64 {
        self.expected_n
    }

    /// Returns the number of observations per compressed block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of observations accepted so far.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns true if no observation has been accepted.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns true once [`Stream::finish`] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the number of levels, including the raw buffer at level 0.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Returns the number of tuples held across all levels.
    pub fn num_retained(&self) -> usize {
        self.levels.iter().map(Summary::len).sum()
    }

    /// Returns the final summary, or `None` before [`Stream::finish`].
    pub fn summary(&self) -> Option<&Summary> {
        self.finished.then_some(&self.levels[0])
    }

    /// Adds one observation. NaN values are ignored.
    ///
    /// # Panics
    ///
    /// Panics if the stream has been finished.
    pub fn update(&mut self, value: f64) {
        assert!(!self.finished, "cannot update a finished stream");
        if value.is_nan() {
            return;
        }

        self.n += 1;
        self.levels[0].push(Tuple::observation(value));
        if self.levels[0].len() >= self.block_size {
            self.compress_block();
        }
    }

    /// Merges every level into a single summary. Calling it again does nothing.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }

        let mut merged = mem::take(&mut self.levels[0]);
        merged.sort_by_value();
        merged.merge_duplicate_values();
        for level in self.levels.drain(1..) {
            merged = merged.merge(&level);
        }
        self.levels[0] = merged;
        self.finished = true;
        debug!(
            n = self.n,
            retained = self.levels[0].len(),
            "finished quantile stream"
        );
    }

    /// Returns the approximate value at the given quantile fraction.
    ///
    /// Some occurrence of the answer has a rank within `epsilon * n()` of
    /// `floor(q * n())`. `q = 0.0` answers the minimum and
    /// `q = 1.0` the maximum. Returns `None` if the stream is empty or has
    /// not been finished.
    ///
    /// # Panics
    ///
    /// Panics if q is not in [0.0, 1.0].
    pub fn query(&self, q: f64) -> Option<f64> {
        assert!(
            (0.0..=1.0).contains(&q),
            "quantile must be in [0.0, 1.0], got {q}"
        );
        if !self.finished {
            return None;
        }
        self.levels[0].quantile(q, self.epsilon)
    }

    /// Folds another finished stream into this one, as if every observation
    /// of `other` had been added here.
    ///
    /// The merged stream keeps the larger of the two epsilons.
    ///
    /// # Panics
    ///
    /// Panics if either stream has not been finished.
    pub fn merge(&mut self, other: &Stream) {
        assert!(
            self.finished && other.finished,
            "both streams must be finished before merging"
        );

        self.levels[0] = self.levels[0].merge(&other.levels[0]);
        self.n += other.n;
        self.expected_n += other.expected_n;
        self.epsilon = self.epsilon.max(other.epsilon);
        debug!(
            n = self.n,
            retained = self.levels[0].len(),
            "merged quantile streams"
        );
    }

    fn prune_target(&self) -> usize {
        (self.block_size + 2) / 2 + 1
    }

    fn compress_block(&mut self) {
        let target = self.prune_target();
        let mut block = mem::take(&mut self.levels[0]);
        block.sort_by_value();
        block.merge_duplicate_values();
        let mut carry = block.prune(target, 0.0, 0);

        for level in 1..self.levels.len() {
            if self.levels[level].is_empty() {
                trace!(level, retained = carry.len(), "stored carry");
                self.levels[level] = carry;
                return;
            }
            let occupant = mem::take(&mut self.levels[level]);
            let level_epsilon = level as f64 / self.block_size as f64;
            carry = occupant.merge(&carry).prune(target, level_epsilon, level);
        }

        trace!(
            level = self.levels.len(),
            retained = carry.len(),
            "added level"
        );
        self.levels.push(carry);
    }
}

/// Computes `floor(ln(epsilon * n) / epsilon)`, raised to at least
/// `ceil(e / epsilon)`.
///
/// Every stream with `epsilon * n < e` therefore fits in one exact block.
fn block_size(epsilon: f64, n: u64) -> Result<usize, Error> {
    let raw = ((epsilon * n as f64).ln() / epsilon).floor();
    if raw.is_nan() || raw < 0.0 {
        return Err(Error::config_invalid("epsilon too accurate for n")
            .with_context("epsilon", epsilon)
            .with_context("n", n));
    }
    Ok(raw.max((E / epsilon).ceil()) as usize)
}
