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

use tracing::trace;

use super::summary::Summary;
use super::summary::locate_rank;

impl Summary {
    /// Compresses this summary to at most `target + 1` tuples.
    ///
    /// The first tuple is always kept. For each `i` in `1..=target` the tuple
    /// within `level_epsilon * size()` of rank `size() * i / target` is
    /// selected (or the closest one if none is), so the last tuple is kept as
    /// well. Selected tuples keep their rank bounds, which keeps `size()`
    /// unchanged.
    ///
    /// `level` only labels the trace event.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fastquantile::gk::Summary;
    /// let exact = Summary::from_values((1..=100).map(f64::from));
    /// let pruned = exact.prune(10, 0.0, 0);
    /// assert_eq!(pruned.len(), 11);
    /// assert_eq!(pruned.size(), 100);
    /// assert_eq!(pruned.max_value(), Some(100.0));
    /// ```
    pub fn prune(&self, target: usize, level_epsilon: f64, level: usize) -> Summary {
        if self.len() <= 1 || target == 0 {
            return self.clone();
        }

        let size = self.size();
        let eps_n = (level_epsilon * size as f64).floor() as u64;
        let steps = target as u64;
        let spans = self.spans();

        let mut selected = Vec::with_capacity(target + 1);
        selected.push(spans[0]);
        let mut last_index = 0;
        for step in 1..=steps {
            let rank = size * step / steps;
            let index = locate_rank(&spans, rank, eps_n, size, last_index);
            if index == last_index {
                continue;
            }
            selected.push(spans[index]);
            last_index = index;
        }

        trace!(
            level,
            target,
            before = self.len(),
            after = selected.len(),
            "pruned summary"
        );
        Summary::from_spans(selected)
    }
}
