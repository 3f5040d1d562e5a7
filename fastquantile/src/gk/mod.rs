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

//! Streaming quantile estimation with a deterministic rank error bound.
//!
//! A [`Stream`] answers "which value sits at the q-th quantile of everything
//! seen so far?" in a single pass, keeping `O(b · log(εn))` tuples instead of
//! the `n` observations themselves. Every answer is a value whose true rank is
//! within `ε·n` of the requested rank.
//!
//! Observations are buffered into a level-0 block of `b` slots. A full block
//! is sorted and pruned to roughly `b/2` tuples, then carried upward through a
//! ladder of levels the way a binary counter carries a bit: an occupied level
//! is merged with the incoming summary, pruned again, cleared, and the result
//! moves on until it reaches a vacant level. Level `k` therefore summarizes
//! about `b · 2^k` observations with error at most `k/b`.
//!
//! Each retained [`Tuple`] stores a value together with `g`, the rank gap to
//! its predecessor, and `delta`, the extra uncertainty of its rank. The tuples
//! of a [`Summary`] are ordered by value, so the rank of the `i`-th tuple lies
//! in `[rmin, rmin + delta]` where `rmin` is the running sum of `g`.
//!
//! # References
//!
//! - Michael Greenwald, Sanjeev Khanna, "Space-Efficient Online Computation of
//!   Quantile Summaries", SIGMOD 2001.
//! - Michael Greenwald, Sanjeev Khanna, "Power-Conserving Computation of
//!   Order-Statistics over Sensor Networks", PODS 2004.
//! - Qi Zhang, Wei Wang, "An Efficient Algorithm for Approximate Biased
//!   Quantile Queries on Data Streams", ICDM 2007.
//!
//! # Usage
//!
//! ```rust
//! # use fastquantile::gk::Stream;
//! let mut stream = Stream::new(0.01, 1000).unwrap();
//! for i in 1..=1000 {
//!     stream.update(i as f64);
//! }
//! stream.finish();
//! let median = stream.query(0.5).unwrap();
//! assert!((490.0..=510.0).contains(&median));
//! ```
//!
//! Streams over disjoint partitions can be finished independently and then
//! merged:
//!
//! ```rust
//! # use fastquantile::gk::Stream;
//! let mut evens = Stream::new(0.01, 1000).unwrap();
//! let mut odds = Stream::new(0.01, 1000).unwrap();
//! for i in 0..500 {
//!     evens.update((2 * i) as f64);
//!     odds.update((2 * i + 1) as f64);
//! }
//! evens.finish();
//! odds.finish();
//! evens.merge(&odds);
//! assert_eq!(evens.n(), 1000);
//! assert_eq!(evens.query(0.0), Some(0.0));
//! assert_eq!(evens.query(1.0), Some(999.0));
//! ```

mod prune;
mod stream;
mod summary;

pub use self::stream::Stream;
pub use self::summary::Summary;
pub use self::summary::Tuple;

/// Default value of parameter epsilon.
pub const DEFAULT_EPSILON: f64 = 0.01;
