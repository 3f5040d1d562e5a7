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

//! Example feeding per-batch training losses into a quantile stream

use fastquantile::gk::DEFAULT_EPSILON;
use fastquantile::gk::Stream;

const EPOCHS: usize = 20;
const BATCHES_PER_EPOCH: usize = 500;
const BATCH_SIZE: usize = 32;
const LEARNING_RATE: f64 = 0.1;

/// Seeded xorshift generator for reproducible inputs.
struct XorShift(u64);

impl XorShift {
    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn main() {
    println!("=== Loss Percentiles Example ===\n");

    let expected = (EPOCHS * BATCHES_PER_EPOCH) as u64;
    let mut losses = match Stream::new(DEFAULT_EPSILON, expected) {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!("invalid stream config: {err}");
            return;
        }
    };

    // Logistic regression on y = [2x - 1 > 0] with label noise.
    let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
    let (mut w, mut b) = (0.0f64, 0.0f64);
    for _ in 0..EPOCHS {
        for _ in 0..BATCHES_PER_EPOCH {
            let (mut grad_w, mut grad_b, mut loss) = (0.0, 0.0, 0.0);
            for _ in 0..BATCH_SIZE {
                let x = rng.next_f64() * 2.0 - 1.0;
                let mut y = if 2.0 * x - 1.0 > 0.0 { 1.0 } else { 0.0 };
                if rng.next_f64() < 0.05 {
                    y = 1.0 - y;
                }
                let p = sigmoid(w * x + b).clamp(1e-12, 1.0 - 1e-12);
                loss -= y * p.ln() + (1.0 - y) * (1.0 - p).ln();
                grad_w += (p - y) * x;
                grad_b += p - y;
            }
            let scale = BATCH_SIZE as f64;
            w -= LEARNING_RATE * grad_w / scale;
            b -= LEARNING_RATE * grad_b / scale;
            losses.update(loss / scale);
        }
    }
    losses.finish();

    println!("   Batches observed: {}", losses.n());
    println!("   Block size: {}", losses.block_size());
    println!("   Tuples retained: {}", losses.num_retained());
    println!("   Final weights: w = {w:.4}, b = {b:.4}");
    println!();

    println!("   Batch loss percentiles:");
    for (label, q) in [("p0", 0.0), ("p50", 0.5), ("p90", 0.9), ("p99", 0.99), ("p100", 1.0)] {
        if let Some(value) = losses.query(q) {
            println!("   {label:>5}: {value:.6}");
        }
    }
    println!();
}
