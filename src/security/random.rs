//! Random value generation for `random` markers

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%&*-_=+?";

/// Parameters of a generated random value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomSpec {
    pub min_length: usize,
    pub max_length: usize,
    pub upper_case: usize,
    pub numeric: usize,
    pub special: usize,
    /// Hand the generated plain value back to the caller after the save
    pub retain_on_insert: bool,
}

impl Default for RandomSpec {
    fn default() -> Self {
        Self {
            min_length: 10,
            max_length: 15,
            upper_case: 5,
            numeric: 3,
            special: 4,
            retain_on_insert: false,
        }
    }
}

impl RandomSpec {
    pub fn lengths(mut self, min: usize, max: usize) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn upper_case(mut self, count: usize) -> Self {
        self.upper_case = count;
        self
    }

    pub fn numeric(mut self, count: usize) -> Self {
        self.numeric = count;
        self
    }

    pub fn special(mut self, count: usize) -> Self {
        self.special = count;
        self
    }

    pub fn retain_on_insert(mut self, retain: bool) -> Self {
        self.retain_on_insert = retain;
        self
    }

    /// Inclusive length range actually used
    ///
    /// Both bounds are raised to the number of mandatory characters so the
    /// class counts always fit.
    pub fn length_bounds(&self) -> (usize, usize) {
        let required = self.upper_case + self.numeric + self.special;
        let min = self.min_length.min(self.max_length).max(required);
        let max = self.max_length.max(self.min_length).max(min);
        (min, max)
    }

    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let (min, max) = self.length_bounds();
        let length = rng.gen_range(min..=max);

        let mut chars = Vec::with_capacity(length);
        push_from(&mut chars, UPPER, self.upper_case, rng);
        push_from(&mut chars, DIGITS, self.numeric, rng);
        push_from(&mut chars, SPECIAL, self.special, rng);
        let filler = length - chars.len();
        push_from(&mut chars, LOWER, filler, rng);

        chars.shuffle(rng);
        chars.into_iter().map(char::from).collect()
    }
}

fn push_from<R: Rng + ?Sized>(out: &mut Vec<u8>, pool: &[u8], count: usize, rng: &mut R) {
    for _ in 0..count {
        out.push(pool[rng.gen_range(0..pool.len())]);
    }
}
