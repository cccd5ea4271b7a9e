//! Hard-threshold feed-forward network evolved by mutation only.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::lerp;

#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("network shape {0:?} needs at least two non-zero layer sizes")]
    InvalidShape(Vec<usize>),
    #[error("expected {expected} inputs, got {actual}")]
    InputSize { expected: usize, actual: usize },
    #[error("genome shape {found:?} does not match configured shape {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// One fully connected layer. `weights[input][output]`, `biases[output]`.
/// Sizes are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    inputs: Vec<f32>,
    outputs: Vec<f32>,
    weights: Vec<Vec<f32>>,
    biases: Vec<f32>,
}

impl Level {
    pub fn new(input_count: usize, output_count: usize, rng: &mut impl Rng) -> Self {
        let mut level = Self {
            inputs: vec![0.0; input_count],
            outputs: vec![0.0; output_count],
            weights: vec![vec![0.0; output_count]; input_count],
            biases: vec![0.0; output_count],
        };
        level.randomize(rng);
        level
    }

    fn randomize(&mut self, rng: &mut impl Rng) {
        for row in &mut self.weights {
            for w in row.iter_mut() {
                *w = rng.gen_range(-1.0..=1.0);
            }
        }
        for b in &mut self.biases {
            *b = rng.gen_range(-1.0..=1.0);
        }
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn weights(&self) -> &[Vec<f32>] {
        &self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    /// Each output fires 1 when its weighted input sum strictly exceeds its bias
    pub fn feed_forward(&mut self, inputs: &[f32]) -> Result<&[f32], NetworkError> {
        if inputs.len() != self.inputs.len() {
            return Err(NetworkError::InputSize {
                expected: self.inputs.len(),
                actual: inputs.len(),
            });
        }
        self.inputs.copy_from_slice(inputs);

        for (o, output) in self.outputs.iter_mut().enumerate() {
            let sum: f32 = self
                .inputs
                .iter()
                .zip(&self.weights)
                .map(|(input, row)| input * row[o])
                .sum();
            *output = if sum > self.biases[o] { 1.0 } else { 0.0 };
        }

        Ok(&self.outputs)
    }

    fn mutate(&mut self, rate: f32, rng: &mut impl Rng) {
        for b in &mut self.biases {
            *b = lerp(*b, rng.gen_range(-1.0..=1.0), rate);
        }
        for row in &mut self.weights {
            for w in row.iter_mut() {
                *w = lerp(*w, rng.gen_range(-1.0..=1.0), rate);
            }
        }
    }
}

/// Ordered stack of levels. `Clone` is a full deep copy; no storage is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetwork {
    levels: Vec<Level>,
}

impl NeuralNetwork {
    /// Builds a randomized network from layer sizes, e.g. `[7, 6, 4]`
    pub fn new(shape: &[usize], rng: &mut impl Rng) -> Result<Self, NetworkError> {
        if shape.len() < 2 || shape.contains(&0) {
            return Err(NetworkError::InvalidShape(shape.to_vec()));
        }
        let levels = shape
            .windows(2)
            .map(|pair| Level::new(pair[0], pair[1], rng))
            .collect();
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Layer sizes this network was built with
    pub fn shape(&self) -> Vec<usize> {
        let mut shape: Vec<usize> = self.levels.iter().map(Level::input_count).collect();
        if let Some(last) = self.levels.last() {
            shape.push(last.output_count());
        }
        shape
    }

    pub fn feed_forward(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        let mut signal = inputs.to_vec();
        for level in &mut self.levels {
            signal = level.feed_forward(&signal)?.to_vec();
        }
        Ok(signal)
    }

    /// Blends every weight and bias toward a fresh value in [-1, 1].
    /// `rate = 0` leaves the network untouched, `rate = 1` reinitializes it.
    pub fn mutate(&mut self, rate: f32, rng: &mut impl Rng) {
        for level in &mut self.levels {
            level.mutate(rate, rng);
        }
    }

    pub fn to_genome(&self) -> Genome {
        Genome(
            self.levels
                .iter()
                .map(|level| GenomeLevel {
                    weights: level.weights.clone(),
                    biases: level.biases.clone(),
                })
                .collect(),
        )
    }

    /// Rebuilds a network from a genome, rejecting any that does not match `expected_shape`
    pub fn from_genome(genome: &Genome, expected_shape: &[usize]) -> Result<Self, NetworkError> {
        let found = genome.shape();
        if found != expected_shape || !genome.is_rectangular() {
            return Err(NetworkError::ShapeMismatch {
                expected: expected_shape.to_vec(),
                found,
            });
        }

        let levels = genome
            .0
            .iter()
            .map(|gl| Level {
                inputs: vec![0.0; gl.weights.len()],
                outputs: vec![0.0; gl.biases.len()],
                weights: gl.weights.clone(),
                biases: gl.biases.clone(),
            })
            .collect();
        Ok(Self { levels })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeLevel {
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,
}

/// Persisted form of a network: `[{ "weights": [[..]], "biases": [..] }, ..]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome(pub Vec<GenomeLevel>);

impl Genome {
    /// Layer sizes implied by the genome, read from row counts and bias lengths
    pub fn shape(&self) -> Vec<usize> {
        let mut shape: Vec<usize> = self.0.iter().map(|gl| gl.weights.len()).collect();
        if let Some(last) = self.0.last() {
            shape.push(last.biases.len());
        }
        shape
    }

    /// Every weight row matches its level's output count and levels chain together
    fn is_rectangular(&self) -> bool {
        self.0.iter().enumerate().all(|(i, gl)| {
            let outputs = gl.biases.len();
            let chains = self
                .0
                .get(i + 1)
                .is_none_or(|next| next.weights.len() == outputs);
            chains && gl.weights.iter().all(|row| row.len() == outputs)
        })
    }
}
