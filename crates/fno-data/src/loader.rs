//! Mini-batch iteration over paired (input, target) tensors.

use fno_types::error::{FnoError, FnoResult};
use ndarray::{Array4, Array5, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

/// One mini-batch: inputs (B, W, H, T, T), targets (B, W, H, T).
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Array5<f64>,
    pub targets: Array4<f64>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.inputs.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowing batcher. Sample order is sequential unless [`shuffle`] is
/// called with a caller-owned RNG; the last batch may be partial.
///
/// [`shuffle`]: DataLoader::shuffle
pub struct DataLoader<'a> {
    inputs: &'a Array5<f64>,
    targets: &'a Array4<f64>,
    batch_size: usize,
    order: Vec<usize>,
}

impl<'a> DataLoader<'a> {
    pub fn new(
        inputs: &'a Array5<f64>,
        targets: &'a Array4<f64>,
        batch_size: usize,
    ) -> FnoResult<Self> {
        if batch_size == 0 {
            return Err(FnoError::ConfigError(
                "batch_size must be positive".to_string(),
            ));
        }
        let n = inputs.len_of(Axis(0));
        if targets.len_of(Axis(0)) != n {
            return Err(FnoError::ShapeMismatch(format!(
                "{n} inputs but {} targets",
                targets.len_of(Axis(0))
            )));
        }
        Ok(Self {
            inputs,
            targets,
            batch_size,
            order: (0..n).collect(),
        })
    }

    /// Permute the sample order for the next pass.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    pub fn n_samples(&self) -> usize {
        self.order.len()
    }

    /// Number of batches per pass, counting a trailing partial batch.
    pub fn n_batches(&self) -> usize {
        (self.order.len() + self.batch_size - 1) / self.batch_size
    }

    pub fn iter(&self) -> impl Iterator<Item = Batch> + '_ {
        self.order.chunks(self.batch_size).map(move |idx| Batch {
            inputs: self.inputs.select(Axis(0), idx),
            targets: self.targets.select(Axis(0), idx),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tensors(n: usize) -> (Array5<f64>, Array4<f64>) {
        let inputs = Array5::from_shape_fn((n, 2, 2, 3, 3), |(s, ..)| s as f64);
        let targets = Array4::from_shape_fn((n, 2, 2, 3), |(s, ..)| -(s as f64));
        (inputs, targets)
    }

    #[test]
    fn test_sequential_batches_keep_partial_tail() {
        let (x, y) = tensors(7);
        let loader = DataLoader::new(&x, &y, 3).unwrap();
        let sizes: Vec<usize> = loader.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(loader.n_batches(), 3);
        let last = loader.iter().last().unwrap();
        assert_eq!(last.inputs[[0, 0, 0, 0, 0]], 6.0);
    }

    #[test]
    fn test_shuffle_keeps_pairs_aligned() {
        let (x, y) = tensors(10);
        let mut loader = DataLoader::new(&x, &y, 4).unwrap();
        loader.shuffle(&mut StdRng::seed_from_u64(3));
        let mut seen = Vec::new();
        for batch in loader.iter() {
            for b in 0..batch.len() {
                let id = batch.inputs[[b, 1, 1, 2, 2]];
                assert_eq!(batch.targets[[b, 0, 1, 2]], -id);
                seen.push(id as usize);
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let (x, y) = tensors(12);
        let order = |seed: u64| {
            let mut loader = DataLoader::new(&x, &y, 12).unwrap();
            loader.shuffle(&mut StdRng::seed_from_u64(seed));
            let first: Vec<f64> = loader.iter().next().unwrap().targets.iter().copied().collect();
            first
        };
        assert_eq!(order(5), order(5));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let (x, _) = tensors(4);
        let (_, y) = tensors(5);
        assert!(DataLoader::new(&x, &y, 2).is_err());
        let (x, y) = tensors(4);
        assert!(DataLoader::new(&x, &y, 0).is_err());
    }
}
