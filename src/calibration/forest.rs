//! Bagged CART regression trees over a single input feature.
//!
//! Each tree is grown on a bootstrap resample of the data. Splits minimise the
//! summed squared error of both children; thresholds sit halfway between
//! neighbouring distinct inputs. A tree stops growing at `max_depth`, when a
//! node is pure, or when no split leaves `min_samples_leaf` on both sides.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::CapacityTier;

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: f64) -> f64 {
        match self {
            Node::Leaf(v) => *v,
            Node::Split {
                threshold,
                left,
                right,
            } => {
                if x <= *threshold {
                    left.predict(x)
                } else {
                    right.predict(x)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    /// Grow a tree from `(x, y)` points. `points` must not be empty.
    pub fn fit(mut points: Vec<(f64, f64)>, max_depth: Option<usize>, min_samples_leaf: usize) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let root = grow(&points, 0, max_depth, min_samples_leaf.max(1));
        Self { root }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.root.predict(x)
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

/// `points` is sorted by x.
fn grow(points: &[(f64, f64)], depth: usize, max_depth: Option<usize>, min_leaf: usize) -> Node {
    let n = points.len();
    let mean = points.iter().map(|p| p.1).sum::<f64>() / n as f64;

    if max_depth.is_some_and(|d| depth >= d) || n < 2 * min_leaf {
        return Node::Leaf(mean);
    }

    let sse_total: f64 = points.iter().map(|p| (p.1 - mean).powi(2)).sum();
    if sse_total <= f64::EPSILON {
        return Node::Leaf(mean);
    }

    match best_split(points, min_leaf) {
        Some((idx, threshold)) => {
            let (l, r) = points.split_at(idx);
            Node::Split {
                threshold,
                left: Box::new(grow(l, depth + 1, max_depth, min_leaf)),
                right: Box::new(grow(r, depth + 1, max_depth, min_leaf)),
            }
        }
        None => Node::Leaf(mean),
    }
}

/// Returns `(left_len, threshold)` of the lowest-error split, if any split is allowed.
fn best_split(points: &[(f64, f64)], min_leaf: usize) -> Option<(usize, f64)> {
    let n = points.len();
    let total_sum: f64 = points.iter().map(|p| p.1).sum();
    let total_sq: f64 = points.iter().map(|p| p.1 * p.1).sum();

    let mut best: Option<(usize, f64, f64)> = None;
    let mut left_sum = 0.0;
    let mut left_sq = 0.0;

    for i in 0..n - 1 {
        left_sum += points[i].1;
        left_sq += points[i].1 * points[i].1;

        let left_len = i + 1;
        let right_len = n - left_len;
        if left_len < min_leaf || right_len < min_leaf {
            continue;
        }
        // Equal inputs cannot be separated by a threshold.
        if points[i].0 >= points[i + 1].0 {
            continue;
        }

        let right_sum = total_sum - left_sum;
        let right_sq = total_sq - left_sq;
        let sse = (left_sq - left_sum * left_sum / left_len as f64)
            + (right_sq - right_sum * right_sum / right_len as f64);

        if best.map_or(true, |(_, _, b)| sse < b) {
            let threshold = (points[i].0 + points[i + 1].0) / 2.0;
            best = Some((left_len, threshold, sse));
        }
    }

    best.map(|(idx, threshold, _)| (idx, threshold))
}

/// Ensemble of bootstrap-trained trees; prediction is the mean over trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit `tier.trees` trees. `x` and `y` must be non-empty and of equal length.
    pub fn fit(x: &[f64], y: &[f64], tier: &CapacityTier, seed: u64) -> Self {
        debug_assert_eq!(x.len(), y.len());
        debug_assert!(!x.is_empty());

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..tier.trees.max(1))
            .map(|_| {
                let sample: Vec<(f64, f64)> = (0..n)
                    .map(|_| {
                        let i = rng.random_range(0..n);
                        (x[i], y[i])
                    })
                    .collect();
                RegressionTree::fit(sample, tier.max_depth, tier.min_samples_leaf)
            })
            .collect();
        Self { trees }
    }

    pub fn predict(&self, x: f64) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        sum / self.trees.len() as f64
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(RegressionTree::depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(trees: usize, max_depth: Option<usize>, min_leaf: usize) -> CapacityTier {
        CapacityTier {
            min_samples: 0,
            trees,
            max_depth,
            min_samples_leaf: min_leaf,
        }
    }

    #[test]
    fn single_point_tree_is_constant() {
        let t = RegressionTree::fit(vec![(3.0, 7.0)], None, 1);
        assert_eq!(t.predict(0.0), 7.0);
        assert_eq!(t.predict(10.0), 7.0);
        assert_eq!(t.depth(), 0);
    }

    #[test]
    fn tree_separates_two_clusters() {
        let pts = vec![(1.0, 2.0), (1.5, 2.0), (8.0, 9.0), (8.5, 9.0)];
        let t = RegressionTree::fit(pts, Some(1), 1);
        assert_eq!(t.predict(1.2), 2.0);
        assert_eq!(t.predict(9.0), 9.0);
    }

    #[test]
    fn depth_limit_is_respected() {
        let pts: Vec<(f64, f64)> = (0..40).map(|i| (i as f64 / 4.0, (i % 7) as f64)).collect();
        let t = RegressionTree::fit(pts, Some(2), 1);
        assert!(t.depth() <= 2);
    }

    #[test]
    fn min_leaf_blocks_small_splits() {
        // Three points cannot be split into two leaves of at least two.
        let t = RegressionTree::fit(vec![(1.0, 0.0), (2.0, 5.0), (3.0, 10.0)], None, 2);
        assert_eq!(t.depth(), 0);
        assert!((t.predict(1.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn identical_inputs_never_split() {
        let t = RegressionTree::fit(vec![(4.0, 1.0), (4.0, 9.0), (4.0, 5.0)], None, 1);
        assert_eq!(t.depth(), 0);
    }

    #[test]
    fn forest_is_deterministic_for_a_seed() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 / 3.0).collect();
        let y: Vec<f64> = x.iter().map(|v| 10.0 - v).collect();
        let t = tier(30, Some(4), 2);
        let a = RandomForest::fit(&x, &y, &t, 42);
        let b = RandomForest::fit(&x, &y, &t, 42);
        for probe in [0.0, 2.5, 5.0, 7.5, 10.0] {
            assert_eq!(a.predict(probe), b.predict(probe));
        }
        assert_eq!(a.tree_count(), 30);
        assert!(a.max_tree_depth() <= 4);
    }

    #[test]
    fn forest_predictions_stay_within_target_range() {
        let x: Vec<f64> = (0..25).map(|i| (i % 11) as f64).collect();
        let y: Vec<f64> = (0..25).map(|i| ((i * 3) % 11) as f64).collect();
        let f = RandomForest::fit(&x, &y, &tier(10, None, 1), 7);
        for probe in [-5.0, 0.0, 3.3, 10.0, 20.0] {
            let p = f.predict(probe);
            assert!((0.0..=10.0).contains(&p), "prediction {p} out of range");
        }
    }
}
