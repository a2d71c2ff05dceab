//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms over a flat parameter list.
pub trait Optimizer {
    /// Perform a single optimization step.
    fn step(&mut self, params: &mut [Tensor]);

    /// Zero out all gradients.
    fn zero_grad(&mut self, params: &mut [Tensor]) {
        for param in params {
            param.zero_grad();
        }
    }

    /// Get learning rate.
    fn lr(&self) -> f32;

    /// Set learning rate.
    fn set_lr(&mut self, lr: f32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    /// Minimal SGD used to exercise the default trait methods.
    struct TestOptimizer {
        learning_rate: f32,
    }

    impl Optimizer for TestOptimizer {
        fn step(&mut self, params: &mut [Tensor]) {
            for param in params {
                if let Some(grad) = param.grad().cloned() {
                    let data = param.data_mut();
                    for (d, g) in data.iter_mut().zip(grad.iter()) {
                        *d -= self.learning_rate * g;
                    }
                }
            }
        }

        fn lr(&self) -> f32 {
            self.learning_rate
        }

        fn set_lr(&mut self, lr: f32) {
            self.learning_rate = lr;
        }
    }

    #[test]
    fn test_default_zero_grad() {
        let mut opt = TestOptimizer { learning_rate: 0.1 };
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], true)];
        params[0].set_grad(arr1(&[0.5, 1.0]));

        assert!(params[0].grad().is_some());
        opt.zero_grad(&mut params);
        assert!(params[0].grad().is_none());
    }

    #[test]
    fn test_step_applies_update() {
        let mut opt = TestOptimizer { learning_rate: 0.1 };
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], true)];
        params[0].set_grad(arr1(&[0.5, 1.0]));

        opt.step(&mut params);
        assert!((params[0].data()[0] - 0.95).abs() < 1e-6);
        assert!((params[0].data()[1] - 1.9).abs() < 1e-6);
    }

    #[test]
    fn test_set_lr() {
        let mut opt = TestOptimizer { learning_rate: 0.1 };
        opt.set_lr(0.01);
        assert_eq!(opt.lr(), 0.01);
    }
}
