//! Adam optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::Array1;

/// Adam optimizer with bias-corrected moment estimates.
///
/// Update rule:
///   m_t = β1 * m_{t-1} + (1 - β1) * g
///   v_t = β2 * v_{t-1} + (1 - β2) * g²
///   θ_t = θ_{t-1} - lr_t * m_t / (√v_t + ε)
/// where lr_t folds in the bias correction √(1-β2^t) / (1-β1^t).
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>, // First moment
    v: Vec<Option<Array1<f32>>>, // Second moment
}

impl Adam {
    /// Create a new Adam optimizer.
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self { lr, beta1, beta2, epsilon, t: 0, m: Vec::new(), v: Vec::new() }
    }

    /// Create Adam with the standard hyperparameters.
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    /// Optimizer step counter.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    fn ensure_moments(&mut self, n: usize) {
        if self.m.len() < n {
            self.m.resize(n, None);
            self.v.resize(n, None);
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_moments(params.len());
        self.t += 1;

        // Bias correction folded into the step size
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad().cloned() else { continue };

            let m_t = match &self.m[i] {
                Some(m) => m * self.beta1 + &grad * (1.0 - self.beta1),
                None => &grad * (1.0 - self.beta1),
            };

            let grad_sq = &grad * &grad;
            let v_t = match &self.v[i] {
                Some(v) => v * self.beta2 + &grad_sq * (1.0 - self.beta2),
                None => &grad_sq * (1.0 - self.beta2),
            };

            let update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
            *param.data_mut() -= &update;

            self.m[i] = Some(m_t);
            self.v[i] = Some(v_t);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
