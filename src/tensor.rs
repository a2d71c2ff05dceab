//! Flat parameter tensor with an optional gradient buffer.
//!
//! The only trainable state in a run lives in these: the noise copies and
//! the class logits. Gradients are computed analytically by the loss
//! composer and driver, then consumed by the optimizer.

use ndarray::Array1;

/// A 1-D `f32` parameter with an optional gradient of the same length.
#[derive(Debug, Clone)]
pub struct Tensor {
    data: Array1<f32>,
    grad: Option<Array1<f32>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from a plain vector.
    #[must_use]
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self { data: Array1::from(data), grad: None, requires_grad }
    }

    /// Create a zero-filled tensor.
    #[must_use]
    pub fn zeros(len: usize, requires_grad: bool) -> Self {
        Self { data: Array1::zeros(len), grad: None, requires_grad }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the tensor holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether gradients should be tracked for this tensor.
    #[must_use]
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Read-only view of the values.
    #[must_use]
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Mutable view of the values.
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Current gradient, if one has been set since the last `zero_grad`.
    #[must_use]
    pub fn grad(&self) -> Option<&Array1<f32>> {
        self.grad.as_ref()
    }

    /// Mutable access to the gradient buffer.
    pub fn grad_mut(&mut self) -> Option<&mut Array1<f32>> {
        self.grad.as_mut()
    }

    /// Replace the gradient. No-op when `requires_grad` is false.
    ///
    /// # Panics
    /// Panics if the gradient length disagrees with the data length.
    pub fn set_grad(&mut self, grad: Array1<f32>) {
        if !self.requires_grad {
            return;
        }
        assert_eq!(grad.len(), self.data.len(), "gradient length must match data length");
        self.grad = Some(grad);
    }

    /// Add into the gradient buffer, allocating it on first use.
    pub fn accumulate_grad(&mut self, grad: &Array1<f32>) {
        if !self.requires_grad {
            return;
        }
        assert_eq!(grad.len(), self.data.len(), "gradient length must match data length");
        match &mut self.grad {
            Some(g) => *g += grad,
            None => self.grad = Some(grad.clone()),
        }
    }

    /// Drop the gradient buffer.
    pub fn zero_grad(&mut self) {
        self.grad = None;
    }

    /// Clamp every value into `[-bound, bound]` in place.
    pub fn clamp(&mut self, bound: f32) {
        self.data.mapv_inplace(|v| v.clamp(-bound, bound));
    }

    /// True when every value is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
