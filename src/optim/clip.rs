//! Gradient stabilization utilities: global-norm clipping and centering.

use crate::Tensor;

/// Clip gradients by global norm.
///
/// Computes the global norm across all gradients and scales them down when
/// the norm exceeds `max_norm`, preserving the relative magnitudes between
/// parameters.
///
/// Returns the global norm before clipping.
pub fn clip_grad_norm(params: &mut [Tensor], max_norm: f32) -> f32 {
    let mut total_norm_sq = 0.0;
    for param in params.iter() {
        if let Some(grad) = param.grad() {
            total_norm_sq += grad.iter().map(|&g| g * g).sum::<f32>();
        }
    }

    let global_norm = total_norm_sq.sqrt();

    if global_norm > max_norm {
        let clip_coef = max_norm / global_norm;
        for param in params.iter_mut() {
            if let Some(grad) = param.grad_mut() {
                grad.mapv_inplace(|g| g * clip_coef);
            }
        }
    }

    global_norm
}

/// Subtract the mean from each gradient buffer.
///
/// A zero-mean gradient keeps the latent update from drifting the whole
/// noise vector in one direction, which the generator tends to answer with
/// off-manifold output.
pub fn center_grad(params: &mut [Tensor]) {
    for param in params.iter_mut() {
        if let Some(grad) = param.grad_mut() {
            if grad.is_empty() {
                continue;
            }
            let mean = grad.sum() / grad.len() as f32;
            grad.mapv_inplace(|g| g - mean);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_clip_grad_norm_no_clipping() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0, 2.0], true),
            Tensor::from_vec(vec![3.0], true),
        ];
        params[0].set_grad(arr1(&[0.1, 0.2]));
        params[1].set_grad(arr1(&[0.1]));

        // Global norm = sqrt(0.01 + 0.04 + 0.01) ≈ 0.245
        let global_norm = clip_grad_norm(&mut params, 1.0);
        assert_abs_diff_eq!(global_norm, 0.245, epsilon = 1e-3);

        assert_abs_diff_eq!(params[0].grad().unwrap()[0], 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(params[1].grad().unwrap()[0], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_grad_norm_with_clipping() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0, 2.0], true),
            Tensor::from_vec(vec![3.0], true),
        ];
        params[0].set_grad(arr1(&[3.0, 4.0]));
        params[1].set_grad(arr1(&[0.0]));

        // Global norm = sqrt(9 + 16) = 5
        let global_norm = clip_grad_norm(&mut params, 1.0);
        assert_abs_diff_eq!(global_norm, 5.0, epsilon = 1e-6);

        assert_abs_diff_eq!(params[0].grad().unwrap()[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].grad().unwrap()[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_preserves_relative_magnitudes() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0], true),
            Tensor::from_vec(vec![1.0], true),
        ];
        params[0].set_grad(arr1(&[10.0]));
        params[1].set_grad(arr1(&[5.0]));

        clip_grad_norm(&mut params, 1.0);

        let g0 = params[0].grad().unwrap()[0];
        let g1 = params[1].grad().unwrap()[0];
        assert_abs_diff_eq!(g0 / g1, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_clip_no_gradients() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], false)];
        let global_norm = clip_grad_norm(&mut params, 1.0);
        assert_abs_diff_eq!(global_norm, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_center_grad_zero_mean() {
        let mut params = vec![Tensor::from_vec(vec![0.0, 0.0, 0.0], true)];
        params[0].set_grad(arr1(&[1.0, 2.0, 3.0]));

        center_grad(&mut params);

        let g = params[0].grad().unwrap();
        assert_abs_diff_eq!(g.sum(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(g[0], -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(g[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_center_grad_preserves_differences() {
        let mut params = vec![Tensor::from_vec(vec![0.0, 0.0], true)];
        params[0].set_grad(arr1(&[4.0, 1.0]));

        center_grad(&mut params);

        let g = params[0].grad().unwrap();
        assert_abs_diff_eq!(g[0] - g[1], 3.0, epsilon = 1e-6);
    }
}
