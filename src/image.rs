//! In-memory image tensor.
//!
//! Images travel through the loop as CHW `f32` arrays in `[0, 1]`. File
//! encoding lives in the CLI layer; the core only produces these tensors.

use ndarray::Array3;

/// A square RGB image in CHW layout with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Array3<f32>,
}

impl Image {
    /// Wrap an existing CHW array.
    ///
    /// # Panics
    /// Panics unless the array has exactly 3 channels and square spatial dims.
    #[must_use]
    pub fn new(data: Array3<f32>) -> Self {
        let (c, h, w) = data.dim();
        assert_eq!(c, 3, "image must have 3 channels");
        assert_eq!(h, w, "image must be square");
        Self { data }
    }

    /// Zero-filled image of the given side length.
    #[must_use]
    pub fn zeros(size: usize) -> Self {
        Self { data: Array3::zeros((3, size, size)) }
    }

    /// Side length in pixels.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.dim().1
    }

    /// The underlying CHW array.
    #[must_use]
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Mutable access to the CHW array.
    pub fn data_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    /// True when every pixel is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Clamp all pixels into `[0, 1]` in place.
    pub fn clamp_unit(&mut self) {
        self.data.mapv_inplace(|v| v.clamp(0.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_shape() {
        let img = Image::zeros(8);
        assert_eq!(img.size(), 8);
        assert_eq!(img.data().dim(), (3, 8, 8));
    }

    #[test]
    #[should_panic(expected = "3 channels")]
    fn test_wrong_channel_count_panics() {
        Image::new(Array3::zeros((1, 8, 8)));
    }

    #[test]
    fn test_finiteness() {
        let mut img = Image::zeros(4);
        assert!(img.is_finite());
        img.data_mut()[[0, 0, 0]] = f32::INFINITY;
        assert!(!img.is_finite());
    }

    #[test]
    fn test_clamp_unit() {
        let mut img = Image::zeros(2);
        img.data_mut()[[0, 0, 0]] = 1.5;
        img.data_mut()[[1, 1, 1]] = -0.5;
        img.clamp_unit();
        assert_eq!(img.data()[[0, 0, 0]], 1.0);
        assert_eq!(img.data()[[1, 1, 1]], 0.0);
    }
}
