//! Inverted dropout with caller-supplied randomness.
//!
//! Masks are sampled from the generator handed to [`Dropout::forward`], so the
//! caller decides how reproducible a forward pass is. Kept elements are scaled
//! by `1 / (1 - p)`. The sampled binary mask is returned alongside the output
//! because a backward pass must replay exactly the same pattern.

use candle_core::{DType, Device, Result, Tensor};
use rand::{Rng, RngCore};

use crate::checks;

/// Mask produced by a dropout site.
#[derive(Debug, Clone)]
pub enum DropoutMask {
    /// The site ran with probability zero; nothing was sampled.
    Disabled,
    /// Binary keep mask (`1.0` kept, `0.0` dropped) shaped like the input.
    Sampled(Tensor),
}

impl DropoutMask {
    pub fn is_sampled(&self) -> bool {
        matches!(self, DropoutMask::Sampled(_))
    }

    /// Returns the sampled mask, if any.
    pub fn tensor(&self) -> Option<&Tensor> {
        match self {
            DropoutMask::Disabled => None,
            DropoutMask::Sampled(mask) => Some(mask),
        }
    }

    /// Materialises the mask, using a `1 x 1` zero placeholder when disabled.
    pub fn to_tensor(&self, dtype: DType, device: &Device) -> Result<Tensor> {
        match self {
            DropoutMask::Disabled => Tensor::zeros((1, 1), dtype, device),
            DropoutMask::Sampled(mask) => Ok(mask.clone()),
        }
    }
}

/// Dropout site with a fixed drop probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    probability: f64,
}

impl Dropout {
    /// Builds a dropout site; `probability` must lie in `[0, 1)`.
    pub fn new(probability: f64) -> Result<Self> {
        checks::expect_probability("dropout", probability)?;
        Ok(Self { probability })
    }

    /// A site that never drops anything.
    pub fn disabled() -> Self {
        Self { probability: 0.0 }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn is_enabled(&self) -> bool {
        self.probability > 0.0
    }

    /// Applies dropout to `input`, drawing one uniform sample per element.
    ///
    /// With probability zero the input is returned unchanged and `rng` is not
    /// touched.
    pub fn forward(&self, input: &Tensor, rng: &mut dyn RngCore) -> Result<(Tensor, DropoutMask)> {
        if !self.is_enabled() {
            return Ok((input.clone(), DropoutMask::Disabled));
        }
        let keep = 1.0 - self.probability;
        let mask_data = (0..input.elem_count())
            .map(|_| if rng.gen::<f64>() < keep { 1.0 } else { 0.0 })
            .collect::<Vec<f64>>();
        let mask = Tensor::from_vec(mask_data, input.shape().clone(), input.device())?
            .to_dtype(input.dtype())?;
        log::debug!(
            "dropout p={} sampled mask {:?}",
            self.probability,
            input.dims()
        );
        let output = input.mul(&mask)?.affine(1.0 / keep, 0.0)?;
        Ok((output, DropoutMask::Sampled(mask)))
    }
}
