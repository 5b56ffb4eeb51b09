//! Per-token layer normalisation over flattened token matrices.
//!
//! Inputs follow the `(batch, seq * hidden)` convention. Every token (a row of
//! the `(batch * seq, hidden)` view) is normalised over its `hidden` features
//! with the population variance, then rescaled by `gamma` and shifted by
//! `beta`. No running statistics exist: each call normalises with the
//! statistics of the tokens it was handed.
//!
//! The forward pass also returns a [`NormCache`] holding what a backward pass
//! needs to differentiate the normalisation exactly.

use candle_core::{DType, Device, Error, Result, Tensor};

use crate::checks;

/// Configuration shared by normalisation layers.
#[derive(Debug, Clone, PartialEq)]
pub struct NormConfig {
    /// Size of the hidden dimension being normalised.
    pub hidden_size: usize,
    /// Added to the variance before the square root.
    pub epsilon: f64,
}

impl NormConfig {
    /// Creates a configuration with the default epsilon.
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            epsilon: 1e-5,
        }
    }
}

/// Statistics saved by a normalisation call.
///
/// `mean` and `variance` are `(1, batch * seq)` rows, one scalar per token in
/// the row-major `(batch, seq)` order of the input. `normalized` holds the
/// value before the `gamma`/`beta` affine, in the `(batch, seq * hidden)`
/// layout of the input.
#[derive(Debug, Clone)]
pub struct NormCache {
    pub mean: Tensor,
    pub variance: Tensor,
    pub normalized: Tensor,
}

/// Output of a normalisation call together with its cache.
#[derive(Debug, Clone)]
pub struct NormOutput {
    pub output: Tensor,
    pub cache: NormCache,
}

/// Shared interface for normalisation layers used inside encoder blocks.
pub trait NormalizationLayer: Send + Sync {
    /// Returns the configuration so callers can check shape compatibility.
    fn config(&self) -> &NormConfig;

    /// Normalises every token of a `(batch, seq * hidden)` tensor.
    fn forward_tokens(&self, hidden: &Tensor, seq_len: usize) -> Result<NormOutput>;
}

/// LayerNorm with `(1, hidden)` scale and shift rows.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    config: NormConfig,
    gamma: Tensor,
    beta: Tensor,
}

impl LayerNorm {
    /// Constructs a LayerNorm from caller-owned scale and shift parameters.
    pub fn new(gamma: Tensor, beta: Tensor, config: NormConfig) -> Result<Self> {
        if !config.epsilon.is_finite() || config.epsilon <= 0.0 {
            return Err(Error::Msg(format!(
                "norm epsilon must be finite and positive, got {}",
                config.epsilon
            )));
        }
        checks::expect_row_vector("norm.gamma", &gamma, config.hidden_size)?;
        checks::expect_row_vector("norm.beta", &beta, config.hidden_size)?;
        checks::expect_same_dtype("norm.beta", &beta, "norm.gamma", &gamma)?;
        Ok(Self {
            config,
            gamma,
            beta,
        })
    }

    /// Constructs a LayerNorm with `gamma = 1` and `beta = 0`.
    pub fn without_affine(config: NormConfig, dtype: DType, device: &Device) -> Result<Self> {
        let gamma = Tensor::ones((1, config.hidden_size), dtype, device)?;
        let beta = Tensor::zeros((1, config.hidden_size), dtype, device)?;
        Self::new(gamma, beta, config)
    }

    pub fn gamma(&self) -> &Tensor {
        &self.gamma
    }

    pub fn beta(&self) -> &Tensor {
        &self.beta
    }
}

impl NormalizationLayer for LayerNorm {
    fn config(&self) -> &NormConfig {
        &self.config
    }

    fn forward_tokens(&self, hidden: &Tensor, seq_len: usize) -> Result<NormOutput> {
        let hidden_size = self.config.hidden_size;
        let batch = checks::expect_tokens("norm.input", hidden, seq_len, hidden_size)?;
        checks::expect_same_dtype("norm.input", hidden, "norm.gamma", &self.gamma)?;
        let tokens = batch * seq_len;

        let tokens_view = hidden.reshape((tokens, hidden_size))?;
        let mean = tokens_view.mean_keepdim(1)?;
        let centered = tokens_view.broadcast_sub(&mean)?;
        let variance = centered.sqr()?.mean_keepdim(1)?;
        let denom = variance.affine(1.0, self.config.epsilon)?.sqrt()?;
        let normalized = centered.broadcast_div(&denom)?;
        let output = normalized
            .broadcast_mul(&self.gamma)?
            .broadcast_add(&self.beta)?;

        let layout = (batch, seq_len * hidden_size);
        Ok(NormOutput {
            output: output.reshape(layout)?,
            cache: NormCache {
                mean: mean.reshape((1, tokens))?,
                variance: variance.reshape((1, tokens))?,
                normalized: normalized.reshape(layout)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_input(batch: usize, seq: usize, hidden: usize) -> Result<Tensor> {
        let data = (0..batch * seq * hidden)
            .map(|i| ((i * 7) % 11) as f64 * 0.25 - 1.5)
            .collect::<Vec<_>>();
        Tensor::from_vec(data, (batch, seq * hidden), &Device::Cpu)
    }

    fn row(values: &[f64]) -> Result<Tensor> {
        Tensor::from_vec(values.to_vec(), (1, values.len()), &Device::Cpu)
    }

    #[test]
    fn layer_norm_matches_reference() -> Result<()> {
        let (batch, seq, hidden) = (2, 3, 4);
        let gamma = [1.0, 0.5, -0.25, 1.5];
        let beta = [0.1, -0.2, 0.05, 0.0];
        let mut config = NormConfig::new(hidden);
        config.epsilon = 1e-6;
        let layer = LayerNorm::new(row(&gamma)?, row(&beta)?, config.clone())?;

        let input = build_input(batch, seq, hidden)?;
        let result = layer.forward_tokens(&input, seq)?;
        assert_eq!(result.output.dims(), input.dims());

        let values = input.flatten_all()?.to_vec1::<f64>()?;
        let output = result.output.flatten_all()?.to_vec1::<f64>()?;
        for (token, chunk) in values.chunks(hidden).enumerate() {
            let mean = chunk.iter().sum::<f64>() / hidden as f64;
            let var = chunk.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / hidden as f64;
            for (j, v) in chunk.iter().enumerate() {
                let expected = (v - mean) / (var + config.epsilon).sqrt() * gamma[j] + beta[j];
                let got = output[token * hidden + j];
                assert!((got - expected).abs() < 1e-12, "token {token} feature {j}");
            }
        }
        Ok(())
    }

    #[test]
    fn cache_is_token_ordered() -> Result<()> {
        let (batch, seq, hidden) = (2, 2, 3);
        let input = Tensor::from_vec(
            vec![
                1.0f64, 2.0, 3.0, // b0 t0
                0.0, 0.0, 6.0, // b0 t1
                -1.0, -1.0, -1.0, // b1 t0
                4.0, 8.0, 12.0, // b1 t1
            ],
            (batch, seq * hidden),
            &Device::Cpu,
        )?;
        let layer = LayerNorm::without_affine(NormConfig::new(hidden), DType::F64, &Device::Cpu)?;
        let cache = layer.forward_tokens(&input, seq)?.cache;

        assert_eq!(cache.mean.dims(), &[1, batch * seq]);
        assert_eq!(cache.variance.dims(), &[1, batch * seq]);
        assert_eq!(cache.normalized.dims(), &[batch, seq * hidden]);
        let mean = cache.mean.flatten_all()?.to_vec1::<f64>()?;
        for (got, want) in mean.iter().zip([2.0, 2.0, -1.0, 8.0].iter()) {
            assert!((got - want).abs() < 1e-12);
        }

        let variance = cache.variance.flatten_all()?.to_vec1::<f64>()?;
        let expected = [2.0 / 3.0, 8.0, 0.0, 32.0 / 3.0];
        for (got, want) in variance.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn normalized_tokens_have_zero_mean_unit_variance() -> Result<()> {
        let (batch, seq, hidden) = (3, 4, 8);
        let mut config = NormConfig::new(hidden);
        config.epsilon = 1e-12;
        let layer = LayerNorm::without_affine(config, DType::F64, &Device::Cpu)?;
        let input = build_input(batch, seq, hidden)?;
        let normalized = layer.forward_tokens(&input, seq)?.cache.normalized;

        let values = normalized.flatten_all()?.to_vec1::<f64>()?;
        for chunk in values.chunks(hidden) {
            let mean = chunk.iter().sum::<f64>() / hidden as f64;
            let var = chunk.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / hidden as f64;
            assert!(mean.abs() < 1e-9);
            assert!((var - 1.0).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn invalid_parameters_are_rejected() -> Result<()> {
        let mut config = NormConfig::new(4);
        config.epsilon = 0.0;
        assert!(LayerNorm::without_affine(config.clone(), DType::F64, &Device::Cpu).is_err());
        config.epsilon = f64::NAN;
        assert!(LayerNorm::without_affine(config, DType::F64, &Device::Cpu).is_err());

        let gamma = row(&[1.0, 1.0, 1.0])?;
        let beta = row(&[0.0, 0.0, 0.0, 0.0])?;
        assert!(LayerNorm::new(gamma, beta, NormConfig::new(4)).is_err());

        let layer = LayerNorm::without_affine(NormConfig::new(4), DType::F64, &Device::Cpu)?;
        assert_eq!(layer.gamma().to_vec2::<f64>()?, vec![vec![1.0; 4]]);
        assert_eq!(layer.beta().to_vec2::<f64>()?, vec![vec![0.0; 4]]);
        let input = Tensor::zeros((2, 10), DType::F64, &Device::Cpu)?;
        assert!(layer.forward_tokens(&input, 3).is_err());
        Ok(())
    }
}
