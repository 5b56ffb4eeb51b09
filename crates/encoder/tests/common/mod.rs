#![allow(dead_code)]

use candle_core::{Device, Result, Tensor};
use encoder::{
    AffineParams, EncoderConfig, EncoderLayerParams, LayerNormParams, NormParams, ProjectionParams,
};

/// Ones on the wrapped diagonal (`i % cols == j % rows`), scaled.
pub fn identity_like(rows: usize, cols: usize, scale: f64) -> Result<Tensor> {
    let data = (0..rows * cols)
        .map(|idx| {
            let (i, j) = (idx / cols, idx % cols);
            if i % cols == j % rows {
                scale
            } else {
                0.0
            }
        })
        .collect::<Vec<_>>();
    Tensor::from_vec(data, (rows, cols), &Device::Cpu)
}

/// Deterministic pseudo-random values in roughly `[-amplitude, amplitude]`.
pub fn ramp(rows: usize, cols: usize, seed: usize, amplitude: f64) -> Result<Tensor> {
    let data = (0..rows * cols)
        .map(|idx| (((idx + seed) * 7919) % 23) as f64 / 11.0 - 1.0)
        .map(|v| v * amplitude)
        .collect::<Vec<_>>();
    Tensor::from_vec(data, (rows, cols), &Device::Cpu)
}

pub fn zeros(rows: usize, cols: usize) -> Result<Tensor> {
    Tensor::zeros((rows, cols), candle_core::DType::F64, &Device::Cpu)
}

pub fn ones(rows: usize, cols: usize) -> Result<Tensor> {
    Tensor::ones((rows, cols), candle_core::DType::F64, &Device::Cpu)
}

fn unit_norm(hidden: usize) -> Result<NormParams> {
    Ok(NormParams::new(ones(1, hidden)?, zeros(1, hidden)?))
}

/// Identity-like weights, zero biases, `gamma = 1`, `beta = 0`.
pub fn identity_params(config: &EncoderConfig, ffn_scale: f64) -> Result<EncoderLayerParams> {
    let (d, i) = (config.hidden_size, config.intermediate_size);
    let square = || -> Result<AffineParams> {
        Ok(AffineParams::new(identity_like(d, d, 1.0)?, zeros(1, d)?))
    };
    Ok(EncoderLayerParams {
        projections: ProjectionParams {
            query: square()?,
            key: square()?,
            value: square()?,
            attention_output: square()?,
            intermediate: AffineParams::new(identity_like(d, i, ffn_scale)?, zeros(1, i)?),
            output: AffineParams::new(identity_like(i, d, 1.0)?, zeros(1, d)?),
        },
        layer_norms: LayerNormParams {
            attention: unit_norm(d)?,
            ffn: unit_norm(d)?,
        },
    })
}

/// Dense non-trivial weights and biases with unit LayerNorm affines.
pub fn ramp_params(config: &EncoderConfig) -> Result<EncoderLayerParams> {
    let (d, i) = (config.hidden_size, config.intermediate_size);
    let affine = |rows: usize, cols: usize, seed: usize| -> Result<AffineParams> {
        Ok(AffineParams::new(
            ramp(rows, cols, seed, 0.4)?,
            ramp(1, cols, seed + 3, 0.05)?,
        ))
    };
    Ok(EncoderLayerParams {
        projections: ProjectionParams {
            query: affine(d, d, 1)?,
            key: affine(d, d, 2)?,
            value: affine(d, d, 3)?,
            attention_output: affine(d, d, 4)?,
            intermediate: affine(d, i, 5)?,
            output: affine(i, d, 6)?,
        },
        layer_norms: LayerNormParams {
            attention: unit_norm(d)?,
            ffn: unit_norm(d)?,
        },
    })
}

pub fn hidden_states(config: &EncoderConfig, batch: usize, amplitude: f64) -> Result<Tensor> {
    ramp(batch, config.token_width(), 17, amplitude)
}
