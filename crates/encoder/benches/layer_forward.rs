use candle_core::{Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use encoder::{
    AffineParams, EncoderConfig, EncoderLayer, EncoderLayerParams, LayerNormParams, NormParams,
    ProjectionParams,
};
use layers::ActivationKind;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random(rng: &mut StdRng, rows: usize, cols: usize, scale: f64) -> Tensor {
    let data = (0..rows * cols)
        .map(|_| (rng.gen::<f64>() * 2.0 - 1.0) * scale)
        .collect::<Vec<_>>();
    Tensor::from_vec(data, (rows, cols), &Device::Cpu).expect("tensor")
}

fn affine(rng: &mut StdRng, rows: usize, cols: usize) -> AffineParams {
    let scale = (rows as f64).recip().sqrt();
    AffineParams::new(random(rng, rows, cols, scale), random(rng, 1, cols, 0.02))
}

fn unit_norm(hidden: usize) -> NormParams {
    let gamma = Tensor::from_vec(vec![1f64; hidden], (1, hidden), &Device::Cpu).expect("gamma");
    let beta = Tensor::from_vec(vec![0f64; hidden], (1, hidden), &Device::Cpu).expect("beta");
    NormParams::new(gamma, beta)
}

fn build_params(config: &EncoderConfig, rng: &mut StdRng) -> EncoderLayerParams {
    let (d, i) = (config.hidden_size, config.intermediate_size);
    EncoderLayerParams {
        projections: ProjectionParams {
            query: affine(rng, d, d),
            key: affine(rng, d, d),
            value: affine(rng, d, d),
            attention_output: affine(rng, d, d),
            intermediate: affine(rng, d, i),
            output: affine(rng, i, d),
        },
        layer_norms: LayerNormParams {
            attention: unit_norm(d),
            ffn: unit_norm(d),
        },
    }
}

fn bench_layer_forward(c: &mut Criterion) {
    let batch = 4usize;
    // (heads, head_dim, seq_len)
    let shapes = &[(2usize, 32usize, 32usize), (4, 32, 64), (8, 32, 128)];

    for (name, dropout) in [("eval", 0.0), ("train", 0.1)] {
        let mut group = c.benchmark_group(format!("encoder_layer/{name}"));
        for &(heads, head_dim, seq_len) in shapes {
            let hidden = heads * head_dim;
            let mut config =
                EncoderConfig::new(heads, head_dim, seq_len, 4 * hidden, ActivationKind::Gelu);
            config.attention_dropout = dropout;
            config.hidden_dropout = dropout;

            let mut rng = StdRng::seed_from_u64(0);
            let params = build_params(&config, &mut rng);
            let layer = EncoderLayer::new(config.clone(), &params).expect("layer");
            let input = random(&mut rng, batch, config.token_width(), 1.0);

            group.throughput(Throughput::Elements((batch * seq_len) as u64));
            group.bench_with_input(
                BenchmarkId::from_parameter(format!("h{heads}xd{head_dim}xt{seq_len}")),
                &(layer, input),
                |b, (layer, input)| {
                    let mut rng = StdRng::seed_from_u64(1);
                    b.iter(|| {
                        let out = layer
                            .forward(black_box(input), None, &mut rng)
                            .expect("forward");
                        black_box(out.hidden_states);
                    });
                },
            );
        }
        group.finish();
    }
}

criterion_group!(benches, bench_layer_forward);
criterion_main!(benches);
