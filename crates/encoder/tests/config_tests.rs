use std::fs;

use anyhow::Result;
use encoder::{EncoderConfig, EncoderError};
use layers::ActivationKind;
use tempfile::tempdir;

#[test]
fn loads_toml_with_defaults() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("layer.toml");
    fs::write(
        &path,
        r#"
hidden_size = 8
num_heads = 2
head_dim = 4
seq_len = 6
intermediate_size = 32
hidden_dropout = 0.1
"#,
    )?;

    let config = EncoderConfig::from_path(&path)?;
    assert_eq!(config.activation_kind()?, ActivationKind::Gelu);
    assert_eq!(config.attention_dropout, 0.0);
    assert_eq!(config.ffn_dropout(), 0.1);
    assert_eq!(config.layer_norm_eps, 1e-5);
    Ok(())
}

#[test]
fn loads_json_matching_builder() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("layer.json");
    let expected = EncoderConfig::new(2, 2, 3, 8, ActivationKind::Tanh);
    fs::write(&path, serde_json::to_string_pretty(&expected)?)?;

    assert_eq!(EncoderConfig::from_path(&path)?, expected);
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("layer.yaml");
    fs::write(&path, "hidden_size: 4")?;
    let err = EncoderConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, EncoderError::ConfigFormat(_)), "{err}");
    Ok(())
}

#[test]
fn loaded_config_is_validated() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("layer.toml");
    fs::write(
        &path,
        r#"
hidden_size = 8
num_heads = 3
head_dim = 4
seq_len = 6
intermediate_size = 32
activation = "tanh"
"#,
    )?;
    let err = EncoderConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, EncoderError::DimensionMismatch(_)), "{err}");

    fs::write(&path, "hidden_size = \"eight\"")?;
    let err = EncoderConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, EncoderError::Toml(_)), "{err}");
    Ok(())
}

#[test]
fn overflowing_head_product_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("layer.toml");
    fs::write(
        &path,
        r#"
hidden_size = 8
num_heads = 8589934592
head_dim = 8589934592
seq_len = 6
intermediate_size = 32
"#,
    )?;
    let err = EncoderConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, EncoderError::DimensionMismatch(_)), "{err}");
    Ok(())
}
