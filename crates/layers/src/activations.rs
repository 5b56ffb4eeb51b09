//! Activation catalogue for the encoder feed-forward sublayer.
//!
//! Activations consume token matrices shaped `(batch, seq * hidden)` and return
//! tensors with identical layout; every element is transformed independently.
//!
//! # Built-in formulas
//!
//! * **Tanh** is the hyperbolic tangent. For inputs near zero it behaves like
//!   the identity, which makes it handy for shape-level checks.
//! * **GELU** uses the tanh approximation
//!   `0.5 * x * (1 + tanh(sqrt(2 / pi) * (x + 0.044715 * x^3)))`.

use std::{fmt, str::FromStr, sync::Arc};

use candle_core::{Error, Result, Tensor};

/// Identifies which non-linearity is implemented by an [`Activation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    /// Hyperbolic tangent.
    Tanh,
    /// Gaussian error linear unit, tanh approximation.
    Gelu,
}

impl ActivationKind {
    /// Selector string accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationKind::Tanh => "tanh",
            ActivationKind::Gelu => "gelu",
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tanh" => Ok(ActivationKind::Tanh),
            "gelu" => Ok(ActivationKind::Gelu),
            other => Err(Error::Msg(format!(
                "unsupported activation '{other}', expected one of: tanh, gelu"
            ))),
        }
    }
}

/// Common interface shared by element-wise activation functions.
pub trait Activation: Send + Sync {
    /// Returns the [`ActivationKind`] for introspection when wiring composite blocks.
    fn kind(&self) -> ActivationKind;

    /// Applies the activation element-wise.
    fn forward(&self, input: &Tensor) -> Result<Tensor>;
}

/// Built-in activation backed by Candle kernels.
struct BuiltinActivation {
    kind: ActivationKind,
}

impl Activation for BuiltinActivation {
    fn kind(&self) -> ActivationKind {
        self.kind
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        match self.kind {
            ActivationKind::Tanh => input.tanh(),
            ActivationKind::Gelu => input.gelu(),
        }
    }
}

/// Returns a shared built-in activation implementation.
pub fn builtin(kind: ActivationKind) -> Arc<dyn Activation> {
    Arc::new(BuiltinActivation { kind })
}
