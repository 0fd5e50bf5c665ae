//! Activation functions for neurons.
//!
//! The set is closed: topology and activation are fixed for a whole run, so a
//! tagged enum covers every case without dynamic dispatch.

use serde::{Deserialize, Serialize};

/// Steepness of the logistic curve used by [`Activation::LogSigmoid`].
///
/// Inputs near 0 map close to 0.5 and the curve saturates towards 0/1 by
/// roughly `|x| = 0.5`.
pub const LOG_SIGMOID_STEEPNESS: f64 = 9.21024;

/// Activation function applied by a neuron to the sum of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    /// Steep logistic: f(x) = 1 / (1 + e^(-9.21024 x))
    #[default]
    LogSigmoid,
}

impl Activation {
    /// All available activation functions.
    pub const ALL: [Self; 1] = [Self::LogSigmoid];

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates. Infinite inputs saturate to the curve's limits.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }

        match self {
            Self::LogSigmoid => {
                if x == f64::INFINITY {
                    return 1.0;
                }
                if x == f64::NEG_INFINITY {
                    return 0.0;
                }
                // Must stay e^y (pow), not exp(y): saved weights were tuned against it.
                1.0 / (1.0 + std::f64::consts::E.powf(-LOG_SIGMOID_STEEPNESS * x))
            }
        }
    }

    /// Range of values this activation can produce.
    #[must_use]
    pub const fn output_range(self) -> (f64, f64) {
        match self {
            Self::LogSigmoid => (0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sigmoid_midpoint() {
        assert!((Activation::LogSigmoid.apply(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_log_sigmoid_saturates_quickly() {
        assert!(Activation::LogSigmoid.apply(0.5) > 0.99);
        assert!(Activation::LogSigmoid.apply(-0.5) < 0.01);
    }

    #[test]
    fn test_log_sigmoid_is_symmetric() {
        let up = Activation::LogSigmoid.apply(0.1);
        let down = Activation::LogSigmoid.apply(-0.1);
        assert!((up + down - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_sigmoid_extremes() {
        assert!((Activation::LogSigmoid.apply(f64::INFINITY) - 1.0).abs() < 1e-12);
        assert!(Activation::LogSigmoid.apply(f64::NEG_INFINITY).abs() < 1e-12);
        assert!(Activation::LogSigmoid.apply(-1e6).abs() < 1e-12);
        assert!(Activation::LogSigmoid.apply(f64::NAN).is_nan());
    }

    #[test]
    fn test_output_range_contains_outputs() {
        for activation in Activation::ALL {
            let (lo, hi) = activation.output_range();
            for x in [-5.0, -0.2, 0.0, 0.3, 5.0] {
                let y = activation.apply(x);
                assert!((lo..=hi).contains(&y), "{activation:?}({x}) = {y}");
            }
        }
    }
}
