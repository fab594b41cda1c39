use crate::types::{Sample, TransformError, TransformResult};
use rand::RngCore;
use std::fmt;

/// A sample operator applied by [`Compose`](crate::core::Compose).
///
/// Operators are immutable once constructed: parameters are validated in the
/// constructor and every random quantity is drawn from `rng` on each call.
/// Each call consumes the whole sample (all acquisitions plus labels) and
/// returns the transformed sample, so spatial operators can keep images and
/// labels aligned.
pub trait Transform: Send + Sync + fmt::Debug {
    /// Operator name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Applies the operator to one sample
    fn apply(&self, sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample>;
}

/// Validate a gate probability.
pub(crate) fn check_prob(operator: &'static str, prob: f64) -> TransformResult<f64> {
    if !(0.0..=1.0).contains(&prob) {
        return Err(TransformError::config(
            operator,
            format!("prob should be between 0 and 1, got {}", prob),
        ));
    }
    Ok(prob)
}

/// Validate a two-element parameter coming from a free-form list.
pub(crate) fn check_pair<T: Copy + fmt::Debug>(
    operator: &'static str,
    name: &str,
    values: &[T],
) -> TransformResult<(T, T)> {
    match values {
        [a, b] => Ok((*a, *b)),
        _ => Err(TransformError::config(
            operator,
            format!("{} should include 2 elements, got {:?}", name, values),
        )),
    }
}

/// Validate a sampling rate in (0, 1].
pub(crate) fn check_rate(operator: &'static str, name: &str, rate: f64) -> TransformResult<f64> {
    if !(rate > 0.0 && rate <= 1.0) {
        return Err(TransformError::config(
            operator,
            format!("{} should be in (0, 1], got {}", name, rate),
        ));
    }
    Ok(rate)
}
