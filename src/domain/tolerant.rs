//! Degrade-and-continue results for boundary calls.
//!
//! The chat must answer even when the store is briefly unavailable, so most
//! reads fall back to a safe default. [`Tolerant`] keeps that fallback
//! visible in the type instead of swallowing the error.

use std::fmt;

/// Outcome of a boundary call that never fails outright.
#[derive(Debug, Clone, PartialEq)]
pub enum Tolerant<T> {
    /// The call succeeded.
    Ok(T),
    /// The call failed; `value` is the fallback.
    Degraded {
        /// Fallback used in place of the real answer.
        value: T,
        /// Rendered cause of the failure.
        cause: String,
    },
}

impl<T> Tolerant<T> {
    /// Converts a `Result`, substituting `fallback` on error and logging the
    /// degradation under `context`.
    pub fn from_result<E: fmt::Display>(
        result: Result<T, E>,
        context: &'static str,
        fallback: impl FnOnce() -> T,
    ) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(err) => {
                let cause = err.to_string();
                tracing::warn!(context, %cause, "degraded to fallback value");
                Self::Degraded {
                    value: fallback(),
                    cause,
                }
            }
        }
    }

    /// Whether the fallback was used.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Borrows the value, real or fallback.
    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// Returns the value, real or fallback.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => value,
        }
    }
}

impl<T: Default, E: fmt::Display> From<(Result<T, E>, &'static str)> for Tolerant<T> {
    fn from((result, context): (Result<T, E>, &'static str)) -> Self {
        Self::from_result(result, context, T::default)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn ok_passes_through() {
        let t = Tolerant::from_result(Ok::<_, String>(3), "test", || 0);
        assert!(!t.is_degraded());
        assert_eq!(t.into_inner(), 3);
    }

    #[test]
    fn error_uses_fallback_and_keeps_cause() {
        let t = Tolerant::from_result(Err::<u32, _>("boom"), "test", || 7);
        assert!(t.is_degraded());
        assert_eq!(*t.value(), 7);
        let Tolerant::Degraded { cause, .. } = t else {
            panic!("expected a degraded value");
        };
        assert_eq!(cause, "boom");
    }

    #[test]
    fn default_conversion_uses_empty_value() {
        let t: Tolerant<Vec<u8>> = (Err::<Vec<u8>, _>("down"), "list").into();
        assert!(t.is_degraded());
        assert!(t.into_inner().is_empty());
    }
}
