//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ocprobe_telemetry::{Path, Sample, ValueError};

// Condition evaluated on every observation of a watch.
//
// Implementations must be pure: evaluating the same input twice yields the
// same result. `I` is a `Sample<T>` for single watches and a `Snapshot<T>`
// for batch watches.
pub trait Predicate<I: ?Sized>: Send + Sync + 'static {
    fn evaluate(&self, input: &I) -> Result<bool, PredicateError>;
}

// Adapter for predicates that can fail to evaluate.
#[derive(Clone, Copy, Debug)]
pub struct Fallible<F>(pub F);

// Error raised when a predicate can't be evaluated.
#[derive(Clone, Debug, PartialEq)]
pub enum PredicateError {
    // The observed value doesn't have the expected type.
    Decode { path: Path, error: ValueError },
    // The predicate rejected the observation as malformed.
    Malformed(String),
}

// ===== impl Predicate =====

impl<I, F> Predicate<I> for F
where
    I: ?Sized,
    F: Fn(&I) -> bool + Send + Sync + 'static,
{
    fn evaluate(&self, input: &I) -> Result<bool, PredicateError> {
        Ok((self)(input))
    }
}

impl<I, F> Predicate<I> for Fallible<F>
where
    I: ?Sized,
    F: Fn(&I) -> Result<bool, PredicateError> + Send + Sync + 'static,
{
    fn evaluate(&self, input: &I) -> Result<bool, PredicateError> {
        (self.0)(input)
    }
}

// ===== impl PredicateError =====

impl std::fmt::Display for PredicateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredicateError::Decode { path, .. } => {
                write!(f, "failed to decode sample at {path}")
            }
            PredicateError::Malformed(reason) => {
                write!(f, "malformed sample: {reason}")
            }
        }
    }
}

impl std::error::Error for PredicateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PredicateError::Decode { error, .. } => Some(error),
            PredicateError::Malformed(..) => None,
        }
    }
}

// ===== global functions =====

// Holds once the observable exists.
pub fn present<T>() -> impl Predicate<Sample<T>>
where
    T: 'static,
{
    |sample: &Sample<T>| sample.is_present()
}

// Holds once the observable no longer exists.
pub fn absent<T>() -> impl Predicate<Sample<T>>
where
    T: 'static,
{
    |sample: &Sample<T>| !sample.is_present()
}

// Holds once the observable is present and equal to `want`.
pub fn equals<T>(want: T) -> impl Predicate<Sample<T>>
where
    T: PartialEq + Send + Sync + 'static,
{
    move |sample: &Sample<T>| sample.value() == Some(&want)
}

// ===== unit tests =====
