//! Ordered aggregation of check errors.

use super::{CheckError, Failure, Fatal};

/// Collects independent failures in encounter order.
///
/// Nested [`CheckError::Joined`] values are flattened on insertion, so a list never holds a
/// join directly. Fatal failures are never collected: [`ErrorList::absorb`] hands them back.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<CheckError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CheckError) {
        match error {
            CheckError::Joined(errors) => errors.into_iter().for_each(|e| self.push(e)),
            error => self.errors.push(error),
        }
    }

    /// Keeps the value of a successful outcome, records a check error, and returns a fatal one.
    pub fn absorb<T>(&mut self, outcome: Result<T, Failure>) -> Result<Option<T>, Fatal> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(Failure::Check(error)) => {
                self.push(error);
                Ok(None)
            }
            Err(Failure::Fatal(fatal)) => Err(fatal),
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_vec(self) -> Vec<CheckError> {
        self.errors
    }

    /// `None` when empty, the sole error when there is one, a join otherwise.
    pub fn into_error(mut self) -> Option<CheckError> {
        match self.errors.len() {
            0 => None,
            1 => self.errors.pop(),
            _ => Some(CheckError::Joined(self.errors)),
        }
    }

    /// Returns `value` if nothing was collected.
    pub fn finish<T>(self, value: T) -> Result<T, CheckError> {
        match self.into_error() {
            None => Ok(value),
            Some(error) => Err(error),
        }
    }
}
