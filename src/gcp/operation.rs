// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Handle for a submitted long-running operation

use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;

use super::error::ApiError;

/// A mutation that has been accepted by the remote service but has not
/// necessarily finished yet. `wait` blocks until the operation reports
/// success or failure.
pub struct PendingOperation<T> {
    name: String,
    completion: BoxFuture<'static, Result<T, ApiError>>,
}

impl<T: Send + 'static> PendingOperation<T> {
    pub fn new<F>(name: impl Into<String>, completion: F) -> Self
    where
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            completion: completion.boxed(),
        }
    }

    /// An operation that has already completed
    pub fn done(name: impl Into<String>, result: Result<T, ApiError>) -> Self {
        Self::new(name, future::ready(result))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn wait(self) -> Result<T, ApiError> {
        self.completion.await
    }

    /// Transform the successful result
    pub fn map<U, F>(self, f: F) -> PendingOperation<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        PendingOperation {
            name: self.name,
            completion: self.completion.map(|result| result.map(f)).boxed(),
        }
    }
}

impl<T> fmt::Debug for PendingOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
