// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request Context
//!
//! Carries the caller's cancellation signal and deadline into every
//! persistence call made on its behalf. An in-flight call is abandoned as
//! soon as either fires.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Bound the two suspension points of each use case

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a persistence call was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interruption {
    #[error("operation cancelled by caller")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// A context with no deadline that is never cancelled by anyone else
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Tie this context to an external token (e.g. server shutdown)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Fails immediately if the context is already done
    pub fn check(&self) -> Result<(), Interruption> {
        if self.cancellation.is_cancelled() {
            return Err(Interruption::Cancelled);
        }
        if matches!(self.deadline, Some(d) if Instant::now() >= d) {
            return Err(Interruption::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `operation` to completion unless the context is cancelled or its
    /// deadline passes first. The operation future is dropped on interruption.
    pub async fn run<F, T>(&self, operation: F) -> Result<T, Interruption>
    where
        F: Future<Output = T>,
    {
        self.check()?;

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(Interruption::Cancelled),
            _ = wait_for(self.deadline) => Err(Interruption::DeadlineExceeded),
            output = operation => Ok(output),
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
