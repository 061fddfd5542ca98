//! Deadline handling shared by the executors
//!
//! Every RPC the executors issue goes through [`with_deadline`], which bounds
//! the call with `tokio::time::timeout` and classifies the outcome. Expiry
//! drops (and thereby cancels) only the wrapped future.

use crate::error::{AdminError, ClusterError};
use std::future::Future;
use std::time::Duration;

/// Outcome of a deadline-bounded RPC that did not succeed
#[derive(Debug)]
pub enum CallError {
    /// The deadline elapsed before a response arrived
    Elapsed,
    /// The call completed with an error
    Failed(ClusterError),
}

impl CallError {
    /// True for a local deadline expiry or a timeout reported by the transport
    pub fn is_timeout(&self) -> bool {
        match self {
            CallError::Elapsed => true,
            CallError::Failed(e) => e.is_timeout(),
        }
    }

    /// Convert into the executor error for a single-shot call
    pub fn into_admin_error(self, operation: &'static str, deadline: Duration) -> AdminError {
        match self {
            CallError::Failed(e) if !e.is_timeout() => AdminError::RpcFailure {
                operation,
                reason: e.to_string(),
            },
            _ => AdminError::RpcTimeout {
                operation,
                timeout: deadline,
            },
        }
    }
}

/// Run `call` with an explicit deadline
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, ClusterError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CallError::Failed(e)),
        Err(_) => Err(CallError::Elapsed),
    }
}
