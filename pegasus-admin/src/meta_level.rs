//! Meta function level control
//!
//! The level is owned by the meta server. This module only reads it or asks
//! for one atomic transition, and reports exactly what the server answered.
//! After a failed transition the level is unknown to the client and must be
//! re-read with [`MetaLevelController::get_level`].

use crate::config::AdminConfig;
use crate::error::AdminError;
use crate::handle::ClusterHandle;
use crate::metrics;
use crate::rpc::with_deadline;
use crate::types::{LevelTransition, MetaControlRequest, MetaControlResponse, MetaFunctionLevel};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const OPERATION: &str = "meta_control";

/// Reads and changes the cluster's meta function level
pub struct MetaLevelController {
    handle: Arc<dyn ClusterHandle>,
    call_timeout: Duration,
}

impl MetaLevelController {
    pub fn new(handle: Arc<dyn ClusterHandle>, call_timeout: Duration) -> Self {
        Self {
            handle,
            call_timeout,
        }
    }

    pub fn from_config(handle: Arc<dyn ClusterHandle>, config: &AdminConfig) -> Self {
        Self::new(handle, config.call_timeout())
    }

    /// Current level, read with a no-change request
    pub async fn get_level(&self) -> Result<MetaFunctionLevel, AdminError> {
        self.read_level()
            .await
            .inspect_err(|e| metrics::record_command_error("get_level", e.error_type()))
    }

    /// Validate `requested` and ask the meta server to switch to it.
    ///
    /// Unknown names fail with [`AdminError::InvalidLevel`] before any RPC.
    /// Once the request has gone out, every failure is reported as
    /// [`AdminError::LevelChangeFailed`]: the level may or may not have
    /// changed.
    pub async fn set_level(&self, requested: &str) -> Result<LevelTransition, AdminError> {
        self.change_level(requested)
            .await
            .inspect_err(|e| metrics::record_command_error("set_level", e.error_type()))
    }

    async fn read_level(&self) -> Result<MetaFunctionLevel, AdminError> {
        let response = self.call(MetaControlRequest::query()).await?;
        let level = decode_level(response.old_level)?;
        debug!(level = %level, "Read meta function level");
        Ok(level)
    }

    async fn change_level(&self, requested: &str) -> Result<LevelTransition, AdminError> {
        let target: MetaFunctionLevel = requested.parse()?;

        let transition = self.exchange(target).await.map_err(|source| {
            warn!(
                level = %target,
                error = %source,
                "Meta level change failed, current level is unknown until re-read"
            );
            AdminError::LevelChangeFailed {
                target,
                source: Box::new(source),
            }
        })?;

        if transition.new_level != target {
            warn!(
                requested = %target,
                reported = %transition.new_level,
                "Meta server reported a different level than requested"
            );
        }
        info!(
            "Meta function level changed from {} to {}",
            transition.old_level, transition.new_level
        );
        metrics::record_level_transition(
            transition.old_level.as_str(),
            transition.new_level.as_str(),
        );
        Ok(transition)
    }

    async fn exchange(&self, target: MetaFunctionLevel) -> Result<LevelTransition, AdminError> {
        let response = self.call(MetaControlRequest::transition(target)).await?;
        Ok(LevelTransition {
            old_level: decode_level(response.old_level)?,
            new_level: decode_level(response.new_level)?,
        })
    }

    async fn call(&self, request: MetaControlRequest) -> Result<MetaControlResponse, AdminError> {
        with_deadline(self.call_timeout, self.handle.meta_control(request))
            .await
            .map_err(|e| e.into_admin_error(OPERATION, self.call_timeout))
    }
}

fn decode_level(code: u32) -> Result<MetaFunctionLevel, AdminError> {
    MetaFunctionLevel::from_code(code).ok_or_else(|| AdminError::RpcFailure {
        operation: OPERATION,
        reason: format!("meta server reported unknown level code {}", code),
    })
}
