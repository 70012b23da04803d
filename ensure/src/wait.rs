use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use strato_provider::{LifecycleState, Provider, ProviderError, ResourceHandle, ResourceKind};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

#[derive(Error, Debug)]
pub enum WaitError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The resource never reached a terminal state within the deadline.
    /// The remote resource is left in whatever state the provider reports.
    #[error("{kind} {id} still pending after {timeout:?}")]
    Timeout {
        kind: ResourceKind,
        id: String,
        timeout: Duration,
    },

    #[error("{kind} {id} entered failed state")]
    Failed { kind: ResourceKind, id: String },
}

/// Poll a resource's status at a fixed interval until it is terminal.
///
/// Returns the handle refreshed to the available state. A resource that
/// settles into failure, or that is still pending once the overall deadline
/// passes, is surfaced as its own error; there is no backoff and no
/// abandonment of the remote resource beyond giving up on the wait.
pub async fn wait_until_available<P>(
    provider: &P,
    handle: &ResourceHandle,
    options: PollOptions,
) -> Result<ResourceHandle, WaitError>
where
    P: Provider + ?Sized,
{
    if handle.state == LifecycleState::Available {
        return Ok(handle.clone());
    }

    let start = Instant::now();
    loop {
        let state = provider.status(handle).await?;
        match state {
            LifecycleState::Available => {
                info!(kind = %handle.kind, id = %handle.id, "resource available");
                return Ok(handle.clone().with_state(state));
            }
            LifecycleState::Failed => {
                return Err(WaitError::Failed {
                    kind: handle.kind,
                    id: handle.id.clone(),
                });
            }
            LifecycleState::Pending => {
                if start.elapsed() > options.timeout {
                    return Err(WaitError::Timeout {
                        kind: handle.kind,
                        id: handle.id.clone(),
                        timeout: options.timeout,
                    });
                }
                debug!(kind = %handle.kind, id = %handle.id, "still pending");
            }
        }
        sleep(options.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strato_provider::{MemoryProvider, NatGatewaySpec, ResourceDescriptor, ResourceKey};

    fn short_poll() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(50),
        }
    }

    fn gateway_descriptor() -> ResourceDescriptor {
        ResourceDescriptor::NatGateway(NatGatewaySpec {
            subnet_id: "subnet-pub".to_owned(),
            allocation_id: "eipalloc-1".to_owned(),
        })
    }

    #[tokio::test]
    async fn pending_gateway_becomes_available() {
        let provider = MemoryProvider::new();
        let handle = provider
            .create(&ResourceKey::new("nat"), &gateway_descriptor())
            .await
            .unwrap();
        assert_eq!(handle.state, LifecycleState::Pending);

        let ready = wait_until_available(&provider, &handle, short_poll())
            .await
            .unwrap();
        assert_eq!(ready.state, LifecycleState::Available);
        assert_eq!(ready.id, handle.id);
    }

    #[tokio::test]
    async fn never_terminal_resource_times_out() {
        let provider = MemoryProvider::new();
        provider.hold_pending(ResourceKind::NatGateway);
        let handle = provider
            .create(&ResourceKey::new("nat"), &gateway_descriptor())
            .await
            .unwrap();

        let err = wait_until_available(&provider, &handle, short_poll())
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Timeout { .. }));
    }

    #[tokio::test]
    async fn failed_resource_is_not_a_timeout() {
        let provider = MemoryProvider::new();
        let handle = provider
            .create(&ResourceKey::new("nat"), &gateway_descriptor())
            .await
            .unwrap();
        provider.fail(&handle.id);

        let err = wait_until_available(&provider, &handle, short_poll())
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Failed { .. }));
    }

    #[tokio::test]
    async fn already_available_handle_returns_without_polling() {
        let provider = MemoryProvider::new();
        let handle = ResourceHandle::external(ResourceKind::Subnet, "subnet-1");
        // Unknown to the provider; polling would report NotFound.
        let ready = wait_until_available(&provider, &handle, short_poll())
            .await
            .unwrap();
        assert_eq!(ready.state, LifecycleState::Available);
    }
}
