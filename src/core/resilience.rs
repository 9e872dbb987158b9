use failsafe::{backoff, failure_policy, Config, StateMachine, Error};
use failsafe::futures::CircuitBreaker;
use std::time::Duration;
use crate::core::errors::OrchestratorError;

/// Circuit breaker guarding identity provider calls
///
/// Policy:
/// - 5 consecutive provider failures trigger OPEN state
/// - 5 seconds cool-down period before HALF-OPEN (retry)
pub type ProviderCircuitBreaker = StateMachine<
    failure_policy::ConsecutiveFailures<backoff::Constant>,
    ()
>;

/// Create a new standard circuit breaker instance
pub fn create_circuit_breaker() -> ProviderCircuitBreaker {
    Config::new()
        .failure_policy(failure_policy::consecutive_failures(
            5,
            backoff::constant(Duration::from_secs(5)),
        ))
        .build()
}

/// Execute an identity provider call within the circuit breaker
///
/// Only errors for which `OrchestratorError::is_upstream_failure` holds are
/// counted; a wrong password is not a provider outage. Errors pass through
/// unchanged, a rejected call becomes `OrchestratorError::Upstream`.
pub async fn execute_with_cb<F, Fut, T>(
    cb: &ProviderCircuitBreaker,
    operation: F,
) -> Result<T, OrchestratorError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, OrchestratorError>>,
{
    let is_failure = |e: &OrchestratorError| e.is_upstream_failure();
    match cb.call_with(is_failure, operation()).await {
        Ok(val) => Ok(val),
        Err(Error::Inner(e)) => Err(e),
        Err(Error::Rejected) => Err(OrchestratorError::Upstream(
            "Circuit breaker open: identity provider unavailable".to_string(),
        )),
    }
}
