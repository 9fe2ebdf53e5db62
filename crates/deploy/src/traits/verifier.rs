//! Block-explorer source verification collaborator.

use std::future::Future;

use alloy_core::primitives::Address;
use serde_json::Value;

use crate::errors::VerificationError;

/// Registers a deployed contract's source with a block explorer.
///
/// Calling this for an address that is already verified must be harmless:
/// implementations either succeed or return
/// [`VerificationError::AlreadyVerified`].
pub trait Verifier: Send + Sync {
    fn verify(
        &self,
        contract: &str,
        address: Address,
        constructor_arguments: &[Value],
    ) -> impl Future<Output = Result<(), VerificationError>> + Send;
}
