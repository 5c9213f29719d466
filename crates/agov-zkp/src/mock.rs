//! # Mock Proving Backend
//!
//! A deterministic, transparent backend for development and testing.
//!
//! ## How It Works
//!
//! ```text
//! element[i] = H("agov.mock-proof.v1", u32_be(i), JCS(public_inputs))
//! ```
//!
//! `verify_bytes()` recomputes the elements from the public inputs and
//! compares. A proof therefore verifies only against the exact root,
//! nullifier hash, signal, and external nullifier it was produced for.
//!
//! ## Security Warning
//!
//! **NOT PRIVATE.** Anyone can produce a "proof" for any public inputs,
//! including a member that does not exist. The membership precondition is
//! enforced by the service before it calls `prove()`, not by this backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use agov_core::{bytes_to_hex, tagged_sha256, CanonicalBytes};
use async_trait::async_trait;

use crate::proof::{ProofWitness, PublicInputs, PROOF_ELEMENT_COUNT};
use crate::traits::{BackendError, ProvingBackend};

const MOCK_PROOF_TAG: &str = "agov.mock-proof.v1";

/// Deterministic SHA-256 backend.
#[derive(Debug, Default)]
pub struct MockProvingBackend {
    latency: Option<Duration>,
    offline: AtomicBool,
    prove_calls: AtomicU64,
    verify_calls: AtomicU64,
}

impl MockProvingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call, to exercise caller timeouts.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with `BackendError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn prove_calls(&self) -> u64 {
        self.prove_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> u64 {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// The elements a proof over `inputs` must carry.
    pub fn expected_elements(
        inputs: &PublicInputs,
    ) -> Result<[String; PROOF_ELEMENT_COUNT], BackendError> {
        let canonical = CanonicalBytes::new(inputs)
            .map_err(|e| BackendError::InvalidWitness(format!("public inputs: {e}")))?;
        Ok(std::array::from_fn(|i| {
            let index = (i as u32).to_be_bytes();
            bytes_to_hex(&tagged_sha256(
                MOCK_PROOF_TAG,
                &[&index, canonical.as_bytes()],
            ))
        }))
    }

    async fn simulate_call(&self) -> Result<(), BackendError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("mock backend offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProvingBackend for MockProvingBackend {
    fn name(&self) -> &str {
        "mock-sha256"
    }

    async fn prove(
        &self,
        witness: &ProofWitness<'_>,
    ) -> Result<[String; PROOF_ELEMENT_COUNT], BackendError> {
        self.prove_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;
        Self::expected_elements(&witness.public_inputs())
    }

    async fn verify_bytes(
        &self,
        proof_bytes: &[String],
        public_inputs: &PublicInputs,
    ) -> Result<bool, BackendError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;
        let expected = Self::expected_elements(public_inputs)?;
        if proof_bytes.len() != expected.len() {
            return Ok(false);
        }
        Ok(proof_bytes
            .iter()
            .zip(expected.iter())
            .all(|(got, want)| got.trim_start_matches("0x").eq_ignore_ascii_case(want)))
    }
}
