// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configurable rerank double.

use async_trait::async_trait;

use mnemo_core::types::RetrievedRecord;
use mnemo_core::{MnemoError, RerankProvider};

/// How the mock behaves when called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankBehavior {
    /// Return candidates unchanged.
    Identity,
    /// Reverse the candidate order, making the rerank pass observable.
    Reverse,
    /// Report `available() == false`.
    Unavailable,
    /// Accept the call, then fail it.
    Fail,
}

pub struct MockRerankProvider {
    behavior: RerankBehavior,
}

impl MockRerankProvider {
    pub fn new(behavior: RerankBehavior) -> Self {
        Self { behavior }
    }
}

#[async_trait]
impl RerankProvider for MockRerankProvider {
    fn available(&self) -> bool {
        self.behavior != RerankBehavior::Unavailable
    }

    async fn rerank(
        &self,
        _query: &str,
        mut candidates: Vec<RetrievedRecord>,
    ) -> Result<Vec<RetrievedRecord>, MnemoError> {
        match self.behavior {
            RerankBehavior::Identity | RerankBehavior::Unavailable => Ok(candidates),
            RerankBehavior::Reverse => {
                candidates.reverse();
                Ok(candidates)
            }
            RerankBehavior::Fail => Err(MnemoError::Provider {
                message: "rerank simulated failure".to_string(),
                source: None,
            }),
        }
    }
}
