//! Administrative verification and availability workflows.

use crate::core::trust::TrustScoreEngine;
use crate::error::StoreError;
use crate::models::{Provider, ProviderId, VerificationStatus};
use crate::services::traits::{bounded, ProviderStore, VerificationSource};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Verification decision must be verified or rejected, got {0:?}")]
    InvalidDecision(VerificationStatus),

    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub provider: Provider,
    pub trust_refreshed: bool,
}

pub struct VerificationService {
    verification: Arc<dyn VerificationSource>,
    providers: Arc<dyn ProviderStore>,
    trust: Arc<TrustScoreEngine>,
    timeout: Duration,
}

impl VerificationService {
    pub fn new(
        verification: Arc<dyn VerificationSource>,
        providers: Arc<dyn ProviderStore>,
        trust: Arc<TrustScoreEngine>,
        timeout: Duration,
    ) -> Self {
        Self {
            verification,
            providers,
            trust,
            timeout,
        }
    }

    /// Apply an administrator decision and refresh trust
    ///
    /// `Verified` marks both documents verified and reactivates the provider.
    /// The decision stands even if the trust refresh fails.
    pub async fn apply_verification(
        &self,
        provider_id: ProviderId,
        decision: VerificationStatus,
    ) -> Result<VerificationOutcome, VerificationError> {
        if decision == VerificationStatus::Pending {
            return Err(VerificationError::InvalidDecision(decision));
        }

        bounded(
            self.timeout,
            "verification update",
            self.verification.set_verification(provider_id, decision),
        )
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => VerificationError::ProviderNotFound(provider_id),
            other => VerificationError::Store(other),
        })?;

        info!("Provider {} marked {:?}", provider_id, decision);

        let trust_refreshed = self.trust.refresh_after(provider_id, "verification").await;
        let provider = self.reload(provider_id).await?;

        Ok(VerificationOutcome {
            provider,
            trust_refreshed,
        })
    }

    /// Soft activate or deactivate a provider
    pub async fn set_active(
        &self,
        provider_id: ProviderId,
        active: bool,
    ) -> Result<Provider, VerificationError> {
        let found = bounded(
            self.timeout,
            "availability update",
            self.providers.set_active(provider_id, active),
        )
        .await?;

        if !found {
            return Err(VerificationError::ProviderNotFound(provider_id));
        }

        info!(
            "Provider {} {}",
            provider_id,
            if active { "activated" } else { "deactivated" }
        );

        self.reload(provider_id).await
    }

    async fn reload(&self, provider_id: ProviderId) -> Result<Provider, VerificationError> {
        bounded(self.timeout, "provider lookup", self.providers.provider(provider_id))
            .await?
            .ok_or(VerificationError::ProviderNotFound(provider_id))
    }
}
