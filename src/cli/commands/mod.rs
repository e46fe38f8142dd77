//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod apply;
pub mod audit;
pub mod init;
pub mod policy;
pub mod status;
pub mod validate;

use crate::anonymization::AnonymizationEngine;
use crate::audit::{build_signer, AuditChain, EntryCipher, SegmentStore};
use crate::config::ScrubConfig;
use crate::core::Orchestrator;
use crate::policy::PolicyStore;
use anyhow::Context;
use std::sync::Arc;

/// Builds the fully wired service from a loaded configuration
pub(crate) fn build_orchestrator(config: &ScrubConfig) -> anyhow::Result<Orchestrator> {
    let store = Arc::new(
        PolicyStore::open(&config.policy.store_path).context("Failed to open policy store")?,
    );

    let engine = AnonymizationEngine::new(
        config.engine.salt.clone(),
        config.engine.uid_root.clone(),
    )
    .context("Failed to build anonymization engine")?;

    let cipher = if config.audit.encryption.enabled {
        let key = config
            .audit
            .encryption
            .key
            .as_ref()
            .context("audit.encryption.key is required when encryption is enabled")?;
        Some(EntryCipher::from_hex_key(key).context("Invalid audit encryption key")?)
    } else {
        None
    };

    let segments = SegmentStore::new(&config.audit.log_dir, cipher)
        .context("Failed to open audit log directory")?;
    let signer = build_signer(&config.audit.signing.algorithm, &config.audit.signing.key)
        .context("Failed to build audit signer")?;
    let chain = Arc::new(
        AuditChain::open(segments, signer, (&config.audit.retry).into())
            .context("Failed to open audit chain")?,
    );

    Ok(Orchestrator::new(store, engine, chain)?)
}
