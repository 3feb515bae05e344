//! Tip account selection

use rand::seq::SliceRandom;
use relay_client::BundleRelay;
use std::sync::Arc;
use types::{BundlerError, RelayError, Result, TipAccount};

/// Picks the tip account a bundle pays into.
///
/// The relay's published set is fetched on every call; tip accounts rotate,
/// so nothing is cached between submissions.
#[derive(Clone)]
pub struct TipAccountSelector {
    relay: Arc<dyn BundleRelay>,
}

impl TipAccountSelector {
    pub fn new(relay: Arc<dyn BundleRelay>) -> Self {
        Self { relay }
    }

    /// Current tip account set, validated as public keys
    pub async fn fetch_tip_accounts(&self) -> Result<Vec<TipAccount>> {
        let raw = self.relay.get_tip_accounts().await?;
        if raw.is_empty() {
            tracing::error!(relay = %self.relay.name(), "Relay returned no tip accounts");
            return Err(BundlerError::EmptyTipAccountSet);
        }

        let accounts = raw
            .iter()
            .map(|address| {
                address.parse::<TipAccount>().map_err(|message| {
                    BundlerError::Transport(RelayError::InvalidResponse {
                        relay: self.relay.name().to_string(),
                        message,
                        raw: address.clone(),
                    })
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(relay = %self.relay.name(), count = accounts.len(), "Fetched tip accounts");
        Ok(accounts)
    }

    /// Fetch the current set and pick one account uniformly at random
    pub async fn select_tip_account(&self) -> Result<TipAccount> {
        let accounts = self.fetch_tip_accounts().await?;
        let account = choose_tip_account(&accounts)
            .cloned()
            .ok_or(BundlerError::EmptyTipAccountSet)?;

        tracing::info!(tip_account = %account, candidates = accounts.len(), "Selected tip account");
        Ok(account)
    }
}

/// Uniform pick from an already fetched set
pub fn choose_tip_account(accounts: &[TipAccount]) -> Option<&TipAccount> {
    accounts.choose(&mut rand::thread_rng())
}
