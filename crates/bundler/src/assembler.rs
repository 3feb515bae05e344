//! Bundle assembly

use types::{Bundle, BundlerError, Result, SignedTransaction, TipAccount};

/// Packages pre-signed transactions into a bundle.
///
/// Pure: no network access, no re-signing, and the caller's order is kept
/// exactly as given.
pub struct BundleAssembler;

impl BundleAssembler {
    /// Package `transactions` in order, enforcing `1..=limit` entries and at
    /// most one designated tip transaction
    pub fn assemble(transactions: Vec<SignedTransaction>, limit: usize) -> Result<Bundle> {
        let bundle = Bundle::try_new(transactions, limit)?;

        let tips = bundle.transactions().iter().filter(|tx| tx.is_tip()).count();
        if tips > 1 {
            return Err(BundlerError::Configuration(format!(
                "bundle designates {} tip transactions, expected at most one",
                tips
            )));
        }

        tracing::debug!(tx_count = bundle.len(), limit, has_tip = tips == 1, "Assembled bundle");
        Ok(bundle)
    }

    /// Like [`assemble`](Self::assemble), and additionally require that the
    /// tip transaction pays an account from the relay's current set
    pub fn assemble_with_tips(
        transactions: Vec<SignedTransaction>,
        limit: usize,
        tip_accounts: &[TipAccount],
    ) -> Result<Bundle> {
        let bundle = Self::assemble(transactions, limit)?;

        let (position, account) = bundle
            .tip()
            .and_then(|(position, tx)| tx.tip_account().map(|account| (position, account)))
            .ok_or_else(|| BundlerError::Configuration("bundle has no tip transaction".to_string()))?;

        if !tip_accounts.contains(account) {
            return Err(BundlerError::Configuration(format!(
                "tip transaction at position {} pays {}, which is not a current tip account",
                position, account
            )));
        }

        tracing::debug!(tip_account = %account, position, "Tip transaction verified");
        Ok(bundle)
    }
}
