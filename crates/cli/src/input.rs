//! Reading pre-signed transactions from disk

use anyhow::{Context, Result};
use std::path::Path;
use types::{BundlerError, SignedTransaction, TipAccount, TxEncoding};

/// Read one encoded transaction per line. Blank lines and `#` comments are
/// skipped; `tip` marks the transaction at that index as the tip payment.
pub fn read_transactions(
    path: &Path,
    encoding: TxEncoding,
    tip: Option<(usize, TipAccount)>,
) -> Result<Vec<SignedTransaction>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transactions from {}", path.display()))?;
    Ok(parse_transactions(&contents, encoding, tip)?)
}

pub fn parse_transactions(
    contents: &str,
    encoding: TxEncoding,
    tip: Option<(usize, TipAccount)>,
) -> std::result::Result<Vec<SignedTransaction>, BundlerError> {
    let mut transactions = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(position, line)| {
            SignedTransaction::decode(line, encoding)
                .map_err(|message| BundlerError::InvalidTransaction { position, message })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if let Some((index, account)) = tip {
        let len = transactions.len();
        let slot = transactions.get_mut(index).ok_or_else(|| {
            BundlerError::Configuration(format!(
                "tip index {} is out of range for {} transactions",
                index, len
            ))
        })?;
        *slot = slot.clone().into_tip(account);
    }

    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TIP: &str = "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5";

    #[test]
    fn test_parse_skips_comments_and_marks_tip() {
        let contents = "# payload\nLdp\n\n2MJu\n";
        let txs = parse_transactions(contents, TxEncoding::Base58, Some((1, TIP.parse().unwrap()))).unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].bytes(), &[1, 2, 3]);
        assert!(!txs[0].is_tip());
        assert_eq!(txs[1].tip_account().map(|a| a.as_str()), Some(TIP));
    }

    #[test]
    fn test_invalid_line_reports_position() {
        let err = parse_transactions("Ldp\n0OIl\n", TxEncoding::Base58, None).unwrap_err();
        assert!(matches!(err, BundlerError::InvalidTransaction { position: 1, .. }));
    }

    #[test]
    fn test_tip_index_out_of_range() {
        let err = parse_transactions("Ldp\n", TxEncoding::Base58, Some((3, TIP.parse().unwrap()))).unwrap_err();
        assert!(matches!(err, BundlerError::Configuration(_)));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "AQID").unwrap();

        let txs = read_transactions(file.path(), TxEncoding::Base64, None).unwrap();
        assert_eq!(txs[0].bytes(), &[1, 2, 3]);
    }
}
