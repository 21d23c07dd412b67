use bigdecimal::BigDecimal;

use crate::core::shared::utils::round_amount;
use crate::error::WorkflowError;
use crate::workflow::guards::{share_total, shares_balanced};
use crate::workflow::types::RevenueShare;

/// One officer's part of a recognized amount.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareSplit {
    pub officer_id: String,
    pub share_percent: BigDecimal,
    pub amount: BigDecimal,
}

/// `percent`% of `amount`, rounded to paise.
pub fn recognized_portion(amount: &BigDecimal, percent: u32) -> BigDecimal {
    round_amount(&(amount * &BigDecimal::from(percent) / BigDecimal::from(100)))
}

/// Splits `total` across the shares. Each part is rounded independently, so
/// the parts may differ from `total` by a few paise; nothing is redistributed.
pub fn split_by_shares(
    total: &BigDecimal,
    shares: &[RevenueShare],
    tolerance: &BigDecimal,
) -> Result<Vec<ShareSplit>, WorkflowError> {
    if shares.is_empty() {
        return Err(WorkflowError::InconsistentShare(
            "assignment has no revenue shares".to_string(),
        ));
    }
    let sum = share_total(shares.iter().map(|s| &s.share_percent));
    if !shares_balanced(&sum, tolerance) {
        return Err(WorkflowError::InconsistentShare(format!(
            "revenue shares total {}, expected 100",
            sum
        )));
    }
    Ok(shares
        .iter()
        .map(|share| ShareSplit {
            officer_id: share.officer_id.clone(),
            share_percent: share.share_percent.clone(),
            amount: round_amount(&(total * &share.share_percent / BigDecimal::from(100))),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn share(officer: &str, pct: &str) -> RevenueShare {
        RevenueShare {
            id: Uuid::new_v4(),
            assignment_id: Uuid::nil(),
            officer_id: officer.to_string(),
            share_percent: dec(pct),
            share_amount: dec("0"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_recognized_portions() {
        assert_eq!(recognized_portion(&dec("10000"), 80), dec("8000"));
        assert_eq!(recognized_portion(&dec("10000"), 20), dec("2000"));
        assert_eq!(recognized_portion(&dec("1234.56"), 80), dec("987.65"));
        assert_eq!(recognized_portion(&dec("0.625"), 20), dec("0.13"));
    }

    #[test]
    fn test_split_sixty_forty() {
        let shares = [share("A", "60"), share("B", "40")];
        let parts = split_by_shares(&dec("8000"), &shares, &dec("0.01")).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].amount, dec("4800"));
        assert_eq!(parts[1].amount, dec("3200"));
    }

    #[test]
    fn test_split_rounds_each_part() {
        let shares = [share("A", "33.33"), share("B", "33.33"), share("C", "33.34")];
        let parts = split_by_shares(&dec("100"), &shares, &dec("0.01")).unwrap();
        let amounts: Vec<_> = parts.iter().map(|p| p.amount.clone()).collect();
        assert_eq!(amounts, vec![dec("33.33"), dec("33.33"), dec("33.34")]);
    }

    #[test]
    fn test_split_rounds_half_paise_up() {
        let shares = [share("A", "62.5"), share("B", "37.5")];
        let parts = split_by_shares(&dec("0.20"), &shares, &dec("0.01")).unwrap();
        assert_eq!(parts[0].amount, dec("0.13"));
        assert_eq!(parts[1].amount, dec("0.08"));
    }

    #[test]
    fn test_split_rejects_unbalanced_or_empty() {
        let shares = [share("A", "60"), share("B", "30")];
        assert!(matches!(
            split_by_shares(&dec("8000"), &shares, &dec("0.01")),
            Err(WorkflowError::InconsistentShare(_))
        ));
        assert!(matches!(
            split_by_shares(&dec("8000"), &[], &dec("0.01")),
            Err(WorkflowError::InconsistentShare(_))
        ));
    }
}
