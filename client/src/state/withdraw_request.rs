use borsh::{BorshDeserialize, BorshSerialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WithdrawRequest {
    /// request shares of vault withdraw
    pub shares: u128,
    /// requested value (in vault spot_market_index) of shares for withdraw
    pub value: u64,
    /// request ts of vault withdraw
    pub ts: i64,
}

impl WithdrawRequest {
    pub fn is_pending(&self) -> bool {
        self.value != 0 || self.shares != 0
    }

    /// Unix time at which the request can be finalized.
    pub fn redeemable_at(&self, redeem_period: u64) -> i64 {
        self.ts.saturating_add(i64::try_from(redeem_period).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redeemable_after_period() {
        let request = WithdrawRequest {
            shares: 10,
            value: 5,
            ts: 1_700_000_000,
        };
        assert!(request.is_pending());
        assert_eq!(request.redeemable_at(86_400), 1_700_086_400);
        assert_eq!(request.redeemable_at(u64::MAX), i64::MAX);
        assert!(!WithdrawRequest::default().is_pending());
    }
}
