//! Admission controller: the four preflight gates, evaluated in order.
//! Each gate is a pure function over borrowed state so both the
//! singleton order path and the bulk-transaction shadow path share
//! identical logic.

use crate::book::OrderBook;
use crate::errors::ExchangeError;
use crate::ledger::Ledger;
use crate::models::{Contract, Side};

/// Gate 1: side/quantity/price shape and contract alignment.
pub fn check_shape(contract: &Contract, quantity: i64) -> Result<(), ExchangeError> {
    if quantity <= 0 {
        return Err(ExchangeError::BadRequest("quantity must be positive".into()));
    }
    if !contract.is_valid() {
        return Err(ExchangeError::BadRequest(
            "contract must be hour-aligned and exactly one hour wide".into(),
        ));
    }
    Ok(())
}

/// Gate 2: trading window `[delivery_start - 15d, delivery_start - 60s]`.
pub fn check_trading_window(contract: &Contract, now: i64) -> Result<(), ExchangeError> {
    const PRE_WINDOW_MS: i64 = 15 * 86_400_000;
    const CLOSE_BUFFER_MS: i64 = 60_000;

    let opens_at = contract.delivery_start - PRE_WINDOW_MS;
    let closes_at = contract.delivery_start - CLOSE_BUFFER_MS;

    if now < opens_at {
        return Err(ExchangeError::TooEarly);
    }
    if now > closes_at {
        return Err(ExchangeError::TooLate);
    }
    Ok(())
}

/// Gate 3: self-match prevention. Stricter than "no self-trade" — rejects
/// the whole incoming order if *any* crossable resting order on the
/// opposite side belongs to the submitter, even if a non-self crossable
/// order sits in front of it (the engine never reorders the book to route
/// around a self order).
pub fn check_self_match(book: &OrderBook, contract: &Contract, side: Side, price: i64, owner: &str) -> Result<(), ExchangeError> {
    if book.has_self_cross(contract, side.opposite(), side, price, owner) {
        return Err(ExchangeError::SelfMatch);
    }
    Ok(())
}

/// Gate 4: collateral. Only evaluated when the order is liability-increasing
/// (`signed_commitment < 0`): a buy at a positive price, or a sell at a
/// negative price.
pub fn check_collateral(ledger: &Ledger, book: &OrderBook, owner: &str, signed_commitment: i64) -> Result<(), ExchangeError> {
    if signed_commitment < 0 && !ledger.admits_commitment(owner, book, signed_commitment) {
        return Err(ExchangeError::InsufficientCollateral);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_rejects_nonpositive_quantity() {
        let c = Contract::new(0, Contract::HOUR_MS);
        assert!(check_shape(&c, 0).is_err());
        assert!(check_shape(&c, -1).is_err());
        assert!(check_shape(&c, 1).is_ok());
    }

    #[test]
    fn shape_rejects_misaligned_contract() {
        assert!(check_shape(&Contract::new(1, Contract::HOUR_MS + 1), 1).is_err());
        assert!(check_shape(&Contract::new(0, Contract::HOUR_MS - 1), 1).is_err());
        assert!(check_shape(&Contract::new(0, Contract::HOUR_MS + 1), 1).is_err());
    }

    #[test]
    fn trading_window_boundaries() {
        let c = Contract::new(100 * Contract::HOUR_MS, 101 * Contract::HOUR_MS);
        let start = c.delivery_start;
        assert!(matches!(
            check_trading_window(&c, start - 16 * 86_400_000),
            Err(ExchangeError::TooEarly)
        ));
        assert!(matches!(
            check_trading_window(&c, start - 30_000),
            Err(ExchangeError::TooLate)
        ));
        assert!(check_trading_window(&c, start - 60_000).is_ok());
        assert!(check_trading_window(&c, start - 15 * 86_400_000).is_ok());
    }
}
