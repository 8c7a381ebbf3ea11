//! Money formatting over decimal arithmetic.
//!
//! Cart math is done on [`rust_decimal::Decimal`] end to end; rounding to
//! two places happens only here, at the display boundary.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format a decimal dollar amount for display (e.g., `$19.99`).
///
/// Uses midpoint-away-from-zero rounding so `$0.005` displays as `$0.01`,
/// matching what the order server shows on receipts.
#[must_use]
pub fn display_usd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${rounded:.2}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(display_usd(dec("19.99")), "$19.99");
        assert_eq!(display_usd(dec("5")), "$5.00");
        assert_eq!(display_usd(dec("0.5")), "$0.50");
    }

    #[test]
    fn test_display_rounds_midpoint_up() {
        assert_eq!(display_usd(dec("0.005")), "$0.01");
        assert_eq!(display_usd(dec("2.675")), "$2.68");
    }

    #[test]
    fn test_display_preserves_internal_precision() {
        // 3 * 1.333 = 3.999, displays as $4.00 but the input is untouched
        let amount = dec("1.333") * dec("3");
        assert_eq!(display_usd(amount), "$4.00");
        assert_eq!(amount, dec("3.999"));
    }
}
