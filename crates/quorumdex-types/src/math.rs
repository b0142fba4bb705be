//! Integer quote-quantity arithmetic.
//!
//! All value arithmetic is integer-only; intermediate products widen to
//! `u128` and narrow back to `u64` after the final truncating division.
//! Because reserve, release, and settlement all go through the same
//! function, a reserve/release pair at the same price cancels exactly.

use crate::constants::ORDER_PRICE_DECIMALS;

/// `10^decimals` as a `u64`. Valid for `decimals <= 19`.
#[inline]
#[must_use]
pub const fn pow10(decimals: u8) -> u64 {
    10u64.pow(decimals as u32)
}

/// Convert a base-token quantity into the quote-token quantity at the
/// given price:
///
/// ```text
/// quote = (base · 10^quote_decimals · price) / (10^base_decimals · 10^ORDER_PRICE_DECIMALS)
/// ```
///
/// truncating toward zero. Returns `None` when the intermediate product
/// overflows `u128` or the result does not fit in `u64`; callers reject
/// the transaction in that case. Once a reservation at `(quant, price)`
/// has succeeded, any recomputation at a smaller quantity and an equal or
/// lower price cannot fail.
#[must_use]
pub fn calc_quote_quant(
    base_quant: u64,
    quote_decimals: u8,
    price: u64,
    base_decimals: u8,
) -> Option<u64> {
    let scaled = u128::from(base_quant) * u128::from(pow10(quote_decimals));
    let numerator = scaled.checked_mul(u128::from(price))?;
    let denominator = u128::from(pow10(base_decimals)) * u128::from(pow10(ORDER_PRICE_DECIMALS));
    u64::try_from(numerator / denominator).ok()
}
