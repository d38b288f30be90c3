use rust_decimal::Decimal;
use std::str::FromStr;

use cbs_core::Money;

/// Parse a statement money token: `$`/`,` stripped, with parenthesized
/// or suffixed-minus negatives (`(75.25)`, `75.25-`, `-75.25` all parse
/// to −75.25).
pub(crate) fn parse_signed_amount(token: &str) -> Option<Money> {
    let token = token.trim();
    let (parens, token) = match token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, token),
    };
    let (suffixed, token) = match token.strip_suffix('-') {
        Some(inner) => (true, inner),
        None => (false, token),
    };
    let cleaned = token.replace(['$', ','], "");
    let mut dec = Decimal::from_str(&cleaned).ok()?;
    if (parens || suffixed) && dec.is_sign_positive() {
        dec = -dec;
    }
    Some(Money::from_decimal(dec))
}
