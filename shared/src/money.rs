//! Money calculation utilities using rust_decimal for precision
//!
//! Every monetary amount in the marketplace is a `Decimal` with exactly two
//! decimal places. Nothing in the request, storage or response path goes
//! through `f64`.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
pub const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest amount a `NUMERIC(10, 2)` column holds: 99,999,999.99
pub const MAX_MONEY: Decimal = Decimal::from_parts(0x540B_E3FF, 2, 0, false, 2);

/// Whether `amount` fits the stored money columns
pub fn fits_money_column(amount: Decimal) -> bool {
    amount.abs() <= MAX_MONEY
}

/// Round to 2 decimal places and fix the scale so `600` renders as `600.00`
pub fn to_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DECIMAL_PLACES);
    rounded
}

/// `price_per_unit * quantity`, rounded
pub fn line_total(price_per_unit: Decimal, quantity: i32) -> Decimal {
    to_money(price_per_unit * Decimal::from(quantity))
}

/// Whole units of currency (fraction dropped), as providers expect for STK pushes
pub fn whole_units(amount: Decimal) -> i64 {
    amount.trunc().to_i64().unwrap_or(0)
}

/// Compare two amounts within [`MONEY_TOLERANCE`]
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}
