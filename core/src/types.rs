//! Shared primitive types used across the entire pipeline.

/// A scoring period in YYYYMM form (e.g. 202406).
pub type Period = u32;

/// A stable client (merchant account) identifier.
pub type ClientId = String;

/// A merchant-chain identifier (parent of one or more clients).
pub type ChainId = String;

/// Step a YYYYMM period back by `months`, rolling over year boundaries.
pub fn months_back(period: Period, months: u32) -> Period {
    let year = (period / 100) as i64;
    let month = (period % 100) as i64;
    let total = year * 12 + (month - 1) - months as i64;
    let y = total.div_euclid(12);
    let m = total.rem_euclid(12) + 1;
    (y * 100 + m) as Period
}
