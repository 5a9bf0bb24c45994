//! Monetary amounts.
//!
//! Amounts are held as whole kopecks in an `i64`. On the wire they are ruble
//! numbers: whole rubles go out as integers, anything else as a two-decimal
//! float, and incoming floats are rounded to the nearest kopeck.
//! Arithmetic is checked; amounts come from the store and are not trusted to fit.

use core::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value_object::ValueObject;

/// An amount of money in kopecks (1/100 ruble). May be negative (e.g. a loss).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_kopecks(kopecks: i64) -> Self {
        Self(kopecks)
    }

    pub const fn from_rubles(rubles: i64) -> Self {
        Self(rubles * 100)
    }

    /// Whole rubles, or `None` when the amount does not fit in kopecks.
    pub fn checked_from_rubles(rubles: i64) -> Option<Money> {
        rubles.checked_mul(100).map(Money)
    }

    /// A ruble amount with a fractional part, rounded to the nearest kopeck.
    pub fn checked_from_rubles_f64(rubles: f64) -> Option<Money> {
        let kopecks = (rubles * 100.0).round();
        // i64::MAX is not representable as f64; the bound rounds up to 2^63.
        if !kopecks.is_finite() || kopecks < i64::MIN as f64 || kopecks >= i64::MAX as f64 {
            return None;
        }
        Some(Money(kopecks as i64))
    }

    pub const fn kopecks(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Price × quantity, or `None` on overflow.
    pub fn checked_times(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    /// Sum of `amounts`, or `None` as soon as the running total overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |total, amount| total.checked_add(amount))
    }
}

impl ValueObject for Money {}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.0 as f64 / 100.0)
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        deserializer.deserialize_any(RublesVisitor)
    }
}

struct RublesVisitor;

impl Visitor<'_> for RublesVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a ruble amount")
    }

    fn visit_i64<E: de::Error>(self, rubles: i64) -> Result<Money, E> {
        Money::checked_from_rubles(rubles)
            .ok_or_else(|| E::custom(format!("amount {rubles} is out of range")))
    }

    fn visit_u64<E: de::Error>(self, rubles: u64) -> Result<Money, E> {
        i64::try_from(rubles)
            .ok()
            .and_then(Money::checked_from_rubles)
            .ok_or_else(|| E::custom(format!("amount {rubles} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, rubles: f64) -> Result<Money, E> {
        Money::checked_from_rubles_f64(rubles)
            .ok_or_else(|| E::custom(format!("amount {rubles} is out of range")))
    }
}

/// Russian ruble formatting: space-grouped thousands, comma decimals, `₽` suffix.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let rubles = (abs / 100).to_string();
        let kopecks = abs % 100;

        let mut grouped = String::with_capacity(rubles.len() + rubles.len() / 3);
        for (i, ch) in rubles.chars().enumerate() {
            if i > 0 && (rubles.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{grouped},{kopecks:02} ₽")
    }
}
