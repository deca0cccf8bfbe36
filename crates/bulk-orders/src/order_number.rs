//! Month-scoped order numbers: `BLK<YY><MM><seq:04>`.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::DomainError;

pub const ORDER_NUMBER_TAG: &str = "BLK";
pub const MAX_SEQUENCE: u32 = 9999;

/// `BLK` + two-digit year + two-digit month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderNumberPrefix {
    year: u8,
    month: u8,
}

impl OrderNumberPrefix {
    pub fn for_date(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year().rem_euclid(100) as u8,
            month: at.month() as u8,
        }
    }

    pub fn year(&self) -> u8 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }
}

impl core::fmt::Display for OrderNumberPrefix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{ORDER_NUMBER_TAG}{:02}{:02}", self.year, self.month)
    }
}

/// A unique bulk order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber {
    prefix: OrderNumberPrefix,
    sequence: u32,
}

impl OrderNumber {
    pub fn new(prefix: OrderNumberPrefix, sequence: u32) -> Result<Self, DomainError> {
        if sequence == 0 {
            return Err(DomainError::validation("order sequence starts at 1"));
        }
        if sequence > MAX_SEQUENCE {
            return Err(DomainError::invariant(format!(
                "order number sequence exhausted for {prefix}"
            )));
        }
        Ok(Self { prefix, sequence })
    }

    pub fn prefix(&self) -> OrderNumberPrefix {
        self.prefix
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{:04}", self.prefix, self.sequence)
    }
}

impl core::str::FromStr for OrderNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("malformed order number '{s}'"));

        let rest = s.strip_prefix(ORDER_NUMBER_TAG).ok_or_else(invalid)?;
        if rest.len() != 8 || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: u8 = rest[0..2].parse().map_err(|_| invalid())?;
        let month: u8 = rest[2..4].parse().map_err(|_| invalid())?;
        let sequence: u32 = rest[4..8].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        OrderNumber::new(OrderNumberPrefix { year, month }, sequence)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.to_string()
    }
}
