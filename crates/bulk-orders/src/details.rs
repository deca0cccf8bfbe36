//! Shipping and payment details with explicit partial-update patches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub address: String,
    pub method: String,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub instructions: Option<String>,
}

impl ShippingDetails {
    pub fn new(address: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            method: method.into(),
            tracking_number: None,
            estimated_delivery_date: None,
            actual_delivery_date: None,
            instructions: None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.address.trim().is_empty() {
            return Err(DomainError::validation("shipping address cannot be empty"));
        }
        if self.method.trim().is_empty() {
            return Err(DomainError::validation("shipping method cannot be empty"));
        }
        Ok(())
    }

    /// Shallow merge: every `Some` field in the patch replaces the current value.
    pub fn merged(&self, patch: &ShippingDetailsPatch) -> Result<ShippingDetails, DomainError> {
        let merged = ShippingDetails {
            address: patch.address.clone().unwrap_or_else(|| self.address.clone()),
            method: patch.method.clone().unwrap_or_else(|| self.method.clone()),
            tracking_number: patch.tracking_number.clone().or_else(|| self.tracking_number.clone()),
            estimated_delivery_date: patch.estimated_delivery_date.or(self.estimated_delivery_date),
            actual_delivery_date: patch.actual_delivery_date.or(self.actual_delivery_date),
            instructions: patch.instructions.clone().or_else(|| self.instructions.clone()),
        };
        merged.validate()?;
        Ok(merged)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetailsPatch {
    pub address: Option<String>,
    pub method: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub instructions: Option<String>,
}

impl ShippingDetailsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    /// Smallest currency unit.
    pub paid_amount: Option<u64>,
    pub paid_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetailsPatch {
    pub method: Option<String>,
    pub status: Option<String>,
    pub transaction_id: Option<String>,
    pub paid_amount: Option<u64>,
    pub paid_date: Option<DateTime<Utc>>,
}

impl PaymentDetailsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge onto the current details. The first patch must name `method` and `status`.
    pub fn merged_onto(&self, current: Option<&PaymentDetails>) -> Result<PaymentDetails, DomainError> {
        let merged = match current {
            Some(cur) => PaymentDetails {
                method: self.method.clone().unwrap_or_else(|| cur.method.clone()),
                status: self.status.clone().unwrap_or_else(|| cur.status.clone()),
                transaction_id: self.transaction_id.clone().or_else(|| cur.transaction_id.clone()),
                paid_amount: self.paid_amount.or(cur.paid_amount),
                paid_date: self.paid_date.or(cur.paid_date),
            },
            None => {
                let (Some(method), Some(status)) = (self.method.clone(), self.status.clone()) else {
                    return Err(DomainError::validation(
                        "payment method and status are required for the first payment update",
                    ));
                };
                PaymentDetails {
                    method,
                    status,
                    transaction_id: self.transaction_id.clone(),
                    paid_amount: self.paid_amount,
                    paid_date: self.paid_date,
                }
            }
        };

        if merged.method.trim().is_empty() || merged.status.trim().is_empty() {
            return Err(DomainError::validation("payment method and status cannot be empty"));
        }
        Ok(merged)
    }
}
