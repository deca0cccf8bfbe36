//! Bulk discount tiers.
//!
//! Amounts are in the smallest currency unit (cents). Amount tiers take
//! precedence; quantity tiers are only consulted when no amount tier applies.

/// 10 000.00
pub const AMOUNT_TIER_LARGE: u64 = 1_000_000;
/// 5 000.00
pub const AMOUNT_TIER_MEDIUM: u64 = 500_000;
/// 1 000.00
pub const AMOUNT_TIER_SMALL: u64 = 100_000;

pub const QUANTITY_TIER_LARGE: u64 = 100;
pub const QUANTITY_TIER_MEDIUM: u64 = 50;
pub const QUANTITY_TIER_SMALL: u64 = 20;

/// Discount percentage for an order.
pub fn bulk_discount_percentage(total_amount: u64, total_quantity: u64) -> u8 {
    if total_amount >= AMOUNT_TIER_LARGE {
        return 15;
    }
    if total_amount >= AMOUNT_TIER_MEDIUM {
        return 10;
    }
    if total_amount >= AMOUNT_TIER_SMALL {
        return 5;
    }

    if total_quantity >= QUANTITY_TIER_LARGE {
        7
    } else if total_quantity >= QUANTITY_TIER_MEDIUM {
        5
    } else if total_quantity >= QUANTITY_TIER_SMALL {
        3
    } else {
        0
    }
}

/// `total × (1 − pct/100)`, rounded half-up to the nearest cent.
pub fn final_amount(total_amount: u64, discount_percentage: u8) -> u64 {
    let pct = u128::from(discount_percentage.min(100));
    let scaled = u128::from(total_amount) * (100 - pct) + 50;
    // Never larger than total_amount, so the narrowing cannot truncate.
    (scaled / 100) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dollars(d: u64) -> u64 {
        d * 100
    }

    #[test]
    fn amount_tiers_at_exact_boundaries() {
        assert_eq!(bulk_discount_percentage(dollars(10_000), 0), 15);
        assert_eq!(bulk_discount_percentage(dollars(10_000) - 1, 0), 10);
        assert_eq!(bulk_discount_percentage(dollars(9_999), 0), 10);
        assert_eq!(bulk_discount_percentage(dollars(5_000), 0), 10);
        assert_eq!(bulk_discount_percentage(dollars(5_000) - 1, 0), 5);
        assert_eq!(bulk_discount_percentage(dollars(1_000), 0), 5);
        assert_eq!(bulk_discount_percentage(dollars(1_000) - 1, 0), 0);
    }

    #[test]
    fn quantity_tiers_at_exact_boundaries() {
        assert_eq!(bulk_discount_percentage(dollars(500), 100), 7);
        assert_eq!(bulk_discount_percentage(dollars(500), 99), 5);
        assert_eq!(bulk_discount_percentage(dollars(500), 50), 5);
        assert_eq!(bulk_discount_percentage(dollars(500), 49), 3);
        assert_eq!(bulk_discount_percentage(dollars(500), 20), 3);
        assert_eq!(bulk_discount_percentage(dollars(500), 19), 0);
    }

    #[test]
    fn amount_tier_wins_over_larger_quantity_tier() {
        // 5% amount tier applies even though the quantity tier would give 7%.
        assert_eq!(bulk_discount_percentage(dollars(1_000), 500), 5);
    }

    #[test]
    fn final_amount_applies_percentage() {
        assert_eq!(final_amount(dollars(1_200), 5), dollars(1_140));
        assert_eq!(final_amount(dollars(10_000), 15), dollars(8_500));
        assert_eq!(final_amount(999, 0), 999);
        // 3% of 0.33 = 0.0099 -> 0.3201 rounds to 0.32
        assert_eq!(final_amount(33, 3), 32);
        // 5% of 0.10 = 0.005 -> 0.095 rounds half-up to 0.10
        assert_eq!(final_amount(10, 5), 10);
    }

    proptest! {
        #[test]
        fn discount_is_one_of_the_published_tiers(amount in 0u64..5_000_000, qty in 0u64..1_000) {
            let pct = bulk_discount_percentage(amount, qty);
            prop_assert!([0u8, 3, 5, 7, 10, 15].contains(&pct));
        }

        #[test]
        fn final_amount_never_exceeds_total(amount in 0u64..u64::MAX / 200, pct in 0u8..=100) {
            let fin = final_amount(amount, pct);
            prop_assert!(fin <= amount);
            if pct == 0 {
                prop_assert_eq!(fin, amount);
            }
        }
    }
}
