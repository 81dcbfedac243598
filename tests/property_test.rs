use order_sync::domain::event::CheckoutMetadata;
use order_sync::domain::money::MoneyAmount;
use order_sync::domain::review::{ReviewPolicy, classify};
use proptest::prelude::*;
use std::collections::HashMap;

proptest! {
    /// The large-order rule tracks the threshold exactly: flagged iff the
    /// total is strictly above it (with no items and no points in play).
    #[test]
    fn large_order_rule_matches_threshold(total in 0i64..1_000_000) {
        let policy = ReviewPolicy::default();
        let verdict = classify(MoneyAmount::new(total).unwrap(), 0, &[], &policy);
        prop_assert_eq!(verdict.requires_manual_review, total > policy.large_order_cents);
    }

    /// Raising the total of an already-large order never un-flags it.
    #[test]
    fn flag_is_monotonic_above_threshold(extra in 1i64..1_000_000) {
        let policy = ReviewPolicy::default();
        let base = policy.large_order_cents + 1;
        let verdict = classify(MoneyAmount::new(base + extra).unwrap(), 0, &[], &policy);
        prop_assert!(verdict.requires_manual_review);
    }

    /// Verdict fields always agree: review flag, status, and fulfillment
    /// move together.
    #[test]
    fn verdict_fields_are_consistent(total in 0i64..1_000_000, points in 0i64..10_000) {
        use order_sync::domain::order::{FulfillmentStatus, VerificationStatus};
        let verdict = classify(
            MoneyAmount::new(total).unwrap(),
            points,
            &[],
            &ReviewPolicy::default(),
        );
        if verdict.requires_manual_review {
            prop_assert!(!verdict.reasons.is_empty());
            prop_assert_eq!(verdict.verification_status, VerificationStatus::NeedsReview);
            prop_assert_eq!(verdict.fulfillment_status, FulfillmentStatus::Pending);
        } else {
            prop_assert!(verdict.reasons.is_empty());
            prop_assert_eq!(verdict.verification_status, VerificationStatus::Verified);
            prop_assert_eq!(verdict.fulfillment_status, FulfillmentStatus::Processing);
        }
    }

    /// Metadata parsing never fails, whatever strings the storefront wrote.
    #[test]
    fn metadata_parse_never_panics(
        user in ".*",
        used in ".*",
        earned in ".*",
    ) {
        let mut map = HashMap::new();
        map.insert("user_id".to_string(), user);
        map.insert("points_used".to_string(), used);
        map.insert("points_earned".to_string(), earned);
        let meta = CheckoutMetadata::from_map(&map);
        prop_assert!(meta.points_used >= 0);
        prop_assert!(meta.points_earned >= 0);
    }

    /// MoneyAmount rejects negatives and round-trips non-negatives.
    #[test]
    fn money_amount_roundtrip(v in any::<i64>()) {
        match MoneyAmount::new(v) {
            Ok(amount) => {
                prop_assert!(v >= 0);
                prop_assert_eq!(amount.cents(), v);
            }
            Err(_) => prop_assert!(v < 0),
        }
    }

    /// checked_sub never goes below zero.
    #[test]
    fn money_sub_never_negative(a in 0i64..i64::MAX, b in 0i64..i64::MAX) {
        let a = MoneyAmount::new(a).unwrap();
        let b = MoneyAmount::new(b).unwrap();
        match a.checked_sub(b) {
            Some(diff) => prop_assert!(diff.cents() >= 0),
            None => prop_assert!(b.cents() > a.cents()),
        }
    }
}
