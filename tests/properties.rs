use bigdecimal::{BigDecimal, Zero};
use payment_match_rust::ReconcileService;
use proptest::prelude::*;
use std::str::FromStr;

fn cents_to_text(cents: u32) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

fn invoice_text(cents: &[u32]) -> String {
    cents
        .iter()
        .map(|c| cents_to_text(*c))
        .collect::<Vec<_>>()
        .join("\n")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn paid_plus_credit_equals_payment(
        cents in prop::collection::vec(1u32..50_000, 1..10),
        payment in 1u32..200_000,
    ) {
        let payment_text = cents_to_text(payment);
        let result = ReconcileService::default()
            .reconcile(&invoice_text(&cents), &payment_text)
            .unwrap();

        let payment = BigDecimal::from_str(&payment_text).unwrap();
        let paid = result.oldest_first.total_paid();
        prop_assert_eq!(&paid + &result.oldest_first.remaining_credit, payment.clone());
        prop_assert!(paid <= payment);
        prop_assert!(result.oldest_first.remaining_credit >= BigDecimal::zero());
    }

    #[test]
    fn matches_are_within_tolerance_ranked_and_capped(
        cents in prop::collection::vec(1u32..2_000, 1..12),
        payment in 1u32..6_000,
    ) {
        let payment_text = cents_to_text(payment);
        let result = ReconcileService::default()
            .reconcile(&invoice_text(&cents), &payment_text)
            .unwrap();

        let payment = BigDecimal::from_str(&payment_text).unwrap();
        let tolerance = BigDecimal::from_str("0.01").unwrap();
        prop_assert!(result.matches.len() <= 5);

        for m in &result.matches {
            let sum = m.invoices.iter().fold(BigDecimal::zero(), |acc, inv| acc + &inv.amount);
            prop_assert_eq!(&sum, &m.total);
            prop_assert!((&sum - &payment).abs() <= tolerance);
        }

        for pair in result.matches.windows(2) {
            let ordered = pair[0].difference < pair[1].difference
                || (pair[0].difference == pair[1].difference
                    && pair[0].invoices.len() <= pair[1].invoices.len());
            prop_assert!(ordered);
        }
    }

    #[test]
    fn reconciliation_is_deterministic(
        cents in prop::collection::vec(1u32..500, 1..12),
        payment in 1u32..2_000,
    ) {
        let service = ReconcileService::default();
        let text = invoice_text(&cents);
        let payment_text = cents_to_text(payment);

        let first = service.reconcile(&text, &payment_text).unwrap();
        let second = service.reconcile(&text, &payment_text).unwrap();
        prop_assert_eq!(first, second);
    }
}
