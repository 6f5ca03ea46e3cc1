// Total computation: boundary cases the pricing rules must hold at, plus
// property checks over randomly generated carts.

use billcycle::modules::invoices::models::{Invoice, LineItem, TaxLine};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn item(amount: Decimal, quantity: i32) -> LineItem {
    LineItem::new("Service".to_string(), amount, quantity).unwrap()
}

fn tax(rate: Decimal) -> TaxLine {
    TaxLine {
        name: "Tax".to_string(),
        rate,
    }
}

#[test]
fn test_full_discount_zeroes_the_total() {
    let total = Invoice::compute_total(&[item(dec!(100), 2)], Some(dec!(100)), None, None);
    assert_eq!(total, dec!(0.00));
}

#[test]
fn test_multi_row_cart_discounts_the_summed_subtotal() {
    // (19.99 × 3 + 5.00) = 64.97, half off = 32.485, rounded away = 32.49
    let total = Invoice::compute_total(
        &[item(dec!(19.99), 3), item(dec!(5.00), 1)],
        Some(dec!(50)),
        None,
        None,
    );
    assert_eq!(total, dec!(32.49));
}

#[test]
fn test_zero_rate_tax_is_a_no_op() {
    let total = Invoice::compute_total(&[item(dec!(42.42), 1)], None, Some(&tax(dec!(0))), None);
    assert_eq!(total, dec!(42.42));
}

#[test]
fn test_new_invoice_rejects_discount_above_one_hundred() {
    let result = Invoice::new(
        1,
        1,
        "USD".to_string(),
        "en".to_string(),
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        None,
        vec![item(dec!(10), 1)],
        Some(dec!(101)),
        None,
        None,
        true,
        false,
        None,
        false,
        None,
    );
    assert!(result.is_err());
}

#[test]
fn test_new_invoice_rejects_negative_tax_rate() {
    let result = Invoice::new(
        1,
        1,
        "USD".to_string(),
        "en".to_string(),
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        None,
        vec![item(dec!(10), 1)],
        None,
        Some(tax(dec!(-5))),
        None,
        true,
        false,
        None,
        false,
        None,
    );
    assert!(result.is_err());
}

#[test]
fn test_line_item_name_length_limit() {
    assert!(LineItem::new("x".repeat(255), dec!(1), 1).is_ok());
    assert!(LineItem::new("x".repeat(256), dec!(1), 1).is_err());
}

fn money() -> impl Strategy<Value = Decimal> {
    // Realistic unit prices: 0.00 to 10,000.00 in cents.
    (0i64..=1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn cart() -> impl Strategy<Value = Vec<LineItem>> {
    prop::collection::vec(
        (money(), 1i32..=50).prop_map(|(amount, quantity)| {
            LineItem::new("Service".to_string(), amount, quantity).unwrap()
        }),
        1..=8,
    )
}

fn percentage() -> impl Strategy<Value = Decimal> {
    (0i64..=100).prop_map(Decimal::from)
}

proptest! {
    #[test]
    fn prop_total_is_deterministic(items in cart(), discount in percentage(), rate in percentage()) {
        let first = Invoice::compute_total(&items, Some(discount), Some(&tax(rate)), None);
        let second = Invoice::compute_total(&items, Some(discount), Some(&tax(rate)), None);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_total_is_never_negative(items in cart(), discount in percentage()) {
        let total = Invoice::compute_total(&items, Some(discount), None, None);
        prop_assert!(total >= Decimal::ZERO);
    }

    #[test]
    fn prop_total_has_at_most_two_decimal_places(items in cart(), discount in percentage(), rate in percentage()) {
        let total = Invoice::compute_total(&items, Some(discount), Some(&tax(rate)), None);
        prop_assert!(total.scale() <= 2, "total {} has scale {}", total, total.scale());
    }

    #[test]
    fn prop_deeper_discount_never_raises_the_total(items in cart(), a in percentage(), b in percentage()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let with_lo = Invoice::compute_total(&items, Some(lo), None, None);
        let with_hi = Invoice::compute_total(&items, Some(hi), None, None);
        prop_assert!(with_hi <= with_lo);
    }

    #[test]
    fn prop_adding_tax_never_lowers_the_total(items in cart(), rate in percentage()) {
        let untaxed = Invoice::compute_total(&items, None, None, None);
        let taxed = Invoice::compute_total(&items, None, Some(&tax(rate)), None);
        prop_assert!(taxed >= untaxed);
    }
}
