//! Ingredient costing.
//!
//! Costs are always derived from the *current* inventory unit prices; a
//! recipe's stored `cost_per_serving` is never consulted.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use galley_core::{DomainError, DomainResult, InventoryItemId, ValidationErrors};

use crate::recipe::IngredientUse;

/// Fixed markup applied to the ingredient cost (50%).
pub const SUGGESTED_PRICE_MARKUP: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Total ingredient cost and the marked-up selling price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecipeCost {
    pub total_cost: Decimal,
    pub suggested_price: Decimal,
}

/// Price a list of ingredient uses.
///
/// `unit_price_of` returns the current unit price of an item, or `None` when
/// the item is unknown; unknown items are reported as `ingredients[i].id`.
/// Both figures are rounded to cents after the markup is applied. A line or
/// total too large for a `Decimal` is reported on `ingredients[i].quantity`.
pub fn compute_cost<F>(uses: &[IngredientUse], mut unit_price_of: F) -> DomainResult<RecipeCost>
where
    F: FnMut(InventoryItemId) -> Option<Decimal>,
{
    let mut errors = ValidationErrors::new();
    let mut total = Decimal::ZERO;

    for (idx, usage) in uses.iter().enumerate() {
        let Some(price) = unit_price_of(usage.inventory_item_id) else {
            errors.push(format!("ingredients[{idx}].id"), "does not reference an inventory item");
            continue;
        };
        match price.checked_mul(usage.quantity).and_then(|line| total.checked_add(line)) {
            Some(sum) => total = sum,
            None => errors.push(format!("ingredients[{idx}].quantity"), "is too large to price"),
        }
    }
    errors.into_result()?;

    let suggested = total
        .checked_mul(SUGGESTED_PRICE_MARKUP)
        .ok_or_else(|| DomainError::validation("ingredients", "total cost is too large to price"))?;
    Ok(RecipeCost {
        total_cost: to_cents(total),
        suggested_price: to_cents(suggested),
    })
}

fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use galley_core::DomainError;
    use std::collections::HashMap;

    #[test]
    fn total_and_markup_for_two_ingredients() {
        let a = InventoryItemId::new();
        let b = InventoryItemId::new();
        let prices = HashMap::from([(a, Decimal::new(150, 2)), (b, Decimal::new(200, 2))]);
        let uses = vec![
            IngredientUse::new(a, Decimal::from(2)),
            IngredientUse::new(b, Decimal::from(3)),
        ];

        let cost = compute_cost(&uses, |id| prices.get(&id).copied()).unwrap();

        assert_eq!(cost.total_cost, Decimal::new(900, 2));
        assert_eq!(cost.suggested_price, Decimal::new(1350, 2));
        assert_eq!(cost.suggested_price.to_string(), "13.50");
    }

    #[test]
    fn empty_list_costs_nothing() {
        let cost = compute_cost(&[], |_| None).unwrap();
        assert_eq!(cost.total_cost, Decimal::ZERO);
        assert_eq!(cost.suggested_price, Decimal::ZERO);
    }

    #[test]
    fn fractional_quantities_round_to_cents() {
        let a = InventoryItemId::new();
        let uses = vec![IngredientUse::new(a, Decimal::new(33, 2))];
        // 0.33 * 0.99 = 0.3267 -> 0.33; * 1.5 = 0.49005 -> 0.49
        let cost = compute_cost(&uses, |_| Some(Decimal::new(99, 2))).unwrap();
        assert_eq!(cost.total_cost, Decimal::new(33, 2));
        assert_eq!(cost.suggested_price, Decimal::new(49, 2));
    }

    #[test]
    fn unknown_items_are_reported_by_position() {
        let known = InventoryItemId::new();
        let uses = vec![
            IngredientUse::new(known, Decimal::ONE),
            IngredientUse::new(InventoryItemId::new(), Decimal::ONE),
        ];

        let err = compute_cost(&uses, |id| (id == known).then_some(Decimal::ONE)).unwrap_err();
        match err {
            DomainError::Validation(errors) => assert_eq!(errors.fields()[0].field, "ingredients[1].id"),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn oversized_quantities_are_reported_not_panicked() {
        let a = InventoryItemId::new();
        let uses = vec![IngredientUse::new(a, Decimal::ONE), IngredientUse::new(a, Decimal::MAX)];

        let err = compute_cost(&uses, |_| Some(Decimal::from(2))).unwrap_err();
        match err {
            DomainError::Validation(errors) => assert_eq!(errors.fields()[0].field, "ingredients[1].quantity"),
            other => panic!("expected Validation error, got {other:?}"),
        }

        let err = compute_cost(&[IngredientUse::new(a, Decimal::MAX)], |_| Some(Decimal::ONE)).unwrap_err();
        match err {
            DomainError::Validation(errors) => assert_eq!(errors.fields()[0].field, "ingredients"),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the suggested price is the total with a 50% markup (within rounding).
            #[test]
            fn suggested_price_tracks_total(
                lines in proptest::collection::vec((1i64..10_000, 1i64..100_000), 0..10)
            ) {
                let uses: Vec<IngredientUse> = lines
                    .iter()
                    .map(|(q, _)| IngredientUse::new(InventoryItemId::new(), Decimal::new(*q, 2)))
                    .collect();
                let prices: Vec<Decimal> = lines.iter().map(|(_, p)| Decimal::new(*p, 2)).collect();
                let mut next = prices.iter();

                let cost = compute_cost(&uses, |_| next.next().copied()).unwrap();

                let exact: Decimal = uses.iter().zip(&prices).map(|(u, p)| u.quantity * *p).sum();
                prop_assert_eq!(cost.total_cost, to_cents(exact));
                prop_assert_eq!(cost.suggested_price, to_cents(exact * SUGGESTED_PRICE_MARKUP));
            }
        }
    }
}
