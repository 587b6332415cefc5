use rust_decimal::Decimal;

use crate::domain::catalog::{find_item, CatalogItem, CategoryClass};
use crate::domain::order::{OrderTotal, PriceTier};

const GROUP_SEPARATOR: char = '\u{a0}';

#[derive(Clone, Debug, Default)]
pub struct PriceCalculator;

impl PriceCalculator {
    pub fn new() -> Self {
        Self
    }

    /// `None` when the product is unknown, the quantity is not positive, the
    /// item carries no price for the tier its class resolves to, or the
    /// amount does not fit a `Decimal`.
    pub fn total(
        &self,
        product_name: &str,
        quantity: Decimal,
        catalog_items: &[CatalogItem],
    ) -> Option<OrderTotal> {
        if quantity <= Decimal::ZERO {
            return None;
        }
        let item = find_item(catalog_items, product_name)?;
        let (tier, unit_price) = select_tier(item, quantity)?;
        let amount = unit_price.checked_mul(quantity)?.normalize();

        Some(OrderTotal {
            product: item.name.clone(),
            tier,
            unit_price,
            quantity,
            amount,
            breakdown: format!(
                "{} × {} = {}",
                format_amount(quantity),
                format_amount(unit_price),
                format_amount(amount)
            ),
        })
    }
}

fn select_tier(item: &CatalogItem, quantity: Decimal) -> Option<(PriceTier, Decimal)> {
    let prices = &item.prices;
    let five = Decimal::from(5);
    let twenty = Decimal::from(20);

    match item.category_class() {
        CategoryClass::Concentrate => match prices.per_5g {
            Some(price) if quantity >= five => Some((PriceTier::Per5g, price)),
            _ => prices.per_gram.map(|price| (PriceTier::PerGram, price)),
        },
        CategoryClass::Flower => {
            if let (true, Some(price)) = (quantity >= twenty, prices.per_20g) {
                return Some((PriceTier::Per20g, price));
            }
            // Below 5g this still uses the 5g rate; kept as observed pending a
            // product-owner decision.
            prices.per_5g.map(|price| (PriceTier::Per5g, price))
        }
        CategoryClass::Piece => prices.per_piece.map(|price| (PriceTier::PerPiece, price)),
    }
}

/// Renders an amount with digit grouping that only kicks in from five integer
/// digits upward (`8000`, `12 000`), separated by a no-break space.
pub fn format_amount(value: Decimal) -> String {
    let normalized = value.normalize();
    let rendered = normalized.abs().to_string();
    let (integer, fraction) = match rendered.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (rendered.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    if integer.len() >= 5 {
        for (index, digit) in integer.chars().enumerate() {
            if index > 0 && (integer.len() - index) % 3 == 0 {
                grouped.push(GROUP_SEPARATOR);
            }
            grouped.push(digit);
        }
    } else {
        grouped.push_str(integer);
    }

    let sign = if normalized.is_sign_negative() && !normalized.is_zero() { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}
