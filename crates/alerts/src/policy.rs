//! When a stock level warrants an alert, and what the alert says.

use crate::{AlertSubject, AlertType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAlertDecision {
    Raise(AlertType),
    /// Healthy level: resolve whatever is active for the subject.
    Clear,
}

/// Out of stock wins over low stock; the minimum is inclusive.
pub fn evaluate(quantity: i64, min_stock_level: i64) -> StockAlertDecision {
    if quantity == 0 {
        StockAlertDecision::Raise(AlertType::OutOfStock)
    } else if quantity <= min_stock_level {
        StockAlertDecision::Raise(AlertType::LowStock)
    } else {
        StockAlertDecision::Clear
    }
}

pub fn alert_message(
    alert_type: AlertType,
    product_name: &str,
    subject: &AlertSubject,
    quantity: i64,
    min_stock_level: i64,
) -> String {
    let label = match subject {
        AlertSubject::Product { .. } => product_name.to_string(),
        AlertSubject::Variant { size, color, .. } => {
            format!("{product_name} ({}/{})", size.display_name(), color.display_name())
        }
    };
    match alert_type {
        AlertType::OutOfStock => format!("{label} is completely out of stock! Immediate restocking required."),
        AlertType::LowStock => format!(
            "{label} is running low on stock. Current: {quantity} units, Minimum required: {min_stock_level} units. Please restock soon."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockroom_catalog::{Color, FashionProductId, ProductId, Size, VariantId};
    use stockroom_core::AggregateId;

    #[test]
    fn thresholds() {
        assert_eq!(evaluate(0, 5), StockAlertDecision::Raise(AlertType::OutOfStock));
        assert_eq!(evaluate(0, 0), StockAlertDecision::Raise(AlertType::OutOfStock));
        assert_eq!(evaluate(5, 5), StockAlertDecision::Raise(AlertType::LowStock));
        assert_eq!(evaluate(6, 5), StockAlertDecision::Clear);
    }

    #[test]
    fn product_messages() {
        let subject = AlertSubject::Product { product_id: ProductId::new(AggregateId::new()) };
        assert_eq!(
            alert_message(AlertType::OutOfStock, "Desk Lamp", &subject, 0, 5),
            "Desk Lamp is completely out of stock! Immediate restocking required."
        );
        assert_eq!(
            alert_message(AlertType::LowStock, "Desk Lamp", &subject, 3, 5),
            "Desk Lamp is running low on stock. Current: 3 units, Minimum required: 5 units. Please restock soon."
        );
    }

    #[test]
    fn variant_messages_include_size_and_color() {
        let subject = AlertSubject::Variant {
            product_id: FashionProductId::new(AggregateId::new()),
            variant_id: VariantId::new(),
            size: Size::Shoe10Half,
            color: Color::RoseGold,
        };
        assert_eq!(
            alert_message(AlertType::OutOfStock, "Runner", &subject, 0, 2),
            "Runner (10.5/Rose Gold) is completely out of stock! Immediate restocking required."
        );
    }

    proptest! {
        #[test]
        fn clear_only_above_minimum(q in 0i64..1_000, min in 0i64..1_000) {
            let decision = evaluate(q, min);
            prop_assert_eq!(decision == StockAlertDecision::Clear, q > 0 && q > min);
        }
    }
}
