//! Stock movements shared by regular products and fashion variants.

use serde::{Deserialize, Serialize};

use stockroom_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    StockIn,
    StockOut,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::StockIn => "STOCK_IN",
            MovementKind::StockOut => "STOCK_OUT",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STOCK_IN" => Ok(MovementKind::StockIn),
            "STOCK_OUT" => Ok(MovementKind::StockOut),
            _ => Err(DomainError::validation(format!("invalid transaction type '{}'", s.trim()))),
        }
    }
}

/// One recorded change of an on-hand quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub kind: MovementKind,
    /// Always positive; the direction is `kind`.
    pub quantity: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: String,
    pub performed_by: String,
}

impl StockMovement {
    /// Validate and build a movement against the current level.
    pub fn plan(
        current: i64,
        kind: MovementKind,
        quantity: i64,
        reason: impl Into<String>,
        performed_by: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let quantity_after = apply_movement(current, kind, quantity)?;
        Ok(Self {
            kind,
            quantity,
            quantity_before: current,
            quantity_after,
            reason: reason.into(),
            performed_by: performed_by.into(),
        })
    }

    /// Movement taking `from` to `to` (for edits that overwrite a quantity).
    /// `None` when nothing changes.
    pub fn between(from: i64, to: i64, reason: impl Into<String>, performed_by: impl Into<String>) -> Option<Self> {
        let kind = match to.cmp(&from) {
            core::cmp::Ordering::Equal => return None,
            core::cmp::Ordering::Greater => MovementKind::StockIn,
            core::cmp::Ordering::Less => MovementKind::StockOut,
        };
        Some(Self {
            kind,
            quantity: (to - from).abs(),
            quantity_before: from,
            quantity_after: to,
            reason: reason.into(),
            performed_by: performed_by.into(),
        })
    }
}

/// Resulting level after moving `quantity` units.
pub fn apply_movement(current: i64, kind: MovementKind, quantity: i64) -> Result<i64, DomainError> {
    if quantity <= 0 {
        return Err(DomainError::validation("Quantity must be positive"));
    }
    match kind {
        MovementKind::StockIn => current
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("quantity overflow")),
        MovementKind::StockOut => {
            if quantity > current {
                return Err(DomainError::invariant(format!("Insufficient stock. Available: {current}")));
            }
            Ok(current - quantity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn stock_out_beyond_available_is_an_invariant_violation() {
        let err = apply_movement(3, MovementKind::StockOut, 4).unwrap_err();
        assert_eq!(err, DomainError::invariant("Insufficient stock. Available: 3"));
    }

    #[test]
    fn zero_and_negative_quantities_are_invalid() {
        assert!(matches!(apply_movement(3, MovementKind::StockIn, 0), Err(DomainError::Validation(_))));
        assert!(matches!(apply_movement(3, MovementKind::StockOut, -1), Err(DomainError::Validation(_))));
    }

    #[test]
    fn between_picks_direction() {
        let up = StockMovement::between(5, 9, "r", "u").unwrap();
        assert_eq!((up.kind, up.quantity), (MovementKind::StockIn, 4));
        let down = StockMovement::between(9, 5, "r", "u").unwrap();
        assert_eq!((down.kind, down.quantity), (MovementKind::StockOut, 4));
        assert!(StockMovement::between(5, 5, "r", "u").is_none());
    }

    #[test]
    fn kind_parses_and_serializes_screaming_snake() {
        assert_eq!("stock_in".parse::<MovementKind>().unwrap(), MovementKind::StockIn);
        assert_eq!(serde_json::to_string(&MovementKind::StockOut).unwrap(), "\"STOCK_OUT\"");
        assert!("RETURN".parse::<MovementKind>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 1000, ..ProptestConfig::default() })]

        #[test]
        fn stock_never_goes_negative(
            start in 0i64..1_000,
            moves in prop::collection::vec((any::<bool>(), 1i64..200), 0..50),
        ) {
            let mut level = start;
            for (inbound, qty) in moves {
                let kind = if inbound { MovementKind::StockIn } else { MovementKind::StockOut };
                if let Ok(next) = apply_movement(level, kind, qty) {
                    level = next;
                }
                prop_assert!(level >= 0);
            }
        }
    }
}
