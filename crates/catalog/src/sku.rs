//! Stock-keeping unit generation.

use chrono::{DateTime, Utc};

use crate::{Color, FashionCategory, Size};

fn alnum_upper(name: &str, take: usize) -> String {
    name.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .take(take)
        .collect()
}

fn suffix(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis().rem_euclid(10_000)
}

/// `NAMEPART-1234`: up to 8 alphanumerics of the upper-cased name, then the
/// last four digits of the millisecond timestamp.
pub fn product_sku(name: &str, at: DateTime<Utc>) -> String {
    let prefix = alnum_upper(name, 8);
    if prefix.is_empty() {
        return format!("SKU-{}", at.timestamp_millis());
    }
    format!("{prefix}-{}", suffix(at))
}

/// `CLO-NAME-1234`: category code prefix, up to 5 name alphanumerics, timestamp digits.
pub fn fashion_sku(name: &str, category: FashionCategory, at: DateTime<Utc>) -> String {
    let prefix = alnum_upper(name, 5);
    if prefix.is_empty() {
        return format!("FSH-{}", at.timestamp_millis());
    }
    let category_code: String = category.as_str().chars().take(3).collect();
    format!("{category_code}-{prefix}-{}", suffix(at))
}

/// `{product_sku}-{size code}-{color code}` with three-character codes.
pub fn variant_sku(product_sku: &str, size: Size, color: Color) -> String {
    let size_code: String = size.as_str().chars().take(3).collect();
    let color_code: String = color.as_str().chars().take(3).collect();
    format!("{product_sku}-{size_code}-{color_code}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn product_sku_strips_and_truncates() {
        assert_eq!(product_sku("Wireless Mouse (v2)", at(1_700_000_012_345)), "WIRELESS-2345");
        assert_eq!(product_sku("usb-c", at(1_700_000_000_007)), "USBC-7");
        assert_eq!(product_sku("!!!", at(42)), "SKU-42");
    }

    #[test]
    fn fashion_and_variant_skus() {
        let sku = fashion_sku("Classic Tee", FashionCategory::ClothingMens, at(1_700_000_001_234));
        assert_eq!(sku, "CLO-CLASS-1234");
        assert_eq!(variant_sku(&sku, Size::Shoe10Half, Color::RoseGold), "CLO-CLASS-1234-SIZ-ROS");
        assert_eq!(variant_sku(&sku, Size::S, Color::Red), "CLO-CLASS-1234-S-RED");
    }

    proptest! {
        #[test]
        fn product_sku_has_expected_shape(name in "[a-zA-Z0-9 ]{1,30}", millis in 0i64..4_000_000_000_000) {
            let sku = product_sku(&name, at(millis));
            let (head, tail) = sku.rsplit_once('-').unwrap();
            prop_assert!(head.len() <= 8 || head == "SKU");
            prop_assert!(head.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            prop_assert!(tail.parse::<i64>().is_ok());
        }
    }
}
