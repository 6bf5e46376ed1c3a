//! Startup data: the administrator account and an optional demo catalog.

use std::str::FromStr;

use anyhow::Context;
use rust_decimal::Decimal;

use stockroom_auth::{Role, hash_password, normalize_email};
use stockroom_catalog::{Color, FashionCategory, FashionDetails, Gender, NewVariant, ProductDetails, Season, Size, VariantId};

use super::services::{AppServices, NewUser};
use crate::config::AdminSettings;

const SEED_ACTOR: &str = "system";

/// Creates the administrator unless an account with that username or email exists.
pub fn seed_admin(services: &AppServices, admin: &AdminSettings) -> anyhow::Result<()> {
    let users = &services.stockroom().users;
    let email = normalize_email(&admin.email);
    if users.by_username(&admin.username).is_some() || users.by_email(&email).is_some() {
        tracing::debug!(username = %admin.username, "admin account already present");
        return Ok(());
    }

    let password_hash = hash_password(&admin.password).context("hashing admin password")?;
    let user = services
        .register_user(NewUser {
            username: admin.username.clone(),
            email,
            password_hash,
            role: Role::Admin,
            allow_admin: true,
        })
        .map_err(|e| anyhow::anyhow!("seeding admin account: {e}"))?;
    tracing::info!(user_id = %user.id, username = %user.username, "admin account created");
    Ok(())
}

fn price(raw: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("demo price '{raw}'"))
}

fn variant(size: Size, color: Color, quantity: i64, min_stock_level: i64) -> NewVariant {
    NewVariant {
        variant_id: VariantId::new(),
        size,
        color,
        quantity,
        min_stock_level,
        price_adjustment: None,
    }
}

/// A handful of products, some already at or under their minimum so the
/// dashboards and alert pages have something to show.
pub fn seed_demo_catalog(services: &AppServices) -> anyhow::Result<()> {
    if services.stockroom().products.count() > 0 || services.stockroom().fashion.count() > 0 {
        return Ok(());
    }

    let products = [
        ("Desk Lamp", "Lighting", 40, 10, "29.99"),
        ("Office Chair", "Furniture", 6, 8, "149.00"),
        ("USB-C Cable", "Electronics", 0, 15, "9.50"),
        ("Notebook A5", "Stationery", 120, 25, "3.20"),
    ];
    for (name, category, quantity, min_stock_level, unit_price) in products {
        services
            .create_product(
                ProductDetails {
                    name: name.to_string(),
                    sku: None,
                    description: None,
                    category: category.to_string(),
                    quantity,
                    min_stock_level,
                    price: price(unit_price)?,
                },
                SEED_ACTOR,
            )
            .map_err(|e| anyhow::anyhow!("seeding product '{name}': {e}"))?;
    }

    let fashion = [
        (
            FashionDetails {
                name: "Classic Oxford Shirt".to_string(),
                description: Some("Cotton button-down".to_string()),
                category: FashionCategory::ClothingMens,
                brand: "Harbor".to_string(),
                base_price: price("49.90")?,
                season: Some(Season::AllSeason),
                target_gender: Some(Gender::Male),
                material: Some("Cotton".to_string()),
                care_instructions: Some("Machine wash cold".to_string()),
            },
            vec![
                variant(Size::M, Color::White, 12, 5),
                variant(Size::L, Color::White, 3, 5),
                variant(Size::M, Color::Navy, 0, 4),
            ],
        ),
        (
            FashionDetails {
                name: "Trail Runner".to_string(),
                description: None,
                category: FashionCategory::FootwearWomens,
                brand: "Summit".to_string(),
                base_price: price("89.00")?,
                season: Some(Season::Summer),
                target_gender: Some(Gender::Female),
                material: Some("Mesh".to_string()),
                care_instructions: None,
            },
            vec![variant(Size::Shoe7, Color::Coral, 8, 3), variant(Size::Shoe8, Color::Black, 2, 3)],
        ),
    ];
    for (details, variants) in fashion {
        let name = details.name.clone();
        services
            .create_fashion_product(details, variants, SEED_ACTOR)
            .map_err(|e| anyhow::anyhow!("seeding fashion product '{name}': {e}"))?;
    }

    tracing::info!(
        products = services.stockroom().products.count(),
        fashion_products = services.stockroom().fashion.count(),
        "demo catalog seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockroom_auth::UserStatus;
    use stockroom_infra::LoggingNotifier;

    use super::*;
    use crate::config::Settings;

    fn services() -> AppServices {
        AppServices::new(&Settings::default(), Arc::new(LoggingNotifier))
    }

    #[test]
    fn admin_seed_is_idempotent() {
        let services = services();
        let admin = Settings::default().admin;
        seed_admin(&services, &admin).unwrap();
        seed_admin(&services, &admin).unwrap();

        let users = services.stockroom().users.list();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
        assert_eq!(users[0].status, UserStatus::Approved);
    }

    #[test]
    fn demo_catalog_raises_alerts_for_short_stock() {
        let services = services();
        seed_demo_catalog(&services).unwrap();

        assert_eq!(services.stockroom().products.count(), 4);
        assert_eq!(services.stockroom().fashion.count(), 2);
        assert!(!services.stockroom().alerts.active().is_empty());
    }
}
