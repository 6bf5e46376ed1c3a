//! Catalog domain (event-sourced): regular products, fashion products with
//! size/color variants, and the stock movements recorded against both.
//!
//! Pure domain logic; no IO, no HTTP, no storage.

pub mod attributes;
pub mod fashion;
pub mod product;
pub mod sku;
pub mod stock;

pub use attributes::{Color, FashionCategory, Gender, Season, Size};
pub use fashion::{
    AddVariant, CreateFashionProduct, DeleteFashionProduct, FASHION_PRODUCT_AGGREGATE_TYPE, FashionCommand,
    FashionDetails, FashionEvent, FashionProduct, FashionProductCreated, FashionProductDeleted, FashionProductId,
    FashionProductUpdated, NewVariant, UpdateFashionProduct, Variant, VariantAdded, VariantId, VariantStockChange,
    VariantStockMoved,
};
pub use product::{
    CreateProduct, DeleteProduct, PRODUCT_AGGREGATE_TYPE, Product, ProductCommand, ProductCreated, ProductDeleted,
    ProductDetails, ProductEvent, ProductId, ProductUpdated, StockChange, StockMoved, UpdateProduct,
};
pub use stock::{MovementKind, StockMovement, apply_movement};
