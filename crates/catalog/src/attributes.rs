//! Closed vocabularies for fashion products.
//!
//! Each value has a stable wire code (SCREAMING_SNAKE, what clients send and
//! receive) and a display name. Parsing is case-insensitive. Declaration order
//! is the canonical listing order.

use core::str::FromStr;

use stockroom_core::DomainError;

macro_rules! catalog_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $code:literal, $display:literal;)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn display_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| DomainError::validation(format!("invalid {} '{}'", $label, wanted)))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

catalog_enum!(
    /// Fashion product category.
    FashionCategory, "category" {
        ClothingMens => "CLOTHING_MENS", "Men's Clothing";
        ClothingWomens => "CLOTHING_WOMENS", "Women's Clothing";
        ClothingKids => "CLOTHING_KIDS", "Kids' Clothing";
        FootwearMens => "FOOTWEAR_MENS", "Men's Footwear";
        FootwearWomens => "FOOTWEAR_WOMENS", "Women's Footwear";
        FootwearKids => "FOOTWEAR_KIDS", "Kids' Footwear";
        AccessoriesBags => "ACCESSORIES_BAGS", "Bags & Purses";
        AccessoriesJewelry => "ACCESSORIES_JEWELRY", "Jewelry";
        AccessoriesWatches => "ACCESSORIES_WATCHES", "Watches";
        AccessoriesBelts => "ACCESSORIES_BELTS", "Belts";
        AccessoriesHats => "ACCESSORIES_HATS", "Hats & Caps";
        AccessoriesSunglasses => "ACCESSORIES_SUNGLASSES", "Sunglasses";
        AccessoriesScarves => "ACCESSORIES_SCARVES", "Scarves & Wraps";
    }
);

catalog_enum!(
    Season, "season" {
        Spring => "SPRING", "Spring";
        Summer => "SUMMER", "Summer";
        Autumn => "AUTUMN", "Autumn";
        Winter => "WINTER", "Winter";
        AllSeason => "ALL_SEASON", "All Season";
    }
);

catalog_enum!(
    /// Target audience.
    Gender, "gender" {
        Male => "MALE", "Male";
        Female => "FEMALE", "Female";
        Unisex => "UNISEX", "Unisex";
        Kids => "KIDS", "Kids";
    }
);

catalog_enum!(
    /// Garment, US shoe, kids and accessory sizes.
    Size, "size" {
        Xxs => "XXS", "XXS";
        Xs => "XS", "XS";
        S => "S", "S";
        M => "M", "M";
        L => "L", "L";
        Xl => "XL", "XL";
        Xxl => "XXL", "XXL";
        Xxxl => "XXXL", "XXXL";
        Shoe5 => "SIZE_5", "5";
        Shoe5Half => "SIZE_5_5", "5.5";
        Shoe6 => "SIZE_6", "6";
        Shoe6Half => "SIZE_6_5", "6.5";
        Shoe7 => "SIZE_7", "7";
        Shoe7Half => "SIZE_7_5", "7.5";
        Shoe8 => "SIZE_8", "8";
        Shoe8Half => "SIZE_8_5", "8.5";
        Shoe9 => "SIZE_9", "9";
        Shoe9Half => "SIZE_9_5", "9.5";
        Shoe10 => "SIZE_10", "10";
        Shoe10Half => "SIZE_10_5", "10.5";
        Shoe11 => "SIZE_11", "11";
        Shoe11Half => "SIZE_11_5", "11.5";
        Shoe12 => "SIZE_12", "12";
        Shoe13 => "SIZE_13", "13";
        Shoe14 => "SIZE_14", "14";
        Kids2T => "KIDS_2T", "2T";
        Kids3T => "KIDS_3T", "3T";
        Kids4T => "KIDS_4T", "4T";
        Kids5T => "KIDS_5T", "5T";
        KidsXs => "KIDS_XS", "Kids XS";
        KidsS => "KIDS_S", "Kids S";
        KidsM => "KIDS_M", "Kids M";
        KidsL => "KIDS_L", "Kids L";
        KidsXl => "KIDS_XL", "Kids XL";
        OneSize => "ONE_SIZE", "One Size";
        Small => "SMALL", "Small";
        Medium => "MEDIUM", "Medium";
        Large => "LARGE", "Large";
    }
);

catalog_enum!(
    /// Solid colors, metallics, prints and multi-color.
    Color, "color" {
        Black => "BLACK", "Black";
        White => "WHITE", "White";
        Gray => "GRAY", "Gray";
        Navy => "NAVY", "Navy";
        Brown => "BROWN", "Brown";
        Red => "RED", "Red";
        Blue => "BLUE", "Blue";
        Green => "GREEN", "Green";
        Yellow => "YELLOW", "Yellow";
        Orange => "ORANGE", "Orange";
        Purple => "PURPLE", "Purple";
        Pink => "PINK", "Pink";
        Turquoise => "TURQUOISE", "Turquoise";
        Beige => "BEIGE", "Beige";
        Cream => "CREAM", "Cream";
        Ivory => "IVORY", "Ivory";
        Khaki => "KHAKI", "Khaki";
        Olive => "OLIVE", "Olive";
        Burgundy => "BURGUNDY", "Burgundy";
        Maroon => "MAROON", "Maroon";
        Teal => "TEAL", "Teal";
        Coral => "CORAL", "Coral";
        Gold => "GOLD", "Gold";
        Silver => "SILVER", "Silver";
        RoseGold => "ROSE_GOLD", "Rose Gold";
        Floral => "FLORAL", "Floral";
        Striped => "STRIPED", "Striped";
        PolkaDot => "POLKA_DOT", "Polka Dot";
        Plaid => "PLAID", "Plaid";
        Leopard => "LEOPARD", "Leopard Print";
        Zebra => "ZEBRA", "Zebra Print";
        Multicolor => "MULTICOLOR", "Multicolor";
        Rainbow => "RAINBOW", "Rainbow";
    }
);

impl Season {
    /// Meteorological season (northern hemisphere) for a 1-based month.
    pub fn for_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Whether goods tagged `self` sell during `current`.
    pub fn covers(&self, current: Season) -> bool {
        *self == Season::AllSeason || *self == current
    }
}
