//! Menu item classification.

use serde::{Deserialize, Serialize};

/// The kind of a menu item.
///
/// Matches the category strings the order server uses in menu and cart
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Appetizer,
    #[default]
    Entree,
    Side,
    Drink,
    Dessert,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Appetizer => write!(f, "appetizer"),
            Self::Entree => write!(f, "entree"),
            Self::Side => write!(f, "side"),
            Self::Drink => write!(f, "drink"),
            Self::Dessert => write!(f, "dessert"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appetizer" => Ok(Self::Appetizer),
            "entree" => Ok(Self::Entree),
            "side" => Ok(Self::Side),
            "drink" => Ok(Self::Drink),
            "dessert" => Ok(Self::Dessert),
            _ => Err(format!("invalid item kind: {s}")),
        }
    }
}
