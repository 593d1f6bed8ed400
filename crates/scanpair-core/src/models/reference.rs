//! Reference list models (clients, flower types, varieties)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three selector lists pulled from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Client,
    FlowerType,
    Variety,
}

impl ReferenceKind {
    pub const ALL: [Self; 3] = [Self::Client, Self::FlowerType, Self::Variety];

    /// Local table holding this list
    pub const fn table(self) -> &'static str {
        match self {
            Self::Client => "clients",
            Self::FlowerType => "flower_types",
            Self::Variety => "varieties",
        }
    }

    /// Backend endpoint selector and response field name
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Client => "clientes",
            Self::FlowerType => "tipos",
            Self::Variety => "variedades",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::FlowerType => "flower type",
            Self::Variety => "variety",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" | "clients" | "clientes" => Ok(Self::Client),
            "type" | "types" | "flower_type" | "flower-type" | "tipos" => Ok(Self::FlowerType),
            "variety" | "varieties" | "variedades" => Ok(Self::Variety),
            other => Err(format!("unknown reference list '{other}'")),
        }
    }
}

/// A cached selector entry.
///
/// `id` is the 1-based position in the last pulled list and changes whenever
/// the list is re-synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: String,
    pub name: String,
    /// Pull that wrote this row (Unix ms)
    pub last_synced_at: i64,
}

impl ReferenceItem {
    /// Build items from a pulled list, numbering them by position.
    #[must_use]
    pub fn from_names(names: &[String], synced_at: i64) -> Vec<Self> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| Self {
                id: (index + 1).to_string(),
                name: name.clone(),
                last_synced_at: synced_at,
            })
            .collect()
    }
}
