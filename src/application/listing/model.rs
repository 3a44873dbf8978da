//! Typed listing documents.
//!
//! These are the domain values the listing form edits. Discriminated unions
//! use internal tags, so the JSON shape matches what the form produces.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingType {
    Vehicle,
    Droid,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Vehicle => "Vehicle",
            ListingType::Droid => "Droid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub price: f64,
    pub listing_type: ListingType,
    pub product: Product,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Product {
    Vehicle(VehicleProduct),
    Droid(DroidProduct),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "vehicleType")]
pub enum VehicleProduct {
    Spaceship(Spaceship),
    Speeder(Speeder),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewMember {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spaceship {
    pub color: String,
    pub can_fire: bool,
    pub crew_members: Vec<CrewMember>,
    pub wing_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speeder {
    pub color: String,
    pub can_fire: bool,
    pub crew_members: Vec<CrewMember>,
    pub maximum_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "droidType")]
pub enum DroidProduct {
    Protocol(ProtocolDroid),
    Medical(MedicalDroid),
    Astromech(AstromechDroid),
    Assassin(AssassinDroid),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDroid {
    pub color: String,
    pub name: String,
    pub spoken_languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalDroid {
    pub color: String,
    pub name: String,
    pub can_heal_humans: bool,
    pub can_fix_robots: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AstromechDroid {
    pub color: String,
    pub name: String,
    pub tool_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssassinDroid {
    pub color: String,
    pub name: String,
    pub weapons: Vec<String>,
}
