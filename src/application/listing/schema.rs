//! Node shapes of the listing form.
//!
//! ```text
//! listing
//! ├── id, title, imageUrl, price
//! ├── listingType ─┬─ Vehicle -> vehicleProduct
//! │                └─ Droid   -> droidProduct
//! vehicleProduct
//! ├── vehicleType ─┬─ Spaceship -> spaceship
//! │                └─ Speeder   -> speeder
//! droidProduct
//! └── droidType ───┬─ Protocol  -> protocolDroid
//!                  ├─ Medical   -> medicalDroid
//!                  ├─ Astromech -> astromechDroid
//!                  └─ Assassin  -> assassinDroid
//! ```

use serde_json::{Map, Value};

use crate::application::listing::model::ListingType;
use crate::domain::{
    CollectionShape, GroupShape, LeafShape, Mapper, Representation, Required, Shape, VariantSpec,
};

pub const LISTING_TYPE: &str = "listingType";
pub const VEHICLE_TYPE: &str = "vehicleType";
pub const DROID_TYPE: &str = "droidType";
pub const CREW_MEMBERS: &str = "crewMembers";

const VEHICLE_VARIANTS: &[(&str, &str)] = &[("Spaceship", "spaceship"), ("Speeder", "speeder")];
const DROID_VARIANTS: &[(&str, &str)] = &[
    ("Protocol", "protocolDroid"),
    ("Medical", "medicalDroid"),
    ("Astromech", "astromechDroid"),
    ("Assassin", "assassinDroid"),
];

fn required() -> LeafShape {
    LeafShape::new().validator(Required)
}

fn field_for<'a>(variants: &'a [(&str, &'a str)], tag: Option<&Value>) -> Option<&'a str> {
    let tag = tag?.as_str()?;
    variants.iter().find(|(t, _)| *t == tag).map(|(_, field)| *field)
}

/// Product mapper: the whole product moves under the field of its variant.
fn product_mapper(tag_key: &'static str, variants: &'static [(&'static str, &'static str)]) -> Mapper {
    Mapper::new(
        move |value| {
            let mut rep = Representation::new();
            let Value::Object(product) = value else {
                return rep;
            };
            if let Some(tag) = product.get(tag_key) {
                rep.insert(tag_key.to_string(), tag.clone());
                if let Some(field) = field_for(variants, Some(tag)) {
                    rep.insert(field.to_string(), value.clone());
                }
            }
            rep
        },
        move |rep| {
            field_for(variants, rep.get(tag_key))
                .and_then(|field| rep.get(field).cloned())
                .unwrap_or(Value::Null)
        },
    )
}

/// Listing mapper: `product` is split into `vehicleProduct` / `droidProduct`
/// by `listingType`, and joined back on the way out.
fn listing_mapper() -> Mapper {
    fn product_field(listing_type: Option<&Value>) -> Option<&'static str> {
        match listing_type?.as_str()? {
            "Vehicle" => Some("vehicleProduct"),
            "Droid" => Some("droidProduct"),
            _ => None,
        }
    }

    Mapper::new(
        |value| {
            let Value::Object(listing) = value else {
                return Representation::new();
            };
            let mut rep = listing.clone();
            if let Some(product) = rep.remove("product") {
                if let Some(field) = product_field(listing.get(LISTING_TYPE)) {
                    rep.insert(field.to_string(), product);
                }
            }
            rep
        },
        |rep| {
            let mut listing = Map::new();
            for key in ["id", "title", "imageUrl", "price", LISTING_TYPE] {
                listing.insert(key.to_string(), rep.get(key).cloned().unwrap_or(Value::Null));
            }
            let product = product_field(rep.get(LISTING_TYPE))
                .and_then(|field| rep.get(field).cloned())
                .unwrap_or(Value::Null);
            listing.insert("product".to_string(), product);
            Value::Object(listing)
        },
    )
}

pub fn listing_shape() -> GroupShape {
    GroupShape::new(listing_mapper())
        .child("id", LeafShape::new())
        .child("title", required())
        .child("imageUrl", required())
        .child("price", required())
        .child(LISTING_TYPE, required())
        .variants(
            VariantSpec::on(LISTING_TYPE)
                .variant(ListingType::Vehicle.as_str(), "vehicleProduct", vehicle_product_shape())
                .variant(ListingType::Droid.as_str(), "droidProduct", droid_product_shape()),
        )
}

pub fn vehicle_product_shape() -> GroupShape {
    GroupShape::new(product_mapper(VEHICLE_TYPE, VEHICLE_VARIANTS))
        .child(VEHICLE_TYPE, required())
        .variants(
            VariantSpec::on(VEHICLE_TYPE)
                .variant("Spaceship", "spaceship", spaceship_shape())
                .variant("Speeder", "speeder", speeder_shape()),
        )
}

pub fn spaceship_shape() -> GroupShape {
    GroupShape::new(Mapper::projection_tagged(
        &["color", "canFire", CREW_MEMBERS, "wingCount"],
        VEHICLE_TYPE,
        "Spaceship",
    ))
    .child("color", required())
    .child("canFire", required().default_value(false))
    .child(CREW_MEMBERS, crew_members_shape())
    .child("wingCount", required())
}

pub fn speeder_shape() -> GroupShape {
    GroupShape::new(Mapper::projection_tagged(
        &["color", "canFire", CREW_MEMBERS, "maximumSpeed"],
        VEHICLE_TYPE,
        "Speeder",
    ))
    .child("color", required())
    .child("canFire", required().default_value(false))
    .child(CREW_MEMBERS, crew_members_shape())
    .child("maximumSpeed", required())
}

/// Wraps the crew list so the collection sits under a named field; new
/// members are built by the factory.
pub fn crew_members_shape() -> GroupShape {
    GroupShape::new(Mapper::wrapping(CREW_MEMBERS))
        .validator(Required)
        .child(CREW_MEMBERS, CollectionShape::new(crew_member_shape()))
        .collection_factory(|key, _value| match key {
            CREW_MEMBERS => crew_member_shape().into(),
            _ => Shape::Leaf(LeafShape::new()),
        })
}

pub fn crew_member_shape() -> GroupShape {
    GroupShape::new(Mapper::projection(&["firstName", "lastName"]))
        .child("firstName", required())
        .child("lastName", required())
}

pub fn droid_product_shape() -> GroupShape {
    GroupShape::new(product_mapper(DROID_TYPE, DROID_VARIANTS))
        .child(DROID_TYPE, required())
        .variants(
            VariantSpec::on(DROID_TYPE)
                .variant("Protocol", "protocolDroid", protocol_droid_shape())
                .variant("Medical", "medicalDroid", medical_droid_shape())
                .variant("Astromech", "astromechDroid", astromech_droid_shape())
                .variant("Assassin", "assassinDroid", assassin_droid_shape()),
        )
}

fn droid(tag: &'static str, extra: &[&'static str]) -> GroupShape {
    let mut fields = vec!["color", "name"];
    fields.extend_from_slice(extra);
    GroupShape::new(Mapper::projection_tagged(&fields, DROID_TYPE, tag))
        .child("color", required())
        .child("name", required())
}

pub fn protocol_droid_shape() -> GroupShape {
    droid("Protocol", &["spokenLanguages"]).child("spokenLanguages", required())
}

pub fn medical_droid_shape() -> GroupShape {
    droid("Medical", &["canHealHumans", "canFixRobots"])
        .child("canHealHumans", required().default_value(false))
        .child("canFixRobots", required().default_value(false))
}

pub fn astromech_droid_shape() -> GroupShape {
    droid("Astromech", &["toolCount"]).child("toolCount", required())
}

pub fn assassin_droid_shape() -> GroupShape {
    droid("Assassin", &["weapons"]).child("weapons", required())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_vehicle_listing_when_round_tripped_then_product_rejoined() {
        let mapper = listing_mapper();
        let listing = json!({
            "id": "1",
            "title": "X-Wing",
            "imageUrl": "x.png",
            "price": 10,
            "listingType": "Vehicle",
            "product": { "vehicleType": "Spaceship", "color": "white" }
        });

        let rep = mapper.to_representation(&listing).unwrap();
        assert!(rep.contains_key("vehicleProduct"));
        assert!(!rep.contains_key("product"));
        assert_eq!(mapper.from_representation(&rep).unwrap(), listing);
    }

    #[test]
    fn given_unknown_vehicle_type_when_mapping_then_only_tag_kept() {
        let mapper = product_mapper(VEHICLE_TYPE, VEHICLE_VARIANTS);
        let rep = mapper
            .to_representation(&json!({ "vehicleType": "Walker" }))
            .unwrap();
        assert_eq!(Value::Object(rep), json!({ "vehicleType": "Walker" }));
    }
}
