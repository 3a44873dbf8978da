//! The vehicle/droid listing form: typed documents and their node shapes.

pub mod model;
pub mod schema;

pub use model::{
    AssassinDroid, AstromechDroid, CrewMember, DroidProduct, Listing, ListingType, MedicalDroid,
    Product, ProtocolDroid, Speeder, Spaceship, VehicleProduct,
};
pub use schema::{
    crew_member_shape, crew_members_shape, listing_shape, CREW_MEMBERS, DROID_TYPE, LISTING_TYPE,
    VEHICLE_TYPE,
};
