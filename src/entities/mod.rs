pub mod facility;
pub mod facility_photo;
pub mod facility_photo_link;

// Taxonomy axes
pub mod facility_age;
pub mod facility_covering_type;
pub mod facility_owning_type;
pub mod facility_paying_type;
pub mod facility_type;

// Many-to-many taxonomy links
pub mod facility_age_link;
pub mod facility_paying_type_link;
