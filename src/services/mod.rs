// Taxonomy normalizer
pub mod taxonomy;

// Facility records and search
pub mod facilities;
pub mod search;

// Bulk workbook import and export
pub mod spreadsheet;

// Photo attachments
pub mod photos;
