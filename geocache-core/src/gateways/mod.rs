pub mod dead_letter;
pub mod geocode;
