pub mod bbox;
pub mod caption;
pub mod lexicon;
pub mod palette;
pub mod query;
pub mod rooms;
pub mod vocab;
