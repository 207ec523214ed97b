//! Domain types: items, statuses, and the status registry.

pub mod item;
pub mod status;

pub use item::{Item, ItemPatch, NewItem, ParseStatusError, Status, slugify};
