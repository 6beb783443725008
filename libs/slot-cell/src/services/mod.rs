pub mod generator;
pub mod store;

pub use generator::{generate_slots, slot_grid};
pub use store::SlotStoreService;
