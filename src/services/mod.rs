pub mod permissions;
pub mod places;
pub mod sharing;
pub mod store;
pub mod weather;
