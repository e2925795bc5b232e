pub mod itinerary;
pub mod location;
pub mod place;
pub mod review;
pub mod session;
pub mod share;
pub mod trip;
pub mod user;
pub mod weather;
