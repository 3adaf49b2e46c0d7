pub mod location;
pub mod plant;
pub mod state;
