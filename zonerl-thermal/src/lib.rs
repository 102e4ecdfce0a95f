pub mod disturbance;
pub mod env;
pub mod fit;
pub mod integrate;
pub mod state_space;
