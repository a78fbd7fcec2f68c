pub mod types;

pub use types::{Asteroid, Coordinates, DiameterRange, Fireball, NeoEvent};
