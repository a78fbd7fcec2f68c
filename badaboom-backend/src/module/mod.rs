pub mod neo;
pub mod fireball;
pub mod stats;
pub mod renderer;
pub mod report;
