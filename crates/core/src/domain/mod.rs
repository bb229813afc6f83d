pub mod mode;
pub mod pitch;
