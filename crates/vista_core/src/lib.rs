pub mod camera;
pub mod diagnostics;
pub mod lighting;
pub mod portal;
pub mod state;
pub mod transition;
