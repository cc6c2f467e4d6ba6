pub mod controller;

pub use controller::{ControlHandle, LoopState, RenderLoop};
