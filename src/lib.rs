pub mod buffer;
pub mod config;
pub mod error;
pub mod landmarks;
pub mod receiver;
pub mod retarget;
pub mod skeleton;
pub mod visibility;

pub use buffer::LandmarkBuffer;
pub use config::Config;
pub use retarget::RetargetEngine;
pub use skeleton::{Finger, HandRig, HandSkeleton};
pub use visibility::VisibilityState;
