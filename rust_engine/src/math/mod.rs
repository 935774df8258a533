//! 数学工具

mod euler;
pub mod quaternion;

pub use euler::EulerAngles;
