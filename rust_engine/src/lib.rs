//! CamPath Engine - 关键帧相机路径引擎
//!
//! 提供：
//! - 按时间排序的关键帧存储（位置、朝向、视场角、选择状态、Hermite 切线）
//! - 各通道独立插值：线性、自然三次样条、带切线 Hermite、球面线性/三次
//! - 选择与批量编辑：平移、缩放时间、旋转、锚点变换
//! - XML 读写与变更通知

pub mod animation;
pub mod config;
pub mod math;

pub use animation::{CamPath, CamPathValue, Channel, DoubleInterp, QuaternionInterp, TangentMode};
pub use config::CamPathConfig;
pub use math::EulerAngles;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CamPathError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("Format error: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, CamPathError>;
