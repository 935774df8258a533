//! 插值策略
//!
//! 每个通道组持有一个插值器，插值器缓存派生数据（样条系数、SQUAD 控制点等），
//! 存储变化后必须调用 [`Interpolation::keyframes_changed`] 使缓存失效。

mod cubic;
mod hermite;
mod hold;
mod linear;
mod slerp;

use std::fmt;
use std::str::FromStr;

use glam::DQuat;

use crate::config::CamPathConfig;
use crate::CamPathError;

use super::channel_view::ChannelView;
use super::keyframe::Channel;

pub use cubic::CubicInterpolation;
pub use hermite::HermiteInterpolation;
pub use hold::HoldInterpolation;
pub use linear::LinearInterpolation;
pub use slerp::{SCubicInterpolation, SLinearInterpolation};

/// 插值器 trait
pub trait Interpolation<T> {
    /// 关键帧数量是否足以求值
    fn can_eval(&self, view: &ChannelView<'_, T>) -> bool;

    /// 求值；调用前必须确认 `can_eval`
    fn eval(&mut self, view: &ChannelView<'_, T>, t: f64) -> T;

    /// 存储已变化，丢弃缓存
    fn keyframes_changed(&mut self);
}

/// 标量通道插值方法
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DoubleInterp {
    #[default]
    Default,
    Linear,
    Cubic,
    /// 带切线的 Hermite
    Custom,
}

impl DoubleInterp {
    pub const ALL: [DoubleInterp; 4] = [
        DoubleInterp::Default,
        DoubleInterp::Linear,
        DoubleInterp::Cubic,
        DoubleInterp::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DoubleInterp::Default => "default",
            DoubleInterp::Linear => "linear",
            DoubleInterp::Cubic => "cubic",
            DoubleInterp::Custom => "custom",
        }
    }

    /// Default 解析为 Cubic
    pub fn resolve(self) -> DoubleInterp {
        match self {
            DoubleInterp::Default => DoubleInterp::Cubic,
            other => other,
        }
    }

    /// 为某个通道创建插值器
    pub fn build(self, channel: Channel, config: &CamPathConfig) -> Box<dyn Interpolation<f64>> {
        match self.resolve() {
            DoubleInterp::Linear => Box::new(LinearInterpolation::new()),
            DoubleInterp::Custom => Box::new(HermiteInterpolation::new(channel, config)),
            _ => Box::new(CubicInterpolation::new()),
        }
    }
}

impl fmt::Display for DoubleInterp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoubleInterp {
    type Err = CamPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DoubleInterp::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CamPathError::Format(format!("unknown interpolation method: {}", s)))
    }
}

/// 朝向通道插值方法
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QuaternionInterp {
    #[default]
    Default,
    SLinear,
    SCubic,
}

impl QuaternionInterp {
    pub const ALL: [QuaternionInterp; 3] = [
        QuaternionInterp::Default,
        QuaternionInterp::SLinear,
        QuaternionInterp::SCubic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuaternionInterp::Default => "default",
            QuaternionInterp::SLinear => "sLinear",
            QuaternionInterp::SCubic => "sCubic",
        }
    }

    /// Default 解析为 SCubic
    pub fn resolve(self) -> QuaternionInterp {
        match self {
            QuaternionInterp::Default => QuaternionInterp::SCubic,
            other => other,
        }
    }

    pub fn build(self, config: &CamPathConfig) -> Box<dyn Interpolation<DQuat>> {
        match self.resolve() {
            QuaternionInterp::SLinear => Box::new(SLinearInterpolation::new(config)),
            _ => Box::new(SCubicInterpolation::new(config)),
        }
    }
}

impl fmt::Display for QuaternionInterp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuaternionInterp {
    type Err = CamPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuaternionInterp::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CamPathError::Format(format!("unknown rotation interpolation method: {}", s)))
    }
}

/// 段内插值系数 [0, 1]
#[inline]
pub(crate) fn coefficient(t0: f64, t1: f64, t: f64) -> f64 {
    let interval = t1 - t0;
    if interval > 0.0 {
        ((t - t0) / interval).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// 查找 `t` 所在段的起点下标 i（times[i] <= t < times[i + 1]），结果限制在 [0, n - 2]
///
/// `times` 至少需要 2 个元素。
pub(crate) fn find_segment(times: &[f64], t: f64) -> usize {
    let upper = times.partition_point(|&x| x <= t);
    upper.saturating_sub(1).min(times.len().saturating_sub(2))
}
