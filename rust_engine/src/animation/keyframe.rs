//! 相机路径关键帧

use std::fmt;
use std::str::FromStr;

use glam::{DQuat, DVec3};

use crate::math::quaternion::normalize_or_identity;
use crate::math::EulerAngles;
use crate::CamPathError;

/// 可设置切线的数值通道
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    X = 0,
    Y = 1,
    Z = 2,
    Fov = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::X, Channel::Y, Channel::Z, Channel::Fov];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// 是否属于位置通道组
    pub fn is_position(self) -> bool {
        matches!(self, Channel::X | Channel::Y | Channel::Z)
    }

    /// 读取关键帧上该通道的值
    pub fn value(self, value: &CamPathValue) -> f64 {
        match self {
            Channel::X => value.position.x,
            Channel::Y => value.position.y,
            Channel::Z => value.position.z,
            Channel::Fov => value.fov,
        }
    }

    /// 文件中切线属性的前缀
    pub fn attribute_prefix(self) -> &'static str {
        match self {
            Channel::X => "tx",
            Channel::Y => "ty",
            Channel::Z => "tz",
            Channel::Fov => "tfov",
        }
    }

    /// 切线属性的短前缀（读取时兼容）
    pub fn short_prefix(self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::Z => "z",
            Channel::Fov => "fov",
        }
    }
}

/// Hermite 切线模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TangentMode {
    /// 由非自定义插值曲线数值求导
    #[default]
    Auto,
    /// 斜率为 0
    Flat,
    /// 弦斜率
    Linear,
    /// 使用存储的斜率
    Free,
}

impl TangentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TangentMode::Auto => "auto",
            TangentMode::Flat => "flat",
            TangentMode::Linear => "linear",
            TangentMode::Free => "free",
        }
    }
}

impl fmt::Display for TangentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TangentMode {
    type Err = CamPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            TangentMode::Auto,
            TangentMode::Flat,
            TangentMode::Linear,
            TangentMode::Free,
        ]
        .into_iter()
        .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| CamPathError::Format(format!("unknown tangent mode: {}", s)))
    }
}

/// 单个通道的 Hermite 切线数据
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelTangents {
    pub slope_in: f64,
    pub slope_out: f64,
    pub mode_in: TangentMode,
    pub mode_out: TangentMode,
    pub weight_in: f64,
    pub weight_out: f64,
}

impl Default for ChannelTangents {
    fn default() -> Self {
        Self {
            slope_in: 0.0,
            slope_out: 0.0,
            mode_in: TangentMode::Auto,
            mode_out: TangentMode::Auto,
            weight_in: 1.0,
            weight_out: 1.0,
        }
    }
}

/// 关键帧值
///
/// 切线数据仅在对应通道使用自定义插值时生效，但总是保存以保证文件往返无损。
#[derive(Clone, Debug, PartialEq)]
pub struct CamPathValue {
    pub position: DVec3,
    /// 朝向，构造时归一化；符号不做规范化
    pub rotation: DQuat,
    pub fov: f64,
    /// 编辑器选择状态，不属于相机位姿
    pub selected: bool,
    /// 按 [`Channel::index`] 排列
    pub tangents: [ChannelTangents; 4],
}

impl Default for CamPathValue {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            fov: 90.0,
            selected: false,
            tangents: [ChannelTangents::default(); 4],
        }
    }
}

impl CamPathValue {
    /// 从位置、欧拉角（度）和视场角创建
    pub fn from_euler(position: DVec3, angles: EulerAngles, fov: f64) -> Self {
        Self {
            position,
            rotation: angles.to_quat(),
            fov,
            ..Self::default()
        }
    }

    /// 从位置、四元数和视场角创建
    pub fn from_quat(position: DVec3, rotation: DQuat, fov: f64, selected: bool) -> Self {
        Self {
            position,
            rotation: normalize_or_identity(rotation),
            fov,
            selected,
            ..Self::default()
        }
    }

    /// 当前朝向的欧拉角
    pub fn angles(&self) -> EulerAngles {
        EulerAngles::from_quat(self.rotation)
    }

    #[inline]
    pub fn tangents(&self, channel: Channel) -> &ChannelTangents {
        &self.tangents[channel.index()]
    }

    #[inline]
    pub fn tangents_mut(&mut self, channel: Channel) -> &mut ChannelTangents {
        &mut self.tangents[channel.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let v = CamPathValue::default();
        assert_eq!(v.fov, 90.0);
        assert!(!v.selected);
        for ch in Channel::ALL {
            let t = v.tangents(ch);
            assert_eq!(t.mode_in, TangentMode::Auto);
            assert_eq!(t.weight_out, 1.0);
            assert_eq!(t.slope_in, 0.0);
        }
    }

    #[test]
    fn test_tangent_mode_parse_ignores_case() {
        assert_eq!("FLAT".parse::<TangentMode>().unwrap(), TangentMode::Flat);
        assert_eq!("free".parse::<TangentMode>().unwrap(), TangentMode::Free);
        assert!("smooth".parse::<TangentMode>().is_err());
    }

    #[test]
    fn test_from_quat_normalizes() {
        let v = CamPathValue::from_quat(DVec3::ZERO, DQuat::from_xyzw(0.0, 0.0, 0.0, 2.0), 60.0, true);
        assert!((v.rotation.length() - 1.0).abs() < 1e-12);
        assert!(v.selected);
    }

    #[test]
    fn test_channel_value() {
        let v = CamPathValue::from_euler(DVec3::new(1.0, 2.0, 3.0), EulerAngles::default(), 70.0);
        assert_eq!(Channel::X.value(&v), 1.0);
        assert_eq!(Channel::Z.value(&v), 3.0);
        assert_eq!(Channel::Fov.value(&v), 70.0);
    }
}
