//! 欧拉角与四元数转换
//!
//! 坐标系为 Quake 约定：x 向前，y 向左，z 向上。
//! 旋转顺序先 roll（绕 x），再 pitch（绕 y），最后 yaw（绕 z），方向遵循右手定则。

use glam::{DMat3, DQuat, EulerRot};

/// 欧拉角（度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    /// 绕 y 轴
    pub pitch: f64,
    /// 绕 z 轴
    pub yaw: f64,
    /// 绕 x 轴
    pub roll: f64,
}

impl EulerAngles {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// 转换为单位四元数：q = Yaw * Pitch * Roll
    pub fn to_quat(self) -> DQuat {
        DQuat::from_euler(
            EulerRot::ZYX,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
        .normalize()
    }

    /// 从四元数还原欧拉角，零长度四元数视为单位旋转
    pub fn from_quat(q: DQuat) -> Self {
        if q.length_squared() < 1e-24 {
            return Self::default();
        }
        let (yaw, pitch, roll) = q.normalize().to_euler(EulerRot::ZYX);
        Self {
            pitch: pitch.to_degrees(),
            yaw: yaw.to_degrees(),
            roll: roll.to_degrees(),
        }
    }

    /// 旋转矩阵 R = YAW * (PITCH * ROLL)
    pub fn rotation_matrix(self) -> DMat3 {
        let yaw = DMat3::from_rotation_z(self.yaw.to_radians());
        let pitch = DMat3::from_rotation_y(self.pitch.to_radians());
        let roll = DMat3::from_rotation_x(self.roll.to_radians());
        yaw * (pitch * roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn assert_vec_close(a: DVec3, b: DVec3) {
        assert!((a - b).length() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_yaw_turns_forward_to_left() {
        let q = EulerAngles::new(0.0, 90.0, 0.0).to_quat();
        assert_vec_close(q * DVec3::X, DVec3::Y);
    }

    #[test]
    fn test_pitch_follows_right_hand_rule() {
        // 绕 y 轴正向旋转：x 转向 -z
        let q = EulerAngles::new(90.0, 0.0, 0.0).to_quat();
        assert_vec_close(q * DVec3::X, DVec3::NEG_Z);
    }

    #[test]
    fn test_matrix_matches_quaternion() {
        let angles = EulerAngles::new(12.0, -40.0, 75.0);
        let m = angles.rotation_matrix();
        let q = angles.to_quat();
        let v = DVec3::new(1.0, 2.0, -3.0);
        assert_vec_close(m * v, q * v);
    }

    #[test]
    fn test_round_trip() {
        let angles = EulerAngles::new(20.0, 135.0, -60.0);
        let back = EulerAngles::from_quat(angles.to_quat());
        assert!((back.pitch - 20.0).abs() < 1e-9);
        assert!((back.yaw - 135.0).abs() < 1e-9);
        assert!((back.roll + 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_quat_is_identity() {
        let angles = EulerAngles::from_quat(DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert_eq!(angles, EulerAngles::default());
    }
}
