//! 四元数工具：球面插值与 SQUAD

use glam::{DQuat, DVec3};

/// 四元数点积
#[inline]
pub fn dot(a: DQuat, b: DQuat) -> f64 {
    a.dot(b)
}

/// 让 `b` 与 `a` 处于同一半球（点积为负时取反）
#[inline]
pub fn align(a: DQuat, b: DQuat) -> DQuat {
    if dot(a, b) < 0.0 {
        -b
    } else {
        b
    }
}

/// 归一化，零长度时返回单位四元数
pub fn normalize_or_identity(q: DQuat) -> DQuat {
    let len_sq = q.length_squared();
    if len_sq < 1e-24 || !len_sq.is_finite() {
        DQuat::IDENTITY
    } else {
        q * (1.0 / len_sq.sqrt())
    }
}

/// 归一化线性插值
pub fn nlerp(a: DQuat, b: DQuat, t: f64) -> DQuat {
    normalize_or_identity(a * (1.0 - t) + b * t)
}

/// 球面线性插值（点积为负时一般不取反，可能走长弧）
///
/// 两端几乎平行时退化为 nlerp。点积低于 `-parallel_threshold`（几乎反向）时，
/// 两者表示同一旋转，此时将 `b` 取反后按 nlerp 处理，避免除以接近 0 的 sin。
pub fn slerp(a: DQuat, b: DQuat, t: f64, parallel_threshold: f64) -> DQuat {
    let mut b = b;
    let mut d = dot(a, b);

    if d < -parallel_threshold {
        b = -b;
        d = -d;
    }

    if d > parallel_threshold {
        return nlerp(a, b, t);
    }

    let theta_0 = d.clamp(-1.0, 1.0).acos();
    let sin_theta_0 = theta_0.sin();
    let s0 = ((1.0 - t) * theta_0).sin() / sin_theta_0;
    let s1 = (t * theta_0).sin() / sin_theta_0;

    a * s0 + b * s1
}

/// 最短路径球面插值：点积为负时先将 `b` 取反
pub fn slerp_shortest(a: DQuat, b: DQuat, t: f64, parallel_threshold: f64) -> DQuat {
    slerp(a, align(a, b), t, parallel_threshold)
}

/// 单位四元数的对数（纯四元数，w = 0）
pub fn log(q: DQuat) -> DQuat {
    let v = DVec3::new(q.x, q.y, q.z);
    let len = v.length();
    if len < 1e-12 {
        return DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0);
    }
    let k = len.atan2(q.w) / len;
    DQuat::from_xyzw(v.x * k, v.y * k, v.z * k, 0.0)
}

/// 纯四元数的指数
pub fn exp(q: DQuat) -> DQuat {
    let v = DVec3::new(q.x, q.y, q.z);
    let theta = v.length();
    if theta < 1e-12 {
        return DQuat::IDENTITY;
    }
    let s = theta.sin() / theta;
    DQuat::from_xyzw(v.x * s, v.y * s, v.z * s, theta.cos())
}

/// SQUAD 控制四元数
///
/// s_i = q_i * exp(-(log(q_i⁻¹ q_{i-1}) + log(q_i⁻¹ q_{i+1})) / 4)
pub fn squad_intermediate(prev: DQuat, current: DQuat, next: DQuat) -> DQuat {
    let inv = current.conjugate();
    let sum = log(inv * prev) + log(inv * next);
    normalize_or_identity(current * exp(sum * -0.25))
}

/// SQUAD 插值
pub fn squad(q0: DQuat, q1: DQuat, s0: DQuat, s1: DQuat, t: f64, parallel_threshold: f64) -> DQuat {
    let c = slerp(q0, q1, t, parallel_threshold);
    let d = slerp(s0, s1, t, parallel_threshold);
    normalize_or_identity(slerp(c, d, 2.0 * t * (1.0 - t), parallel_threshold))
}

/// 两个旋转之间的角距离（弧度，0..=π）
pub fn angle_between(a: DQuat, b: DQuat) -> f64 {
    let d = dot(normalize_or_identity(a), normalize_or_identity(b)).abs().min(1.0);
    2.0 * d.acos()
}
