//! 朝向通道的球面插值
//!
//! 最短路径修正在段级别进行：相邻关键帧点积为负时取反后者，
//! 保证插值不会绕球面远路。

use glam::DQuat;

use crate::config::CamPathConfig;
use crate::math::quaternion::{align, slerp_shortest, squad, squad_intermediate};

use super::{coefficient, find_segment, ChannelView, Interpolation};

/// 首/尾之外取端点，`f` 负责段内插值
fn eval_clamped<F>(times: &[f64], quats: &[DQuat], t: f64, f: F) -> DQuat
where
    F: FnOnce(usize, f64) -> DQuat,
{
    let n = times.len();
    match n {
        0 => DQuat::IDENTITY,
        1 => quats[0],
        _ => {
            if t <= times[0] {
                return quats[0];
            }
            if t >= times[n - 1] {
                return quats[n - 1];
            }
            let i = find_segment(times, t);
            f(i, coefficient(times[i], times[i + 1], t))
        }
    }
}

/// 球面线性插值
#[derive(Debug)]
pub struct SLinearInterpolation {
    parallel_threshold: f64,
    cache: Option<(Vec<f64>, Vec<DQuat>)>,
}

impl SLinearInterpolation {
    pub fn new(config: &CamPathConfig) -> Self {
        Self {
            parallel_threshold: config.slerp_parallel_threshold,
            cache: None,
        }
    }
}

impl Interpolation<DQuat> for SLinearInterpolation {
    fn can_eval(&self, view: &ChannelView<'_, DQuat>) -> bool {
        view.len() >= 2
    }

    fn eval(&mut self, view: &ChannelView<'_, DQuat>, t: f64) -> DQuat {
        let threshold = self.parallel_threshold;
        let (times, quats) = self.cache.get_or_insert_with(|| view.iter().unzip());
        eval_clamped(times, quats, t, |i, u| {
            slerp_shortest(quats[i], quats[i + 1], u, threshold)
        })
    }

    fn keyframes_changed(&mut self) {
        self.cache = None;
    }
}

/// SQUAD 控制数据
#[derive(Debug)]
struct SquadCache {
    times: Vec<f64>,
    /// 已对齐到同一半球的关键帧
    quats: Vec<DQuat>,
    intermediates: Vec<DQuat>,
}

impl SquadCache {
    fn build(points: Vec<(f64, DQuat)>) -> Self {
        let (times, raw): (Vec<f64>, Vec<DQuat>) = points.into_iter().unzip();

        let mut quats: Vec<DQuat> = Vec::with_capacity(raw.len());
        for q in raw {
            let aligned = match quats.last() {
                Some(&prev) => align(prev, q),
                None => q,
            };
            quats.push(aligned);
        }

        let n = quats.len();
        let intermediates = (0..n)
            .map(|i| {
                if i == 0 || i + 1 == n {
                    quats[i]
                } else {
                    squad_intermediate(quats[i - 1], quats[i], quats[i + 1])
                }
            })
            .collect();

        Self {
            times,
            quats,
            intermediates,
        }
    }
}

/// 球面三次插值（SQUAD），在关键帧处 C¹ 连续
#[derive(Debug)]
pub struct SCubicInterpolation {
    parallel_threshold: f64,
    cache: Option<SquadCache>,
}

impl SCubicInterpolation {
    pub fn new(config: &CamPathConfig) -> Self {
        Self {
            parallel_threshold: config.slerp_parallel_threshold,
            cache: None,
        }
    }
}

impl Interpolation<DQuat> for SCubicInterpolation {
    fn can_eval(&self, view: &ChannelView<'_, DQuat>) -> bool {
        view.len() >= 2
    }

    fn eval(&mut self, view: &ChannelView<'_, DQuat>, t: f64) -> DQuat {
        let threshold = self.parallel_threshold;
        let cache = self
            .cache
            .get_or_insert_with(|| SquadCache::build(view.collect()));
        let SquadCache {
            times,
            quats,
            intermediates,
        } = cache;

        eval_clamped(times, quats, t, |i, u| {
            squad(
                quats[i],
                quats[i + 1],
                intermediates[i],
                intermediates[i + 1],
                u,
                threshold,
            )
        })
    }

    fn keyframes_changed(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::channel_view::select_rotation;
    use crate::animation::{CamPathValue, KeyframeMap};
    use crate::math::quaternion::angle_between;
    use glam::DVec3;

    fn map_of(points: &[(f64, DQuat)]) -> KeyframeMap {
        points
            .iter()
            .map(|&(t, rotation)| {
                (
                    t,
                    CamPathValue {
                        rotation,
                        ..CamPathValue::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_slinear_midpoint() {
        let map = map_of(&[(0.0, DQuat::IDENTITY), (2.0, DQuat::from_rotation_z(1.0))]);
        let view = ChannelView::new(&map, select_rotation);
        let mut interp = SLinearInterpolation::new(&CamPathConfig::default());
        let mid = interp.eval(&view, 1.0);
        assert!(angle_between(mid, DQuat::from_rotation_z(0.5)) < 1e-9);
    }

    #[test]
    fn test_antipodal_keys_do_not_spin() {
        // q 与 -q 表示同一旋转，插值不应绕远路
        let q = DQuat::from_axis_angle(DVec3::new(0.3, -0.5, 0.8).normalize(), 1.1);
        let map = map_of(&[(0.0, q), (1.0, -q)]);
        let view = ChannelView::new(&map, select_rotation);

        let mut linear = SLinearInterpolation::new(&CamPathConfig::default());
        let mut cubic = SCubicInterpolation::new(&CamPathConfig::default());
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!(angle_between(linear.eval(&view, t), q) < 1e-6);
            assert!(angle_between(cubic.eval(&view, t), q) < 1e-6);
        }
    }

    #[test]
    fn test_negative_dot_takes_short_arc() {
        let a = DQuat::from_rotation_z(0.0);
        let b = -DQuat::from_rotation_z(0.6);
        let map = map_of(&[(0.0, a), (1.0, b)]);
        let view = ChannelView::new(&map, select_rotation);
        let mut interp = SCubicInterpolation::new(&CamPathConfig::default());
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let q = interp.eval(&view, t);
            assert!(angle_between(q, a) <= 0.6 + 1e-9);
            assert!(angle_between(q, b) <= 0.6 + 1e-9);
        }
    }

    #[test]
    fn test_scubic_hits_keys() {
        let keys = [
            (0.0, DQuat::IDENTITY),
            (1.0, DQuat::from_rotation_z(0.8)),
            (2.0, DQuat::from_rotation_x(0.4) * DQuat::from_rotation_z(0.8)),
            (3.0, DQuat::from_rotation_y(-0.3)),
        ];
        let map = map_of(&keys);
        let view = ChannelView::new(&map, select_rotation);
        let mut interp = SCubicInterpolation::new(&CamPathConfig::default());
        for (t, q) in keys {
            assert!(angle_between(interp.eval(&view, t), q) < 1e-9);
        }
    }

    #[test]
    fn test_scubic_uniform_rotation_stays_on_axis() {
        let map = map_of(&[
            (0.0, DQuat::from_rotation_z(0.0)),
            (1.0, DQuat::from_rotation_z(0.5)),
            (2.0, DQuat::from_rotation_z(1.0)),
        ]);
        let view = ChannelView::new(&map, select_rotation);
        let mut interp = SCubicInterpolation::new(&CamPathConfig::default());
        let q = interp.eval(&view, 0.5);
        assert!(angle_between(q, DQuat::from_rotation_z(0.25)) < 1e-6);
    }
}
