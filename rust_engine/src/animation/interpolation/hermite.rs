//! 带切线的 Hermite 插值（自定义插值）
//!
//! 每段是一条三次贝塞尔曲线：
//! - P0 = (t0, y0)，P3 = (t1, y1)
//! - P1 = (t0 + w_out·Δt/3, y0 + m_out·w_out·Δt/3)
//! - P2 = (t1 − w_in·Δt/3,  y1 − m_in·w_in·Δt/3)
//!
//! 权重都为 1 时即标准三次 Hermite。斜率 m 按切线模式求得，
//! Auto 模式对自然三次样条数值求导，近似非自定义插值下的曲线形状。

use crate::animation::keyframe::{Channel, ChannelTangents, TangentMode};
use crate::config::CamPathConfig;

use super::{ChannelView, CubicInterpolation, Interpolation};

/// 预计算的 Hermite 段
#[derive(Debug, Clone, Copy)]
struct HermiteSegment {
    t0: f64,
    t1: f64,
    y0: f64,
    y1: f64,
    /// 段起点出切线斜率
    slope_out: f64,
    /// 段终点入切线斜率
    slope_in: f64,
    weight_out: f64,
    weight_in: f64,
}

impl HermiteSegment {
    fn eval(&self, t: f64) -> f64 {
        let dt = self.t1 - self.t0;
        if dt <= 0.0 {
            return self.y0;
        }

        // 归一化后的贝塞尔 x 控制点，权重在 [0, 3] 内时 x(s) 单调
        let x1 = self.weight_out / 3.0;
        let x2 = 1.0 - self.weight_in / 3.0;
        let s = solve_bezier_x(x1, x2, (t - self.t0) / dt);

        let c1 = self.y0 + self.slope_out * self.weight_out * dt / 3.0;
        let c2 = self.y1 - self.slope_in * self.weight_in * dt / 3.0;

        let u = 1.0 - s;
        u * u * u * self.y0 + 3.0 * u * u * s * c1 + 3.0 * u * s * s * c2 + s * s * s * self.y1
    }
}

/// 贝塞尔 x 分量：x(0) = 0，x(1) = 1
#[inline]
fn bezier_x(x1: f64, x2: f64, s: f64) -> f64 {
    let u = 1.0 - s;
    3.0 * u * u * s * x1 + 3.0 * u * s * s * x2 + s * s * s
}

#[inline]
fn bezier_dx(x1: f64, x2: f64, s: f64) -> f64 {
    let u = 1.0 - s;
    3.0 * u * u * x1 + 6.0 * u * s * (x2 - x1) + 3.0 * s * s * (1.0 - x2)
}

/// 求解 x(s) = x 的参数 s
///
/// 牛顿法，跳出区间时退回二分。
fn solve_bezier_x(x1: f64, x2: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let mut lo = 0.0;
    let mut hi = 1.0;
    let mut s = x;

    for _ in 0..32 {
        let err = bezier_x(x1, x2, s) - x;
        if err.abs() < 1e-12 {
            break;
        }
        if err > 0.0 {
            hi = s;
        } else {
            lo = s;
        }

        let dx = bezier_dx(x1, x2, s);
        let newton = if dx.abs() > 1e-9 { s - err / dx } else { f64::NAN };
        s = if newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
    }

    s
}

/// Hermite 插值器
#[derive(Debug)]
pub struct HermiteInterpolation {
    channel: Channel,
    config: CamPathConfig,
    /// Auto 切线的参考曲线
    auto_curve: CubicInterpolation,
    segments: Option<Vec<HermiteSegment>>,
}

impl HermiteInterpolation {
    pub fn new(channel: Channel, config: &CamPathConfig) -> Self {
        Self {
            channel,
            config: config.clone(),
            auto_curve: CubicInterpolation::new(),
            segments: None,
        }
    }

    fn build_segments(&mut self, view: &ChannelView<'_, f64>) -> Vec<HermiteSegment> {
        let channel = self.channel;
        let keys: Vec<(f64, f64, ChannelTangents)> = view
            .map()
            .iter()
            .map(|(t, v)| (t, channel.value(v), *v.tangents(channel)))
            .collect();

        let mut segments = Vec::with_capacity(keys.len().saturating_sub(1));
        for pair in keys.windows(2) {
            let (t0, y0, tan0) = pair[0];
            let (t1, y1, tan1) = pair[1];
            let dt = t1 - t0;
            let chord = if dt > 0.0 { (y1 - y0) / dt } else { 0.0 };
            let eps = self.config.auto_epsilon(dt);

            let slope_out = match tan0.mode_out {
                TangentMode::Free => tan0.slope_out,
                TangentMode::Flat => 0.0,
                TangentMode::Linear => chord,
                TangentMode::Auto => {
                    let a = self.auto_curve.eval(view, t0);
                    let b = self.auto_curve.eval(view, t0 + eps);
                    (b - a) / eps
                }
            };

            let slope_in = match tan1.mode_in {
                TangentMode::Free => tan1.slope_in,
                TangentMode::Flat => 0.0,
                TangentMode::Linear => chord,
                TangentMode::Auto => {
                    let a = self.auto_curve.eval(view, t1 - eps);
                    let b = self.auto_curve.eval(view, t1);
                    (b - a) / eps
                }
            };

            segments.push(HermiteSegment {
                t0,
                t1,
                y0,
                y1,
                slope_out,
                slope_in,
                weight_out: self.config.clamp_weight(tan0.weight_out),
                weight_in: self.config.clamp_weight(tan1.weight_in),
            });
        }

        segments
    }
}

impl Interpolation<f64> for HermiteInterpolation {
    fn can_eval(&self, view: &ChannelView<'_, f64>) -> bool {
        view.len() >= 2
    }

    fn eval(&mut self, view: &ChannelView<'_, f64>, t: f64) -> f64 {
        if self.segments.is_none() {
            let segments = self.build_segments(view);
            self.segments = Some(segments);
        }
        let segments = self.segments.as_deref().unwrap_or_default();

        let (first, last) = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => (first, last),
            // 少于 2 个关键帧
            _ => return view.first().map(|(_, y)| y).unwrap_or(0.0),
        };

        if t <= first.t0 {
            return first.y0;
        }
        if t >= last.t1 {
            return last.y1;
        }

        let i = segments
            .partition_point(|s| s.t0 <= t)
            .saturating_sub(1)
            .min(segments.len() - 1);
        segments[i].eval(t)
    }

    fn keyframes_changed(&mut self) {
        self.segments = None;
        self.auto_curve.keyframes_changed();
    }
}
