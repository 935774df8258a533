//! 自然三次样条插值
//!
//! 穿过通道全部关键帧的全局 C² 样条，两端二阶导数为 0。
//! 每次存储变化后全量重建。

use super::{find_segment, ChannelView, Interpolation};

/// 自然三次样条
#[derive(Debug, Default)]
pub struct CubicInterpolation {
    spline: Option<NaturalSpline>,
}

impl CubicInterpolation {
    pub fn new() -> Self {
        Self { spline: None }
    }
}

impl Interpolation<f64> for CubicInterpolation {
    fn can_eval(&self, view: &ChannelView<'_, f64>) -> bool {
        view.len() >= 2
    }

    fn eval(&mut self, view: &ChannelView<'_, f64>, t: f64) -> f64 {
        self.spline
            .get_or_insert_with(|| NaturalSpline::build(view.collect()))
            .eval(t)
    }

    fn keyframes_changed(&mut self) {
        self.spline = None;
    }
}

/// 样条数据：节点与各节点处的二阶导数
#[derive(Debug)]
struct NaturalSpline {
    times: Vec<f64>,
    values: Vec<f64>,
    second_derivs: Vec<f64>,
}

impl NaturalSpline {
    /// 用追赶法解三对角方程组求二阶导数
    fn build(points: Vec<(f64, f64)>) -> Self {
        let (times, values): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
        let n = times.len();
        let mut second_derivs = vec![0.0; n];

        if n >= 3 {
            let h: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();

            // 内部节点 1..n-1 的方程：
            // h[i-1] M[i-1] + 2 (h[i-1] + h[i]) M[i] + h[i] M[i+1] = rhs[i]
            let mut diag = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                diag[i] = 2.0 * (h[i - 1] + h[i]);
                rhs[i] = 6.0
                    * ((values[i + 1] - values[i]) / h[i] - (values[i] - values[i - 1]) / h[i - 1]);
            }

            // 前向消元
            for i in 2..n - 1 {
                let m = h[i - 1] / diag[i - 1];
                diag[i] -= m * h[i - 1];
                rhs[i] -= m * rhs[i - 1];
            }

            // 回代
            for i in (1..n - 1).rev() {
                let upper = if i + 1 < n - 1 { h[i] * second_derivs[i + 1] } else { 0.0 };
                second_derivs[i] = (rhs[i] - upper) / diag[i];
            }
        }

        Self {
            times,
            values,
            second_derivs,
        }
    }

    fn eval(&self, t: f64) -> f64 {
        let n = self.times.len();
        match n {
            0 => 0.0,
            1 => self.values[0],
            _ => {
                if t <= self.times[0] {
                    return self.values[0];
                }
                if t >= self.times[n - 1] {
                    return self.values[n - 1];
                }

                let i = find_segment(&self.times, t);
                let h = self.times[i + 1] - self.times[i];
                let a = self.times[i + 1] - t;
                let b = t - self.times[i];
                let m0 = self.second_derivs[i];
                let m1 = self.second_derivs[i + 1];
                let y0 = self.values[i];
                let y1 = self.values[i + 1];

                m0 * a * a * a / (6.0 * h)
                    + m1 * b * b * b / (6.0 * h)
                    + (y0 / h - m0 * h / 6.0) * a
                    + (y1 / h - m1 * h / 6.0) * b
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::channel_view::select_fov;
    use crate::animation::{CamPathValue, KeyframeMap};

    fn map_of(points: &[(f64, f64)]) -> KeyframeMap {
        points
            .iter()
            .map(|&(t, fov)| {
                (
                    t,
                    CamPathValue {
                        fov,
                        ..CamPathValue::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_passes_through_keys() {
        let map = map_of(&[(0.0, 10.0), (1.0, 30.0), (2.5, 20.0), (4.0, 50.0)]);
        let view = ChannelView::new(&map, select_fov);
        let mut interp = CubicInterpolation::new();
        for (t, v) in [(0.0, 10.0), (1.0, 30.0), (2.5, 20.0), (4.0, 50.0)] {
            assert!((interp.eval(&view, t) - v).abs() < 1e-9);
        }
    }

    #[test]
    fn test_two_keys_is_linear() {
        let map = map_of(&[(0.0, 0.0), (2.0, 4.0)]);
        let view = ChannelView::new(&map, select_fov);
        let mut interp = CubicInterpolation::new();
        assert!((interp.eval(&view, 0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reproduces_straight_line() {
        // 自然样条对共线点退化为直线
        let map = map_of(&[(0.0, 0.0), (1.0, 2.0), (3.0, 6.0), (4.0, 8.0)]);
        let view = ChannelView::new(&map, select_fov);
        let mut interp = CubicInterpolation::new();
        assert!((interp.eval(&view, 2.0) - 4.0).abs() < 1e-9);
        assert!((interp.eval(&view, 3.5) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_smooth_through_peak() {
        let map = map_of(&[(0.0, 0.0), (1.0, 10.0), (2.0, 0.0)]);
        let view = ChannelView::new(&map, select_fov);
        let mut interp = CubicInterpolation::new();
        // 对称数据：M1 = -30，中点值 = 6.875
        assert!((interp.eval(&view, 0.5) - 6.875).abs() < 1e-9);
        assert!((interp.eval(&view, 1.5) - 6.875).abs() < 1e-9);
    }

    #[test]
    fn test_repeat_invalidation_is_idempotent() {
        let map = map_of(&[(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]);
        let view = ChannelView::new(&map, select_fov);
        let mut interp = CubicInterpolation::new();
        interp.keyframes_changed();
        let a = interp.eval(&view, 1.3);
        interp.keyframes_changed();
        interp.keyframes_changed();
        let b = interp.eval(&view, 1.3);
        assert_eq!(a, b);
    }
}
