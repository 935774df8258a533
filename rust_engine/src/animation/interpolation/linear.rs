//! 分段线性插值

use super::{coefficient, find_segment, ChannelView, Interpolation};

/// 分段线性插值，关键帧时间范围外取首/尾值
#[derive(Debug, Default)]
pub struct LinearInterpolation {
    cache: Option<Points>,
}

#[derive(Debug)]
struct Points {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl LinearInterpolation {
    pub fn new() -> Self {
        Self { cache: None }
    }
}

impl Interpolation<f64> for LinearInterpolation {
    fn can_eval(&self, view: &ChannelView<'_, f64>) -> bool {
        view.len() >= 2
    }

    fn eval(&mut self, view: &ChannelView<'_, f64>, t: f64) -> f64 {
        let Points { times, values } = self.cache.get_or_insert_with(|| {
            let (times, values) = view.iter().unzip();
            Points { times, values }
        });

        match times.len() {
            0 => 0.0,
            1 => values[0],
            n => {
                if t <= times[0] {
                    return values[0];
                }
                if t >= times[n - 1] {
                    return values[n - 1];
                }
                let i = find_segment(times, t);
                let coef = coefficient(times[i], times[i + 1], t);
                values[i] + (values[i + 1] - values[i]) * coef
            }
        }
    }

    fn keyframes_changed(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::channel_view::select_x;
    use crate::animation::{CamPathValue, KeyframeMap};
    use glam::DVec3;

    fn map_of(points: &[(f64, f64)]) -> KeyframeMap {
        points
            .iter()
            .map(|&(t, x)| {
                (
                    t,
                    CamPathValue {
                        position: DVec3::new(x, 0.0, 0.0),
                        ..CamPathValue::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_linear_between_and_outside() {
        let map = map_of(&[(0.0, 0.0), (2.0, 10.0), (3.0, 0.0)]);
        let view = ChannelView::new(&map, select_x);
        let mut interp = LinearInterpolation::new();
        assert!(interp.can_eval(&view));
        assert!((interp.eval(&view, 1.0) - 5.0).abs() < 1e-12);
        assert!((interp.eval(&view, 2.5) - 5.0).abs() < 1e-12);
        assert_eq!(interp.eval(&view, -1.0), 0.0);
        assert_eq!(interp.eval(&view, 10.0), 0.0);
        assert_eq!(interp.eval(&view, 2.0), 10.0);
    }

    #[test]
    fn test_cache_invalidation() {
        let mut map = map_of(&[(0.0, 0.0), (1.0, 1.0)]);
        let mut interp = LinearInterpolation::new();
        {
            let view = ChannelView::new(&map, select_x);
            assert!((interp.eval(&view, 0.5) - 0.5).abs() < 1e-12);
        }
        map.insert(
            1.0,
            CamPathValue {
                position: DVec3::new(3.0, 0.0, 0.0),
                ..CamPathValue::default()
            },
        );
        interp.keyframes_changed();
        let view = ChannelView::new(&map, select_x);
        assert!((interp.eval(&view, 0.5) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_key_cannot_eval() {
        let map = map_of(&[(0.0, 4.0)]);
        let view = ChannelView::new(&map, select_x);
        let mut interp = LinearInterpolation::new();
        assert!(!interp.can_eval(&view));
        assert_eq!(interp.eval(&view, 3.0), 4.0);
    }
}
