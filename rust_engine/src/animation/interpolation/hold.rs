//! 阶跃插值（选择状态通道）

use super::{ChannelView, Interpolation};

/// 取时间不晚于 `t` 的最近关键帧的值，首帧之前取首帧值
///
/// 直接在有序存储上查找，不需要缓存。
#[derive(Debug, Default)]
pub struct HoldInterpolation;

impl HoldInterpolation {
    pub fn new() -> Self {
        Self
    }
}

impl Interpolation<bool> for HoldInterpolation {
    fn can_eval(&self, view: &ChannelView<'_, bool>) -> bool {
        !view.is_empty()
    }

    fn eval(&mut self, view: &ChannelView<'_, bool>, t: f64) -> bool {
        let (prev, next) = view.search_closest(t);
        prev.or(next).map(|(_, v)| v).unwrap_or(false)
    }

    fn keyframes_changed(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::channel_view::select_selected;
    use crate::animation::{CamPathValue, KeyframeMap};

    fn map_of(points: &[(f64, bool)]) -> KeyframeMap {
        points
            .iter()
            .map(|&(t, selected)| {
                (
                    t,
                    CamPathValue {
                        selected,
                        ..CamPathValue::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_steps_at_keys() {
        let map = map_of(&[(0.0, true), (1.0, false), (2.0, true)]);
        let view = ChannelView::new(&map, select_selected);
        let mut interp = HoldInterpolation::new();
        assert!(interp.can_eval(&view));
        assert!(interp.eval(&view, -5.0));
        assert!(interp.eval(&view, 0.99));
        assert!(!interp.eval(&view, 1.0));
        assert!(!interp.eval(&view, 1.5));
        assert!(interp.eval(&view, 2.0));
        assert!(interp.eval(&view, 100.0));
    }

    #[test]
    fn test_single_key_is_enough() {
        let map = map_of(&[(3.0, true)]);
        let view = ChannelView::new(&map, select_selected);
        let interp = HoldInterpolation::new();
        assert!(interp.can_eval(&view));

        let empty = KeyframeMap::new();
        assert!(!interp.can_eval(&ChannelView::new(&empty, select_selected)));
    }
}
