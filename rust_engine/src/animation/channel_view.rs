//! 通道视图
//!
//! 把关键帧值投影成单个通道（标量/四元数/布尔），保持存储的时间顺序，
//! 作为插值器的输入，使每个通道独立插值。

use glam::DQuat;

use super::keyframe::CamPathValue;
use super::keyframe_map::KeyframeMap;

/// 通道选择函数
pub type Selector<T> = fn(&CamPathValue) -> T;

pub fn select_x(value: &CamPathValue) -> f64 {
    value.position.x
}

pub fn select_y(value: &CamPathValue) -> f64 {
    value.position.y
}

pub fn select_z(value: &CamPathValue) -> f64 {
    value.position.z
}

pub fn select_rotation(value: &CamPathValue) -> DQuat {
    value.rotation
}

pub fn select_fov(value: &CamPathValue) -> f64 {
    value.fov
}

pub fn select_selected(value: &CamPathValue) -> bool {
    value.selected
}

/// 只读通道视图
pub struct ChannelView<'a, T> {
    map: &'a KeyframeMap,
    select: Selector<T>,
}

impl<T> Clone for ChannelView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ChannelView<'_, T> {}

impl<'a, T> ChannelView<'a, T> {
    pub fn new(map: &'a KeyframeMap, select: Selector<T>) -> Self {
        Self { map, select }
    }

    /// 底层存储（Hermite 插值需要读取切线）
    pub fn map(&self) -> &'a KeyframeMap {
        self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 按时间顺序遍历 (时间, 通道值)
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (f64, T)> + 'a
    where
        T: 'a,
    {
        let select = self.select;
        self.map.iter().map(move |(t, v)| (t, select(v)))
    }

    /// 收集为 (时间, 值) 列表，供插值器缓存
    pub fn collect(&self) -> Vec<(f64, T)> {
        self.map.iter().map(|(t, v)| (t, (self.select)(v))).collect()
    }

    pub fn first(&self) -> Option<(f64, T)> {
        self.map.first().map(|(t, v)| (t, (self.select)(v)))
    }

    pub fn last(&self) -> Option<(f64, T)> {
        self.map.last().map(|(t, v)| (t, (self.select)(v)))
    }

    /// 包围 `t` 的前后关键帧，见 [`KeyframeMap::search_closest`]
    pub fn search_closest(&self, t: f64) -> (Option<(f64, T)>, Option<(f64, T)>) {
        let (prev, next) = self.map.search_closest(t);
        (
            prev.map(|(time, v)| (time, (self.select)(v))),
            next.map(|(time, v)| (time, (self.select)(v))),
        )
    }
}
