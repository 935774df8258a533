//! 关键帧存储
//!
//! 时间到关键帧值的有序映射，时间唯一：在已有时间插入会覆盖旧值（不混合）。

use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;

use super::keyframe::CamPathValue;

/// 可排序的时间键
///
/// 使用 `f64::total_cmp` 全序比较，`-0.0` 归一化为 `0.0`。
#[derive(Clone, Copy, Debug)]
pub struct KeyTime(f64);

impl KeyTime {
    pub fn new(time: f64) -> Self {
        if time == 0.0 {
            Self(0.0)
        } else {
            Self(time)
        }
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for KeyTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyTime {}

impl PartialOrd for KeyTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// 关键帧映射（时间 -> 关键帧值）
#[derive(Clone, Debug, Default)]
pub struct KeyframeMap {
    keyframes: BTreeMap<KeyTime, CamPathValue>,
}

impl KeyframeMap {
    pub fn new() -> Self {
        Self {
            keyframes: BTreeMap::new(),
        }
    }

    /// 插入关键帧，返回被覆盖的旧值
    pub fn insert(&mut self, time: f64, value: CamPathValue) -> Option<CamPathValue> {
        self.keyframes.insert(KeyTime::new(time), value)
    }

    /// 移除关键帧
    pub fn remove(&mut self, time: f64) -> Option<CamPathValue> {
        self.keyframes.remove(&KeyTime::new(time))
    }

    pub fn get(&self, time: f64) -> Option<&CamPathValue> {
        self.keyframes.get(&KeyTime::new(time))
    }

    pub fn clear(&mut self) {
        self.keyframes.clear();
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// 第一个关键帧
    pub fn first(&self) -> Option<(f64, &CamPathValue)> {
        self.keyframes.iter().next().map(|(k, v)| (k.get(), v))
    }

    /// 最后一个关键帧
    pub fn last(&self) -> Option<(f64, &CamPathValue)> {
        self.keyframes.iter().next_back().map(|(k, v)| (k.get(), v))
    }

    /// 按时间顺序遍历
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.keyframes.iter(),
        }
    }

    /// 按时间顺序可变遍历（只允许修改值，不允许修改时间）
    pub fn values_mut(&mut self) -> btree_map::ValuesMut<'_, KeyTime, CamPathValue> {
        self.keyframes.values_mut()
    }

    /// 按时间顺序遍历 (时间, &mut 值)
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (f64, &mut CamPathValue)> + '_ {
        self.keyframes.iter_mut().map(|(k, v)| (k.get(), v))
    }

    /// 遍历时删除不满足条件的关键帧
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(f64, &mut CamPathValue) -> bool,
    {
        self.keyframes.retain(|k, v| keep(k.get(), v));
    }

    /// 查找包围 `time` 的前后关键帧
    ///
    /// 前帧时间 `<= time`，后帧时间 `> time`。
    pub fn search_closest(&self, time: f64) -> (Option<(f64, &CamPathValue)>, Option<(f64, &CamPathValue)>) {
        let key = KeyTime::new(time);
        let prev = self
            .keyframes
            .range(..=key)
            .next_back()
            .map(|(k, v)| (k.get(), v));
        let next = self
            .keyframes
            .range((std::ops::Bound::Excluded(key), std::ops::Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.get(), v));
        (prev, next)
    }

    /// 时间跨度，少于 2 个关键帧时为 0
    pub fn duration(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some((first, _)), Some((last, _))) if self.len() >= 2 => last - first,
            _ => 0.0,
        }
    }
}

impl FromIterator<(f64, CamPathValue)> for KeyframeMap {
    fn from_iter<I: IntoIterator<Item = (f64, CamPathValue)>>(iter: I) -> Self {
        let mut map = KeyframeMap::new();
        for (time, value) in iter {
            map.insert(time, value);
        }
        map
    }
}

impl<'a> IntoIterator for &'a KeyframeMap {
    type Item = (f64, &'a CamPathValue);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 有序迭代器
#[derive(Clone)]
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, KeyTime, CamPathValue>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (f64, &'a CamPathValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.get(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k.get(), v))
    }
}

impl ExactSizeIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_with_fov(fov: f64) -> CamPathValue {
        CamPathValue {
            fov,
            ..CamPathValue::default()
        }
    }

    #[test]
    fn test_insert_overwrites_same_time() {
        let mut map = KeyframeMap::new();
        map.insert(1.0, value_with_fov(60.0));
        let old = map.insert(1.0, value_with_fov(70.0));
        assert_eq!(old.map(|v| v.fov), Some(60.0));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(1.0).map(|v| v.fov), Some(70.0));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let mut map = KeyframeMap::new();
        map.insert(0.0, value_with_fov(60.0));
        map.insert(-0.0, value_with_fov(70.0));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_ordered_iteration_and_bounds() {
        let map: KeyframeMap = [(5.0, value_with_fov(1.0)), (-2.0, value_with_fov(2.0)), (3.0, value_with_fov(3.0))]
            .into_iter()
            .collect();
        let times: Vec<f64> = map.iter().map(|(t, _)| t).collect();
        assert_eq!(times, vec![-2.0, 3.0, 5.0]);
        assert_eq!(map.first().map(|(t, _)| t), Some(-2.0));
        assert_eq!(map.last().map(|(t, _)| t), Some(5.0));
        assert_eq!(map.duration(), 7.0);
    }

    #[test]
    fn test_search_closest() {
        let map: KeyframeMap = [(0.0, value_with_fov(1.0)), (1.0, value_with_fov(2.0))]
            .into_iter()
            .collect();
        let (prev, next) = map.search_closest(0.5);
        assert_eq!(prev.map(|(t, _)| t), Some(0.0));
        assert_eq!(next.map(|(t, _)| t), Some(1.0));

        let (prev, next) = map.search_closest(1.0);
        assert_eq!(prev.map(|(t, _)| t), Some(1.0));
        assert!(next.is_none());

        let (prev, next) = map.search_closest(-1.0);
        assert!(prev.is_none());
        assert_eq!(next.map(|(t, _)| t), Some(0.0));
    }

    #[test]
    fn test_retain_while_iterating() {
        let mut map: KeyframeMap = (0..5).map(|i| (i as f64, value_with_fov(i as f64))).collect();
        map.retain(|t, _| t != 1.0 && t != 3.0);
        let times: Vec<f64> = map.iter().map(|(t, _)| t).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_empty_duration() {
        let mut map = KeyframeMap::new();
        assert_eq!(map.duration(), 0.0);
        map.insert(3.0, CamPathValue::default());
        assert_eq!(map.duration(), 0.0);
        assert!(map.first().is_some());
    }
}
