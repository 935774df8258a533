//! 相机路径
//!
//! 持有关键帧存储、各通道组的插值方法与插值器，以及变更通知。
//! 每个修改操作按顺序完成：更新存储 → 受影响通道的缓存失效 → 通知监听器。
//!
//! 批量编辑作用于“目标集合”：存在选中关键帧时只作用于选中帧，否则作用于全部。

use std::fmt;

use glam::{DMat3, DQuat, DVec3};

use crate::config::CamPathConfig;
use crate::math::quaternion::normalize_or_identity;
use crate::math::EulerAngles;

use super::channel_view::{
    select_fov, select_rotation, select_selected, select_x, select_y, select_z, ChannelView,
};
use super::interpolation::{DoubleInterp, HoldInterpolation, Interpolation, QuaternionInterp};
use super::keyframe::{CamPathValue, Channel, ChannelTangents, TangentMode};
use super::keyframe_map::{Iter, KeyframeMap};
use super::notifier::{ChangeNotifier, ListenerId};

/// 从文件/字符串解析出的完整路径状态，整体替换到 [`CamPath`]
#[derive(Debug, Clone, Default)]
pub(crate) struct CamPathDocument {
    pub map: KeyframeMap,
    pub position_method: DoubleInterp,
    pub rotation_method: QuaternionInterp,
    pub fov_method: DoubleInterp,
    pub offset: f64,
    pub hold: bool,
}

/// 相机路径
pub struct CamPath {
    map: KeyframeMap,
    config: CamPathConfig,

    enabled: bool,
    hold: bool,
    /// 全局时间偏移，由使用方在求值时加到时间上，不改变存储的时间
    offset: f64,

    position_method: DoubleInterp,
    rotation_method: QuaternionInterp,
    fov_method: DoubleInterp,

    x_interp: Box<dyn Interpolation<f64>>,
    y_interp: Box<dyn Interpolation<f64>>,
    z_interp: Box<dyn Interpolation<f64>>,
    rotation_interp: Box<dyn Interpolation<DQuat>>,
    fov_interp: Box<dyn Interpolation<f64>>,
    selected_interp: HoldInterpolation,

    notifier: ChangeNotifier,
}

impl Default for CamPath {
    fn default() -> Self {
        Self::new()
    }
}

impl CamPath {
    pub fn new() -> Self {
        Self::with_config(CamPathConfig::default())
    }

    pub fn with_config(config: CamPathConfig) -> Self {
        let position_method = DoubleInterp::Default;
        let rotation_method = QuaternionInterp::Default;
        let fov_method = DoubleInterp::Default;

        Self {
            map: KeyframeMap::new(),
            enabled: false,
            hold: false,
            offset: 0.0,
            position_method,
            rotation_method,
            fov_method,
            x_interp: position_method.build(Channel::X, &config),
            y_interp: position_method.build(Channel::Y, &config),
            z_interp: position_method.build(Channel::Z, &config),
            rotation_interp: rotation_method.build(&config),
            fov_interp: fov_method.build(Channel::Fov, &config),
            selected_interp: HoldInterpolation::new(),
            notifier: ChangeNotifier::new(),
            config,
        }
    }

    pub fn config(&self) -> &CamPathConfig {
        &self.config
    }

    // ========== 状态 ==========

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn hold(&self) -> bool {
        self.hold
    }

    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
        self.changed();
    }

    // ========== 插值方法 ==========

    pub fn position_method(&self) -> DoubleInterp {
        self.position_method
    }

    pub fn set_position_method(&mut self, method: DoubleInterp) {
        self.rebuild_position(method);
        log::debug!("位置插值方法: {}", method);
        self.changed();
    }

    pub fn rotation_method(&self) -> QuaternionInterp {
        self.rotation_method
    }

    pub fn set_rotation_method(&mut self, method: QuaternionInterp) {
        self.rebuild_rotation(method);
        log::debug!("旋转插值方法: {}", method);
        self.changed();
    }

    pub fn fov_method(&self) -> DoubleInterp {
        self.fov_method
    }

    pub fn set_fov_method(&mut self, method: DoubleInterp) {
        self.rebuild_fov(method);
        log::debug!("FOV 插值方法: {}", method);
        self.changed();
    }

    fn rebuild_position(&mut self, method: DoubleInterp) {
        self.position_method = method;
        self.x_interp = method.build(Channel::X, &self.config);
        self.y_interp = method.build(Channel::Y, &self.config);
        self.z_interp = method.build(Channel::Z, &self.config);
    }

    fn rebuild_rotation(&mut self, method: QuaternionInterp) {
        self.rotation_method = method;
        self.rotation_interp = method.build(&self.config);
    }

    fn rebuild_fov(&mut self, method: DoubleInterp) {
        self.fov_method = method;
        self.fov_interp = method.build(Channel::Fov, &self.config);
    }

    // ========== 关键帧 ==========

    /// 插入关键帧，同一时间已有的关键帧（含切线与选择状态）被覆盖
    pub fn add(&mut self, time: f64, value: CamPathValue) {
        self.map.insert(time, value);
        self.invalidate_all();
        self.changed();
    }

    pub fn remove(&mut self, time: f64) -> Option<CamPathValue> {
        let removed = self.map.remove(time);
        self.invalidate_all();
        self.changed();
        removed
    }

    /// 有选中帧时只删除选中帧并保留偏移；否则删除全部并把偏移归零
    pub fn clear(&mut self) {
        let before = self.map.len();
        self.map.retain(|_, v| !v.selected);

        if self.map.len() == before {
            self.map.clear();
            self.offset = 0.0;
        }

        self.invalidate_all();
        self.changed();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Iter<'_> {
        self.map.iter()
    }

    pub fn keyframes(&self) -> &KeyframeMap {
        &self.map
    }

    pub fn get(&self, time: f64) -> Option<&CamPathValue> {
        self.map.get(time)
    }

    pub fn lower_bound(&self) -> Option<f64> {
        self.map.first().map(|(t, _)| t)
    }

    pub fn upper_bound(&self) -> Option<f64> {
        self.map.last().map(|(t, _)| t)
    }

    /// 首尾关键帧时间差，不足 2 帧时为 0
    pub fn duration(&self) -> f64 {
        self.map.duration()
    }

    // ========== 求值 ==========

    pub fn can_eval(&self) -> bool {
        let map = &self.map;
        self.x_interp.can_eval(&ChannelView::new(map, select_x))
            && self.y_interp.can_eval(&ChannelView::new(map, select_y))
            && self.z_interp.can_eval(&ChannelView::new(map, select_z))
            && self
                .rotation_interp
                .can_eval(&ChannelView::new(map, select_rotation))
            && self.fov_interp.can_eval(&ChannelView::new(map, select_fov))
            && self
                .selected_interp
                .can_eval(&ChannelView::new(map, select_selected))
    }

    /// 在路径时间 `t` 处合成相机姿态
    ///
    /// 调用方应先确认 [`CamPath::can_eval`]；关键帧不足时返回退化结果而不会 panic。
    /// 返回值不带切线信息。
    pub fn eval(&mut self, t: f64) -> CamPathValue {
        if self.map.is_empty() {
            return CamPathValue {
                fov: self.config.default_fov,
                ..CamPathValue::default()
            };
        }

        let map = &self.map;
        let x = self.x_interp.eval(&ChannelView::new(map, select_x), t);
        let y = self.y_interp.eval(&ChannelView::new(map, select_y), t);
        let z = self.z_interp.eval(&ChannelView::new(map, select_z), t);
        let rotation = self
            .rotation_interp
            .eval(&ChannelView::new(map, select_rotation), t);
        let fov = self.fov_interp.eval(&ChannelView::new(map, select_fov), t);
        let selected = self
            .selected_interp
            .eval(&ChannelView::new(map, select_selected), t);

        CamPathValue {
            position: DVec3::new(x, y, z),
            rotation: normalize_or_identity(rotation),
            fov,
            selected,
            ..CamPathValue::default()
        }
    }

    /// 从下界到上界按固定步长采样（含上界），用于离线导出
    pub fn bake(&mut self, step: f64) -> Vec<(f64, CamPathValue)> {
        if !self.can_eval() || step.is_nan() || step <= 0.0 {
            return Vec::new();
        }
        let (Some(lower), Some(upper)) = (self.lower_bound(), self.upper_bound()) else {
            return Vec::new();
        };

        let steps = ((upper - lower) / step).floor();
        if !steps.is_finite() || steps >= self.config.max_bake_samples as f64 {
            log::warn!(
                "bake step {} too small for [{}, {}], limit is {} samples",
                step,
                lower,
                upper,
                self.config.max_bake_samples
            );
            return Vec::new();
        }

        let count = steps as usize;
        let mut samples = Vec::new();
        for i in 0..=count {
            let t = lower + i as f64 * step;
            samples.push((t, self.eval(t)));
        }
        if let Some(&(last, _)) = samples.last() {
            if upper - last > step * 1e-6 {
                samples.push((upper, self.eval(upper)));
            }
        }
        samples
    }

    // ========== 选择 ==========

    pub fn select_all(&mut self) -> usize {
        for value in self.map.values_mut() {
            value.selected = true;
        }
        self.selection_changed()
    }

    pub fn select_none(&mut self) {
        for value in self.map.values_mut() {
            value.selected = false;
        }
        self.selection_changed();
    }

    pub fn select_invert(&mut self) -> usize {
        for value in self.map.values_mut() {
            value.selected = !value.selected;
        }
        self.selection_changed()
    }

    /// 追加选中下标在 [min, max] 内的关键帧
    pub fn select_add_index(&mut self, min: usize, max: usize) -> usize {
        for (i, value) in self.map.values_mut().enumerate() {
            value.selected = value.selected || (min <= i && i <= max);
        }
        self.selection_changed()
    }

    /// 追加选中时间在 [min, max] 内的关键帧
    pub fn select_add_time_range(&mut self, min: f64, max: f64) -> usize {
        for (t, value) in self.map.iter_mut() {
            value.selected = value.selected || (min <= t && t <= max);
        }
        self.selection_changed()
    }

    /// 从时间 `min` 起追加选中，直到选中总数（含之前已选中的帧）达到 `count`
    pub fn select_add_count(&mut self, min: f64, count: usize) -> usize {
        let mut selected = 0;
        for (t, value) in self.map.iter_mut() {
            value.selected = value.selected || (min <= t && selected < count);
            if value.selected {
                selected += 1;
            }
        }
        self.selection_changed()
    }

    fn selected_count(&self) -> usize {
        self.map.iter().filter(|(_, v)| v.selected).count()
    }

    fn selection_changed(&mut self) -> usize {
        self.selected_interp.keyframes_changed();
        self.changed();
        self.selected_count()
    }

    // ========== 批量编辑 ==========

    fn has_selection(&self) -> bool {
        self.map.iter().any(|(_, v)| v.selected)
    }

    /// 对目标集合中的每个关键帧执行 `f`
    fn for_each_target<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut CamPathValue),
    {
        let all = !self.has_selection();
        for value in self.map.values_mut() {
            if all || value.selected {
                f(value);
            }
        }
    }

    /// 目标集合包围盒中心
    fn target_midpoint(&self) -> Option<DVec3> {
        let all = !self.has_selection();
        let (min, max) = self
            .map
            .iter()
            .filter(|(_, v)| all || v.selected)
            .fold(None, |acc: Option<(DVec3, DVec3)>, (_, v)| match acc {
                None => Some((v.position, v.position)),
                Some((min, max)) => Some((min.min(v.position), max.max(v.position))),
            })?;
        Some((min + max) * 0.5)
    }

    /// 按新时间重建存储，时间冲突时后写入者胜出
    fn retime<F>(&mut self, mut new_time: F)
    where
        F: FnMut(f64, &CamPathValue) -> f64,
    {
        let old = std::mem::take(&mut self.map);
        self.map = old
            .iter()
            .map(|(t, v)| (new_time(t, v), v.clone()))
            .collect();
    }

    /// 平移目标集合的时间
    ///
    /// `relative` 为 true 时直接加上 `t`，否则使目标集合的第一帧落在 `t`。
    pub fn set_start(&mut self, t: f64, relative: bool) {
        let all = !self.has_selection();
        let first = self
            .map
            .iter()
            .find(|(_, v)| all || v.selected)
            .map(|(time, _)| time);
        let Some(first) = first else {
            return;
        };

        let delta = if relative { t } else { t - first };
        self.retime(|time, v| if all || v.selected { time + delta } else { time });

        self.invalidate_all();
        self.changed();
    }

    /// 以目标集合第一帧为基准缩放时间，使目标跨度变为 `t`
    pub fn set_duration(&mut self, t: f64) {
        if self.map.len() < 2 {
            return;
        }

        let all = !self.has_selection();
        let mut targets = self.map.iter().filter(|(_, v)| all || v.selected);
        let Some((first, _)) = targets.next() else {
            return;
        };
        let last = targets.last().map(|(time, _)| time).unwrap_or(first);

        let old_duration = last - first;
        let scale = if old_duration != 0.0 { t / old_duration } else { 0.0 };

        self.retime(|time, v| {
            if all || v.selected {
                first + scale * (time - first)
            } else {
                time
            }
        });

        self.invalidate_all();
        self.changed();
    }

    /// 设置位置分量
    ///
    /// 以目标集合包围盒中心为原点移动到给定值，多帧编辑时保留相对分布。
    pub fn set_position(&mut self, x: Option<f64>, y: Option<f64>, z: Option<f64>) {
        let Some(mid) = self.target_midpoint() else {
            return;
        };

        self.for_each_target(|v| {
            if let Some(x) = x {
                v.position.x = x + (v.position.x - mid.x);
            }
            if let Some(y) = y {
                v.position.y = y + (v.position.y - mid.y);
            }
            if let Some(z) = z {
                v.position.z = z + (v.position.z - mid.z);
            }
        });

        self.invalidate_position();
        self.changed();
    }

    /// 设置欧拉角分量（度）
    pub fn set_angles(&mut self, pitch: Option<f64>, yaw: Option<f64>, roll: Option<f64>) {
        if self.map.is_empty() {
            return;
        }

        self.for_each_target(|v| {
            let angles = match (pitch, yaw, roll) {
                (Some(pitch), Some(yaw), Some(roll)) => EulerAngles::new(pitch, yaw, roll),
                _ => {
                    let cur = v.angles();
                    EulerAngles::new(
                        pitch.unwrap_or(cur.pitch),
                        yaw.unwrap_or(cur.yaw),
                        roll.unwrap_or(cur.roll),
                    )
                }
            };
            v.rotation = angles.to_quat();
        });

        self.invalidate_rotation();
        self.changed();
    }

    pub fn set_fov(&mut self, fov: f64) {
        if self.map.is_empty() {
            return;
        }

        self.for_each_target(|v| v.fov = fov);

        self.invalidate_fov();
        self.changed();
    }

    /// 绕目标集合包围盒中心整体旋转（欧拉角，度）
    pub fn rotate(&mut self, pitch: f64, yaw: f64, roll: f64) {
        let Some(mid) = self.target_midpoint() else {
            return;
        };

        let angles = EulerAngles::new(pitch, yaw, roll);
        let matrix = angles.rotation_matrix();
        let quat = angles.to_quat();
        self.transform_targets(mid, mid, matrix, quat);
    }

    /// 把目标集合从锚点姿态整体搬到目标姿态，保持内部形状
    pub fn anchor_transform(
        &mut self,
        anchor_position: DVec3,
        anchor_angles: EulerAngles,
        dest_position: DVec3,
        dest_angles: EulerAngles,
    ) {
        if self.map.is_empty() {
            return;
        }

        let dest = dest_angles.to_quat();
        let mut anchor = anchor_angles.to_quat();
        if dest.dot(anchor) < 0.0 {
            anchor = -anchor;
        }

        let quat = normalize_or_identity(dest * anchor.conjugate());
        let matrix = DMat3::from_quat(quat);
        self.transform_targets(anchor_position, dest_position, matrix, quat);
    }

    /// p' = R (p - from) + to，q' = r * q
    fn transform_targets(&mut self, from: DVec3, to: DVec3, matrix: DMat3, quat: DQuat) {
        self.for_each_target(|v| {
            v.position = matrix * (v.position - from) + to;
            v.rotation = normalize_or_identity(quat * v.rotation);
        });

        self.invalidate_position();
        self.invalidate_rotation();
        self.changed();
    }

    /// 设置切线斜率
    pub fn set_tangent(&mut self, channel: Channel, slope_in: Option<f64>, slope_out: Option<f64>) {
        self.edit_tangents(channel, |tan| {
            if let Some(slope) = slope_in {
                tan.slope_in = slope;
            }
            if let Some(slope) = slope_out {
                tan.slope_out = slope;
            }
        });
    }

    /// 设置切线模式
    pub fn set_tangent_mode(
        &mut self,
        channel: Channel,
        mode_in: Option<TangentMode>,
        mode_out: Option<TangentMode>,
    ) {
        self.edit_tangents(channel, |tan| {
            if let Some(mode) = mode_in {
                tan.mode_in = mode;
            }
            if let Some(mode) = mode_out {
                tan.mode_out = mode;
            }
        });
    }

    /// 设置切线权重，原样保存，求值时才做限制
    pub fn set_tangent_weight(
        &mut self,
        channel: Channel,
        weight_in: Option<f64>,
        weight_out: Option<f64>,
    ) {
        self.edit_tangents(channel, |tan| {
            if let Some(weight) = weight_in {
                tan.weight_in = weight;
            }
            if let Some(weight) = weight_out {
                tan.weight_out = weight;
            }
        });
    }

    fn edit_tangents<F>(&mut self, channel: Channel, mut edit: F)
    where
        F: FnMut(&mut ChannelTangents),
    {
        if self.map.is_empty() {
            return;
        }

        self.for_each_target(|v| edit(v.tangents_mut(channel)));

        // 切线只影响自定义插值
        if channel.is_position() {
            if self.position_method == DoubleInterp::Custom {
                self.invalidate_position();
            }
        } else if self.fov_method == DoubleInterp::Custom {
            self.invalidate_fov();
        }

        self.changed();
    }

    // ========== 整体替换 ==========

    pub(crate) fn to_document(&self) -> CamPathDocument {
        CamPathDocument {
            map: self.map.clone(),
            position_method: self.position_method,
            rotation_method: self.rotation_method,
            fov_method: self.fov_method,
            offset: self.offset,
            hold: self.hold,
        }
    }

    /// 用解析结果替换当前内容，只通知一次
    pub(crate) fn apply_document(&mut self, document: CamPathDocument) {
        self.map = document.map;
        self.offset = document.offset;
        self.hold = document.hold;
        self.rebuild_position(document.position_method);
        self.rebuild_rotation(document.rotation_method);
        self.rebuild_fov(document.fov_method);

        self.invalidate_all();
        self.changed();
    }

    // ========== 通知 ==========

    pub fn on_changed_add<F>(&self, callback: F) -> ListenerId
    where
        F: FnMut() + 'static,
    {
        self.notifier.add(callback)
    }

    pub fn on_changed_remove(&self, id: ListenerId) -> bool {
        self.notifier.remove(id)
    }

    /// 监听器列表句柄，可在回调中移除监听器
    pub fn change_notifier(&self) -> ChangeNotifier {
        self.notifier.clone()
    }

    fn changed(&self) {
        self.notifier.notify();
    }

    fn invalidate_position(&mut self) {
        self.x_interp.keyframes_changed();
        self.y_interp.keyframes_changed();
        self.z_interp.keyframes_changed();
    }

    fn invalidate_rotation(&mut self) {
        self.rotation_interp.keyframes_changed();
    }

    fn invalidate_fov(&mut self) {
        self.fov_interp.keyframes_changed();
    }

    fn invalidate_all(&mut self) {
        self.invalidate_position();
        self.invalidate_rotation();
        self.invalidate_fov();
        self.selected_interp.keyframes_changed();
    }
}

impl fmt::Debug for CamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CamPath")
            .field("keyframes", &self.map.len())
            .field("enabled", &self.enabled)
            .field("hold", &self.hold)
            .field("offset", &self.offset)
            .field("position_method", &self.position_method)
            .field("rotation_method", &self.rotation_method)
            .field("fov_method", &self.fov_method)
            .finish()
    }
}
