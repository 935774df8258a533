//! 相机路径配置
//!
//! 所有参数扁平化，每个 `CamPath` 实例持有一份，不使用全局状态。

/// 相机路径配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct CamPathConfig {
    // ========== Hermite 切线 ==========
    /// Auto 切线数值求导的步长，占段时长的比例，默认 0.001
    pub auto_tangent_epsilon: f64,
    /// 切线权重上限，默认 3.0
    /// 超过 3.0 时贝塞尔时间映射不再单调
    pub max_tangent_weight: f64,

    // ========== 四元数 ==========
    /// 两个四元数点积超过此值时退化为归一化线性插值，默认 0.9995
    pub slerp_parallel_threshold: f64,

    // ========== 关键帧默认值 ==========
    /// 缺省视场角（度），默认 90.0
    pub default_fov: f64,

    // ========== 文件 ==========
    /// 写入 XML 时的小数位数，默认 6（与 `%f` 一致）
    pub float_precision: usize,
    /// `bake` 单次最多产生的采样数，默认 1_000_000
    pub max_bake_samples: usize,
}

impl Default for CamPathConfig {
    fn default() -> Self {
        Self {
            // 步长太大时 Auto 切线会偏离原曲线，太小则受舍入误差影响
            auto_tangent_epsilon: 0.001,
            max_tangent_weight: 3.0,

            slerp_parallel_threshold: 0.9995,

            default_fov: 90.0,

            float_precision: 6,
            max_bake_samples: 1_000_000,
        }
    }
}

impl CamPathConfig {
    /// 计算某段的 Auto 切线求导步长
    pub fn auto_epsilon(&self, segment_duration: f64) -> f64 {
        let eps = self.auto_tangent_epsilon.abs() * segment_duration.abs();
        if eps > 0.0 {
            eps
        } else {
            f64::EPSILON
        }
    }

    /// 将切线权重限制在 [0, max_tangent_weight]
    pub fn clamp_weight(&self, weight: f64) -> f64 {
        if weight.is_nan() {
            return 1.0;
        }
        weight.clamp(0.0, self.max_tangent_weight.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_weight() {
        let config = CamPathConfig::default();
        assert_eq!(config.clamp_weight(-1.0), 0.0);
        assert_eq!(config.clamp_weight(1.5), 1.5);
        assert_eq!(config.clamp_weight(10.0), 3.0);
        assert_eq!(config.clamp_weight(f64::NAN), 1.0);
    }

    #[test]
    fn test_auto_epsilon_never_zero() {
        let config = CamPathConfig::default();
        assert!((config.auto_epsilon(2.0) - 0.002).abs() < 1e-12);
        assert!(config.auto_epsilon(0.0) > 0.0);
    }
}
