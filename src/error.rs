// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 错误类型
//! Error types for signal extraction and configuration

use crate::pose::Landmark;

/// 单帧信号提取错误 (只影响当前帧的当前肢体, 不会终止流水线)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    /// 本帧未检测到所需关键点
    #[error("missing keypoint: {0}")]
    MissingKeypoint(Landmark),

    /// 角度计算时两点重合 (向量长度为0)
    #[error("degenerate vector: coincident keypoints")]
    DegenerateVector,

    /// 需要检测框但当前主体没有检测框 (单人模式)
    #[error("missing detection region")]
    MissingRegion,

    /// 信号为 NaN 或无穷大
    #[error("non-finite signal: {0}")]
    NonFinite(f32),
}

/// 配置加载与校验错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid band for limb {limb}: low {low} must be below high {high}")]
    InvalidBand { limb: String, low: f32, high: f32 },

    #[error("invalid dead zone for limb {limb}: {dead_zone}")]
    InvalidDeadZone { limb: String, dead_zone: f32 },

    #[error("duplicate limb name: {0}")]
    DuplicateLimb(String),

    #[error("exercise policy {0} has no limbs")]
    EmptyPolicy(String),

    #[error("no exercise selected: set `exercise` or `policy`")]
    NoExercise,
}
