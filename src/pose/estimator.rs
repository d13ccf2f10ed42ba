// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 姿态估计接口
//! Keypoint source boundary

use crate::detection::TrackedDetection;

use super::Keypoints;

/// 关键点来源 Trait (外部姿态模型)
pub trait PoseSource<F> {
    /// 估计关键点
    ///
    /// # 参数
    /// - `frame`: 当前帧
    /// - `subject`: 多人模式下为该人的追踪结果 (在其检测框区域内估计); 单人模式为 None
    ///
    /// # 返回
    /// 检测到的关键点, 未检测到的关键点不出现在结果中
    fn keypoints(&mut self, frame: &F, subject: Option<&TrackedDetection>)
        -> anyhow::Result<Keypoints>;
}
