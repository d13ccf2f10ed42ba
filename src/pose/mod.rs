/// 姿态数据 (Pose data)
///
/// - keypoint:  上游姿态模型输出的关键点词表与单帧关键点集合
/// - estimator: 关键点来源 Trait
pub mod estimator;
pub mod keypoint;

pub use estimator::PoseSource;
pub use keypoint::{Keypoints, Landmark, Point2, LANDMARK_COUNT};
