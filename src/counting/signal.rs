// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 信号提取
//! Signal extractors: keypoints → one scalar per frame

use serde::{Deserialize, Serialize};

use crate::detection::BBox;
use crate::error::SignalError;
use crate::pose::{Keypoints, Landmark, Point2};

/// 坐标轴 (默认竖直方向, 图像行坐标向下增大)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    #[default]
    Y,
}

impl Axis {
    fn of(self, p: &Point2) -> f32 {
        match self {
            Axis::X => p.x(),
            Axis::Y => p.y(),
        }
    }
}

/// 计算以 `vertex` 为顶点的关节角度 (度, 0-180)
///
/// cos(θ) = (v1 · v2) / (|v1| × |v2|), v1 = vertex→a, v2 = vertex→c
pub fn joint_angle(a: Point2, vertex: Point2, c: Point2) -> Result<f32, SignalError> {
    let v1 = (
        (a.x() - vertex.x()) as f64,
        (a.y() - vertex.y()) as f64,
    );
    let v2 = (
        (c.x() - vertex.x()) as f64,
        (c.y() - vertex.y()) as f64,
    );

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 <= f64::EPSILON || mag2 <= f64::EPSILON {
        return Err(SignalError::DegenerateVector);
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    // 浮点误差可能略超出 [-1, 1]
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Ok(cos_angle.acos().to_degrees() as f32)
}

/// 两点在指定轴上的有符号差值 `a - b` (像素)
pub fn axis_delta(a: Point2, b: Point2, axis: Axis) -> f32 {
    axis.of(&a) - axis.of(&b)
}

/// 信号来源 (选择哪些关键点、用哪个提取器)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalSource {
    /// 关节角度 a-vertex-c
    JointAngle {
        a: Landmark,
        vertex: Landmark,
        c: Landmark,
    },
    /// 两关键点坐标差 a - b
    Position {
        a: Landmark,
        b: Landmark,
        #[serde(default)]
        axis: Axis,
    },
    /// 追踪框中心坐标 (多人模式)
    RegionCenter {
        #[serde(default)]
        axis: Axis,
    },
}

impl SignalSource {
    /// 提取当前帧信号
    pub fn extract(&self, keypoints: &Keypoints, region: Option<&BBox>) -> Result<f32, SignalError> {
        match *self {
            SignalSource::JointAngle { a, vertex, c } => joint_angle(
                keypoints.require(a)?,
                keypoints.require(vertex)?,
                keypoints.require(c)?,
            ),
            SignalSource::Position { a, b, axis } => Ok(axis_delta(
                keypoints.require(a)?,
                keypoints.require(b)?,
                axis,
            )),
            SignalSource::RegionCenter { axis } => {
                let (cx, cy) = region.ok_or(SignalError::MissingRegion)?.center();
                Ok(match axis {
                    Axis::X => cx,
                    Axis::Y => cy,
                })
            }
        }
    }
}
