// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 姿态关键点
//! Keypoint vocabulary and per-frame keypoint sets

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// 关键点词表大小 (上游姿态模型输出 33 个关键点)
pub const LANDMARK_COUNT: usize = 33;

/// 解剖学关键点 (固定词表, 序号与上游姿态模型一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

/// 名称 → 关键点 (编译期生成)
static LANDMARK_NAMES: phf::Map<&'static str, Landmark> = phf_map! {
    "nose" => Landmark::Nose,
    "left_eye_inner" => Landmark::LeftEyeInner,
    "left_eye" => Landmark::LeftEye,
    "left_eye_outer" => Landmark::LeftEyeOuter,
    "right_eye_inner" => Landmark::RightEyeInner,
    "right_eye" => Landmark::RightEye,
    "right_eye_outer" => Landmark::RightEyeOuter,
    "left_ear" => Landmark::LeftEar,
    "right_ear" => Landmark::RightEar,
    "mouth_left" => Landmark::MouthLeft,
    "mouth_right" => Landmark::MouthRight,
    "left_shoulder" => Landmark::LeftShoulder,
    "right_shoulder" => Landmark::RightShoulder,
    "left_elbow" => Landmark::LeftElbow,
    "right_elbow" => Landmark::RightElbow,
    "left_wrist" => Landmark::LeftWrist,
    "right_wrist" => Landmark::RightWrist,
    "left_pinky" => Landmark::LeftPinky,
    "right_pinky" => Landmark::RightPinky,
    "left_index" => Landmark::LeftIndex,
    "right_index" => Landmark::RightIndex,
    "left_thumb" => Landmark::LeftThumb,
    "right_thumb" => Landmark::RightThumb,
    "left_hip" => Landmark::LeftHip,
    "right_hip" => Landmark::RightHip,
    "left_knee" => Landmark::LeftKnee,
    "right_knee" => Landmark::RightKnee,
    "left_ankle" => Landmark::LeftAnkle,
    "right_ankle" => Landmark::RightAnkle,
    "left_heel" => Landmark::LeftHeel,
    "right_heel" => Landmark::RightHeel,
    "left_foot_index" => Landmark::LeftFootIndex,
    "right_foot_index" => Landmark::RightFootIndex,
};

impl Landmark {
    /// 全部关键点 (按序号排列)
    pub const ALL: [Landmark; LANDMARK_COUNT] = [
        Landmark::Nose,
        Landmark::LeftEyeInner,
        Landmark::LeftEye,
        Landmark::LeftEyeOuter,
        Landmark::RightEyeInner,
        Landmark::RightEye,
        Landmark::RightEyeOuter,
        Landmark::LeftEar,
        Landmark::RightEar,
        Landmark::MouthLeft,
        Landmark::MouthRight,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftWrist,
        Landmark::RightWrist,
        Landmark::LeftPinky,
        Landmark::RightPinky,
        Landmark::LeftIndex,
        Landmark::RightIndex,
        Landmark::LeftThumb,
        Landmark::RightThumb,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
        Landmark::LeftHeel,
        Landmark::RightHeel,
        Landmark::LeftFootIndex,
        Landmark::RightFootIndex,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// snake_case 名称 (与 serde 名称一致)
    pub fn name(self) -> &'static str {
        LANDMARK_NAMES
            .entries()
            .find(|(_, lm)| **lm == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// 按名称或序号文本查找 ("left_knee" 或 "25")
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(lm) = LANDMARK_NAMES.get(name) {
            return Some(*lm);
        }
        name.parse::<usize>().ok().and_then(Self::from_index)
    }
}

impl std::fmt::Display for Landmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 像素坐标关键点 (x, y, 置信度)
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point2 {
    x: f32,
    y: f32,
    #[serde(default = "full_confidence")]
    confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl Point2 {
    pub fn new_with_conf(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 无置信度信息的点视为完全可信
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            confidence: 1.0,
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// 单帧关键点集合 (缺失的关键点为 None, 不是零坐标)
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoints {
    points: [Option<Point2>; LANDMARK_COUNT],
}

impl Default for Keypoints {
    fn default() -> Self {
        Self {
            points: [None; LANDMARK_COUNT],
        }
    }
}

impl Keypoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 (序号, x, y) 构造, 词表外的序号忽略
    pub fn from_indexed<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (usize, f32, f32)>,
    {
        let mut keypoints = Self::new();
        for (index, x, y) in points {
            if let Some(lm) = Landmark::from_index(index) {
                keypoints.insert(lm, Point2::new(x, y));
            }
        }
        keypoints
    }

    /// 归一化坐标 (0-1) → 像素坐标 (截断为整数像素)
    pub fn from_normalized<I>(points: I, width: u32, height: u32) -> Self
    where
        I: IntoIterator<Item = (usize, f32, f32, f32)>,
    {
        let mut keypoints = Self::new();
        for (index, nx, ny, conf) in points {
            if let Some(lm) = Landmark::from_index(index) {
                let x = (nx * width as f32).trunc();
                let y = (ny * height as f32).trunc();
                keypoints.insert(lm, Point2::new_with_conf(x, y, conf));
            }
        }
        keypoints
    }

    pub fn insert(&mut self, landmark: Landmark, point: Point2) {
        self.points[landmark.index()] = Some(point);
    }

    pub fn get(&self, landmark: Landmark) -> Option<&Point2> {
        self.points[landmark.index()].as_ref()
    }

    /// 获取必需的关键点, 缺失时返回 MissingKeypoint
    pub fn require(&self, landmark: Landmark) -> Result<Point2, SignalError> {
        self.points[landmark.index()].ok_or(SignalError::MissingKeypoint(landmark))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Landmark, &Point2)> + '_ {
        self.points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| Some((Landmark::ALL[i], p.as_ref()?)))
    }

    /// 丢弃置信度低于阈值的关键点 (阈值为0时全部保留)
    pub fn gate(mut self, min_confidence: f32) -> Self {
        if min_confidence > 0.0 {
            for slot in self.points.iter_mut() {
                if slot.is_some_and(|p| p.confidence < min_confidence) {
                    *slot = None;
                }
            }
        }
        self
    }
}
