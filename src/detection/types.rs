// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 检测与追踪数据结构定义
/// Data structures delivered by the external detector/tracker
use serde::{Deserialize, Serialize};

// ========== 公共常量 ==========

/// 只有该类别的检测结果会交给计数核心
pub const PERSON_LABEL: &str = "person";

/// RGB 显示颜色
pub type Rgb = (u8, u8, u8);

// ========== 数据结构 ==========

/// 检测框 (Detection bounding box, 像素坐标 x1,y1 左上 / x2,y2 右下)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence: 1.0,
        }
    }

    /// 获取中心点
    pub fn center(&self) -> (f32, f32) {
        let cx = (self.x1 + self.x2) / 2.0;
        let cy = (self.y1 + self.y2) / 2.0;
        (cx, cy)
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// 追踪结果 (外部追踪器给出的稳定ID + 检测框 + 类别)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedDetection {
    /// 唯一跟踪ID
    pub id: u32,

    /// 当前边界框
    pub bbox: BBox,

    /// 类别名称 (例如 "person")
    pub label: String,
}

impl TrackedDetection {
    pub fn new(id: u32, bbox: BBox, label: impl Into<String>) -> Self {
        Self {
            id,
            bbox,
            label: label.into(),
        }
    }

    /// 是否为指定类别 (忽略大小写)
    pub fn is_label(&self, label: &str) -> bool {
        self.label.eq_ignore_ascii_case(label)
    }
}
