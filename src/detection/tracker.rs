// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 多目标追踪边界
//! Identity source interface and per-identity display colors

use serde::{Deserialize, Serialize};

use super::types::{Rgb, TrackedDetection};

// ========== 追踪器统一接口 ==========

/// 身份来源 Trait (外部检测+追踪模型)
///
/// 每帧返回带稳定ID的检测结果; ID 在帧间保持一致是外部追踪器的责任
pub trait IdentitySource<F> {
    /// 获取当前帧的全部追踪结果 (未按类别过滤)
    fn detections(&mut self, frame: &F) -> anyhow::Result<Vec<TrackedDetection>>;
}

// ========== 颜色分配 ==========

/// 预定义颜色表 (与ID取模)
pub const DEFAULT_PALETTE: [Rgb; 10] = [
    (255, 64, 64),   // 红色
    (64, 255, 64),   // 绿色
    (64, 64, 255),   // 蓝色
    (255, 255, 64),  // 黄色
    (255, 64, 255),  // 品红
    (64, 255, 255),  // 青色
    (255, 128, 0),   // 橙色
    (128, 0, 255),   // 紫色
    (255, 128, 192), // 粉色
    (128, 255, 128), // 浅绿
];

/// 主体颜色分配方式
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectPalette {
    /// 固定颜色表, 按 ID 取模
    Fixed { colors: Vec<Rgb> },
    /// 黄金角度采样 HSV
    GoldenAngle,
}

impl Default for SubjectPalette {
    fn default() -> Self {
        SubjectPalette::Fixed {
            colors: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl SubjectPalette {
    /// 根据ID选择颜色 (空颜色表退化为黄金角度)
    pub fn color_for(&self, id: u32) -> Rgb {
        match self {
            SubjectPalette::Fixed { colors } if !colors.is_empty() => {
                colors[id as usize % colors.len()]
            }
            _ => id_to_color(id),
        }
    }
}

/// 根据ID生成不同颜色
pub fn id_to_color(id: u32) -> Rgb {
    let hue = (id as f32 * 137.508) % 360.0; // 黄金角度采样
    hsv_to_rgb(hue, 0.8, 0.9)
}

/// HSV转RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
