/// 检测与追踪边界 (Detection & tracking boundary)
///
/// 外部检测/追踪模型只在接口处出现:
/// - types:   检测框、追踪结果
/// - tracker: 身份来源 Trait 与 ID 颜色分配
pub mod tracker;
pub mod types;

pub use tracker::{id_to_color, IdentitySource, SubjectPalette, DEFAULT_PALETTE};
pub use types::{BBox, Rgb, TrackedDetection, PERSON_LABEL};
