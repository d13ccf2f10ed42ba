/// 重复次数计数核心 (Rep counting core)
///
/// 数据流: 关键点 → 信号提取 → 阈值策略 + 迟滞状态机 → 主体注册表 → 快照
/// - signal:        关节角度 / 坐标差 / 追踪框中心
/// - policy:        阈值带、触发条件、阶段名称 (无状态)
/// - exercise:      内置练习预设
/// - state_machine: 迟滞计数状态机
/// - registry:      按身份管理每个主体的计数状态
pub mod exercise;
pub mod policy;
pub mod registry;
pub mod signal;
pub mod state_machine;

pub use exercise::Exercise;
pub use policy::{
    Band, Calibration, CountTrigger, ExercisePolicy, LimbPolicy, Side, StageColors, StageLabels,
};
pub use registry::{
    LimbSnapshot, RegistryConfig, RegistryStats, SubjectKey, SubjectRecord, SubjectRegistry,
    SubjectSnapshot,
};
pub use signal::{axis_delta, joint_angle, Axis, SignalSource};
pub use state_machine::{advance, RepState, Transition};
