// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 计数器配置参数
pub mod counting; // 计数核心: 信号、策略、状态机、注册表
pub mod detection; // 检测/追踪接口
pub mod error; // 错误类型
pub mod pipeline; // 逐帧处理流水线
pub mod pose; // 关键点词表

pub use crate::config::CounterConfig;
pub use crate::counting::{
    Exercise, ExercisePolicy, LimbPolicy, RepState, SubjectKey, SubjectRegistry, SubjectSnapshot,
};
pub use crate::error::{ConfigError, SignalError};
pub use crate::pipeline::{elapsed_label, FramePipeline, FrameResult, Observation, PipelineConfig};

/// 本地时间字符串, 用于生成输出文件名
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
