// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 计数器配置 - 通过JSON文件调整参数

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::counting::{Exercise, ExercisePolicy, RegistryConfig};
use crate::detection::PERSON_LABEL;
use crate::error::ConfigError;
use crate::pipeline::PipelineConfig;

/// 计数器参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    // === 练习 ===
    pub exercise: Option<Exercise>,       // 内置预设
    pub policy: Option<ExercisePolicy>,   // 自定义策略 (优先于预设)

    // === 输入 ===
    pub person_label: String,             // 参与计数的检测类别
    pub min_keypoint_confidence: f32,     // 关键点置信度下限
    pub fps: f64,                         // 计时显示用帧率

    // === 主体注册表 ===
    pub registry: RegistryConfig,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            exercise: Some(Exercise::Squat),
            policy: None,

            person_label: PERSON_LABEL.to_string(),
            min_keypoint_confidence: 0.0,
            fps: 30.0,

            registry: RegistryConfig::default(),
        }
    }
}

impl CounterConfig {
    /// 从JSON文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = serde_json::from_str(&json)?;
        tracing::info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 加载配置, 文件不存在时创建默认配置
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        tracing::info!("📝 配置文件不存在,创建默认配置...");
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 选用的策略: 自定义策略优先, 其次是预设
    pub fn resolve_policy(&self) -> Result<ExercisePolicy, ConfigError> {
        let policy = match (&self.policy, self.exercise) {
            (Some(policy), _) => policy.clone(),
            (None, Some(exercise)) => exercise.policy(),
            (None, None) => return Err(ConfigError::NoExercise),
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            person_label: self.person_label.clone(),
            min_keypoint_confidence: self.min_keypoint_confidence,
            registry: self.registry.clone(),
            fps: Some(self.fps),
        }
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        let name = match (&self.policy, self.exercise) {
            (Some(policy), _) => format!("{} (自定义)", policy.name),
            (None, Some(exercise)) => exercise.to_string(),
            (None, None) => "未设置".to_string(),
        };
        tracing::info!("🎛️  当前计数器配置:");
        tracing::info!("  练习: {}", name);
        tracing::info!("  检测类别: {}", self.person_label);
        tracing::info!("  关键点置信度下限: {:.2}", self.min_keypoint_confidence);
        tracing::info!("  帧率: {:.1}", self.fps);
        match self.registry.max_missed_frames {
            Some(n) => tracing::info!("  最大缺席帧数: {}", n),
            None => tracing::info!("  最大缺席帧数: 不淘汰"),
        }
    }
}
