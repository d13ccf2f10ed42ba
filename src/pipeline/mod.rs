// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 逐帧处理流水线 (Frame pipeline)
///
/// 单线程、同步: 一帧处理完 (关键点输入 → 计数输出) 才处理下一帧。
/// - 单人模式: 整帧估计一次关键点, 主体为 Solo
/// - 多人模式: 追踪器给出带ID的检测框, 只处理 "person", 在每个框内估计关键点
///
/// 未出现在当前帧的主体不做任何修改。
pub mod replay;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::counting::{ExercisePolicy, RegistryConfig, SubjectKey, SubjectRegistry, SubjectSnapshot};
use crate::detection::{BBox, IdentitySource, PERSON_LABEL};
use crate::error::ConfigError;
use crate::pose::{Keypoints, PoseSource};

pub use replay::{RecordedFrame, ReplayCollaborator, ReplaySource};

// ========== 数据结构 ==========

/// 单个主体在当前帧的观测
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    /// 外部追踪ID, 单人模式为 None
    pub identity: Option<u32>,
    pub keypoints: Keypoints,
    /// 追踪框, 单人模式为 None
    pub region: Option<BBox>,
}

impl Observation {
    pub fn solo(keypoints: Keypoints) -> Self {
        Self {
            identity: None,
            keypoints,
            region: None,
        }
    }

    pub fn tracked(identity: u32, keypoints: Keypoints, region: BBox) -> Self {
        Self {
            identity: Some(identity),
            keypoints,
            region: Some(region),
        }
    }
}

/// 单帧处理结果 (交给渲染/日志)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameResult {
    pub frame_index: u64,
    pub subjects: Vec<SubjectSnapshot>,
    /// 本帧被淘汰的主体
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evicted: Vec<SubjectKey>,
    /// 计时文本 "m:ss", 未设置帧率时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
}

impl FrameResult {
    pub fn subject(&self, identity: Option<u32>) -> Option<&SubjectSnapshot> {
        self.subjects.iter().find(|s| s.identity == identity)
    }
}

/// 流水线配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 只处理该类别的检测结果
    #[serde(default = "default_person_label")]
    pub person_label: String,
    /// 关键点最低置信度, 0 表示不过滤
    #[serde(default)]
    pub min_keypoint_confidence: f32,
    #[serde(default)]
    pub registry: RegistryConfig,
    /// 帧率, 设置后每帧结果带计时
    #[serde(default)]
    pub fps: Option<f64>,
}

fn default_person_label() -> String {
    PERSON_LABEL.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            person_label: default_person_label(),
            min_keypoint_confidence: 0.0,
            registry: RegistryConfig::default(),
            fps: None,
        }
    }
}

// ========== 流水线 ==========

pub struct FramePipeline {
    registry: SubjectRegistry,
    config: PipelineConfig,
    frame_index: u64,
    /// 需要检测框却没有追踪器的帧数
    frames_without_region: u64,
}

impl FramePipeline {
    /// 校验策略后创建流水线
    pub fn new(policy: ExercisePolicy, config: PipelineConfig) -> Result<Self, ConfigError> {
        policy.validate()?;
        let registry = SubjectRegistry::new(Arc::new(policy), config.registry.clone());
        Ok(Self {
            registry,
            config,
            frame_index: 0,
            frames_without_region: 0,
        })
    }

    pub fn registry(&self) -> &SubjectRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &ExercisePolicy {
        self.registry.policy()
    }

    /// 下一帧的序号
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// 策略依赖追踪框但以单人模式运行的帧数 (这些帧无法计数)
    pub fn frames_without_region(&self) -> u64 {
        self.frames_without_region
    }

    /// 处理一帧的全部观测
    pub fn process(&mut self, observations: &[Observation]) -> FrameResult {
        let frame_index = self.frame_index;
        self.registry.begin_frame(frame_index);

        let mut seen = HashSet::new();
        let mut subjects = Vec::with_capacity(observations.len());
        for obs in observations {
            let key = SubjectKey::from(obs.identity);
            // 同一帧内同一身份只更新一次
            if !seen.insert(key) {
                tracing::warn!(subject = %key, frame = frame_index, "重复身份, 忽略");
                continue;
            }

            let keypoints = obs.keypoints.clone().gate(self.config.min_keypoint_confidence);
            let signals: Vec<_> = self
                .registry
                .policy()
                .limbs
                .iter()
                .map(|limb| limb.signal.extract(&keypoints, obs.region.as_ref()))
                .collect();
            subjects.push(self.registry.update(key, &signals));
        }

        let evicted = self.registry.evict_stale();
        self.frame_index += 1;

        FrameResult {
            frame_index,
            subjects,
            evicted,
            elapsed: self.config.fps.map(|fps| elapsed_label(frame_index, fps)),
        }
    }

    /// 向外部模块收集当前帧的观测
    ///
    /// `identity` 为 None 时为单人模式。外部模块出错时记录警告, 当作未检测到。
    pub fn observe<F>(
        &self,
        frame: &F,
        pose: &mut dyn PoseSource<F>,
        identity: Option<&mut dyn IdentitySource<F>>,
    ) -> Vec<Observation> {
        let Some(tracker) = identity else {
            let keypoints = pose.keypoints(frame, None).unwrap_or_else(|e| {
                tracing::warn!(frame = self.frame_index, error = %e, "关键点估计失败");
                Keypoints::new()
            });
            return vec![Observation::solo(keypoints)];
        };

        let detections = match tracker.detections(frame) {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!(frame = self.frame_index, error = %e, "追踪失败");
                return Vec::new();
            }
        };

        detections
            .iter()
            .filter(|det| det.is_label(&self.config.person_label))
            .map(|det| {
                let keypoints = pose.keypoints(frame, Some(det)).unwrap_or_else(|e| {
                    tracing::warn!(subject = det.id, error = %e, "关键点估计失败");
                    Keypoints::new()
                });
                Observation::tracked(det.id, keypoints, det.bbox)
            })
            .collect()
    }

    /// 收集观测并处理一帧
    pub fn run_frame<F>(
        &mut self,
        frame: &F,
        pose: &mut dyn PoseSource<F>,
        identity: Option<&mut dyn IdentitySource<F>>,
    ) -> FrameResult {
        if identity.is_none() && self.policy().needs_region() {
            if self.frames_without_region == 0 {
                tracing::warn!(
                    exercise = %self.policy().name,
                    "⚠️  该练习依赖追踪框, 单人模式下无法计数"
                );
            }
            self.frames_without_region += 1;
        }
        let observations = self.observe(frame, pose, identity);
        self.process(&observations)
    }
}

/// 帧序号 → 计时文本 "m:ss"
pub fn elapsed_label(frame_index: u64, fps: f64) -> String {
    if !fps.is_finite() || fps <= 0.0 {
        return "0:00".to_string();
    }
    let elapsed = (frame_index as f64 / fps) as u64;
    format!("{}:{:02}", elapsed / 60, elapsed % 60)
}
