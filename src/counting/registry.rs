// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 主体注册表
//! Subject registry: identity → per-subject counters, baseline and color
//!
//! 首次有效出现时创建记录, 之后按身份查找。默认永不删除;
//! 配置 `max_missed_frames` 后, 连续缺席超过该帧数的记录会被淘汰。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::policy::{Calibration, ExercisePolicy, LimbPolicy, Side};
use super::state_machine::RepState;
use crate::detection::{Rgb, SubjectPalette};
use crate::error::SignalError;

// ========== 公共数据结构 ==========

/// 主体身份 (单人模式无外部ID)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKey {
    Solo,
    Tracked(u32),
}

impl SubjectKey {
    pub fn identity(&self) -> Option<u32> {
        match self {
            SubjectKey::Solo => None,
            SubjectKey::Tracked(id) => Some(*id),
        }
    }
}

impl From<Option<u32>> for SubjectKey {
    fn from(identity: Option<u32>) -> Self {
        identity.map_or(SubjectKey::Solo, SubjectKey::Tracked)
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKey::Solo => f.write_str("solo"),
            SubjectKey::Tracked(id) => write!(f, "#{}", id),
        }
    }
}

/// 单个肢体的持久状态
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LimbState {
    pub rep: RepState,
    /// 静息基线 (仅 RestingBaseline 校准使用, 首次观测后固定)
    pub baseline: Option<f32>,
}

/// 主体记录 (一个被追踪的人的全部持久状态)
#[derive(Clone, Debug)]
pub struct SubjectRecord {
    pub key: SubjectKey,
    pub limbs: Vec<LimbState>,
    /// 显示颜色 (创建时分配)
    pub color: Rgb,
    /// 首次出现的帧序号
    pub first_seen: u64,
    /// 最近一次更新的帧序号
    pub last_seen: u64,
    /// 总共被更新的帧数
    pub frames_seen: u64,
}

impl SubjectRecord {
    fn new(key: SubjectKey, limb_count: usize, color: Rgb, frame: u64) -> Self {
        Self {
            key,
            limbs: vec![LimbState::default(); limb_count],
            color,
            first_seen: frame,
            last_seen: frame,
            frames_seen: 0,
        }
    }

    /// 所有肢体计数之和
    pub fn total_count(&self) -> u32 {
        self.limbs.iter().map(|l| l.rep.count()).sum()
    }
}

/// 单个肢体的渲染快照
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LimbSnapshot {
    pub limb: String,
    /// 阶段名称, 未定时为 None
    pub stage: Option<String>,
    pub side: Option<Side>,
    pub count: u32,
    pub color: Rgb,
    /// 本帧使用的信号值 (被跳过时为 None)
    pub signal: Option<f32>,
    /// 本帧是否计数
    pub counted: bool,
}

/// 主体快照 (每次 update 的输出)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubjectSnapshot {
    pub identity: Option<u32>,
    pub color: Rgb,
    pub limbs: Vec<LimbSnapshot>,
}

impl SubjectSnapshot {
    pub fn limb(&self, name: &str) -> Option<&LimbSnapshot> {
        self.limbs.iter().find(|l| l.limb == name)
    }

    pub fn total_count(&self) -> u32 {
        self.limbs.iter().map(|l| l.count).sum()
    }
}

/// 注册表配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// 最大允许缺席帧数, None 表示永不淘汰
    #[serde(default)]
    pub max_missed_frames: Option<u32>,
    /// 单人模式颜色
    #[serde(default = "default_solo_color")]
    pub solo_color: Rgb,
    /// 多人模式按ID分配颜色
    #[serde(default)]
    pub palette: SubjectPalette,
}

fn default_solo_color() -> Rgb {
    (0, 255, 0)
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_missed_frames: None,
            solo_color: default_solo_color(),
            palette: SubjectPalette::default(),
        }
    }
}

/// 注册表统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub active: usize,
    pub created: u64,
    pub evicted: u64,
    pub total_reps: u64,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "跟踪: {} 人 | 累计创建: {} | 淘汰: {} | 总次数: {}",
            self.active, self.created, self.evicted, self.total_reps
        )
    }
}

// ========== 注册表 ==========

/// 主体注册表 (独占所有主体记录)
pub struct SubjectRegistry {
    policy: Arc<ExercisePolicy>,
    config: RegistryConfig,
    records: HashMap<SubjectKey, SubjectRecord>,
    /// 当前帧序号
    frame: u64,
    created: u64,
    evicted: u64,
}

impl SubjectRegistry {
    pub fn new(policy: Arc<ExercisePolicy>, config: RegistryConfig) -> Self {
        Self {
            policy,
            config,
            records: HashMap::new(),
            frame: 0,
            created: 0,
            evicted: 0,
        }
    }

    pub fn policy(&self) -> &ExercisePolicy {
        &self.policy
    }

    /// 设置当前帧序号 (用于最近出现时间与淘汰)
    pub fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, key: SubjectKey) -> bool {
        self.records.contains_key(&key)
    }

    pub fn get(&self, key: SubjectKey) -> Option<&SubjectRecord> {
        self.records.get(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = SubjectKey> + '_ {
        self.records.keys().copied()
    }

    /// 获取已有记录, 不存在时以默认状态创建
    pub fn get_or_create(&mut self, key: SubjectKey) -> &mut SubjectRecord {
        let frame = self.frame;
        let limb_count = self.policy.limbs.len();
        let color = self.color_for(key);
        let created = &mut self.created;
        self.records.entry(key).or_insert_with(|| {
            *created += 1;
            tracing::info!(subject = %key, frame, "新主体");
            SubjectRecord::new(key, limb_count, color, frame)
        })
    }

    /// 用本帧各肢体信号驱动状态机, 返回更新后的快照
    ///
    /// `signals` 与策略中的肢体一一对应; 出错的肢体本帧跳过, 状态保持不变。
    /// 未登记的主体若所有信号都无效则不创建记录。
    pub fn update(&mut self, key: SubjectKey, signals: &[Result<f32, SignalError>]) -> SubjectSnapshot {
        // 非有限值不能进入基线或状态机
        let signals: Vec<Result<f32, SignalError>> = signals
            .iter()
            .map(|s| match s {
                Ok(v) if !v.is_finite() => Err(SignalError::NonFinite(*v)),
                other => other.clone(),
            })
            .collect();

        if !self.records.contains_key(&key) && signals.iter().all(|s| s.is_err()) {
            tracing::debug!(subject = %key, "无有效信号, 暂不创建记录");
            return self.blank_snapshot(key);
        }

        let policy = Arc::clone(&self.policy);
        let frame = self.frame;
        let record = self.get_or_create(key);
        record.last_seen = frame;
        record.frames_seen += 1;

        let mut limbs = Vec::with_capacity(policy.limbs.len());
        for (idx, limb_policy) in policy.limbs.iter().enumerate() {
            let state = &mut record.limbs[idx];
            let signal = match signals.get(idx) {
                Some(Ok(raw)) => Some(calibrate(limb_policy, state, *raw)),
                Some(Err(e)) => {
                    tracing::debug!(subject = %key, limb = %limb_policy.name, error = %e, "跳过本帧");
                    None
                }
                None => None,
            };

            let counted = match signal {
                Some(s) => state.rep.apply(limb_policy, s),
                None => false,
            };
            if counted {
                tracing::debug!(
                    subject = %key,
                    limb = %limb_policy.name,
                    count = state.rep.count(),
                    "计数 +1"
                );
            }

            limbs.push(limb_snapshot(limb_policy, &state.rep, signal, counted));
        }

        SubjectSnapshot {
            identity: key.identity(),
            color: record.color,
            limbs,
        }
    }

    /// 当前快照 (不修改状态)
    pub fn snapshot(&self, key: SubjectKey) -> Option<SubjectSnapshot> {
        let record = self.records.get(&key)?;
        let limbs = self
            .policy
            .limbs
            .iter()
            .zip(&record.limbs)
            .map(|(p, s)| limb_snapshot(p, &s.rep, None, false))
            .collect();
        Some(SubjectSnapshot {
            identity: key.identity(),
            color: record.color,
            limbs,
        })
    }

    pub fn remove(&mut self, key: SubjectKey) -> Option<SubjectRecord> {
        self.records.remove(&key)
    }

    /// 删除缺席太久的记录, 返回被淘汰的身份
    pub fn evict_stale(&mut self) -> Vec<SubjectKey> {
        let Some(max_missed) = self.config.max_missed_frames else {
            return Vec::new();
        };
        let frame = self.frame;
        let mut evicted: Vec<SubjectKey> = self
            .records
            .values()
            .filter(|r| frame.saturating_sub(r.last_seen) > max_missed as u64)
            .map(|r| r.key)
            .collect();
        evicted.sort();

        for key in &evicted {
            if let Some(record) = self.remove(*key) {
                tracing::info!(
                    subject = %key,
                    last_seen = record.last_seen,
                    total = record.total_count(),
                    "淘汰主体"
                );
            }
        }
        self.evicted += evicted.len() as u64;
        evicted
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            active: self.records.len(),
            created: self.created,
            evicted: self.evicted,
            total_reps: self.records.values().map(|r| r.total_count() as u64).sum(),
        }
    }

    fn color_for(&self, key: SubjectKey) -> Rgb {
        match key {
            SubjectKey::Solo => self.config.solo_color,
            SubjectKey::Tracked(id) => self.config.palette.color_for(id),
        }
    }

    fn blank_snapshot(&self, key: SubjectKey) -> SubjectSnapshot {
        let rep = RepState::new();
        SubjectSnapshot {
            identity: key.identity(),
            color: self.color_for(key),
            limbs: self
                .policy
                .limbs
                .iter()
                .map(|p| limb_snapshot(p, &rep, None, false))
                .collect(),
        }
    }
}

/// 按校准方式换算信号; 静息基线在首次有效观测时捕获且不再更新
fn calibrate(policy: &LimbPolicy, state: &mut LimbState, raw: f32) -> f32 {
    match policy.calibration {
        Calibration::None => raw,
        Calibration::RestingBaseline => {
            let baseline = *state.baseline.get_or_insert(raw);
            baseline - raw
        }
    }
}

fn limb_snapshot(policy: &LimbPolicy, rep: &RepState, signal: Option<f32>, counted: bool) -> LimbSnapshot {
    let side = rep.stage();
    LimbSnapshot {
        limb: policy.name.clone(),
        stage: side.map(|s| policy.labels.label(s).to_string()),
        side,
        count: rep.count(),
        color: policy.stage_colors().color(side),
        signal,
        counted,
    }
}
