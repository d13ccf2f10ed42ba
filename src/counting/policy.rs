// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 阈值策略
//! Threshold policy: how a signal maps onto stages, and which transition counts
//!
//! 策略本身不保存状态, 每帧由状态机查询。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::signal::SignalSource;
use crate::detection::Rgb;
use crate::error::ConfigError;

/// 迟滞带的两侧
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Low,
    High,
}

/// 信号 → 所在侧的判定规则
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Band {
    /// 双阈值迟滞: s < low → Low, s > high → High, 中间为死区
    Hysteresis { low: f32, high: f32 },
    /// 比较器翻转: s < -dead_zone → Low, s > dead_zone → High
    ///
    /// `ties` 指定时, 死区内的值归入该侧 (不再保持原阶段)
    Comparator {
        #[serde(default)]
        dead_zone: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ties: Option<Side>,
    },
    /// 窗口判定: low + margin < s < high - margin → High (窗口内),
    /// s <= low - margin 或 s >= high + margin → Low, 边界两侧 margin 内为死区
    Window {
        low: f32,
        high: f32,
        #[serde(default)]
        margin: f32,
    },
}

impl Band {
    /// 判定信号所在侧, 死区内返回 None
    pub fn classify(&self, signal: f32) -> Option<Side> {
        if signal.is_nan() {
            return None;
        }
        match *self {
            Band::Hysteresis { low, high } => {
                if signal < low {
                    Some(Side::Low)
                } else if signal > high {
                    Some(Side::High)
                } else {
                    None
                }
            }
            Band::Comparator { dead_zone, ties } => {
                if signal < -dead_zone {
                    Some(Side::Low)
                } else if signal > dead_zone {
                    Some(Side::High)
                } else {
                    ties
                }
            }
            Band::Window { low, high, margin } => {
                if low + margin < signal && signal < high - margin {
                    Some(Side::High)
                } else if signal <= low - margin || signal >= high + margin {
                    Some(Side::Low)
                } else {
                    None
                }
            }
        }
    }

    fn validate(&self, limb: &str) -> Result<(), ConfigError> {
        match *self {
            Band::Hysteresis { low, high } => {
                // NaN 比较为 false, 同样拒绝
                if !(low < high) {
                    return Err(ConfigError::InvalidBand {
                        limb: limb.to_string(),
                        low,
                        high,
                    });
                }
            }
            Band::Comparator { dead_zone, .. } => {
                if !(dead_zone >= 0.0) {
                    return Err(ConfigError::InvalidDeadZone {
                        limb: limb.to_string(),
                        dead_zone,
                    });
                }
            }
            Band::Window { low, high, margin } => {
                if !(margin >= 0.0) {
                    return Err(ConfigError::InvalidDeadZone {
                        limb: limb.to_string(),
                        dead_zone: margin,
                    });
                }
                // 收窄后的窗口不能为空
                if !(low + margin < high - margin) {
                    return Err(ConfigError::InvalidBand {
                        limb: limb.to_string(),
                        low: low + margin,
                        high: high - margin,
                    });
                }
            }
        }
        Ok(())
    }
}

/// 计数触发条件
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountTrigger {
    /// 从对侧进入该侧时 +1 (深蹲、弯举等)
    Enter(Side),
    /// 任何换侧都 +1 (步数、左右交替)
    EverySideChange,
}

impl CountTrigger {
    /// 从 `from` 换到 `to` 是否计数
    pub fn fires(&self, from: Side, to: Side) -> bool {
        if from == to {
            return false;
        }
        match *self {
            CountTrigger::Enter(side) => to == side,
            CountTrigger::EverySideChange => true,
        }
    }
}

/// 两侧的显示名称 (例如 "down" / "up")
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLabels {
    pub low: String,
    pub high: String,
}

impl StageLabels {
    pub fn new(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn label(&self, side: Side) -> &str {
        match side {
            Side::Low => &self.low,
            Side::High => &self.high,
        }
    }
}

/// 阶段颜色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageColors {
    pub unset: Rgb,
    pub low: Rgb,
    pub high: Rgb,
}

/// 红色: 复位侧
pub const RED: Rgb = (255, 0, 0);
/// 绿色: 计数侧
pub const GREEN: Rgb = (0, 255, 0);

impl StageColors {
    /// 计数侧绿色, 其余红色
    pub fn for_trigger(trigger: CountTrigger) -> Self {
        match trigger {
            CountTrigger::Enter(Side::Low) => Self {
                unset: RED,
                low: GREEN,
                high: RED,
            },
            CountTrigger::Enter(Side::High) => Self {
                unset: RED,
                low: RED,
                high: GREEN,
            },
            CountTrigger::EverySideChange => Self {
                unset: RED,
                low: GREEN,
                high: GREEN,
            },
        }
    }

    pub fn color(&self, stage: Option<Side>) -> Rgb {
        match stage {
            None => self.unset,
            Some(Side::Low) => self.low,
            Some(Side::High) => self.high,
        }
    }
}

/// 基线校准方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calibration {
    /// 直接使用原始信号
    #[default]
    None,
    /// 首次观测值作为静息基线, 之后信号 = 基线 - 原始值; 基线不再更新
    RestingBaseline,
}

/// 单个肢体/动作的计数策略
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimbPolicy {
    /// 肢体名称 (同一练习内唯一)
    pub name: String,
    pub signal: SignalSource,
    pub band: Band,
    pub trigger: CountTrigger,
    pub labels: StageLabels,
    #[serde(default)]
    pub calibration: Calibration,
    /// 省略时按触发条件生成 (计数侧绿色)
    #[serde(default)]
    pub colors: Option<StageColors>,
}

impl LimbPolicy {
    pub fn new(
        name: impl Into<String>,
        signal: SignalSource,
        band: Band,
        trigger: CountTrigger,
        labels: StageLabels,
    ) -> Self {
        Self {
            name: name.into(),
            signal,
            band,
            trigger,
            labels,
            calibration: Calibration::None,
            colors: None,
        }
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn stage_colors(&self) -> StageColors {
        self.colors
            .unwrap_or_else(|| StageColors::for_trigger(self.trigger))
    }
}

/// 一个练习的完整策略 (一个或多个独立计数的肢体)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExercisePolicy {
    pub name: String,
    pub limbs: Vec<LimbPolicy>,
}

impl ExercisePolicy {
    pub fn new(name: impl Into<String>, limbs: Vec<LimbPolicy>) -> Self {
        Self {
            name: name.into(),
            limbs,
        }
    }

    /// 校验阈值带与肢体名称
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limbs.is_empty() {
            return Err(ConfigError::EmptyPolicy(self.name.clone()));
        }
        let mut names = HashSet::new();
        for limb in &self.limbs {
            if !names.insert(limb.name.as_str()) {
                return Err(ConfigError::DuplicateLimb(limb.name.clone()));
            }
            limb.band.validate(&limb.name)?;
        }
        Ok(())
    }

    /// 是否有肢体依赖追踪框 (单人模式无法提供)
    pub fn needs_region(&self) -> bool {
        self.limbs
            .iter()
            .any(|l| matches!(l.signal, SignalSource::RegionCenter { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::signal::Axis;
    use crate::counting::state_machine::RepState;
    use assert_matches::assert_matches;

    fn limb(band: Band) -> LimbPolicy {
        LimbPolicy::new(
            "arm",
            SignalSource::RegionCenter { axis: Axis::Y },
            band,
            CountTrigger::Enter(Side::High),
            StageLabels::new("down", "up"),
        )
    }

    #[test]
    fn test_hysteresis_is_strict() {
        let band = Band::Hysteresis {
            low: 30.0,
            high: 150.0,
        };
        assert_eq!(band.classify(29.9), Some(Side::Low));
        assert_eq!(band.classify(30.0), None);
        assert_eq!(band.classify(90.0), None);
        assert_eq!(band.classify(150.0), None);
        assert_eq!(band.classify(150.1), Some(Side::High));
        assert_eq!(band.classify(f32::NAN), None);
    }

    #[test]
    fn test_comparator_dead_zone() {
        let exact = Band::Comparator {
            dead_zone: 0.0,
            ties: None,
        };
        assert_eq!(exact.classify(-1.0), Some(Side::Low));
        assert_eq!(exact.classify(0.0), None);
        assert_eq!(exact.classify(1.0), Some(Side::High));

        let padded = Band::Comparator {
            dead_zone: 5.0,
            ties: None,
        };
        assert_eq!(padded.classify(-4.0), None);
        assert_eq!(padded.classify(4.0), None);
        assert_eq!(padded.classify(6.0), Some(Side::High));
    }

    #[test]
    fn test_comparator_ties() {
        // 手腕与脚跟等高算作着地
        let grounded_on_tie = Band::Comparator {
            dead_zone: 0.0,
            ties: Some(Side::Low),
        };
        assert_eq!(grounded_on_tie.classify(0.0), Some(Side::Low));
        assert_eq!(grounded_on_tie.classify(-3.0), Some(Side::Low));
        assert_eq!(grounded_on_tie.classify(0.5), Some(Side::High));

        let band: Band = serde_json::from_str(r#"{"kind": "comparator", "ties": "low"}"#).unwrap();
        assert_eq!(band, grounded_on_tie);
        let band: Band = serde_json::from_str(r#"{"kind": "comparator"}"#).unwrap();
        assert_eq!(band.classify(0.0), None);
    }

    #[test]
    fn test_window() {
        let band = Band::Window {
            low: 30.0,
            high: 100.0,
            margin: 0.0,
        };
        assert_eq!(band.classify(0.0), Some(Side::Low));
        assert_eq!(band.classify(30.0), Some(Side::Low));
        assert_eq!(band.classify(50.0), Some(Side::High));
        assert_eq!(band.classify(100.0), Some(Side::Low));
        assert_eq!(band.classify(120.0), Some(Side::Low));
    }

    #[test]
    fn test_window_margin() {
        let band = Band::Window {
            low: 30.0,
            high: 100.0,
            margin: 5.0,
        };
        assert_eq!(band.classify(25.0), Some(Side::Low));
        assert_eq!(band.classify(29.0), None);
        assert_eq!(band.classify(31.0), None);
        assert_eq!(band.classify(35.0), None);
        assert_eq!(band.classify(36.0), Some(Side::High));
        assert_eq!(band.classify(94.0), Some(Side::High));
        assert_eq!(band.classify(98.0), None);
        assert_eq!(band.classify(105.0), Some(Side::Low));

        // 抖动跨过下边界不会反复进入窗口
        let mut state = RepState::new();
        for s in [0.0, 29.0, 31.0, 29.0, 31.0, 29.0, 31.0] {
            state.step(&band, CountTrigger::Enter(Side::High), s);
        }
        assert_eq!(state.count(), 0);
        assert_eq!(state.stage(), Some(Side::Low));

        let band: Band = serde_json::from_str(r#"{"kind": "window", "low": 30, "high": 100}"#).unwrap();
        assert_eq!(
            band,
            Band::Window {
                low: 30.0,
                high: 100.0,
                margin: 0.0
            }
        );
    }

    #[test]
    fn test_trigger() {
        let enter_low = CountTrigger::Enter(Side::Low);
        assert!(enter_low.fires(Side::High, Side::Low));
        assert!(!enter_low.fires(Side::Low, Side::High));
        assert!(!enter_low.fires(Side::Low, Side::Low));
        assert!(CountTrigger::EverySideChange.fires(Side::Low, Side::High));
        assert!(CountTrigger::EverySideChange.fires(Side::High, Side::Low));
    }

    #[test]
    fn test_validate() {
        let ok = ExercisePolicy::new(
            "ok",
            vec![limb(Band::Hysteresis {
                low: 30.0,
                high: 150.0,
            })],
        );
        assert!(ok.validate().is_ok());

        let inverted = ExercisePolicy::new(
            "inverted",
            vec![limb(Band::Hysteresis {
                low: 150.0,
                high: 30.0,
            })],
        );
        assert_matches!(inverted.validate(), Err(ConfigError::InvalidBand { .. }));

        let negative = ExercisePolicy::new(
            "neg",
            vec![limb(Band::Comparator {
                dead_zone: -1.0,
                ties: None,
            })],
        );
        assert_matches!(negative.validate(), Err(ConfigError::InvalidDeadZone { .. }));

        let window = |margin| {
            ExercisePolicy::new(
                "jump",
                vec![limb(Band::Window {
                    low: 30.0,
                    high: 100.0,
                    margin,
                })],
            )
        };
        assert!(window(5.0).validate().is_ok());
        assert_matches!(window(-1.0).validate(), Err(ConfigError::InvalidDeadZone { .. }));
        assert_matches!(window(35.0).validate(), Err(ConfigError::InvalidBand { .. }));

        let dup = ExercisePolicy::new(
            "dup",
            vec![
                limb(Band::Comparator {
                    dead_zone: 0.0,
                    ties: None,
                }),
                limb(Band::Comparator {
                    dead_zone: 0.0,
                    ties: None,
                }),
            ],
        );
        assert_matches!(dup.validate(), Err(ConfigError::DuplicateLimb(name)) if name == "arm");

        let empty = ExercisePolicy::new("empty", vec![]);
        assert_matches!(empty.validate(), Err(ConfigError::EmptyPolicy(_)));
    }

    #[test]
    fn test_policy_from_json() {
        let json = r#"{
            "name": "custom_curl",
            "limbs": [{
                "name": "right_arm",
                "signal": {"kind": "joint_angle", "a": "right_shoulder", "vertex": "right_elbow", "c": "right_wrist"},
                "band": {"kind": "hysteresis", "low": 30.0, "high": 150.0},
                "trigger": {"enter": "low"},
                "labels": {"low": "up", "high": "down"}
            }]
        }"#;
        let policy: ExercisePolicy = serde_json::from_str(json).unwrap();
        assert!(policy.validate().is_ok());
        let limb = &policy.limbs[0];
        assert_eq!(limb.trigger, CountTrigger::Enter(Side::Low));
        assert_eq!(limb.calibration, Calibration::None);
        assert!(!policy.needs_region());
        assert_eq!(limb.stage_colors().color(Some(Side::Low)), GREEN);
    }
}
