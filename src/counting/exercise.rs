// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 练习预设
//! Built-in exercise presets
//!
//! 阶段名称保持既有约定, 未做修正
//! (深蹲/俯卧撑中大角度侧被称为 "up", 计数发生在进入 "down" 时)。
//! 需要不同名称时在配置文件中提供自定义策略。

use serde::{Deserialize, Serialize};

use super::policy::{
    Band, Calibration, CountTrigger, ExercisePolicy, LimbPolicy, Side, StageLabels,
};
use super::signal::{Axis, SignalSource};
use crate::pose::Landmark;

/// 内置练习类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Exercise {
    /// 深蹲: 右膝角度
    Squat,
    /// 俯卧撑: 右肘角度 + 手腕/脚跟跳跃
    PushUp,
    /// 开合跳: 左肩角度
    JumpingJack,
    /// 卧推: 右肘相对右肩高度
    BenchPress,
    /// 卷腹: 左髋角度
    Crunch,
    /// 哑铃弯举: 双肘角度
    Curl,
    /// 侧平举: 髋-肩-腕角度
    LateralRaise,
    /// 弯举 (手腕相对肘部高度)
    WristCurl,
    /// 步数: 左右脚踝交替
    Steps,
    /// 步数: 左右手腕交替
    ArmSwingSteps,
    /// 跳绳: 追踪框中心相对静息基线 (多人)
    RopeJump,
}

impl Exercise {
    pub const ALL: [Exercise; 11] = [
        Exercise::Squat,
        Exercise::PushUp,
        Exercise::JumpingJack,
        Exercise::BenchPress,
        Exercise::Crunch,
        Exercise::Curl,
        Exercise::LateralRaise,
        Exercise::WristCurl,
        Exercise::Steps,
        Exercise::ArmSwingSteps,
        Exercise::RopeJump,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Exercise::Squat => "squat",
            Exercise::PushUp => "push_up",
            Exercise::JumpingJack => "jumping_jack",
            Exercise::BenchPress => "bench_press",
            Exercise::Crunch => "crunch",
            Exercise::Curl => "curl",
            Exercise::LateralRaise => "lateral_raise",
            Exercise::WristCurl => "wrist_curl",
            Exercise::Steps => "steps",
            Exercise::ArmSwingSteps => "arm_swing_steps",
            Exercise::RopeJump => "rope_jump",
        }
    }

    /// 生成该练习的阈值策略
    pub fn policy(&self) -> ExercisePolicy {
        use Landmark::*;

        let limbs = match self {
            Exercise::Squat => vec![angle_limb(
                "right_knee",
                (RightHip, RightKnee, RightAnkle),
                (90.0, 100.0),
                Side::Low,
                ("down", "up"),
            )],
            Exercise::PushUp => vec![
                angle_limb(
                    "right_elbow",
                    (RightShoulder, RightElbow, RightWrist),
                    (80.0, 100.0),
                    Side::Low,
                    ("down", "up"),
                ),
                // 脚跟 y - 手腕 y > 0: 手腕高于脚跟; 等高算着地
                comparator_limb(
                    "jump",
                    (RightHeel, RightWrist),
                    CountTrigger::Enter(Side::High),
                    ("grounded", "jump"),
                    Some(Side::Low),
                ),
            ],
            Exercise::JumpingJack => vec![angle_limb(
                "left_shoulder",
                (LeftHip, LeftShoulder, LeftElbow),
                (50.0, 100.0),
                Side::High,
                ("down", "up"),
            )],
            // 肘 y - 肩 y < 0: 肘高于肩
            Exercise::BenchPress => vec![comparator_limb(
                "right_elbow",
                (RightElbow, RightShoulder),
                CountTrigger::Enter(Side::Low),
                ("up", "down"),
                None,
            )],
            Exercise::Crunch => vec![angle_limb(
                "left_hip",
                (LeftKnee, LeftHip, LeftShoulder),
                (50.0, 60.0),
                Side::Low,
                ("up", "down"),
            )],
            Exercise::Curl => vec![
                angle_limb(
                    "right_arm",
                    (RightShoulder, RightElbow, RightWrist),
                    (30.0, 150.0),
                    Side::Low,
                    ("up", "down"),
                ),
                angle_limb(
                    "left_arm",
                    (LeftShoulder, LeftElbow, LeftWrist),
                    (30.0, 150.0),
                    Side::Low,
                    ("up", "down"),
                ),
            ],
            Exercise::LateralRaise => vec![
                angle_limb(
                    "right_arm",
                    (RightHip, RightShoulder, RightWrist),
                    (70.0, 80.0),
                    Side::High,
                    ("down", "up"),
                ),
                angle_limb(
                    "left_arm",
                    (LeftHip, LeftShoulder, LeftWrist),
                    (70.0, 80.0),
                    Side::High,
                    ("down", "up"),
                ),
            ],
            // 腕 y - 肘 y < 0: 手腕高于肘部
            Exercise::WristCurl => vec![comparator_limb(
                "right_arm",
                (RightWrist, RightElbow),
                CountTrigger::Enter(Side::Low),
                ("up", "down"),
                None,
            )],
            // 右 y - 左 y < 0: 右侧更高
            Exercise::Steps => vec![comparator_limb(
                "ankles",
                (RightAnkle, LeftAnkle),
                CountTrigger::EverySideChange,
                ("right_up", "left_up"),
                None,
            )],
            Exercise::ArmSwingSteps => vec![comparator_limb(
                "wrists",
                (RightWrist, LeftWrist),
                CountTrigger::EverySideChange,
                ("right_up", "left_up"),
                None,
            )],
            Exercise::RopeJump => vec![LimbPolicy::new(
                "body",
                SignalSource::RegionCenter { axis: Axis::Y },
                // 边界两侧各 5 像素死区, 抬升在 30 附近抖动不重复计数
                Band::Window {
                    low: 30.0,
                    high: 100.0,
                    margin: 5.0,
                },
                CountTrigger::Enter(Side::High),
                StageLabels::new("grounded", "airborne"),
            )
            .with_calibration(Calibration::RestingBaseline)],
        };

        ExercisePolicy::new(self.name(), limbs)
    }
}

impl std::fmt::Display for Exercise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn angle_limb(
    name: &str,
    (a, vertex, c): (Landmark, Landmark, Landmark),
    (low, high): (f32, f32),
    count_on: Side,
    (low_label, high_label): (&str, &str),
) -> LimbPolicy {
    LimbPolicy::new(
        name,
        SignalSource::JointAngle { a, vertex, c },
        Band::Hysteresis { low, high },
        CountTrigger::Enter(count_on),
        StageLabels::new(low_label, high_label),
    )
}

/// 无死区比较器 (对抖动敏感, 可通过配置增加死区)
fn comparator_limb(
    name: &str,
    (a, b): (Landmark, Landmark),
    trigger: CountTrigger,
    (low_label, high_label): (&str, &str),
    ties: Option<Side>,
) -> LimbPolicy {
    LimbPolicy::new(
        name,
        SignalSource::Position { a, b, axis: Axis::Y },
        Band::Comparator {
            dead_zone: 0.0,
            ties,
        },
        trigger,
        StageLabels::new(low_label, high_label),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::state_machine::RepState;
    use crate::pose::{Keypoints, Point2};

    fn count_angles(exercise: Exercise, angles: &[f32]) -> RepState {
        let policy = exercise.policy();
        let mut state = RepState::new();
        for &a in angles {
            state.apply(&policy.limbs[0], a);
        }
        state
    }

    #[test]
    fn test_all_presets_valid() {
        for exercise in Exercise::ALL {
            let policy = exercise.policy();
            assert!(policy.validate().is_ok(), "{} invalid", exercise);
            assert_eq!(policy.name, exercise.name());
        }
    }

    #[test]
    fn test_squat_counts_on_down() {
        // 站立 → 下蹲 → 站立 → 下蹲
        let state = count_angles(Exercise::Squat, &[170.0, 120.0, 95.0, 80.0, 95.0, 165.0, 85.0]);
        assert_eq!(state.count(), 2);
        let policy = Exercise::Squat.policy();
        assert_eq!(policy.limbs[0].labels.label(state.stage().unwrap()), "down");
    }

    #[test]
    fn test_jumping_jack_counts_on_up() {
        let state = count_angles(Exercise::JumpingJack, &[20.0, 70.0, 150.0, 40.0, 160.0]);
        assert_eq!(state.count(), 2);
    }

    #[test]
    fn test_push_up_labels_kept() {
        let policy = Exercise::PushUp.policy();
        let elbow = &policy.limbs[0];
        assert_eq!(elbow.labels.label(Side::High), "up");
        assert_eq!(elbow.trigger, CountTrigger::Enter(Side::Low));
        assert_eq!(elbow.band.classify(170.0), Some(Side::High));
    }

    #[test]
    fn test_bench_press_from_keypoints() {
        let policy = Exercise::BenchPress.policy();
        let limb = &policy.limbs[0];
        let mut state = RepState::new();
        // (肘 y, 肩 y): 肘低于肩 → 肘高于肩 → 肘低于肩 → 肘高于肩
        for (elbow_y, shoulder_y) in [(300.0, 250.0), (200.0, 250.0), (310.0, 250.0), (190.0, 250.0)] {
            let mut kps = Keypoints::new();
            kps.insert(Landmark::RightElbow, Point2::new(100.0, elbow_y));
            kps.insert(Landmark::RightShoulder, Point2::new(120.0, shoulder_y));
            let signal = limb.signal.extract(&kps, None).unwrap();
            state.apply(limb, signal);
        }
        assert_eq!(state.count(), 2);
        assert_eq!(limb.labels.label(state.stage().unwrap()), "up");
    }

    #[test]
    fn test_steps_every_alternation() {
        let policy = Exercise::Steps.policy();
        let limb = &policy.limbs[0];
        let mut state = RepState::new();
        for (right_y, left_y) in [(400.0, 420.0), (430.0, 410.0), (400.0, 420.0), (400.0, 400.0), (390.0, 420.0)] {
            let mut kps = Keypoints::new();
            kps.insert(Landmark::RightAnkle, Point2::new(0.0, right_y));
            kps.insert(Landmark::LeftAnkle, Point2::new(0.0, left_y));
            state.apply(limb, limb.signal.extract(&kps, None).unwrap());
        }
        // 首次不计数, 之后两次换侧, 等高为死区
        assert_eq!(state.count(), 2);
        assert_eq!(limb.labels.label(state.stage().unwrap()), "right_up");
    }

    #[test]
    fn test_rope_jump_needs_region() {
        assert!(Exercise::RopeJump.policy().needs_region());
        assert!(Exercise::ALL
            .iter()
            .filter(|e| **e != Exercise::RopeJump)
            .all(|e| !e.policy().needs_region()));
        let policy = Exercise::RopeJump.policy();
        assert_eq!(policy.limbs[0].calibration, Calibration::RestingBaseline);
    }

    #[test]
    fn test_push_up_jump_rearms_on_level_wrist() {
        let policy = Exercise::PushUp.policy();
        let jump = &policy.limbs[1];
        let mut state = RepState::new();
        // (脚跟 y, 手腕 y): 等高 → 手腕高 → 等高 → 手腕高
        for (heel_y, wrist_y) in [(500.0, 500.0), (500.0, 300.0), (500.0, 500.0), (500.0, 320.0)] {
            let mut kps = Keypoints::new();
            kps.insert(Landmark::RightHeel, Point2::new(0.0, heel_y));
            kps.insert(Landmark::RightWrist, Point2::new(0.0, wrist_y));
            state.apply(jump, jump.signal.extract(&kps, None).unwrap());
        }
        assert_eq!(state.count(), 2);
        assert_eq!(jump.labels.label(state.stage().unwrap()), "jump");
    }

    #[test]
    fn test_rope_jump_ignores_jitter_at_threshold() {
        use crate::counting::registry::{RegistryConfig, SubjectKey, SubjectRegistry};
        use crate::detection::BBox;
        use std::sync::Arc;

        let policy = Exercise::RopeJump.policy();
        let limb = policy.limbs[0].clone();
        let mut registry = SubjectRegistry::new(Arc::new(policy), RegistryConfig::default());
        let key = SubjectKey::Tracked(1);
        let mut feed = |center_y: f32| {
            let region = BBox::new(0.0, center_y - 100.0, 100.0, center_y + 100.0);
            let signal = limb.signal.extract(&Keypoints::new(), Some(&region));
            registry.update(key, &[signal])
        };

        // 基线 400, 抬升在 29 与 31 之间来回
        feed(400.0);
        for _ in 0..3 {
            feed(371.0);
            feed(369.0);
        }
        assert_eq!(feed(400.0).total_count(), 0);

        // 真正起跳仍然计数
        feed(350.0);
        assert_eq!(feed(400.0).total_count(), 1);
    }
}
