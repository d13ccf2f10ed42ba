// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 计数状态机
//! Hysteresis rep state machine
//!
//! 状态: 未定 (None) / Low / High
//! - 未定: 首个有效信号决定所在侧, 不计数
//! - 死区: 不转换, 不计数
//! - 换侧: 按触发条件决定是否 +1

use serde::Serialize;

use super::policy::{Band, CountTrigger, LimbPolicy, Side};

/// 单次转换结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub stage: Option<Side>,
    pub incremented: bool,
}

/// 纯转换函数 `advance(signal, prior_stage) -> (new_stage, incremented)`
pub fn advance(band: &Band, trigger: CountTrigger, prior: Option<Side>, signal: f32) -> Transition {
    let Some(side) = band.classify(signal) else {
        return Transition {
            stage: prior,
            incremented: false,
        };
    };

    match prior {
        None => Transition {
            stage: Some(side),
            incremented: false,
        },
        Some(prev) => Transition {
            stage: Some(side),
            incremented: trigger.fires(prev, side),
        },
    }
}

/// 计数状态 (阶段 + 次数), 次数只增不减
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepState {
    stage: Option<Side>,
    count: u32,
}

impl RepState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Option<Side> {
        self.stage
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// 输入一帧信号, 返回本帧是否计数
    pub fn apply(&mut self, policy: &LimbPolicy, signal: f32) -> bool {
        self.step(&policy.band, policy.trigger, signal)
    }

    pub fn step(&mut self, band: &Band, trigger: CountTrigger, signal: f32) -> bool {
        let t = advance(band, trigger, self.stage, signal);
        self.stage = t.stage;
        if t.incremented {
            self.count = self.count.saturating_add(1);
        }
        t.incremented
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const CURL: Band = Band::Hysteresis {
        low: 30.0,
        high: 150.0,
    };

    fn run(band: &Band, trigger: CountTrigger, signals: &[f32]) -> (RepState, Vec<Option<Side>>) {
        let mut state = RepState::new();
        let mut stages = Vec::new();
        for &s in signals {
            state.step(band, trigger, s);
            stages.push(state.stage());
        }
        (state, stages)
    }

    #[test]
    fn test_first_signal_never_counts() {
        for trigger in [
            CountTrigger::Enter(Side::Low),
            CountTrigger::Enter(Side::High),
            CountTrigger::EverySideChange,
        ] {
            let (state, _) = run(&CURL, trigger, &[10.0]);
            assert_eq!(state.stage(), Some(Side::Low));
            assert_eq!(state.count(), 0);
        }
    }

    #[test]
    fn test_single_count_per_cycle() {
        // High → 死区 → Low → 死区 → High: 只有进入 Low 时计数一次
        let signals = [160.0, 120.0, 60.0, 25.0, 20.0, 60.0, 120.0, 170.0];
        let (state, _) = run(&CURL, CountTrigger::Enter(Side::Low), &signals);
        assert_eq!(state.count(), 1);
        assert_eq!(state.stage(), Some(Side::High));
    }

    #[test]
    fn test_dead_zone_noop() {
        let mut state = RepState::new();
        state.step(&CURL, CountTrigger::EverySideChange, 160.0);
        for s in [149.0, 100.0, 31.0, 30.0, 150.0, 75.5] {
            assert!(!state.step(&CURL, CountTrigger::EverySideChange, s));
            assert_eq!(state.stage(), Some(Side::High));
        }
        assert_eq!(state.count(), 0);

        // 未定状态下死区保持未定
        let (state, _) = run(&CURL, CountTrigger::EverySideChange, &[90.0, 100.0]);
        assert_eq!(state.stage(), None);
    }

    #[test]
    fn test_idempotent_redelivery() {
        let trigger = CountTrigger::Enter(Side::Low);
        let mut state = RepState::new();
        state.step(&CURL, trigger, 160.0);
        assert!(state.step(&CURL, trigger, 20.0));
        let snapshot = state;
        assert!(!state.step(&CURL, trigger, 20.0));
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_end_to_end_every_side_change() {
        let signals = [160.0, 155.0, 140.0, 90.0, 25.0, 90.0, 160.0];
        let mut state = RepState::new();
        let mut increments = Vec::new();
        for s in signals {
            increments.push(state.step(&CURL, CountTrigger::EverySideChange, s));
        }
        assert_eq!(
            increments,
            vec![false, false, false, false, true, false, true]
        );
        assert_eq!(state.count(), 2);
    }

    #[test]
    fn test_end_to_end_stage_trace() {
        let signals = [160.0, 155.0, 140.0, 90.0, 25.0, 90.0, 160.0];
        let (state, stages) = run(&CURL, CountTrigger::Enter(Side::Low), &signals);
        assert_eq!(
            stages,
            vec![
                Some(Side::High),
                Some(Side::High),
                Some(Side::High),
                Some(Side::High),
                Some(Side::Low),
                Some(Side::Low),
                Some(Side::High),
            ]
        );
        // 进入 Low 才计数: 一个完整周期只计一次
        assert_eq!(state.count(), 1);
    }

    #[test]
    fn test_comparator_flip_alternation() {
        // 右脚踝 y - 左脚踝 y: 负 = 右脚高
        let band = Band::Comparator {
            dead_zone: 0.0,
            ties: None,
        };
        let signals = [-10.0, -12.0, 8.0, 0.0, 9.0, -3.0, -4.0, 5.0];
        let (state, _) = run(&band, CountTrigger::EverySideChange, &signals);
        assert_eq!(state.count(), 3);
    }

    #[test]
    fn test_monotonic_random_sequences() {
        let mut rng = StdRng::seed_from_u64(7);
        let bands = [
            CURL,
            Band::Comparator {
                dead_zone: 2.0,
                ties: None,
            },
            Band::Window {
                low: 30.0,
                high: 100.0,
                margin: 5.0,
            },
        ];
        for band in bands {
            for trigger in [CountTrigger::Enter(Side::High), CountTrigger::EverySideChange] {
                let mut state = RepState::new();
                let mut prev = 0;
                for _ in 0..2000 {
                    let s: f32 = rng.gen_range(-200.0..200.0);
                    state.step(&band, trigger, s);
                    assert!(state.count() >= prev);
                    assert!(state.count() - prev <= 1);
                    prev = state.count();
                }
            }
        }
    }
}
