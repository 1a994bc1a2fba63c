use std::fmt::Display;

/// 一帧在 CPU 侧所处的阶段
///
/// Idle -> Acquiring -> Recording -> Submitted -> Presenting -> Idle
///
/// acquire 得到 out of date 时会重建 swapchain 并且重新 acquire，因此允许 Acquiring -> Acquiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

impl Display for FramePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl FramePhase {
    #[inline]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Acquiring)
                | (Self::Acquiring, Self::Acquiring)
                | (Self::Acquiring, Self::Recording)
                | (Self::Recording, Self::Submitted)
                | (Self::Submitted, Self::Presenting)
                | (Self::Presenting, Self::Idle)
        )
    }

    /// 非法的迁移意味着调用顺序错误，直接 panic
    pub fn transition(&mut self, next: Self) {
        if !self.can_transition_to(next) {
            panic!("invalid frame phase transition: {} -> {}", self, next);
        }
        *self = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut phase = FramePhase::default();
        for next in [
            FramePhase::Acquiring,
            FramePhase::Acquiring,
            FramePhase::Recording,
            FramePhase::Submitted,
            FramePhase::Presenting,
            FramePhase::Idle,
        ] {
            phase.transition(next);
        }
        assert_eq!(phase, FramePhase::Idle);
    }

    #[test]
    fn test_illegal_edges() {
        assert!(!FramePhase::Idle.can_transition_to(FramePhase::Recording));
        assert!(!FramePhase::Recording.can_transition_to(FramePhase::Acquiring));
        assert!(!FramePhase::Presenting.can_transition_to(FramePhase::Acquiring));
        assert!(!FramePhase::Idle.can_transition_to(FramePhase::Idle));
    }

    #[test]
    #[should_panic(expected = "Submitted -> Submitted")]
    fn test_double_submit() {
        let mut phase = FramePhase::Submitted;
        phase.transition(FramePhase::Submitted);
    }
}
