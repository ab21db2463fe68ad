use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

/// Lifecycle of a [`Player`](super::Player).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Created = 0,
    Opening = 1,
    Ready = 2,
    Closing = 3,
    Closed = 4,
}

impl PlayerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PlayerState::Created,
            1 => PlayerState::Opening,
            2 => PlayerState::Ready,
            3 => PlayerState::Closing,
            _ => PlayerState::Closed,
        }
    }
}

pub(super) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(super) fn new(state: PlayerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(super) fn load(&self) -> PlayerState {
        PlayerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from -> to` if the current state is `from`. Only one caller
    /// can win a given transition.
    pub(super) fn transition(
        &self,
        from: PlayerState,
        to: PlayerState,
    ) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(super) fn store(
        &self,
        state: PlayerState,
    ) {
        self.0.store(state as u8, Ordering::Release);
    }
}
