use crate::engine::EventKind;

/// A set of event kinds a subscriber is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventKindSet(u32);

impl EventKindSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self::of(&EventKind::ALL)
    }

    /// Every kind the hub can publish (replies are routed to waiters instead).
    pub fn notifications() -> Self {
        EventKind::ALL
            .into_iter()
            .filter(|kind| *kind != EventKind::None && !kind.is_reply())
            .fold(Self::empty(), Self::with)
    }

    pub fn of(kinds: &[EventKind]) -> Self {
        kinds.iter().fold(Self::empty(), |set, kind| set.with(*kind))
    }

    pub fn with(
        self,
        kind: EventKind,
    ) -> Self {
        Self(self.0 | Self::bit(kind))
    }

    pub fn contains(
        &self,
        kind: EventKind,
    ) -> bool {
        self.0 & Self::bit(kind) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    fn bit(kind: EventKind) -> u32 {
        1 << (kind as u32)
    }
}

impl From<EventKind> for EventKindSet {
    fn from(kind: EventKind) -> Self {
        Self::empty().with(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let set = EventKindSet::of(&[EventKind::EndFile, EventKind::PlaybackRestart]);

        assert!(set.contains(EventKind::EndFile));
        assert!(set.contains(EventKind::PlaybackRestart));
        assert!(!set.contains(EventKind::StartFile));
    }

    #[test]
    fn test_notifications_exclude_replies() {
        let set = EventKindSet::notifications();

        assert!(set.contains(EventKind::Shutdown));
        assert!(!set.contains(EventKind::CommandReply));
        assert!(!set.contains(EventKind::None));
        assert!(EventKindSet::empty().is_empty());
    }
}
