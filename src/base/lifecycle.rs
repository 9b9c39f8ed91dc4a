/// Where a resolver is in its life.
///
/// `Destroyed` has no variant: a destroyed resolver is simply dropped and no
/// handle can observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Lifecycle {
    /// Normal operation; locked calls are accepted.
    #[default]
    Active = 0,

    /// Orphaned; the shutdown task is queued on the serializer.
    ShuttingDown = 1,

    /// `shutdown_locked` has completed; waiting for the last reference.
    ShutDown = 2,
}

impl Lifecycle {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Active,
            1 => Lifecycle::ShuttingDown,
            _ => Lifecycle::ShutDown,
        }
    }

    pub fn is_active(self) -> bool {
        self == Lifecycle::Active
    }
}
