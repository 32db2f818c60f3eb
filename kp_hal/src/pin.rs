//! Digital output pins.

/// A digital output line.
///
/// Setting a pin must not block; implementations are called from inside
/// critical sections.
pub trait OutputPin: Send {
    /// Drive the pin high (`true`) or low (`false`).
    fn set(&mut self, high: bool);

    /// Current driven level.
    fn is_high(&self) -> bool;
}
