use crate::foundation::error::{StippleError, StippleResult};

pub use kurbo::{Point, Vec2};

/// Tick frequency of the incremental draw loop, in ticks per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TickRate(u32);

impl TickRate {
    pub fn new(per_sec: u32) -> StippleResult<Self> {
        if per_sec == 0 {
            return Err(StippleError::invalid_parameter("TickRate must be > 0"));
        }
        Ok(Self(per_sec))
    }

    pub fn per_sec(self) -> u32 {
        self.0
    }

    /// Delay between two consecutive ticks.
    pub fn tick_duration(self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.0.max(1)))
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_rate_rejects_zero() {
        assert!(TickRate::new(0).is_err());
        assert_eq!(TickRate::new(60).unwrap().per_sec(), 60);
    }

    #[test]
    fn tick_duration_is_inverse_rate() {
        let r = TickRate::new(50).unwrap();
        assert_eq!(r.tick_duration(), std::time::Duration::from_millis(20));
    }
}
