use std::ops::Range;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use rand::Rng;

pub trait Delay {
    fn sleep(&self, duration: Duration);
}

impl<D: Delay + ?Sized> Delay for &D {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Default)]
pub struct RecordedDelay {
    slept: Mutex<Vec<Duration>>,
}

impl RecordedDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Duration> {
        match self.slept.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Delay for RecordedDelay {
    fn sleep(&self, duration: Duration) {
        match self.slept.lock() {
            Ok(mut guard) => guard.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    range_ms: Range<u64>,
}

impl Pacing {
    pub const DEFAULT_MIN_MS: u64 = 1500;
    pub const DEFAULT_MAX_MS: u64 = 3500;

    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            range_ms: min_ms..max_ms,
        }
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.range_ms.start)
    }

    pub fn next<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.range_ms.is_empty() {
            return self.min();
        }
        Duration::from_millis(rng.random_range(self.range_ms.clone()))
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_MS, Self::DEFAULT_MAX_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacing_stays_within_half_open_range() {
        let pacing = Pacing::default();
        let mut rng = rand::rng();
        for _ in 0..500 {
            let delay = pacing.next(&mut rng);
            assert!(delay >= Duration::from_millis(1500));
            assert!(delay < Duration::from_millis(3500));
        }
    }

    #[test]
    fn empty_range_falls_back_to_min() {
        let pacing = Pacing::new(0, 0);
        assert_eq!(pacing.next(&mut rand::rng()), Duration::ZERO);
    }

    #[test]
    fn recorded_delay_keeps_order() {
        let delay = RecordedDelay::new();
        delay.sleep(Duration::from_millis(500));
        delay.sleep(Duration::from_millis(1000));
        assert_eq!(
            delay.recorded(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }
}
