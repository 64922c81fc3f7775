use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Intake total and goal as seen by the gauge on a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelReading {
    pub cumulative: u32,
    pub goal: u32,
}

impl LevelReading {
    fn pack(self) -> u64 {
        (u64::from(self.goal) << 32) | u64::from(self.cumulative)
    }

    fn unpack(raw: u64) -> Self {
        Self {
            cumulative: raw as u32,
            goal: (raw >> 32) as u32,
        }
    }
}

/// Read side of the intake total. The gauge polls this every frame.
pub trait LevelSource {
    fn reading(&self) -> LevelReading;
}

impl LevelSource for LevelReading {
    fn reading(&self) -> LevelReading {
        *self
    }
}

/// Lock-free cell the tracker publishes into after every mutation.
#[derive(Debug, Clone, Default)]
pub struct LevelHandle(Arc<AtomicU64>);

impl LevelHandle {
    pub fn new(reading: LevelReading) -> Self {
        Self(Arc::new(AtomicU64::new(reading.pack())))
    }

    pub fn publish(&self, reading: LevelReading) {
        self.0.store(reading.pack(), Ordering::Release);
    }
}

impl LevelSource for LevelHandle {
    fn reading(&self) -> LevelReading {
        LevelReading::unpack(self.0.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_readings_are_visible_to_clones() {
        let handle = LevelHandle::new(LevelReading {
            cumulative: 0,
            goal: 2000,
        });
        let reader = handle.clone();
        handle.publish(LevelReading {
            cumulative: u32::MAX,
            goal: 1500,
        });
        assert_eq!(
            reader.reading(),
            LevelReading {
                cumulative: u32::MAX,
                goal: 1500
            }
        );
    }
}
