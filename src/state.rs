use crate::errors::AppError;
use crate::gauge::{DrivenScheduler, Gauge, SvgSurface};
use crate::gesture::SlideTracker;
use crate::reminder::{NotificationBoard, ReminderEvaluator};
use crate::tracker::Tracker;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct AppData {
    pub tracker: Tracker,
    pub reminders: ReminderEvaluator<NotificationBoard>,
}

/// Shared with the frame loop, which cannot await, so this one is a
/// blocking mutex held for a single frame at most.
pub type SharedGauge = Arc<std::sync::Mutex<Gauge<SvgSurface>>>;

/// Advanced once per page animation frame. Locked before the gauge, never
/// while holding it.
pub type SharedFrames = Arc<std::sync::Mutex<DrivenScheduler>>;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<AppData>>,
    pub gauge: SharedGauge,
    pub frames: SharedFrames,
    pub slide: Arc<Mutex<SlideTracker>>,
}

impl AppState {
    pub fn new(
        data_path: PathBuf,
        tracker: Tracker,
        gauge: SharedGauge,
        frames: DrivenScheduler,
    ) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(AppData {
                tracker,
                reminders: ReminderEvaluator::new(NotificationBoard::default()),
            })),
            gauge,
            frames: Arc::new(std::sync::Mutex::new(frames)),
            slide: Arc::new(Mutex::new(SlideTracker::default())),
        }
    }

    pub fn lock_gauge(&self) -> Result<std::sync::MutexGuard<'_, Gauge<SvgSurface>>, AppError> {
        self.gauge
            .lock()
            .map_err(|_| AppError::internal_message("gauge state poisoned"))
    }

    pub fn lock_frames(&self) -> Result<std::sync::MutexGuard<'_, DrivenScheduler>, AppError> {
        self.frames
            .lock()
            .map_err(|_| AppError::internal_message("frame scheduler poisoned"))
    }
}
