//! Debounced, reference-counted loading indicator.
//!
//! Every request that wants an indicator holds a [`LoadingGuard`]. The
//! indicator appears only once work has been pending for the debounce delay,
//! and disappears when the last guard drops, on every exit path.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::presenter::Presenter;

#[derive(Default)]
struct LoadingState {
    pending: usize,
    visible: bool,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

/// Shared indicator state; clones coordinate through the same counter.
#[derive(Clone)]
pub struct LoadingTracker {
    state: Arc<Mutex<LoadingState>>,
    presenter: Arc<dyn Presenter>,
    delay: Duration,
}

impl LoadingTracker {
    pub fn new(presenter: Arc<dyn Presenter>, delay: Duration) -> Self {
        Self { state: Arc::new(Mutex::new(LoadingState::default())), presenter, delay }
    }

    /// Register pending work and (re)arm the show timer.
    ///
    /// Must be called within a Tokio runtime.
    pub fn acquire(&self, text: &str) -> LoadingGuard {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending += 1;

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        if !state.visible {
            state.generation = state.generation.wrapping_add(1);
            let generation = state.generation;
            let shared = Arc::clone(&self.state);
            let presenter = Arc::clone(&self.presenter);
            let delay = self.delay;
            let text = text.to_string();

            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                // A newer acquire or a final release superseded this timer.
                if state.generation != generation {
                    return;
                }
                state.timer = None;
                if state.pending > 0 && !state.visible {
                    state.visible = true;
                    presenter.show_loading(&text);
                }
            }));
        }

        LoadingGuard { tracker: self.clone() }
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending = state.pending.saturating_sub(1);
        if state.pending > 0 {
            return;
        }

        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if state.visible {
            state.visible = false;
            self.presenter.hide_loading();
        }
    }

    pub fn pending(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).pending
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).visible
    }
}

/// Pending-work token; dropping it releases the indicator.
pub struct LoadingGuard {
    tracker: LoadingTracker,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tracker.release();
    }
}
