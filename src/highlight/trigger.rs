use gtk::glib;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Inputs that decide whether a highlight must be recomputed
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRequest {
    pub page_index: usize,
    pub scale: f64,
    pub query: String,
}

impl HighlightRequest {
    pub fn new(page_index: usize, scale: f64, query: impl Into<String>) -> Self {
        Self {
            page_index,
            scale,
            query: query.into(),
        }
    }

    fn same_key(&self, other: &HighlightRequest) -> bool {
        self.page_index == other.page_index
            && self.scale.to_bits() == other.scale.to_bits()
            && self.query == other.query
    }
}

/// Tracks the last highlight request seen by a view
#[derive(Debug, Default)]
pub struct TriggerState {
    current: Option<HighlightRequest>,
}

impl TriggerState {
    /// Record `request`; returns true when page, scale or query changed
    pub fn update(&mut self, request: HighlightRequest) -> bool {
        let changed = match &self.current {
            Some(current) => !current.same_key(&request),
            None => true,
        };
        if changed {
            self.current = Some(request);
        }
        changed
    }

    pub fn current(&self) -> Option<&HighlightRequest> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Runs at most one pending callback on the thread-default main context;
/// scheduling again cancels whatever was still waiting
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    pending: Rc<RefCell<Option<glib::SourceId>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, delay: Duration, func: F)
    where
        F: FnOnce() + 'static,
    {
        self.cancel();

        let pending = Rc::clone(&self.pending);
        let source_id = glib::timeout_add_local_once(delay, move || {
            // The source is finished once dispatched, so just forget its id
            pending.borrow_mut().take();
            func();
        });

        self.pending.replace(Some(source_id));
    }

    pub fn cancel(&self) {
        if let Some(source_id) = self.pending.borrow_mut().take() {
            source_id.remove();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

/// Fixed-rate frames on the thread-default main context, at most one
/// animation per handle; starting again stops the running one
#[derive(Debug, Clone, Default)]
pub struct Animation {
    running: Rc<RefCell<Option<glib::SourceId>>>,
}

impl Animation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `on_frame` every `frame` with progress in `(0, 1]`, ending at 1.0
    pub fn start<F>(&self, frame: Duration, steps: u32, mut on_frame: F)
    where
        F: FnMut(f64) + 'static,
    {
        self.stop();

        let steps = steps.max(1);
        let running = Rc::clone(&self.running);
        let mut step = 0;
        let source_id = glib::timeout_add_local(frame, move || {
            step += 1;
            on_frame(step as f64 / steps as f64);
            if step >= steps {
                // Returning Break removes the source
                running.borrow_mut().take();
                glib::ControlFlow::Break
            } else {
                glib::ControlFlow::Continue
            }
        });

        self.running.replace(Some(source_id));
    }

    pub fn stop(&self) {
        if let Some(source_id) = self.running.borrow_mut().take() {
            source_id.remove();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.borrow().is_some()
    }
}

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(3)
}
