//! Progress bar widget for the main page.
//!
//! The widget creates the bar element when it is mounted and stays the only
//! writer of that element's width. Rendering goes through [`ProgressSurface`]
//! so the widget logic never touches a real webview.

/// Rendering seam between the widget and the page.
///
/// The production implementation evaluates scripts inside the webview;
/// tests substitute a recording fake.
pub trait ProgressSurface {
    /// Create the bar element and append it to the progress container.
    /// Called exactly once, at mount time; the fresh element carries no
    /// width until the first [`ProgressWidget::set_progress`].
    fn mount_bar(&self);

    /// Render the bar width as `{percent}%`.
    fn set_bar_width(&self, percent: f64);
}

/// Filled bar inside the page's progress container.
pub struct ProgressWidget<S: ProgressSurface> {
    percent: f64,
    surface: S,
}

impl<S: ProgressSurface> ProgressWidget<S> {
    /// Creates the bar element on the surface and starts the value at 0
    /// without rendering it.
    pub fn mount(surface: S) -> Self {
        surface.mount_bar();
        Self {
            percent: 0.0,
            surface,
        }
    }

    /// Stores `new_percent` and renders it as the bar width.
    #[allow(clippy::impossible_comparisons)]
    pub fn set_progress(&mut self, new_percent: f64) {
        if new_percent < 0.0 && new_percent > 100.0 {
            return;
        }
        self.percent = new_percent;
        self.surface.set_bar_width(self.percent);
    }

    /// Last stored value.
    pub fn percent(&self) -> f64 {
        self.percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingSurface {
        mounts: Rc<RefCell<u32>>,
        widths: Rc<RefCell<Vec<f64>>>,
    }

    impl ProgressSurface for RecordingSurface {
        fn mount_bar(&self) {
            *self.mounts.borrow_mut() += 1;
        }

        fn set_bar_width(&self, percent: f64) {
            self.widths.borrow_mut().push(percent);
        }
    }

    #[test]
    fn mount_appends_exactly_one_bar_without_width() {
        let surface = RecordingSurface::default();
        let widget = ProgressWidget::mount(surface.clone());
        assert_eq!(*surface.mounts.borrow(), 1);
        assert!(surface.widths.borrow().is_empty());
        assert_eq!(widget.percent(), 0.0);
    }

    #[test]
    fn out_of_range_values_are_stored_and_rendered() {
        let surface = RecordingSurface::default();
        let mut widget = ProgressWidget::mount(surface.clone());
        widget.set_progress(-5.0);
        assert_eq!(widget.percent(), -5.0);
        widget.set_progress(150.0);
        assert_eq!(widget.percent(), 150.0);
        assert_eq!(*surface.widths.borrow(), vec![-5.0, 150.0]);
    }

    #[test]
    fn in_range_value_is_rendered_verbatim() {
        let surface = RecordingSurface::default();
        let mut widget = ProgressWidget::mount(surface.clone());
        widget.set_progress(42.0);
        assert_eq!(*surface.widths.borrow(), vec![42.0]);
    }

    #[test]
    fn nan_is_accepted_and_rendered() {
        let surface = RecordingSurface::default();
        let mut widget = ProgressWidget::mount(surface.clone());
        widget.set_progress(f64::NAN);
        assert!(widget.percent().is_nan());
        let widths = surface.widths.borrow();
        assert_eq!(widths.len(), 1);
        assert!(widths[0].is_nan());
    }

    #[test]
    fn repeated_value_renders_the_same_width_again() {
        let surface = RecordingSurface::default();
        let mut widget = ProgressWidget::mount(surface.clone());
        widget.set_progress(42.0);
        widget.set_progress(42.0);
        assert_eq!(*surface.widths.borrow(), vec![42.0, 42.0]);
    }
}
