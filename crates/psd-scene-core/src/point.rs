use crate::observable::Observable;
use std::fmt;

type PointCallback = Box<dyn FnMut(f64, f64)>;

/// A two-component observable coordinate.
///
/// Each component is an [`Observable`]; the point itself carries one owner
/// callback which always receives the full `(x, y)` pair after the write has
/// been applied, never a half-updated pair. The callback runs at most once
/// per call to any setter.
pub struct BoundPoint {
    x: Observable<f64>,
    y: Observable<f64>,
    on_change: Option<PointCallback>,
}

impl BoundPoint {
    /// Creates a point at `(x, y)`.
    ///
    /// The callback is not invoked for the initial value.
    pub fn new(x: f64, y: f64, on_change: Option<PointCallback>) -> Self {
        Self {
            x: Observable::new(x),
            y: Observable::new(y),
            on_change,
        }
    }

    pub fn x(&self) -> f64 {
        self.x.value()
    }

    pub fn y(&self) -> f64 {
        self.y.value()
    }

    pub fn xy(&self) -> (f64, f64) {
        (self.x(), self.y())
    }

    pub fn to_point(&self) -> kurbo::Point {
        kurbo::Point::new(self.x(), self.y())
    }

    pub fn set_x(&mut self, x: f64) -> bool {
        let changed = self.x.set(x);
        if changed {
            self.notify();
        }
        changed
    }

    pub fn set_y(&mut self, y: f64) -> bool {
        let changed = self.y.set(y);
        if changed {
            self.notify();
        }
        changed
    }

    /// Updates both components, then notifies once if either changed.
    pub fn set_xy(&mut self, x: f64, y: f64) -> bool {
        let changed_x = self.x.set(x);
        let changed_y = self.y.set(y);
        let changed = changed_x || changed_y;
        if changed {
            self.notify();
        }
        changed
    }

    /// Replaces the owner callback. Used when the display handle behind the
    /// point is rebuilt.
    pub fn set_on_change(&mut self, on_change: Option<PointCallback>) {
        self.on_change = on_change;
    }

    fn notify(&mut self) {
        let (x, y) = self.xy();
        if let Some(callback) = self.on_change.as_mut() {
            callback(x, y);
        }
    }
}

impl fmt::Debug for BoundPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundPoint")
            .field("x", &self.x())
            .field("y", &self.y())
            .finish()
    }
}
