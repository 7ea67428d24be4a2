/// Hook pair for the "fetch on screen focus" pattern: `on_activate`
/// runs every time a screen regains visibility, not just on first
/// mount. Leaving focus does not cancel in-flight work; stale results
/// are discarded by the shelf aggregator's generation guard.
pub trait Screen {
    fn on_activate(&mut self) {}
    fn on_deactivate(&mut self) {}
}

/// Minimal navigation abstraction: named screens, one active at a
/// time. Navigating deactivates the previous screen and activates the
/// target; re-navigating to the active screen is a no-op.
#[derive(Default)]
pub struct Navigator {
    screens: Vec<(String, Box<dyn Screen>)>,
    active: Option<usize>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, screen: Box<dyn Screen>) {
        self.screens.push((name.into(), screen));
    }

    pub fn active(&self) -> Option<&str> {
        self.active.map(|index| self.screens[index].0.as_str())
    }

    /// Returns false when no screen has the given name.
    pub fn navigate(&mut self, name: &str) -> bool {
        let Some(target) = self.screens.iter().position(|(n, _)| n == name) else {
            return false;
        };
        if self.active == Some(target) {
            return true;
        }
        if let Some(current) = self.active {
            self.screens[current].1.on_deactivate();
        }
        self.active = Some(target);
        self.screens[target].1.on_activate();
        true
    }
}
