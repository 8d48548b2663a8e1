use crate::presenter::SidebarLabels;
use crate::render::render_text;
use crate::view::SidebarView;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Where the sidebar is drawn. Mounted once as an isolated root, then
/// redrawn whole on every render.
pub trait SidebarSurface: Send {
    fn mount(&mut self);
    fn render(&mut self, view: &SidebarView);
}

#[derive(Debug, Default)]
struct Frames {
    mounts: usize,
    renders: usize,
    last_view: Option<SidebarView>,
    last_text: String,
}

/// Headless surface that keeps the latest frame as text.
///
/// Clones share the same frames, so a caller can keep one to inspect what a
/// controller drew.
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    labels: SidebarLabels,
    frames: Arc<Mutex<Frames>>,
}

impl TextSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mount_count(&self) -> usize {
        self.frames().mounts
    }

    #[must_use]
    pub fn render_count(&self) -> usize {
        self.frames().renders
    }

    #[must_use]
    pub fn last_text(&self) -> String {
        self.frames().last_text.clone()
    }

    #[must_use]
    pub fn last_view(&self) -> Option<SidebarView> {
        self.frames().last_view.clone()
    }

    fn frames(&self) -> MutexGuard<'_, Frames> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SidebarSurface for TextSurface {
    fn mount(&mut self) {
        let mut frames = self.frames();
        if frames.mounts > 0 {
            return;
        }
        frames.mounts += 1;
    }

    fn render(&mut self, view: &SidebarView) {
        let text = render_text(view, &self.labels);
        let mut frames = self.frames();
        frames.renders += 1;
        frames.last_text = text;
        frames.last_view = Some(view.clone());
    }
}
