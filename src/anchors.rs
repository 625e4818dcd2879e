//! Component id -> rendered bounding box, for the active view only.

use serde::Serialize;
use std::collections::HashMap;

use crate::schema::AnchorSide;

/// Bounding box in diagram-container coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn side_midpoint(&self, side: AnchorSide) -> (f32, f32) {
        let (cx, cy) = self.center();
        match side {
            AnchorSide::Top => (cx, self.y),
            AnchorSide::Bottom => (cx, self.bottom()),
            AnchorSide::Left => (self.x, cy),
            AnchorSide::Right => (self.right(), cy),
        }
    }
}

/// Written by the rendering surface whenever a node mounts or resizes, read
/// by routing. Entries belong to exactly one view; activating another view
/// drops them so ids reused across views never resolve to stale boxes.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    view: Option<String>,
    entries: HashMap<String, Rect>,
    generation: u64,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// Keys the registry to `view_id`, clearing entries if it changed.
    pub fn activate(&mut self, view_id: &str) {
        if self.view.as_deref() == Some(view_id) {
            return;
        }
        self.view = Some(view_id.to_string());
        self.entries.clear();
        self.generation += 1;
    }

    pub fn register(&mut self, component_id: &str, geometry: Rect) {
        let previous = self.entries.insert(component_id.to_string(), geometry);
        if previous != Some(geometry) {
            self.generation += 1;
        }
    }

    pub fn remove(&mut self, component_id: &str) -> Option<Rect> {
        let removed = self.entries.remove(component_id);
        if removed.is_some() {
            self.generation += 1;
        }
        removed
    }

    pub fn get(&self, component_id: &str) -> Option<Rect> {
        self.entries.get(component_id).copied()
    }

    /// Drops every entry and the view key (view teardown).
    pub fn clear(&mut self) {
        self.view = None;
        if !self.entries.is_empty() {
            self.entries.clear();
        }
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bumped on every change; readers compare it to skip redundant work.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
