//! Client logo carousel
//!
//! Looping slide rotation with responsive item counts. Items keep their DOM
//! order; the visible window is expressed as a display slot per item so the
//! loop wraps without cloning elements.

use serde::{Deserialize, Serialize};

/// Items shown from a minimum viewport width upward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub min_width: u32,
    pub items: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub autoplay: bool,
    pub autoplay_timeout_ms: u32,
    pub autoplay_hover_pause: bool,
    pub dots: bool,
    #[serde(rename = "loop")]
    pub looped: bool,
    /// Gap between items (px)
    pub margin: f32,
    /// Sorted by `min_width`
    pub responsive: Vec<Breakpoint>,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            autoplay_timeout_ms: 2500,
            autoplay_hover_pause: true,
            dots: true,
            looped: true,
            margin: 20.0,
            responsive: vec![
                Breakpoint { min_width: 0, items: 2 },
                Breakpoint { min_width: 576, items: 3 },
                Breakpoint { min_width: 768, items: 4 },
                Breakpoint { min_width: 992, items: 6 },
            ],
        }
    }
}

impl CarouselConfig {
    /// Items per view for a viewport width (the widest matching breakpoint wins)
    pub fn items_for_width(&self, viewport_width: f64) -> u32 {
        self.responsive
            .iter()
            .filter(|bp| f64::from(bp.min_width) <= viewport_width)
            .max_by_key(|bp| bp.min_width)
            .map(|bp| bp.items.max(1))
            .unwrap_or(1)
    }
}

/// Slide state for one carousel container
#[derive(Debug, Clone)]
pub struct Carousel {
    pub config: CarouselConfig,
    item_count: usize,
    per_view: usize,
    /// First visible item
    index: usize,
    hovered: bool,
}

impl Carousel {
    pub fn new(config: CarouselConfig, item_count: usize, viewport_width: f64) -> Self {
        let mut carousel = Self {
            config,
            item_count,
            per_view: 1,
            index: 0,
            hovered: false,
        };
        carousel.set_viewport_width(viewport_width);
        carousel
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn per_view(&self) -> usize {
        self.per_view
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Re-evaluate breakpoints; returns true if the per-view count changed
    pub fn set_viewport_width(&mut self, width: f64) -> bool {
        let per_view = self.config.items_for_width(width) as usize;
        let changed = per_view != self.per_view;
        self.per_view = per_view;
        self.index = self.index.min(self.max_index());
        changed
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// Fewer items than fit in one view: nothing to rotate
    pub fn is_static(&self) -> bool {
        self.item_count <= self.per_view
    }

    fn max_index(&self) -> usize {
        if self.config.looped {
            self.item_count.saturating_sub(1)
        } else {
            self.item_count.saturating_sub(self.per_view)
        }
    }

    /// Autoplay tick. Returns true if the view moved.
    pub fn autoplay_tick(&mut self) -> bool {
        if !self.config.autoplay || (self.hovered && self.config.autoplay_hover_pause) {
            return false;
        }
        self.next()
    }

    /// Move forward one item, wrapping if looped
    pub fn next(&mut self) -> bool {
        if self.is_static() {
            return false;
        }
        if self.index < self.max_index() {
            self.index += 1;
        } else if self.config.looped {
            self.index = 0;
        } else {
            return false;
        }
        true
    }

    /// Number of navigation dots
    pub fn page_count(&self) -> usize {
        if self.item_count == 0 {
            return 0;
        }
        self.item_count.div_ceil(self.per_view)
    }

    pub fn current_page(&self) -> usize {
        (self.index / self.per_view).min(self.page_count().saturating_sub(1))
    }

    /// Jump to the first item of a page
    pub fn go_to_page(&mut self, page: usize) {
        self.index = (page * self.per_view).min(self.max_index());
    }

    /// Display position of an item (0 = leftmost). Items at or past
    /// `per_view` are off screen.
    pub fn slot_of(&self, item: usize) -> usize {
        if self.item_count == 0 {
            return 0;
        }
        if self.config.looped {
            (item + self.item_count - self.index) % self.item_count
        } else {
            item.wrapping_sub(self.index).min(self.item_count)
        }
    }

    /// Item width that fits `per_view` items and their gaps in the container
    pub fn item_width(&self, container_width: f32) -> f32 {
        let gaps = self.config.margin * (self.per_view.saturating_sub(1)) as f32;
        ((container_width - gaps) / self.per_view as f32).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoints() {
        let config = CarouselConfig::default();
        assert_eq!(config.items_for_width(320.0), 2);
        assert_eq!(config.items_for_width(576.0), 3);
        assert_eq!(config.items_for_width(800.0), 4);
        assert_eq!(config.items_for_width(1920.0), 6);

        let empty = CarouselConfig {
            responsive: vec![],
            ..CarouselConfig::default()
        };
        assert_eq!(empty.items_for_width(1000.0), 1);
    }

    #[test]
    fn test_loop_wraps() {
        let mut c = Carousel::new(CarouselConfig::default(), 8, 1200.0);
        assert_eq!(c.per_view(), 6);
        for expected in 1..8 {
            assert!(c.next());
            assert_eq!(c.index(), expected);
        }
        assert!(c.next());
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn test_slots_rotate() {
        let mut c = Carousel::new(CarouselConfig::default(), 5, 400.0);
        c.next();
        c.next();
        assert_eq!(c.slot_of(2), 0);
        assert_eq!(c.slot_of(3), 1);
        assert_eq!(c.slot_of(0), 3);
        assert_eq!(c.slot_of(1), 4);
    }

    #[test]
    fn test_hover_pauses_autoplay() {
        let mut c = Carousel::new(CarouselConfig::default(), 10, 400.0);
        c.set_hovered(true);
        assert!(!c.autoplay_tick());
        assert_eq!(c.index(), 0);
        c.set_hovered(false);
        assert!(c.autoplay_tick());
        assert_eq!(c.index(), 1);
    }

    #[test]
    fn test_static_when_everything_fits() {
        let mut c = Carousel::new(CarouselConfig::default(), 4, 1200.0);
        assert!(c.is_static());
        assert!(!c.next());
        assert_eq!(c.page_count(), 1);
    }

    #[test]
    fn test_pages_and_dots() {
        let mut c = Carousel::new(CarouselConfig::default(), 10, 800.0);
        assert_eq!(c.page_count(), 3);
        c.go_to_page(2);
        assert_eq!(c.index(), 8);
        assert_eq!(c.current_page(), 2);

        // Shrinking the viewport re-pages
        assert!(c.set_viewport_width(300.0));
        assert_eq!(c.page_count(), 5);
        assert_eq!(c.current_page(), 4);
    }

    #[test]
    fn test_no_loop_stops_at_end() {
        let config = CarouselConfig {
            looped: false,
            ..CarouselConfig::default()
        };
        let mut c = Carousel::new(config, 5, 400.0);
        assert!(c.next());
        assert!(c.next());
        assert!(c.next());
        assert_eq!(c.index(), 3);
        assert!(!c.next());
    }

    #[test]
    fn test_item_width() {
        let c = Carousel::new(CarouselConfig::default(), 10, 1000.0);
        assert_eq!(c.item_width(1100.0), 1000.0 / 6.0);
    }
}
