//! Sensitive screen-region detection
//!
//! Flags clicks that land on OS chrome (taskbar, system tray, start menu).
//! Regions are recomputed from the dimensions passed in on every call, since
//! the agent's target display can change between actions.

use serde::Serialize;

const TASKBAR_HEIGHT: i32 = 48;
const TRAY_WIDTH: i32 = 300;
const START_MENU_WIDTH: i32 = 60;

/// Named axis-aligned rectangle in screen-pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenRegion {
    pub name: &'static str,
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl ScreenRegion {
    /// Inclusive containment on all four edges
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// Sensitive regions for a display of the given size.
///
/// Declaration order matters: the broad taskbar strip comes first and the
/// tray/start-menu boxes sit inside it, so a tray point reports "taskbar".
pub fn sensitive_regions(screen_width: i32, screen_height: i32) -> [ScreenRegion; 3] {
    [
        ScreenRegion {
            name: "taskbar",
            x_min: 0,
            y_min: screen_height - TASKBAR_HEIGHT,
            x_max: screen_width,
            y_max: screen_height,
        },
        ScreenRegion {
            name: "system_tray",
            x_min: screen_width - TRAY_WIDTH,
            y_min: screen_height - TASKBAR_HEIGHT,
            x_max: screen_width,
            y_max: screen_height,
        },
        ScreenRegion {
            name: "start_menu",
            x_min: 0,
            y_min: screen_height - TASKBAR_HEIGHT,
            x_max: START_MENU_WIDTH,
            y_max: screen_height,
        },
    ]
}

/// Name of the first sensitive region containing the point, if any.
pub fn region_at(x: i32, y: i32, screen_width: i32, screen_height: i32) -> Option<&'static str> {
    sensitive_regions(screen_width, screen_height)
        .into_iter()
        .find(|region| region.contains(x, y))
        .map(|region| region.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_in_bottom_strip_is_taskbar() {
        assert_eq!(region_at(5, 1070, 1920, 1080), Some("taskbar"));
        assert_eq!(region_at(960, 1035, 1920, 1080), Some("taskbar"));
    }

    #[test]
    fn test_desktop_point_matches_nothing() {
        assert_eq!(region_at(0, 0, 1920, 1080), None);
        assert_eq!(region_at(960, 540, 1920, 1080), None);
    }

    #[test]
    fn test_tray_point_reports_broad_region_first() {
        // (1900, 1070) is inside both the tray box and the taskbar strip;
        // declaration order yields the taskbar label
        assert_eq!(region_at(1900, 1070, 1920, 1080), Some("taskbar"));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert_eq!(region_at(0, 1032, 1920, 1080), Some("taskbar"));
        assert_eq!(region_at(1920, 1080, 1920, 1080), Some("taskbar"));
        assert_eq!(region_at(0, 1031, 1920, 1080), None);
    }

    #[test]
    fn test_regions_follow_given_dimensions() {
        // Smaller display: the strip moves up with the bottom edge
        assert_eq!(region_at(10, 760, 1280, 800), Some("taskbar"));
        assert_eq!(region_at(10, 740, 1280, 800), None);
    }
}
