//! VeridianOS Window Manager
//!
//! A compositing window manager for VeridianOS desktop environment.

#![no_std]
#![no_main]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use alloc::string::String;
use core::panic::PanicInfo;

/// Window identifier
type WindowId = u64;

/// Window state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Normal,
    Minimized,
    Maximized,
    Fullscreen,
    Hidden,
}

/// Window attributes
#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub z_order: i32,
    pub state: WindowState,
    pub title: String,
    pub framebuffer: Vec<u32>,
    pub has_decorations: bool,
    pub is_focused: bool,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl Window {
    /// Create a new window
    pub fn new(id: WindowId, x: i32, y: i32, width: u32, height: u32, title: String) -> Self {
        let framebuffer = alloc::vec![0u32; (width * height) as usize];

        Self {
            id,
            x,
            y,
            width,
            height,
            z_order: 0,
            state: WindowState::Normal,
            title,
            framebuffer,
            has_decorations: true,
            is_focused: false,
            min_width: 100,
            min_height: 100,
            max_width: 4096,
            max_height: 4096,
        }
    }

    /// Move window to new position
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    /// Resize window
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(self.min_width).min(self.max_width);
        let height = height.max(self.min_height).min(self.max_height);

        self.width = width;
        self.height = height;
        self.framebuffer.resize((width * height) as usize, 0);
    }

    /// Set window state
    pub fn set_state(&mut self, state: WindowState) {
        self.state = state;
    }

    /// Check if point is inside window
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width as i32 &&
        y >= self.y && y < self.y + self.height as i32
    }

    /// Get decoration height (title bar)
    pub fn decoration_height(&self) -> u32 {
        if self.has_decorations { 24 } else { 0 }
    }
}

/// Window manager
pub struct WindowManager {
    windows: BTreeMap<WindowId, Window>,
    next_window_id: WindowId,
    focused_window: Option<WindowId>,
    screen_width: u32,
    screen_height: u32,
    screen_buffer: Vec<u32>,
    background_color: u32,
}

impl WindowManager {
    /// Create a new window manager
    pub fn new(width: u32, height: u32) -> Self {
        let screen_buffer = alloc::vec![0xFF2E3440u32; (width * height) as usize]; // Dark blue background

        Self {
            windows: BTreeMap::new(),
            next_window_id: 1,
            focused_window: None,
            screen_width: width,
            screen_height: height,
            screen_buffer,
            background_color: 0xFF2E3440,
        }
    }

    /// Create a new window
    pub fn create_window(&mut self, x: i32, y: i32, width: u32, height: u32, title: String) -> WindowId {
        let id = self.next_window_id;
        self.next_window_id += 1;

        let mut window = Window::new(id, x, y, width, height, title);
        window.z_order = self.windows.len() as i32;

        self.windows.insert(id, window);
        self.focus_window(id);

        id
    }

    /// Destroy a window
    pub fn destroy_window(&mut self, id: WindowId) -> Result<(), &'static str> {
        self.windows.remove(&id).ok_or("Window not found")?;

        // If this was the focused window, focus another
        if self.focused_window == Some(id) {
            self.focused_window = self.windows.keys().next().copied();
            if let Some(new_focus) = self.focused_window {
                if let Some(window) = self.windows.get_mut(&new_focus) {
                    window.is_focused = true;
                }
            }
        }

        Ok(())
    }

    /// Focus a window
    pub fn focus_window(&mut self, id: WindowId) {
        // Unfocus current window
        if let Some(current) = self.focused_window {
            if let Some(window) = self.windows.get_mut(&current) {
                window.is_focused = false;
            }
        }

        // Focus new window
        if let Some(window) = self.windows.get_mut(&id) {
            window.is_focused = true;
            self.focused_window = Some(id);

            // Bring to front
            let max_z = self.windows.values().map(|w| w.z_order).max().unwrap_or(0);
            window.z_order = max_z + 1;
        }
    }

    /// Move a window
    pub fn move_window(&mut self, id: WindowId, x: i32, y: i32) -> Result<(), &'static str> {
        let window = self.windows.get_mut(&id).ok_or("Window not found")?;
        window.move_to(x, y);
        Ok(())
    }

    /// Resize a window
    pub fn resize_window(&mut self, id: WindowId, width: u32, height: u32) -> Result<(), &'static str> {
        let window = self.windows.get_mut(&id).ok_or("Window not found")?;
        window.resize(width, height);
        Ok(())
    }

    /// Get window at position (for mouse clicks)
    pub fn window_at(&self, x: i32, y: i32) -> Option<WindowId> {
        // Return topmost window at position
        self.windows
            .values()
            .filter(|w| w.state == WindowState::Normal && w.contains(x, y))
            .max_by_key(|w| w.z_order)
            .map(|w| w.id)
    }

    /// Composite all windows to screen buffer
    pub fn composite(&mut self) {
        // Clear screen with background
        for pixel in self.screen_buffer.iter_mut() {
            *pixel = self.background_color;
        }

        // Get windows in z-order
        let mut windows: Vec<_> = self.windows.values().collect();
        windows.sort_by_key(|w| w.z_order);

        // Draw each window
        for window in windows {
            if window.state == WindowState::Hidden || window.state == WindowState::Minimized {
                continue;
            }

            // Draw window decorations
            if window.has_decorations {
                self.draw_decorations(window);
            }

            // Draw window content
            self.draw_window_content(window);
        }
    }

    /// Draw window decorations (title bar, borders)
    fn draw_decorations(&mut self, window: &Window) {
        let title_color = if window.is_focused { 0xFF4C566A } else { 0xFF3B4252 };
        let border_color = if window.is_focused { 0xFF88C0D0 } else { 0xFF434C5E };

        let deco_height = window.decoration_height();

        // Draw title bar
        for dy in 0..deco_height {
            for dx in 0..window.width {
                let screen_x = window.x + dx as i32;
                let screen_y = window.y - deco_height as i32 + dy as i32;

                if screen_x >= 0 && screen_x < self.screen_width as i32 &&
                   screen_y >= 0 && screen_y < self.screen_height as i32 {
                    let offset = screen_y as usize * self.screen_width as usize + screen_x as usize;
                    if offset < self.screen_buffer.len() {
                        self.screen_buffer[offset] = title_color;
                    }
                }
            }
        }

        // Draw borders (1 pixel)
        for i in 0..window.width {
            // Top border
            self.set_screen_pixel(window.x + i as i32, window.y - 1, border_color);
            // Bottom border
            self.set_screen_pixel(window.x + i as i32, window.y + window.height as i32, border_color);
        }
        for i in 0..window.height {
            // Left border
            self.set_screen_pixel(window.x - 1, window.y + i as i32, border_color);
            // Right border
            self.set_screen_pixel(window.x + window.width as i32, window.y + i as i32, border_color);
        }
    }

    /// Draw window content
    fn draw_window_content(&mut self, window: &Window) {
        for dy in 0..window.height {
            for dx in 0..window.width {
                let screen_x = window.x + dx as i32;
                let screen_y = window.y + dy as i32;

                if screen_x >= 0 && screen_x < self.screen_width as i32 &&
                   screen_y >= 0 && screen_y < self.screen_height as i32 {
                    let window_offset = dy as usize * window.width as usize + dx as usize;
                    let screen_offset = screen_y as usize * self.screen_width as usize + screen_x as usize;

                    if window_offset < window.framebuffer.len() && screen_offset < self.screen_buffer.len() {
                        let pixel = window.framebuffer[window_offset];
                        // Alpha blending would go here
                        self.screen_buffer[screen_offset] = pixel;
                    }
                }
            }
        }
    }

    /// Set a pixel in screen buffer
    fn set_screen_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.screen_width as i32 &&
           y >= 0 && y < self.screen_height as i32 {
            let offset = y as usize * self.screen_width as usize + x as usize;
            if offset < self.screen_buffer.len() {
                self.screen_buffer[offset] = color;
            }
        }
    }

    /// Get screen buffer for display
    pub fn screen_buffer(&self) -> &[u32] {
        &self.screen_buffer
    }

    /// Get window framebuffer for application drawing
    pub fn get_window_buffer(&mut self, id: WindowId) -> Option<&mut [u32]> {
        self.windows.get_mut(&id).map(|w| w.framebuffer.as_mut_slice())
    }
}

/// Main entry point
#[no_mangle]
pub extern "C" fn _start() -> ! {
    // In a real implementation, this would:
    // 1. Initialize graphics driver connection
    // 2. Create window manager instance
    // 3. Enter event loop:
    //    - Process input events (mouse, keyboard)
    //    - Handle window requests from applications via IPC
    //    - Composite windows
    //    - Update display

    // Create window manager (1920x1080 example)
    let mut wm = WindowManager::new(1920, 1080);

    // Create some example windows
    let _win1 = wm.create_window(100, 100, 800, 600, String::from("Terminal"));
    let _win2 = wm.create_window(200, 200, 600, 400, String::from("File Manager"));
    let _win3 = wm.create_window(300, 300, 400, 300, String::from("Text Editor"));

    // Composite and display
    wm.composite();

    // Main event loop would go here
    loop {
        // Process events
        // Update windows
        // Composite
        // Wait for next frame
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    loop {
        core::hint::spin_loop();
    }
}
