//! The presentation-surface boundary: window back buffers and the event
//! interface a platform window exposes to the host application.
//!
//! Real X11/Win32 surfaces live outside the engine; the offscreen
//! implementation here is what tests and platformless hosts run against.

use std::collections::VecDeque;

use parking_lot::Mutex;

use ::color::ColorType;
use ::error::{RenderError, RenderResult};
use ::texture::{TexelOrder, Texture};

/// Events a platform window reports to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    KeyDown { key: u32 },
    KeyUp { key: u32 },
    PointerMove { x: i32, y: i32 },
    PointerDown { button: u8, x: i32, y: i32 },
    PointerUp { button: u8, x: i32, y: i32 },
    Wheel { delta: i32 },
    Resized { width: u16, height: u16 },
    FocusGained,
    FocusLost,
    Exposed,
    CloseRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Starting,
    Running,
    Paused,
    Closing,
    Closed,
}

/// The back buffer a window presents from: an RGBA8 texture sized to the
/// window that the engine blits into.
pub struct WindowBuffer {
    texture: Texture,
}

impl WindowBuffer {
    pub fn new(width: u16, height: u16) -> RenderResult<WindowBuffer> {
        let texture = Texture::new(ColorType::Rgba8U, width, height, 1, TexelOrder::Ordered)
            .map_err(|_| RenderError::WindowBufferUnavailable)?;

        debug!("Allocated {}x{} window buffer", width, height);

        Ok(WindowBuffer { texture: texture })
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.texture.width()
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.texture.height()
    }

    #[inline]
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    #[inline]
    pub fn texture_mut(&mut self) -> &mut Texture {
        &mut self.texture
    }

    /// Reallocate for a resized window, discarding the old contents.
    pub fn resize(&mut self, width: u16, height: u16) -> RenderResult<()> {
        self.texture = Texture::new(ColorType::Rgba8U, width, height, 1, TexelOrder::Ordered)
            .map_err(|_| RenderError::WindowBufferUnavailable)?;
        Ok(())
    }
}

/// The surface a platform window exposes to the host application.
pub trait RenderWindow {
    fn init(&mut self, width: u16, height: u16) -> RenderResult<()>;

    fn destroy(&mut self) -> RenderResult<()>;

    fn set_title(&mut self, title: &str) -> RenderResult<()>;

    fn width(&self) -> u16;

    fn height(&self) -> u16;

    fn state(&self) -> WindowState;

    /// Pump the platform event queue.
    fn update(&mut self);

    fn has_event(&self) -> bool;

    /// Look at the next event without consuming it.
    fn peek_event(&self) -> Option<WindowEvent>;

    /// Consume and return the next event.
    fn pop_event(&mut self) -> Option<WindowEvent>;

    /// Present the back buffer.
    fn render(&mut self, buffer: &mut WindowBuffer) -> RenderResult<()>;
}

/// A windowless presentation surface: events are injected by the host and
/// presented frames are kept in memory.
pub struct OffscreenWindow {
    width: u16,
    height: u16,
    title: String,
    state: WindowState,
    events: Mutex<VecDeque<WindowEvent>>,
    presented: Vec<u8>,
}

impl OffscreenWindow {
    pub fn new() -> OffscreenWindow {
        OffscreenWindow {
            width: 0,
            height: 0,
            title: String::new(),
            state: WindowState::Starting,
            events: Mutex::new(VecDeque::new()),
            presented: Vec::new(),
        }
    }

    /// Inject an event, as a platform backend would from its event thread.
    pub fn push_event(&self, event: WindowEvent) {
        self.events.lock().push_back(event);
    }

    /// The most recently presented frame, tightly packed RGBA8.
    pub fn presented(&self) -> &[u8] {
        &self.presented
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl RenderWindow for OffscreenWindow {
    fn init(&mut self, width: u16, height: u16) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::PlatformFailure("zero-sized window"));
        }

        self.width = width;
        self.height = height;
        self.state = WindowState::Running;
        Ok(())
    }

    fn destroy(&mut self) -> RenderResult<()> {
        self.state = WindowState::Closed;
        self.presented.clear();
        self.events.lock().clear();
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> RenderResult<()> {
        self.title.clear();
        self.title.push_str(title);
        Ok(())
    }

    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn state(&self) -> WindowState {
        self.state
    }

    fn update(&mut self) {
        // no platform queue to pump; events arrive via push_event
    }

    fn has_event(&self) -> bool {
        !self.events.lock().is_empty()
    }

    fn peek_event(&self) -> Option<WindowEvent> {
        self.events.lock().front().cloned()
    }

    fn pop_event(&mut self) -> Option<WindowEvent> {
        let event = self.events.lock().pop_front();

        if event == Some(WindowEvent::CloseRequested) {
            self.state = WindowState::Closing;
        }

        event
    }

    fn render(&mut self, buffer: &mut WindowBuffer) -> RenderResult<()> {
        if self.state != WindowState::Running {
            return Err(RenderError::PlatformFailure("window is not running"));
        }

        let texture = buffer.texture();
        self.presented.clear();
        self.presented.reserve(texture.width() as usize * texture.height() as usize * 4);

        for y in 0..texture.height() {
            for x in 0..texture.width() {
                self.presented.extend_from_slice(texture.texel(x, y, 0));
            }
        }

        Ok(())
    }
}
