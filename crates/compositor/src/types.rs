use glam::Vec2;

/// Paint targets run at a quarter of the display resolution.
pub const PAINT_DIVISOR: u32 = 4;
/// The blurred driving field runs at an eighth of the display resolution.
pub const LOW_RES_DIVISOR: u32 = 8;

/// Size of a render target in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height; 1.0 for degenerate sizes.
    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Divides both dimensions, rounding up and never dropping below one texel.
    pub fn scaled_down(&self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self {
            width: self.width.div_ceil(divisor).max(1),
            height: self.height.div_ceil(divisor).max(1),
        }
    }

    pub fn texel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Size of one texel in normalized coordinates.
    pub fn texel(&self) -> Vec2 {
        Vec2::new(
            1.0 / self.width.max(1) as f32,
            1.0 / self.height.max(1) as f32,
        )
    }
}

impl std::fmt::Display for DisplaySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Dimensions of every frame buffer for one display size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    pub display: DisplaySize,
    pub paint: DisplaySize,
    pub low_res: DisplaySize,
}

impl BufferLayout {
    pub fn for_display(display: DisplaySize) -> Self {
        Self {
            display,
            paint: display.scaled_down(PAINT_DIVISOR),
            low_res: display.scaled_down(LOW_RES_DIVISOR),
        }
    }
}

/// Pointer state latched once per frame.
///
/// Coordinates are normalized to the viewport with the origin in the top-left
/// corner and +y pointing down. `velocity` is the displacement since the
/// previous latch, in the same units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: Vec2,
    pub velocity: Vec2,
    pub frame: u64,
}

impl PointerSample {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, frame: u64) -> Self {
        Self {
            position: Vec2::new(x, y),
            velocity: Vec2::new(vx, vy),
            frame,
        }
    }

    pub fn at_rest(position: Vec2, frame: u64) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            frame,
        }
    }

    /// Where the pointer was one frame earlier.
    pub fn previous_position(&self) -> Vec2 {
        self.position - self.velocity
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != Vec2::ZERO
    }
}

/// Per-frame context handed to every pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub index: u64,
    pub layout: BufferLayout,
}

impl FrameInfo {
    /// Frame counter folded into the 32 bits the jitter hash consumes.
    pub fn noise_frame(&self) -> u32 {
        self.index as u32
    }
}
