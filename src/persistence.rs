use parking_lot::Mutex;
use std::sync::Arc;

/// Phosphor-style afterglow for a display that toggles faster than the eye
/// (or the terminal) can follow.
///
/// Each tick every pixel fades by `decay` (floor 0) and then, if the display
/// has it lit, brightens by `increase` (ceiling 255). With `increase > decay` pixels ramp up faster than
/// they fade, so a pixel the firmware strobes reads as a steady mid-grey
/// instead of flickering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceBuffer {
    width: usize,
    height: usize,
    luma: Vec<u8>,
}

impl PersistenceBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        PersistenceBuffer {
            width,
            height,
            luma: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// row-major luminance, `width * height` entries
    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.luma[y * self.width + x]
    }

    /// fold the current pixel state (SSD1306 page layout) into the buffer
    pub fn update(&mut self, pages: &[u8], decay: u8, increase: u8) {
        assert_eq!(
            pages.len(),
            self.width * self.height / 8,
            "PersistenceBuffer must be given exactly one byte per 8 pixels"
        );
        if self.width == 0 {
            return;
        }
        for (page, columns) in pages.chunks_exact(self.width).enumerate() {
            for (x, &column) in columns.iter().enumerate() {
                let mut bits = column;
                for row in page * 8..page * 8 + 8 {
                    let cell = &mut self.luma[row * self.width + x];
                    *cell = cell.saturating_sub(decay);
                    if bits & 1 == 1 {
                        *cell = cell.saturating_add(increase);
                    }
                    bits >>= 1;
                }
            }
        }
    }
}

/// presentation flags latched alongside a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags {
    pub display_on: bool,
    pub inverted: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

/// a copy of the luminance grid, ready to draw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub luma: Vec<u8>,
    pub flags: FrameFlags,
    /// how many frames have been published before this one
    pub sequence: u64,
}

impl Frame {
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.luma[y * self.width + x]
    }
}

/// Hands finished frames from the simulation side to the presentation side.
///
/// The lock is only ever held for the length of a grid copy, in either
/// direction, so the reader never sees a half-updated grid and the writer is
/// never held up by drawing.
#[derive(Debug, Clone, Default)]
pub struct FrameHandoff {
    frame: Arc<Mutex<Frame>>,
}

impl FrameHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, buffer: &PersistenceBuffer, flags: FrameFlags) {
        let mut frame = self.frame.lock();
        frame.width = buffer.width;
        frame.height = buffer.height;
        frame.luma.clear();
        frame.luma.extend_from_slice(&buffer.luma);
        frame.flags = flags;
        frame.sequence += 1;
    }

    /// copy the latest frame into `out`, reusing its allocation
    pub fn copy_into(&self, out: &mut Frame) {
        let frame = self.frame.lock();
        out.width = frame.width;
        out.height = frame.height;
        out.luma.clear();
        out.luma.extend_from_slice(&frame.luma);
        out.flags = frame.flags;
        out.sequence = frame.sequence;
    }

    pub fn snapshot(&self) -> Frame {
        self.frame.lock().clone()
    }
}
