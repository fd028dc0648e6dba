//! The simulated board as the scheduler sees it. The instruction-level engine
//! and the display controller's command state machine live behind these
//! traits; the scheduler only runs bursts, toggles pins and reads pixels.

/// an I/O pin on the simulated MCU, e.g. port 'F' pin 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin {
    pub port: char,
    pub index: u8,
}

impl Pin {
    pub const fn new(port: char, index: u8) -> Self {
        Pin { port, index }
    }
}

/// what the core was doing when a burst ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Running,
    /// executing a sleep instruction; the engine still advances its cycle counter
    Sleeping,
    /// program finished
    Done,
    Crashed,
}

impl CpuState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CpuState::Done | CpuState::Crashed)
    }
}

/// result of one `run_burst`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    pub cycles: u64,
    pub state: CpuState,
}

/// the instruction-level engine
pub trait Simulator {
    /// run at most `max_cycles`; may stop short (e.g. on halt)
    fn run_burst(&mut self, max_cycles: u64) -> Burst;

    /// cycles executed since reset; never decreases
    fn current_cycle(&self) -> u64;

    /// drive an input pin to `level`
    fn raise_input_line(&mut self, pin: Pin, level: bool);

    fn frequency_hz(&self) -> u64;
}

/// display controller flags the renderer cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFlag {
    DisplayOn,
    Inverted,
    /// columns are addressed right to left (horizontal mirror)
    SegmentRemap,
    /// rows are scanned bottom to top (vertical mirror)
    ComScanReversed,
}

/// The display controller's pixel memory and flags.
///
/// The pixel grid uses SSD1306 page layout: `height / 8` pages of `width`
/// bytes each, where bit `n` of byte `page * width + x` is the pixel at
/// column `x`, row `page * 8 + n`.
pub trait DisplayController {
    /// (width, height) in pixels; height is a multiple of 8
    fn size(&self) -> (usize, usize);

    fn read_pixel_grid(&self) -> &[u8];

    fn read_flag(&self, flag: DisplayFlag) -> bool;
}

/// a board is an engine wired to a display
pub trait Machine: Simulator + DisplayController {}

impl<T: Simulator + DisplayController> Machine for T {}
