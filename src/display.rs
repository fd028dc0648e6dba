use crate::persistence::Frame;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Surface is where finished frames end up. It should abstract the
/// implementation details, so a variety of kinds of screen would work.
pub trait Surface {
    /// present a luminance frame
    fn draw(&mut self, frame: &Frame) -> Result<(), io::Error>;
}

/// luminance is shown as this many grey levels, darkest first
const LUMA_LEVELS: usize = 4;
const GREYS: [Color; LUMA_LEVELS] = [Color::Black, Color::DarkGray, Color::Gray, Color::White];

fn luma_level(luma: u8) -> usize {
    luma as usize * LUMA_LEVELS / 256
}

// store useful metadata about the panel
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel drawn at grey `level`, honouring
    /// the frame's mirroring flags
    fn points_at_level<'a>(
        &self,
        frame: &'a Frame,
        level: usize,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let (w, h) = (self.0, self.1);
        let flags = frame.flags;
        (0..w * h).filter_map(move |i| {
            let (x, y) = (i % w, i / w);
            if luma_level(frame.luma[i]) != level {
                return None;
            }
            let sx = if flags.mirror_x { w - 1 - x } else { x };
            let sy = if flags.mirror_y { h - 1 - y } else { y };
            Some((sx as f64, -1.0 * sy as f64))
        })
    }
}

/// greyscale panel in a terminal, rendered using TUI and crossterm
pub struct TermSurface {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl TermSurface {
    pub fn new(width: usize, height: usize) -> Result<TermSurface, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(TermSurface {
            terminal,
            resolution: Resolution(width, height),
        })
    }
}

impl Surface for TermSurface {
    fn draw(&mut self, frame: &Frame) -> Result<(), io::Error> {
        assert_eq!(
            (frame.width, frame.height),
            (self.resolution.0, self.resolution.1),
            "TermSurface must be given frames of its own resolution"
        );
        let flags = frame.flags;
        let (background, palette) = if flags.inverted {
            let mut p = GREYS;
            p.reverse();
            (Color::White, p)
        } else {
            (Color::Black, GREYS)
        };
        let resolution = &self.resolution;

        self.terminal.draw(|f| {
            // braille packs 2x4 pixels per cell
            let size = Rect::new(
                0,
                0,
                2 + (resolution.0 as u16 + 1) / 2,
                2 + (resolution.1 as u16 + 3) / 4,
            );

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("ARDUBOY")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(background)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Braille)
                .paint(|ctx| {
                    if !flags.display_on {
                        return;
                    }
                    // dim to bright, so a bright pixel wins a shared cell;
                    // level 0 is the background and is not drawn
                    for (level, &color) in palette.iter().enumerate().skip(1) {
                        ctx.draw(&Points {
                            coords: &resolution.points_at_level(frame, level).collect::<Vec<_>>(),
                            color,
                        });
                    }
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines: keeps every frame it's given
#[derive(Default)]
pub struct DummySurface {
    pub frames: Vec<Frame>,
}

impl DummySurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for DummySurface {
    fn draw(&mut self, frame: &Frame) -> Result<(), io::Error> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::FrameFlags;

    fn frame(width: usize, height: usize, lit: &[(usize, usize, u8)], flags: FrameFlags) -> Frame {
        let mut luma = vec![0; width * height];
        for &(x, y, l) in lit {
            luma[y * width + x] = l;
        }
        Frame {
            width,
            height,
            luma,
            flags,
            sequence: 0,
        }
    }

    #[test]
    fn test_luma_levels() {
        assert_eq!(luma_level(0), 0);
        assert_eq!(luma_level(63), 0);
        assert_eq!(luma_level(64), 1);
        assert_eq!(luma_level(170), 2);
        assert_eq!(luma_level(255), 3);
    }

    #[test]
    fn test_bounds() {
        let r = Resolution(128, 64);
        assert_eq!(r.x_bounds(), [0.0, 127.0]);
        assert_eq!(r.y_bounds(), [-63.0, 0.0]);
    }

    #[test]
    fn test_points_unmirrored() {
        let r = Resolution(8, 8);
        let f = frame(8, 8, &[(1, 2, 255)], FrameFlags::default());
        let p: Vec<_> = r.points_at_level(&f, 3).collect();
        assert_eq!(p, vec![(1.0, -2.0)]);
        assert_eq!(r.points_at_level(&f, 0).count(), 63);
    }

    #[test]
    fn test_points_mirrored() {
        let r = Resolution(8, 8);
        let flags = FrameFlags {
            mirror_x: true,
            mirror_y: true,
            ..FrameFlags::default()
        };
        let f = frame(8, 8, &[(1, 2, 100)], flags);
        let p: Vec<_> = r.points_at_level(&f, 1).collect();
        assert_eq!(p, vec![(6.0, -5.0)]);
    }

    #[test]
    fn test_dummy_surface_keeps_frames() -> Result<(), io::Error> {
        let mut s = DummySurface::new();
        s.draw(&frame(8, 8, &[], FrameFlags::default()))?;
        assert_eq!(s.frames.len(), 1);
        Ok(())
    }
}
