//! Shared framebuffer guarded by one lock, split into a writer and a presenter.
//!
//! The dispatcher owns the [`FrameWriter`] and draws into the buffer from its
//! own thread. The hosting surface owns the [`FramePresenter`] and blits the
//! buffer when it composes. Neither half is `Clone`, so there is exactly one
//! writer and one presenter per buffer. Either side may reallocate on a size
//! change; reallocation takes the same lock as drawing and presenting.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// ARGB pixel buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Framebuffer {
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
    /// Row-major pixels, `width * height` entries.
    pixels: Vec<u32>,
}

impl Framebuffer {
    /// Allocate a cleared buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; pixel_count(width, height)],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Mutable row-major pixels.
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Fill with a single color.
    pub fn clear(&mut self, argb: u32) {
        self.pixels.fill(argb);
    }

    /// Fill a rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, left: i32, top: i32, width: i32, height: i32, argb: u32) {
        let x0 = left.clamp(0, self.width as i32) as usize;
        let y0 = top.clamp(0, self.height as i32) as usize;
        let x1 = left.saturating_add(width).clamp(0, self.width as i32) as usize;
        let y1 = top.saturating_add(height).clamp(0, self.height as i32) as usize;
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let stride = self.width as usize;
        for row in y0..y1 {
            self.pixels[row * stride + x0..row * stride + x1].fill(argb);
        }
    }

    /// Reallocate when the size differs. Returns true if it reallocated.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; pixel_count(width, height)];
        true
    }
}

/// Pixel count for a size.
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Create the writer/presenter pair for a new buffer.
pub fn frame_channel(width: u32, height: u32) -> (FrameWriter, FramePresenter) {
    let shared = Arc::new(Mutex::new(Framebuffer::new(width, height)));
    (
        FrameWriter {
            shared: shared.clone(),
        },
        FramePresenter { shared },
    )
}

/// Drawing half, owned by the dispatcher.
pub struct FrameWriter {
    /// Buffer shared with the presenter.
    shared: Arc<Mutex<Framebuffer>>,
}

impl FrameWriter {
    /// Run `f` against the buffer while holding the lock.
    pub fn draw<R>(&mut self, f: impl FnOnce(&mut Framebuffer) -> R) -> R {
        let mut fb = self.shared.lock();
        f(&mut fb)
    }

    /// Reallocate if the size changed.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        let resized = self.shared.lock().resize(width, height);
        if resized {
            trace!(width, height, "framebuffer_resized_by_writer");
        }
        resized
    }
}

/// Presenting half, owned by the hosting surface.
pub struct FramePresenter {
    /// Buffer shared with the writer.
    shared: Arc<Mutex<Framebuffer>>,
}

impl FramePresenter {
    /// Run `f` against the buffer while holding the lock.
    ///
    /// `f` must not block on anything external; copy the pixels out instead.
    pub fn present<R>(&self, f: impl FnOnce(&Framebuffer) -> R) -> R {
        let fb = self.shared.lock();
        f(&fb)
    }

    /// Reallocate if the surface size changed.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        let resized = self.shared.lock().resize(width, height);
        if resized {
            trace!(width, height, "framebuffer_resized_by_presenter");
        }
        resized
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread};

    use super::*;

    #[test]
    fn writer_output_is_visible_to_presenter() {
        let (mut w, p) = frame_channel(4, 2);
        w.draw(|fb| fb.clear(0xff00ff00));
        p.present(|fb| {
            assert_eq!(fb.pixels().len(), 8);
            assert!(fb.pixels().iter().all(|&px| px == 0xff00ff00));
        });
    }

    #[test]
    fn resize_only_when_dimensions_change() {
        let (mut w, mut p) = frame_channel(4, 4);
        assert!(!w.ensure_size(4, 4));
        assert!(p.ensure_size(8, 2));
        w.draw(|fb| {
            assert_eq!((fb.width(), fb.height()), (8, 2));
            assert_eq!(fb.pixels().len(), 16);
        });
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut fb = Framebuffer::new(3, 3);
        fb.fill_rect(-1, 1, 10, 1, 7);
        assert_eq!(fb.pixels(), &[0, 0, 0, 7, 7, 7, 0, 0, 0]);
    }

    #[test]
    fn presenter_never_sees_partial_frame() {
        let (mut w, p) = frame_channel(16, 16);
        let barrier = Arc::new(Barrier::new(2));
        let writer = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for color in 1..200u32 {
                    w.draw(|fb| {
                        for px in fb.pixels_mut() {
                            *px = color;
                        }
                    });
                }
            })
        };
        barrier.wait();
        for _ in 0..200 {
            p.present(|fb| {
                let first = fb.pixels()[0];
                assert!(fb.pixels().iter().all(|&px| px == first));
            });
        }
        writer.join().unwrap();
    }
}
