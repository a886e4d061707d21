// Live scatter view of a shared Simulation: neutral gray points before the
// first step, palette colors per group afterwards, dashed fit lines, and a
// small status overlay. Read-only consumer; stepping happens elsewhere.

use std::sync::{Arc, Mutex};
use std::thread;

use minifb::{Key, Window, WindowOptions};

use crate::sim::{Phase, Simulation};

const WIDTH: usize = 720;
const HEIGHT: usize = 540;
const MARGIN: usize = 40;

const BACKGROUND: u32 = 0xF5F2EC;
const AXIS: u32 = 0x444444;
const NEUTRAL: u32 = 0x9CA3AF;
const TEXT: u32 = 0x272727;

// One color per group, reused modulo when there are more groups than entries.
const PALETTE: [u32; 7] = [
    0x1D282E, 0xC78C78, 0x7899A3, 0x8B7355, 0x4682B4, 0x9370DB, 0x20B2AA,
];

// 3x5 pixel glyphs, just enough for the status overlay.
fn glyph(ch: char) -> &'static [u8; 5] {
    match ch {
        '0' => &[0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => &[0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => &[0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => &[0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => &[0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => &[0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => &[0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => &[0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => &[0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => &[0b111, 0b101, 0b111, 0b001, 0b111],
        ':' => &[0b000, 0b010, 0b000, 0b010, 0b000],
        ' ' => &[0b000, 0b000, 0b000, 0b000, 0b000],
        'a' => &[0b111, 0b101, 0b111, 0b101, 0b101],
        'c' => &[0b111, 0b100, 0b100, 0b100, 0b111],
        'd' => &[0b110, 0b101, 0b101, 0b101, 0b110],
        'e' => &[0b111, 0b100, 0b111, 0b100, 0b111],
        'g' => &[0b111, 0b100, 0b101, 0b101, 0b111],
        'i' => &[0b111, 0b010, 0b010, 0b010, 0b111],
        'l' => &[0b100, 0b100, 0b100, 0b100, 0b111],
        'n' => &[0b101, 0b111, 0b111, 0b111, 0b101],
        'o' => &[0b111, 0b101, 0b101, 0b101, 0b111],
        'p' => &[0b111, 0b101, 0b111, 0b100, 0b100],
        'r' => &[0b110, 0b101, 0b110, 0b101, 0b101],
        's' => &[0b111, 0b100, 0b111, 0b001, 0b111],
        't' => &[0b111, 0b010, 0b010, 0b010, 0b010],
        'u' => &[0b101, 0b101, 0b101, 0b101, 0b111],
        'v' => &[0b101, 0b101, 0b101, 0b101, 0b010],
        _ => &[0b000, 0b000, 0b000, 0b000, 0b000],
    }
}

fn draw_char(buffer: &mut [u32], x: usize, y: usize, ch: char, color: u32) {
    for (dy, &row) in glyph(ch).iter().enumerate() {
        if y + dy >= HEIGHT {
            break;
        }
        for dx in 0..3 {
            if x + dx >= WIDTH {
                break;
            }
            if row & (1 << (2 - dx)) != 0 {
                buffer[(y + dy) * WIDTH + (x + dx)] = color;
            }
        }
    }
}

fn draw_text(buffer: &mut [u32], x: usize, y: usize, text: &str, color: u32) {
    let mut offset_x = x;
    for ch in text.chars() {
        if offset_x + 4 >= WIDTH {
            break;
        }
        draw_char(buffer, offset_x, y, ch, color);
        offset_x += 4;
    }
}

/// Maps data coordinates to pixels, y flipped, with a 10% padded view box.
struct ViewBox {
    x_lo: f64,
    y_lo: f64,
    x_scale: f64,
    y_scale: f64,
}

impl ViewBox {
    fn around(samples: &[crate::data::Sample]) -> ViewBox {
        let mut x_lo = f64::INFINITY;
        let mut x_hi = f64::NEG_INFINITY;
        let mut y_lo = f64::INFINITY;
        let mut y_hi = f64::NEG_INFINITY;
        for s in samples {
            x_lo = x_lo.min(s.x);
            x_hi = x_hi.max(s.x);
            y_lo = y_lo.min(s.y);
            y_hi = y_hi.max(s.y);
        }
        if !x_lo.is_finite() {
            (x_lo, x_hi, y_lo, y_hi) = (0.0, 1.0, 0.0, 1.0);
        }
        let x_pad = ((x_hi - x_lo) * 0.1).max(1e-9);
        let y_pad = ((y_hi - y_lo) * 0.1).max(1e-9);
        let (x_lo, x_hi) = (x_lo - x_pad, x_hi + x_pad);
        let (y_lo, y_hi) = (y_lo - y_pad, y_hi + y_pad);
        let inner_w = (WIDTH - 2 * MARGIN) as f64;
        let inner_h = (HEIGHT - 2 * MARGIN) as f64;
        ViewBox {
            x_lo,
            y_lo,
            x_scale: inner_w / (x_hi - x_lo),
            y_scale: inner_h / (y_hi - y_lo),
        }
    }

    fn pixel(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let px = MARGIN as f64 + (x - self.x_lo) * self.x_scale;
        let py = (HEIGHT - MARGIN) as f64 - (y - self.y_lo) * self.y_scale;
        if px < 0.0 || py < 0.0 || px >= WIDTH as f64 || py >= HEIGHT as f64 {
            return None;
        }
        Some((px as usize, py as usize))
    }
}

fn draw_marker(buffer: &mut [u32], cx: usize, cy: usize, color: u32) {
    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            if dx.abs() == 2 && dy.abs() == 2 {
                continue; // round the corners
            }
            let x = cx as i32 + dx;
            let y = cy as i32 + dy;
            if x >= 0 && y >= 0 && (x as usize) < WIDTH && (y as usize) < HEIGHT {
                buffer[y as usize * WIDTH + x as usize] = color;
            }
        }
    }
}

fn draw_frame(buffer: &mut [u32], sim: &Simulation) {
    buffer.fill(BACKGROUND);

    // Plot border.
    for x in MARGIN..WIDTH - MARGIN {
        buffer[MARGIN * WIDTH + x] = AXIS;
        buffer[(HEIGHT - MARGIN) * WIDTH + x] = AXIS;
    }
    for y in MARGIN..=HEIGHT - MARGIN {
        buffer[y * WIDTH + MARGIN] = AXIS;
        buffer[y * WIDTH + WIDTH - MARGIN] = AXIS;
    }

    let view = ViewBox::around(sim.samples());

    // Dashed fit lines, one pixel column at a time.
    for (group, fit) in sim.fits().iter().enumerate() {
        let color = PALETTE[group % PALETTE.len()];
        for px in MARGIN..WIDTH - MARGIN {
            if (px / 6) % 2 == 1 {
                continue;
            }
            let x = view.x_lo + (px - MARGIN) as f64 / view.x_scale;
            if let Some((sx, sy)) = view.pixel(x, fit.predict(x)) {
                buffer[sy * WIDTH + sx] = color;
            }
        }
    }

    // Points: gray until the first step has produced fits.
    let unclustered = sim.phase() == Phase::Idle;
    for s in sim.samples() {
        let color = if unclustered {
            NEUTRAL
        } else {
            PALETTE[s.group % PALETTE.len()]
        };
        if let Some((px, py)) = view.pixel(s.x, s.y) {
            draw_marker(buffer, px, py, color);
        }
    }

    let status = match sim.phase() {
        Phase::Idle => "idle",
        Phase::Running => "running",
        Phase::Converged => "converged",
    };
    draw_text(buffer, 10, 8, &format!("iteration: {}", sim.iteration()), TEXT);
    draw_text(buffer, 10, 18, status, TEXT);
    draw_text(buffer, 10, 28, &format!("groups: {}", sim.params().clusters), TEXT);
}

/// Opens the window on its own thread and redraws the shared simulation at
/// 30 fps until the window is closed or Escape is pressed.
pub fn spawn_visualizer(sim: Arc<Mutex<Simulation>>) {
    thread::spawn(move || {
        let mut window = match Window::new(
            "Clusterwise Regression — Partition & Fit",
            WIDTH,
            HEIGHT,
            WindowOptions::default(),
        ) {
            Ok(w) => w,
            Err(err) => {
                tracing::warn!(error = %err, "no display available, visualizer disabled");
                return;
            }
        };
        window.set_target_fps(30);

        let mut buffer: Vec<u32> = vec![0; WIDTH * HEIGHT];

        while window.is_open() && !window.is_key_down(Key::Escape) {
            {
                let sim = sim.lock().unwrap();
                draw_frame(&mut buffer, &sim);
            }
            if window.update_with_buffer(&buffer, WIDTH, HEIGHT).is_err() {
                break;
            }
        }
    });
}
