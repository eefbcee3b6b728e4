use std::f64::consts::TAU;
use std::time::Duration;

pub const BURST_PARTICLES: usize = 20;
/// Cyan, purple, white.
pub const BURST_COLORS: [&str; 3] = ["#22d3ee", "#e879f9", "#ffffff"];
pub const BURST_DURATION: Duration = Duration::from_millis(800);
pub const BURST_LIFT_PX: f64 = 100.0;

const SIZE_MIN_PX: f64 = 4.0;
const SIZE_MAX_PX: f64 = 10.0;
const TRAVEL_MIN_PX: f64 = 50.0;
const TRAVEL_MAX_PX: f64 = 150.0;

// Additive recurrence constants: golden ratio for the per-burst offset and
// the three-dimensional generalisation for per-particle parameters.
const GOLDEN: f64 = 0.618_033_988_749_895;
const R3: [f64; 3] = [
    0.819_172_513_396_164_4,
    0.671_043_606_703_789_2,
    0.549_700_477_901_970_4,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub color: &'static str,
    pub size_px: f64,
    /// Final horizontal offset from the burst origin.
    pub dx: f64,
    /// Final vertical offset, lift included (negative is up).
    pub dy: f64,
}

impl Particle {
    /// Distance travelled before the upward lift is applied.
    pub fn travel(&self) -> f64 {
        self.dx.hypot(self.dy + BURST_LIFT_PX)
    }
}

/// One applause particle burst, played on the overlay surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Burst {
    pub particles: Vec<Particle>,
    pub duration: Duration,
}

impl Burst {
    /// Deterministic burst for the `sequence`-th applaud.
    ///
    /// Parameters come from a low-discrepancy sequence so particles spread
    /// evenly without a random source, and successive bursts differ.
    pub fn generate(sequence: u64) -> Self {
        let offset = frac(sequence as f64 * GOLDEN);
        let particles = (0..BURST_PARTICLES)
            .map(|index| {
                let n = index as f64 + 1.0;
                let angle = frac(offset + n * R3[0]) * TAU;
                let travel = lerp(TRAVEL_MIN_PX, TRAVEL_MAX_PX, frac(offset + n * R3[1]));
                let size_px = lerp(SIZE_MIN_PX, SIZE_MAX_PX, frac(offset + n * R3[2]));

                Particle {
                    color: BURST_COLORS[index % BURST_COLORS.len()],
                    size_px,
                    dx: angle.cos() * travel,
                    dy: angle.sin() * travel - BURST_LIFT_PX,
                }
            })
            .collect();

        Self {
            particles,
            duration: BURST_DURATION,
        }
    }
}

fn frac(value: f64) -> f64 {
    value - value.floor()
}

fn lerp(min: f64, max: f64, t: f64) -> f64 {
    min + (max - min) * t
}
