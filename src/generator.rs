//! Synthetic instance generation.
//!
//! Produces random PDPT/PDPTWT instances on a 120 x 120 grid (one unit of
//! distance is traveled in one unit of time) in the tab-delimited format
//! the loader reads, so generated files round-trip through
//! [`crate::instance::Instance::from_reader`]. Generation is deterministic
//! for a given seed.

use std::fmt::Write as _;
use std::path::Path;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Side length of the squared geographical area.
const GRID_SIZE: i64 = 120;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub requests: usize,
    pub vehicles: usize,
    pub stations: usize,
    pub seed: u64,
    /// Planning horizon; every depot and station is open for all of it.
    pub horizon: i64,
    /// Width of the pickup/delivery time windows. `None` leaves all
    /// windows at the full horizon (the untimed PDPT family).
    pub window_width: Option<i64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            requests: 5,
            vehicles: 2,
            stations: 1,
            seed: 42,
            horizon: 960,
            window_width: None,
        }
    }
}

impl GeneratorConfig {
    /// Benchmark-style name for the generated instance.
    pub fn instance_name(&self) -> String {
        match self.window_width {
            None => format!(
                "PDPT-R{}-K{}-T{}-Q100-{}",
                self.requests, self.vehicles, self.stations, self.seed
            ),
            Some(width) => format!(
                "{}R-{}K-{}T-{}L-{}",
                self.requests,
                self.vehicles,
                self.stations,
                width / 60,
                self.seed
            ),
        }
    }
}

/// Renders a random instance as tab-delimited text.
pub fn generate(config: &GeneratorConfig) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut out = String::new();

    out.push_str("nr\tnv\tnt\n");
    let _ = writeln!(out, "{}\t{}\t{}", config.requests, config.vehicles, config.stations);
    out.push('\n');
    out.push_str("node\tx\ty\ta\tb\tload\n");

    let mut point = |rng: &mut ChaCha8Rng| {
        (rng.gen_range(0..=GRID_SIZE), rng.gen_range(0..=GRID_SIZE))
    };

    for v in 1..=config.vehicles {
        let (x, y) = point(&mut rng);
        let _ = writeln!(out, "o{}\t{}\t{}\t0\t{}\t0", v, x, y, config.horizon);
    }
    for v in 1..=config.vehicles {
        let (x, y) = point(&mut rng);
        let _ = writeln!(out, "e{}\t{}\t{}\t0\t{}\t0", v, x, y, config.horizon);
    }

    for r in 1..=config.requests {
        let load = rng.gen_range(5..=20);
        let (px, py) = point(&mut rng);
        let (dx, dy) = point(&mut rng);

        let (pickup_window, delivery_window) = match config.window_width {
            None => ((0, config.horizon), (0, config.horizon)),
            Some(width) => {
                let width = width.min(config.horizon);
                let pickup_start = rng.gen_range(0..=(config.horizon - width));
                let delivery_start = rng.gen_range(pickup_start..=(config.horizon - width).max(pickup_start));
                ((pickup_start, pickup_start + width), (delivery_start, delivery_start + width))
            }
        };

        let _ = writeln!(
            out,
            "p{}\t{}\t{}\t{}\t{}\t{}",
            r, px, py, pickup_window.0, pickup_window.1, load
        );
        let _ = writeln!(
            out,
            "d{}\t{}\t{}\t{}\t{}\t-{}",
            r, dx, dy, delivery_window.0, delivery_window.1, load
        );
    }

    for t in 1..=config.stations {
        let (x, y) = point(&mut rng);
        let _ = writeln!(out, "t{}\t{}\t{}\t0\t{}\t0", t, x, y, config.horizon);
    }

    out
}

/// Generates an instance and writes it to `path`.
pub fn write_instance<P: AsRef<Path>>(config: &GeneratorConfig, path: P) -> Result<(), String> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
    }
    std::fs::write(path, generate(config))
        .map_err(|e| format!("cannot write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Instance;
    use std::io::Cursor;

    #[test]
    fn test_generated_instance_round_trips() {
        let config = GeneratorConfig { requests: 4, vehicles: 3, stations: 2, ..Default::default() };
        let text = generate(&config);

        let instance = Instance::from_reader("generated", Cursor::new(&text), false).unwrap();
        assert_eq!(instance.graph.num_nodes(), 2 * 4 + 2 * 3 + 2);
        assert_eq!(instance.vehicles.len(), 3);
        assert_eq!(instance.requests.len(), 4);
        assert!(instance.requests.iter().all(|r| r.load >= 5 && r.load <= 20));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = GeneratorConfig::default();
        assert_eq!(generate(&config), generate(&config));

        let other = GeneratorConfig { seed: 43, ..Default::default() };
        assert_ne!(generate(&config), generate(&other));
    }

    #[test]
    fn test_windowed_instance_round_trips() {
        let config = GeneratorConfig {
            requests: 3,
            window_width: Some(240),
            ..Default::default()
        };
        let text = generate(&config);
        let instance = Instance::from_reader("generated", Cursor::new(&text), false).unwrap();

        for r in &instance.requests {
            let pickup = instance.graph.node(r.pickup).unwrap();
            assert_eq!(pickup.latest_time - pickup.earliest_time, 240.0);
        }
    }

    #[test]
    fn test_instance_names() {
        let untimed = GeneratorConfig::default();
        assert!(crate::instance::is_pdpt_name(&untimed.instance_name()));

        let timed = GeneratorConfig { window_width: Some(480), ..Default::default() };
        assert!(crate::instance::is_pdptwt_name(&timed.instance_name()));
    }
}
