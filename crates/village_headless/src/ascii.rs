//! ASCII view of a running simulation.
//!
//! [`AsciiCanvas`] implements the core [`Renderer`] trait and rasterizes the
//! camera's view onto a character grid for quick terminal review.

use std::collections::BTreeMap;

use village_core::camera::Camera;
use village_core::components::EntityKind;
use village_core::math::DVec2;
use village_core::particles::Particle;
use village_core::render::{EntityView, Renderer};
use village_core::simulation::Simulation;

/// Grid size and styling for [`render_ascii`].
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Width of the grid in characters.
    pub width: usize,
    /// Height of the grid in characters.
    pub height: usize,
    /// Show the legend with per-kind counts.
    pub show_legend: bool,
    /// Emit ANSI color escapes.
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            show_legend: true,
            use_color: true,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const WHITE: &str = "\x1b[37m";
    pub const GRAY: &str = "\x1b[90m";
}

const EMPTY: char = '.';
const PARTICLE: char = '\'';

fn kind_char(kind: EntityKind) -> char {
    match kind {
        EntityKind::Player => '@',
        EntityKind::House => 'H',
        EntityKind::Enemy => 'e',
        EntityKind::Turret => 'T',
        EntityKind::Building => 'B',
        EntityKind::Worker => 'w',
        EntityKind::Resource => '*',
        EntityKind::Seed => ',',
        EntityKind::Projectile => '+',
    }
}

fn kind_color(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Player => colors::GREEN,
        EntityKind::House => colors::WHITE,
        EntityKind::Enemy => colors::RED,
        EntityKind::Turret => colors::CYAN,
        EntityKind::Building | EntityKind::Worker => colors::BLUE,
        EntityKind::Resource | EntityKind::Seed => colors::YELLOW,
        EntityKind::Projectile => colors::GRAY,
    }
}

/// Higher values win a shared cell.
fn draw_priority(kind: EntityKind) -> u8 {
    match kind {
        EntityKind::Projectile => 1,
        EntityKind::Seed | EntityKind::Resource => 2,
        EntityKind::Worker => 3,
        EntityKind::Building | EntityKind::Turret => 4,
        EntityKind::Enemy => 5,
        EntityKind::House => 6,
        EntityKind::Player => 7,
    }
}

fn health_color(fraction: f64) -> &'static str {
    if fraction > 0.66 {
        colors::GREEN
    } else if fraction > 0.33 {
        colors::YELLOW
    } else {
        colors::RED
    }
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    ch: char,
    color: &'static str,
    priority: u8,
}

impl Cell {
    const BLANK: Self = Self {
        ch: EMPTY,
        color: "",
        priority: 0,
    };
}

/// A character grid covering the camera's view.
#[derive(Debug, Clone)]
pub struct AsciiCanvas {
    config: AsciiConfig,
    screen: DVec2,
    origin: DVec2,
    span: DVec2,
    grid: Vec<Vec<Cell>>,
    counts: BTreeMap<EntityKind, u32>,
}

impl AsciiCanvas {
    /// Canvas for a `screen_width`×`screen_height` world viewport.
    #[must_use]
    pub fn new(config: AsciiConfig, screen_width: f64, screen_height: f64) -> Self {
        let grid = vec![vec![Cell::BLANK; config.width]; config.height];
        Self {
            config,
            screen: DVec2::new(screen_width, screen_height),
            origin: DVec2::new(-screen_width / 2.0, -screen_height / 2.0),
            span: DVec2::new(screen_width, screen_height),
            grid,
            counts: BTreeMap::new(),
        }
    }

    /// Entities drawn in the last frame, per kind.
    #[must_use]
    pub fn counts(&self) -> &BTreeMap<EntityKind, u32> {
        &self.counts
    }

    /// Character at grid cell `(column, row)`.
    #[must_use]
    pub fn char_at(&self, column: usize, row: usize) -> Option<char> {
        self.grid.get(row).and_then(|r| r.get(column)).map(|c| c.ch)
    }

    fn cell_of(&self, position: DVec2) -> Option<(usize, usize)> {
        let rel = (position - self.origin) / self.span;
        if !(0.0..1.0).contains(&rel.x) || !(0.0..1.0).contains(&rel.y) {
            return None;
        }
        let column = (rel.x * self.config.width as f64) as usize;
        let row = (rel.y * self.config.height as f64) as usize;
        Some((column.min(self.config.width - 1), row.min(self.config.height - 1)))
    }

    fn plot(&mut self, position: DVec2, cell: Cell) {
        if let Some((column, row)) = self.cell_of(position) {
            let slot = &mut self.grid[row][column];
            if cell.priority >= slot.priority {
                *slot = cell;
            }
        }
    }

    /// Compose the framed grid, with `title` in the header.
    #[must_use]
    pub fn compose(&self, title: &str) -> String {
        let use_color = self.config.use_color;
        let (bold, reset) = if use_color {
            (colors::BOLD, colors::RESET)
        } else {
            ("", "")
        };
        let rule = "═".repeat(self.config.width);
        let mut output = String::new();

        output.push_str(&format!("{bold}╔══ {title} ══╗{reset}\n"));
        output.push_str(&format!("║{rule}║\n"));
        for row in &self.grid {
            output.push('║');
            for cell in row {
                if use_color && !cell.color.is_empty() {
                    output.push_str(cell.color);
                    output.push(cell.ch);
                    output.push_str(colors::RESET);
                } else {
                    output.push(cell.ch);
                }
            }
            output.push_str("║\n");
        }

        if self.config.show_legend {
            let fill = "═".repeat(self.config.width.saturating_sub(10));
            output.push_str(&format!("╠══ LEGEND {fill}╣\n"));
            output.push_str("║ @=player H=house e=enemy T=turret B=building w=worker *=resource ,=seed +=shot\n");
            let counts = self
                .counts
                .iter()
                .map(|(kind, n)| format!("{kind:?}:{n}"))
                .collect::<Vec<_>>()
                .join(" ");
            output.push_str(&format!("║ {counts}\n"));
        }
        output.push_str(&format!("╚{rule}╝\n"));
        output
    }
}

impl Renderer for AsciiCanvas {
    fn begin_frame(&mut self, camera: &Camera) {
        self.span = self.screen / camera.zoom;
        self.origin = camera.center - self.span / 2.0;
        for row in &mut self.grid {
            row.fill(Cell::BLANK);
        }
        self.counts.clear();
    }

    fn draw_entity(&mut self, view: &EntityView) {
        let color = match (view.kind, view.health) {
            (EntityKind::House | EntityKind::Enemy, Some(fraction)) if fraction < 1.0 => {
                health_color(fraction)
            }
            _ => kind_color(view.kind),
        };
        *self.counts.entry(view.kind).or_insert(0) += 1;
        self.plot(
            view.position,
            Cell {
                ch: kind_char(view.kind),
                color,
                priority: draw_priority(view.kind),
            },
        );
    }

    fn draw_particle(&mut self, particle: &Particle) {
        self.plot(
            particle.position,
            Cell {
                ch: PARTICLE,
                color: colors::GRAY,
                priority: 0,
            },
        );
    }
}

/// Render the simulation's current view as ASCII art.
#[must_use]
pub fn render_ascii(sim: &Simulation, config: &AsciiConfig) -> String {
    let mut canvas = AsciiCanvas::new(
        config.clone(),
        sim.config().viewport_width,
        sim.config().viewport_height,
    );
    sim.render(&mut canvas);
    let house = sim.house_health().map_or(0.0, |h| h.current);
    let title = format!(
        "Tick: {} │ Wave: {} │ House: {:.0} │ {:?}",
        sim.get_tick(),
        sim.wave(),
        house,
        sim.state()
    );
    canvas.compose(&title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use village_test_utils::fixtures;

    fn plain(width: usize, height: usize) -> AsciiConfig {
        AsciiConfig {
            width,
            height,
            show_legend: false,
            use_color: false,
        }
    }

    #[test]
    fn test_house_drawn_at_center() {
        let mut canvas = AsciiCanvas::new(plain(81, 25), 1280.0, 720.0);
        canvas.begin_frame(&Camera::default());
        canvas.draw_entity(&EntityView {
            id: 1,
            kind: EntityKind::House,
            position: DVec2::ZERO,
            radius: 40.0,
            color: village_core::components::Color::WHITE,
            health: Some(1.0),
        });
        assert_eq!(canvas.char_at(40, 12), Some('H'));
        assert_eq!(canvas.counts()[&EntityKind::House], 1);
    }

    #[test]
    fn test_priority_keeps_house_over_resource() {
        let mut canvas = AsciiCanvas::new(plain(80, 24), 1280.0, 720.0);
        canvas.begin_frame(&Camera::default());
        let view = |kind| EntityView {
            id: 1,
            kind,
            position: DVec2::new(1.0, 1.0),
            radius: 10.0,
            color: village_core::components::Color::WHITE,
            health: None,
        };
        canvas.draw_entity(&view(EntityKind::House));
        canvas.draw_entity(&view(EntityKind::Resource));
        assert_eq!(canvas.char_at(40, 12), Some('H'));
    }

    #[test]
    fn test_off_screen_is_skipped() {
        let mut canvas = AsciiCanvas::new(plain(80, 24), 1280.0, 720.0);
        canvas.begin_frame(&Camera::default());
        canvas.draw_entity(&EntityView {
            id: 2,
            kind: EntityKind::Enemy,
            position: DVec2::new(700.0, 0.0),
            radius: 15.0,
            color: village_core::components::Color::WHITE,
            health: Some(1.0),
        });
        assert_eq!(canvas.counts()[&EntityKind::Enemy], 1);
        assert!(canvas.grid.iter().flatten().all(|c| c.ch == EMPTY));
    }

    #[test]
    fn test_render_simulation() {
        let sim = fixtures::defended_village();
        let text = render_ascii(&sim, &plain(80, 24));
        let grid: String = text.lines().skip(2).collect();
        assert!(grid.contains('H'));
        assert!(grid.contains('@'));
        assert!(grid.contains('T'));
        assert!(text.contains("Wave: 1"));
        // Header, two borders and the grid.
        assert_eq!(text.lines().count(), 24 + 3);
    }

    #[test]
    fn test_legend_lists_counts() {
        let sim = fixtures::playing(4);
        let config = AsciiConfig {
            use_color: false,
            ..AsciiConfig::default()
        };
        let text = render_ascii(&sim, &config);
        assert!(text.contains("LEGEND"));
        assert!(text.contains("House:1"));
    }
}
