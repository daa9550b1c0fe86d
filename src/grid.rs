// Hex grid generation for HexFog Core
//
// Pure geometry: a pre-validated GridConfig in, a row-major sequence of hexes
// out. The session owns when to regenerate and how revealed flags are derived.

use std::f64::consts::PI;

use crate::types::{Bounds, GridConfig, Hex, Orientation, Point, RevealedSet};

/// Generate the full grid for a config, row-major (all columns of row 0,
/// then row 1, ...). Ids are `"{col}-{row}"` and unique per grid.
///
/// Pointy orientation: hex width is `size·√3`, height `size·2`, odd rows are
/// shifted right by half a width and rows are `height·¾` apart. Flat
/// orientation swaps the roles: odd columns shift down by half a height and
/// columns are `width·¾` apart.
pub fn generate(config: &GridConfig, revealed: &RevealedSet) -> Vec<Hex> {
    let size = config.hex_size;
    let mut hexes = Vec::with_capacity((config.column_count * config.row_count) as usize);

    for row in 0..config.row_count {
        for col in 0..config.column_count {
            let center = hex_center(config, col, row);
            let id = format!("{}-{}", col, row);
            let is_revealed = revealed.get(&id).copied().unwrap_or(false);

            hexes.push(Hex {
                id,
                center,
                vertices: hex_vertices(center, size, config.orientation),
                row,
                col,
                revealed: is_revealed,
            });
        }
    }

    hexes
}

fn hex_center(config: &GridConfig, col: u32, row: u32) -> Point {
    let size = config.hex_size;
    match config.orientation {
        Orientation::Pointy => {
            let width = size * 3.0_f64.sqrt();
            let height = size * 2.0;
            let row_shift = if row % 2 == 1 { width / 2.0 } else { 0.0 };
            Point {
                x: col as f64 * width + row_shift + config.offset_x,
                y: row as f64 * (height * 0.75) + config.offset_y,
            }
        }
        Orientation::Flat => {
            let width = size * 2.0;
            let height = size * 3.0_f64.sqrt();
            let col_shift = if col % 2 == 1 { height / 2.0 } else { 0.0 };
            Point {
                x: col as f64 * (width * 0.75) + config.offset_x,
                y: row as f64 * height + col_shift + config.offset_y,
            }
        }
    }
}

/// Six vertices at angle `(π/3)·i + startAngle`, radius `size`, centered on
/// the hex. Start angle is π/2 for pointy tops, 0 for flat tops.
fn hex_vertices(center: Point, size: f64, orientation: Orientation) -> [Point; 6] {
    let start_angle = match orientation {
        Orientation::Pointy => PI / 2.0,
        Orientation::Flat => 0.0,
    };

    std::array::from_fn(|i| {
        let angle = (PI / 3.0) * i as f64 + start_angle;
        Point {
            x: center.x + size * angle.cos(),
            y: center.y + size * angle.sin(),
        }
    })
}

/// World-space bounding box of a hex, for spatial index insertion
pub fn hex_bounds(hex: &Hex) -> Bounds {
    let mut bounds = Bounds::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for v in &hex.vertices {
        bounds.x_min = bounds.x_min.min(v.x);
        bounds.y_min = bounds.y_min.min(v.y);
        bounds.x_max = bounds.x_max.max(v.x);
        bounds.y_max = bounds.y_max.max(v.y);
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Orientation;

    fn config(cols: u32, rows: u32, size: f64, orientation: Orientation) -> GridConfig {
        GridConfig {
            hex_size: size,
            column_count: cols,
            row_count: rows,
            offset_x: 0.0,
            offset_y: 0.0,
            orientation,
        }
    }

    #[test]
    fn test_generates_exact_count_with_unique_ids() {
        let hexes = generate(&config(7, 5, 40.0, Orientation::Pointy), &RevealedSet::new());
        assert_eq!(hexes.len(), 35);

        let ids: std::collections::HashSet<_> = hexes.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), 35);
    }

    #[test]
    fn test_row_major_order() {
        let hexes = generate(&config(4, 3, 40.0, Orientation::Pointy), &RevealedSet::new());
        assert_eq!(hexes[0].id, "0-0");
        assert_eq!(hexes[3].id, "3-0");
        assert_eq!(hexes[4].id, "0-1");
        assert_eq!(hexes[11].id, "3-2");
    }

    #[test]
    fn test_vertices_exactly_hex_size_from_center() {
        for orientation in [Orientation::Pointy, Orientation::Flat] {
            let hexes = generate(&config(3, 3, 55.0, orientation), &RevealedSet::new());
            for hex in &hexes {
                for v in &hex.vertices {
                    let dist = ((v.x - hex.center.x).powi(2) + (v.y - hex.center.y).powi(2)).sqrt();
                    assert!((dist - 55.0).abs() < 1e-9, "vertex at distance {}", dist);
                }
            }
        }
    }

    #[test]
    fn test_pointy_odd_row_shift() {
        // 4x3 grid, hexSize 40, pointy, no offset: "0-0" centered at origin,
        // "1-1" shifted right by half a hex width past column stride.
        let hexes = generate(&config(4, 3, 40.0, Orientation::Pointy), &RevealedSet::new());
        let width = 40.0 * 3.0_f64.sqrt();

        let h00 = hexes.iter().find(|h| h.id == "0-0").unwrap();
        assert_eq!(h00.center, Point { x: 0.0, y: 0.0 });

        let h11 = hexes.iter().find(|h| h.id == "1-1").unwrap();
        assert!((h11.center.x - (width + width / 2.0)).abs() < 1e-9);
        assert!((h11.center.y - 60.0).abs() < 1e-9); // 2·40·¾

        let h01 = hexes.iter().find(|h| h.id == "0-1").unwrap();
        assert!((h01.center.x - width / 2.0).abs() < 1e-9);
        assert!((width / 2.0 - 34.64).abs() < 0.01);
    }

    #[test]
    fn test_flat_odd_column_shift() {
        let hexes = generate(&config(3, 3, 40.0, Orientation::Flat), &RevealedSet::new());
        let height = 40.0 * 3.0_f64.sqrt();

        let h10 = hexes.iter().find(|h| h.id == "1-0").unwrap();
        assert!((h10.center.x - 60.0).abs() < 1e-9); // 2·40·¾
        assert!((h10.center.y - height / 2.0).abs() < 1e-9);

        let h20 = hexes.iter().find(|h| h.id == "2-0").unwrap();
        assert!((h20.center.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_offsets_translate_grid() {
        let mut cfg = config(2, 2, 40.0, Orientation::Pointy);
        cfg.offset_x = 100.0;
        cfg.offset_y = -50.0;

        let hexes = generate(&cfg, &RevealedSet::new());
        assert_eq!(hexes[0].center, Point { x: 100.0, y: -50.0 });
    }

    #[test]
    fn test_revealed_rederived_from_set() {
        let mut revealed = RevealedSet::new();
        revealed.insert("1-0".to_string(), true);

        let hexes = generate(&config(2, 1, 40.0, Orientation::Pointy), &revealed);
        assert!(!hexes[0].revealed);
        assert!(hexes[1].revealed);
    }

    #[test]
    fn test_hex_bounds_contains_all_vertices() {
        let hexes = generate(&config(1, 1, 40.0, Orientation::Pointy), &RevealedSet::new());
        let bounds = hex_bounds(&hexes[0]);
        for v in &hexes[0].vertices {
            assert!(bounds.contains(v.x, v.y));
        }
    }
}
