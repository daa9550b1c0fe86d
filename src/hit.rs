// Hit testing for HexFog Core
//
// The spatial indexes narrow a point down to a handful of candidates; exact
// geometry decides. Indexes hold positions into the owning store, so a hit is
// reported as a store index for the session to translate into ids.

use crate::spatial::SpatialHashGrid;
use crate::types::{Hex, Token};

/// Token hit radius as a fraction of the hex size, matching the drawn radius
pub const TOKEN_RADIUS_FACTOR: f64 = 0.4;

/// Even-odd ray-casting test of a world point against a hex's 6 vertices
pub fn point_in_hex(wx: f64, wy: f64, hex: &Hex) -> bool {
    let vertices = &hex.vertices;
    let mut inside = false;
    let mut j = vertices.len() - 1;

    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].x, vertices[i].y);
        let (xj, yj) = (vertices[j].x, vertices[j].y);

        if ((yi > wy) != (yj > wy)) && (wx < (xj - xi) * (wy - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Resolve a world point to the hex containing it, if any.
///
/// Hexes are non-overlapping so the first exact match is the only one.
pub fn hex_at(wx: f64, wy: f64, hexes: &[Hex], index: &SpatialHashGrid<usize>) -> Option<usize> {
    index
        .query_point(wx, wy)
        .iter()
        .copied()
        .find(|&i| point_in_hex(wx, wy, &hexes[i]))
}

/// Resolve a world point to a token within `0.4·hex_size` of its center.
///
/// Candidates are tested in reverse insertion order so the most recently
/// added token wins, matching the visual stacking order.
pub fn token_at(
    wx: f64,
    wy: f64,
    tokens: &[Token],
    index: &SpatialHashGrid<usize>,
    hex_size: f64,
) -> Option<usize> {
    let radius = hex_size * TOKEN_RADIUS_FACTOR;
    let mut candidates: Vec<usize> = index.query_point(wx, wy).to_vec();
    candidates.sort_unstable();

    candidates.into_iter().rev().find(|&i| {
        let token = &tokens[i];
        let (dx, dy) = (token.x - wx, token.y - wy);
        (dx * dx + dy * dy).sqrt() <= radius
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid;
    use crate::types::{Bounds, GridConfig, Orientation, RevealedSet};

    fn build_hex_index(hexes: &[Hex], cell_size: f64) -> SpatialHashGrid<usize> {
        let mut index = SpatialHashGrid::new(cell_size);
        for (i, hex) in hexes.iter().enumerate() {
            index.insert(i, &grid::hex_bounds(hex));
        }
        index
    }

    fn build_token_index(tokens: &[Token], hex_size: f64) -> SpatialHashGrid<usize> {
        let mut index = SpatialHashGrid::new(hex_size * 2.0);
        let radius = hex_size * TOKEN_RADIUS_FACTOR;
        for (i, t) in tokens.iter().enumerate() {
            index.insert(i, &Bounds::new(t.x - radius, t.y - radius, t.x + radius, t.y + radius));
        }
        index
    }

    fn grid_4x3() -> Vec<Hex> {
        let config = GridConfig {
            hex_size: 40.0,
            column_count: 4,
            row_count: 3,
            offset_x: 0.0,
            offset_y: 0.0,
            orientation: Orientation::Pointy,
        };
        grid::generate(&config, &RevealedSet::new())
    }

    #[test]
    fn test_hex_at_center_hits_that_hex() {
        let hexes = grid_4x3();
        let index = build_hex_index(&hexes, 80.0);

        for (i, hex) in hexes.iter().enumerate() {
            assert_eq!(hex_at(hex.center.x, hex.center.y, &hexes, &index), Some(i));
        }
    }

    #[test]
    fn test_hex_at_miss_outside_grid() {
        let hexes = grid_4x3();
        let index = build_hex_index(&hexes, 80.0);

        assert_eq!(hex_at(-500.0, -500.0, &hexes, &index), None);
    }

    #[test]
    fn test_hexes_do_not_overlap() {
        let hexes = grid_4x3();
        let index = build_hex_index(&hexes, 80.0);

        // Sample across the grid; every point is claimed by at most one hex
        for sx in 0..30 {
            for sy in 0..30 {
                let (wx, wy) = (sx as f64 * 10.0 - 30.0, sy as f64 * 10.0 - 30.0);
                let claims = hexes.iter().filter(|h| point_in_hex(wx, wy, h)).count();
                assert!(claims <= 1, "{} hexes claim ({}, {})", claims, wx, wy);

                // The index never loses a true hit
                if claims == 1 {
                    assert!(hex_at(wx, wy, &hexes, &index).is_some());
                }
            }
        }
    }

    #[test]
    fn test_token_at_respects_radius() {
        let tokens = vec![Token::new(100.0, 100.0, "#FF0000".to_string())];
        let index = build_token_index(&tokens, 40.0);

        assert_eq!(token_at(100.0, 100.0, &tokens, &index, 40.0), Some(0));
        assert_eq!(token_at(100.0, 115.9, &tokens, &index, 40.0), Some(0));
        assert_eq!(token_at(100.0, 116.1, &tokens, &index, 40.0), None);
    }

    #[test]
    fn test_token_at_prefers_most_recently_inserted() {
        let tokens = vec![
            Token::new(100.0, 100.0, "#FF0000".to_string()),
            Token::new(102.0, 100.0, "#00FF00".to_string()),
        ];
        let index = build_token_index(&tokens, 40.0);

        // Both overlap the query point; the later insertion stacks on top
        assert_eq!(token_at(101.0, 100.0, &tokens, &index, 40.0), Some(1));
    }
}
