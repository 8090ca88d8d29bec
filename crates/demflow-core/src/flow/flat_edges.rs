//! Flat detection: edge scanning and connected-component labeling.
//!
//! A *flat* is a maximal 8-connected region of equal elevation whose cells
//! found no steepest-descent direction. The scanner partitions the raster's
//! flat boundary into low-edge cells (outlets: flow-bearing cells touching a
//! flat at their own elevation) and high-edge cells (flat cells below
//! adjacent terrain); the labeler then flood-fills every flat reachable from
//! a low-edge seed with a unique positive id.
use std::collections::VecDeque;

use crate::raster::{Elevation, Raster};

use super::d8::{D8_OFFSETS, NO_FLOW};

/// Scan the raster for flat-boundary cells.
///
/// Returns `(low_edges, high_edges)` as FIFO queues of flat row-major cell
/// indices. The scan is row-major (rows outer, columns inner) and each cell's
/// neighbours are examined in the fixed D8 table order; the first matching
/// rule claims the cell and the remaining neighbours are skipped, so a cell
/// lands in at most one queue and queue order is deterministic.
pub(crate) fn find_flat_edges<T: Elevation>(
    elevations: &Raster<T>,
    flowdirs: &Raster<u8>,
) -> (VecDeque<usize>, VecDeque<usize>) {
    let mut low_edges = VecDeque::new();
    let mut high_edges = VecDeque::new();
    let mut cells_without_flow = 0usize;

    for row in 0..flowdirs.height {
        'cells: for col in 0..flowdirs.width {
            let dir = flowdirs.get(row, col);
            if dir == flowdirs.no_data {
                continue;
            }
            if dir == NO_FLOW {
                cells_without_flow += 1;
            }
            for &(dr, dc) in &D8_OFFSETS {
                let (nr, nc) = (row as isize + dr, col as isize + dc);
                if !flowdirs.in_grid(nr, nc) {
                    continue;
                }
                let (nr, nc) = (nr as usize, nc as usize);
                if flowdirs.get(nr, nc) == flowdirs.no_data {
                    continue;
                }

                if dir != NO_FLOW
                    && flowdirs.get(nr, nc) == NO_FLOW
                    && elevations.get(nr, nc) == elevations.get(row, col)
                {
                    // Outlet-side boundary: this cell already drains and sits
                    // at the flat's elevation.
                    low_edges.push_back(elevations.index_of(row, col));
                    continue 'cells;
                } else if dir == NO_FLOW && elevations.get(row, col) < elevations.get(nr, nc) {
                    high_edges.push_back(elevations.index_of(row, col));
                    continue 'cells;
                }
            }
        }
    }

    log::debug!("{} cells had no flow direction", cells_without_flow);
    (low_edges, high_edges)
}

/// Label every flat reachable from a low-edge seed with a unique positive id.
///
/// `labels` must be zero-initialized with the raster's dimensions. Returns
/// the final value of the group counter: assigned labels are
/// `1..returned_value`.
pub(crate) fn label_flats<T: Elevation>(
    elevations: &Raster<T>,
    low_edges: &VecDeque<usize>,
    labels: &mut Raster<i32>,
) -> i32 {
    let mut group_number = 1;
    for &seed in low_edges {
        if labels.data[seed] == 0 {
            label_one_flat(seed, group_number, labels, elevations);
            group_number += 1;
        }
    }
    group_number
}

/// Flood-fill one flat: every cell 8-connected to `seed` through cells at the
/// seed's elevation receives `label`.
fn label_one_flat<T: Elevation>(
    seed: usize,
    label: i32,
    labels: &mut Raster<i32>,
    elevations: &Raster<T>,
) {
    let target_elevation = elevations.data[seed];
    let mut to_fill = VecDeque::new();
    to_fill.push_back(seed);

    while let Some(i) = to_fill.pop_front() {
        if elevations.data[i] != target_elevation {
            continue;
        }
        if labels.data[i] > 0 {
            continue;
        }
        labels.data[i] = label;
        let (row, col) = labels.coords_of(i);
        for &(dr, dc) in &D8_OFFSETS {
            let (nr, nc) = (row as isize + dr, col as isize + dc);
            if labels.in_grid(nr, nc) {
                to_fill.push_back(labels.index_of(nr as usize, nc as usize));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::d8::{d8_flow_directions, FLOWDIR_NO_DATA};

    fn raster_from(rows: &[&[f32]]) -> Raster<f32> {
        let height = rows.len();
        let width = rows[0].len();
        let mut r = Raster::filled(width, height, 0.0f32, -9999.0);
        for (i, row) in rows.iter().enumerate() {
            for (j, &z) in row.iter().enumerate() {
                r.set(i, j, z);
            }
        }
        r
    }

    fn scan(elev: &Raster<f32>) -> (Raster<u8>, VecDeque<usize>, VecDeque<usize>) {
        let mut fd = Raster::filled(1, 1, NO_FLOW, FLOWDIR_NO_DATA);
        d8_flow_directions(elev, &mut fd);
        let (low, high) = find_flat_edges(elev, &fd);
        (fd, low, high)
    }

    /// Plateau with an outlet on the east border.
    fn plateau_with_outlet() -> Raster<f32> {
        raster_from(&[
            &[9.0, 9.0, 9.0, 9.0, 9.0],
            &[9.0, 5.0, 5.0, 5.0, 9.0],
            &[9.0, 5.0, 5.0, 5.0, 1.0],
            &[9.0, 5.0, 5.0, 5.0, 9.0],
            &[9.0, 9.0, 9.0, 9.0, 9.0],
        ])
    }

    /// Plateau fully enclosed by higher ground.
    fn enclosed_plateau() -> Raster<f32> {
        raster_from(&[
            &[9.0, 9.0, 9.0, 9.0, 9.0],
            &[9.0, 5.0, 5.0, 5.0, 9.0],
            &[9.0, 5.0, 5.0, 5.0, 9.0],
            &[9.0, 5.0, 5.0, 5.0, 9.0],
            &[9.0, 9.0, 9.0, 9.0, 9.0],
        ])
    }

    #[test]
    fn monotone_grid_yields_no_edges() {
        let elev = raster_from(&[
            &[9.0, 8.0, 7.0],
            &[6.0, 5.0, 4.0],
            &[3.0, 2.0, 1.0],
        ]);
        let (_, low, high) = scan(&elev);
        assert!(low.is_empty(), "no flats, so no low edges");
        assert!(high.is_empty(), "no flats, so no high edges");
    }

    #[test]
    fn outlet_plateau_edge_queues() {
        let elev = plateau_with_outlet();
        let (fd, low, high) = scan(&elev);

        // The three 5-cells next to the outlet drain toward the 1 and are the
        // low-edge seeds; the remaining 5-cells are NO_FLOW.
        let expect_low: Vec<usize> =
            [(1, 3), (2, 3), (3, 3)].iter().map(|&(r, c)| elev.index_of(r, c)).collect();
        assert_eq!(Vec::from(low.clone()), expect_low);
        for &i in &expect_low {
            let (r, c) = elev.coords_of(i);
            assert_ne!(fd.get(r, c), NO_FLOW, "low-edge seeds already drain");
        }

        // High edges: NO_FLOW 5-cells touching a 9. The plateau centre (2,2)
        // touches only 5s and is in neither queue.
        let expect_high: Vec<usize> =
            [(1, 1), (1, 2), (2, 1), (3, 1), (3, 2)].iter().map(|&(r, c)| elev.index_of(r, c)).collect();
        assert_eq!(Vec::from(high.clone()), expect_high);
        assert!(!high.contains(&elev.index_of(2, 2)));
        assert!(!low.contains(&elev.index_of(2, 2)));
    }

    #[test]
    fn enclosed_plateau_has_high_edges_only() {
        let elev = enclosed_plateau();
        let (_, low, high) = scan(&elev);
        assert!(low.is_empty(), "a pit floor has no outlet");
        // Every 5-cell except the centre touches a 9.
        assert_eq!(high.len(), 8);
    }

    #[test]
    fn labeling_covers_whole_flat_including_seeds() {
        let elev = plateau_with_outlet();
        let (_, low, _) = scan(&elev);
        let mut labels = Raster::filled(elev.width, elev.height, 0i32, 0);
        let group_number = label_flats(&elev, &low, &mut labels);

        assert_eq!(group_number, 2, "one flat labeled, counter ends at 2");
        // All nine 5-cells carry label 1, including the flow-bearing seeds.
        for r in 1..4 {
            for c in 1..4 {
                assert_eq!(labels.get(r, c), 1, "({r},{c}) should be in flat 1");
            }
        }
        // Nothing else is labeled.
        let labeled = labels.data.iter().filter(|&&l| l != 0).count();
        assert_eq!(labeled, 9);
    }

    #[test]
    fn labels_do_not_leak_across_elevations() {
        // Two plateaus at different elevations, each with its own outlet:
        // the flood fill must give each its own label.
        let elev = raster_from(&[
            &[9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0],
            &[9.0, 5.0, 5.0, 9.0, 6.0, 6.0, 9.0],
            &[9.0, 5.0, 5.0, 9.0, 6.0, 6.0, 9.0],
            &[1.0, 5.0, 5.0, 9.0, 6.0, 6.0, 2.0],
        ]);
        let (_, low, _) = scan(&elev);
        let mut labels = Raster::filled(elev.width, elev.height, 0i32, 0);
        let group_number = label_flats(&elev, &low, &mut labels);
        assert_eq!(group_number, 3, "two flats labeled");

        let l5 = labels.get(1, 1);
        let l6 = labels.get(1, 4);
        assert!(l5 > 0 && l6 > 0);
        assert_ne!(l5, l6, "different elevations never share a label");
    }
}
