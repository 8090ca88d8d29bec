//! Consuming the increment mask: flow assignment without touching the DEM,
//! or a minimal in-place perturbation of the DEM itself.
use rayon::prelude::*;

use crate::raster::{Elevation, Raster};
use crate::util::StageClock;

use super::d8::{D8_OFFSETS, NO_FLOW};

/// Resolve flow directions inside flats from the increment mask.
///
/// Every interior cell still marked [`NO_FLOW`] is pointed at its
/// lowest-mask 8-neighbour within the same flat. Border cells and cells the
/// mask marks as NoData keep their existing direction, as do cells of
/// undrainable flats (no in-flat neighbour offers a descent, so they stay
/// [`NO_FLOW`]).
///
/// Rows are processed in parallel: each cell writes only its own direction
/// and reads only the mask and labels.
pub fn assign_flow_in_flats(
    flat_mask: &Raster<i32>,
    labels: &Raster<i32>,
    flowdirs: &mut Raster<u8>,
) {
    assert_eq!(
        (flat_mask.width, flat_mask.height),
        (flowdirs.width, flowdirs.height),
        "mask and flow-direction rasters must share dimensions"
    );
    let clock = StageClock::start("flow assignment in flats");

    let width = flowdirs.width;
    let height = flowdirs.height;
    if width < 3 || height < 3 {
        return;
    }

    let resolved: usize = flowdirs
        .data
        .par_chunks_mut(width)
        .enumerate()
        .skip(1)
        .take(height - 2)
        .map(|(row, dirs)| {
            let mut row_resolved = 0usize;
            for col in 1..width - 1 {
                if flat_mask.get(row, col) == flat_mask.no_data {
                    continue;
                }
                if dirs[col] == NO_FLOW {
                    dirs[col] = masked_flow_dir(flat_mask, labels, row, col);
                    if dirs[col] != NO_FLOW {
                        row_resolved += 1;
                    }
                }
            }
            row_resolved
        })
        .sum();

    clock.finish(format_args!("{resolved} cells resolved"));
}

/// Direction of steepest mask descent for one interior cell.
///
/// Neighbours outside the cell's flat are ignored. Among equal-mask
/// candidates a cardinal direction (odd code) replaces an earlier diagonal
/// one (even code), favouring shorter flow paths when the gradient ties.
fn masked_flow_dir(flat_mask: &Raster<i32>, labels: &Raster<i32>, row: usize, col: usize) -> u8 {
    let mut lowest = flat_mask.get(row, col);
    let mut dir = NO_FLOW;

    // Interior cell: every neighbour is in-grid.
    for (k, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
        let code = (k + 1) as u8;
        let (nr, nc) = ((row as isize + dr) as usize, (col as isize + dc) as usize);
        if labels.get(nr, nc) != labels.get(row, col) {
            continue;
        }
        let m = flat_mask.get(nr, nc);
        if m < lowest || (m == lowest && dir > 0 && dir % 2 == 0 && code % 2 == 1) {
            lowest = m;
            dir = code;
        }
    }

    dir
}

/// Raise labeled cells by the smallest representable steps so ordinary
/// steepest-descent routing drains the flats.
///
/// Each interior labeled cell is stepped up one ULP at a time, `mask(cell)`
/// times, at the elevation type's own precision. Returns the number of cells
/// whose raise reached or passed a different-flat neighbour that was not
/// below them beforehand; each such cell is also reported with a warning.
/// That situation means consecutive ULP steps exhausted the local precision
/// and a formerly descending edge may have inverted; it is reported, not
/// corrected.
///
/// The sweep is sequential: each raise is visible to the checks of cells
/// processed after it.
pub fn perturb_dem_by_mask<T: Elevation>(
    flat_mask: &Raster<i32>,
    labels: &Raster<i32>,
    elevations: &mut Raster<T>,
) -> usize {
    assert_eq!(
        (flat_mask.width, flat_mask.height),
        (elevations.width, elevations.height),
        "mask and elevation rasters must share dimensions"
    );
    let clock = StageClock::start("DEM perturbation");

    let width = elevations.width;
    let height = elevations.height;
    if width < 3 || height < 3 {
        return 0;
    }

    let mut raised = 0usize;
    let mut saturated = 0usize;
    for row in 1..height - 1 {
        for col in 1..width - 1 {
            if labels.get(row, col) == 0 {
                continue;
            }

            let mut was_higher = [false; 8];
            for (k, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
                let (nr, nc) = ((row as isize + dr) as usize, (col as isize + dc) as usize);
                was_higher[k] = elevations.get(row, col) > elevations.get(nr, nc);
            }

            let mut z = elevations.get(row, col);
            for _ in 0..flat_mask.get(row, col) {
                z = z.step_up();
            }
            elevations.set(row, col, z);
            if flat_mask.get(row, col) > 0 {
                raised += 1;
            }

            for (k, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
                let (nr, nc) = ((row as isize + dr) as usize, (col as isize + dc) as usize);
                if labels.get(nr, nc) == labels.get(row, col) {
                    continue;
                }
                if elevations.get(row, col) < elevations.get(nr, nc) {
                    continue;
                }
                if !was_higher[k] {
                    log::warn!(
                        "raising ({row},{col}) produced an invalid alteration of the DEM: \
                         a neighbour that was not below it no longer lies above"
                    );
                    saturated += 1;
                }
            }
        }
    }

    clock.finish(format_args!("{raised} cells raised, {saturated} saturated"));
    saturated
}
