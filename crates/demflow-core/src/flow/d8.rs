//! D8 steepest-descent flow directions.
//!
//! Each cell points at one of its eight neighbours with a code running from
//! 1 (north) clockwise through 8 (northwest), or carries [`NO_FLOW`] (0)
//! when nothing around it lies lower. Cardinal steps take the odd codes and
//! diagonal steps the even ones; the tie-breaking below leans on that parity.
use crate::raster::{Elevation, Raster};

/// The eight neighbour steps as (row delta, col delta), ordered clockwise
/// starting due north. A neighbour's direction code is its position in this
/// table plus one.
pub(crate) const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, 0),  // 1 N
    (-1, 1),  // 2 NE
    (0, 1),   // 3 E
    (1, 1),   // 4 SE
    (1, 0),   // 5 S
    (1, -1),  // 6 SW
    (0, -1),  // 7 W
    (-1, -1), // 8 NW
];

/// Flow-direction code for a cell with no strictly lower neighbour.
pub const NO_FLOW: u8 = 0;

/// Conventional `no_data` sentinel for flow-direction rasters.
pub const FLOWDIR_NO_DATA: u8 = u8::MAX;

/// Compute D8 flow directions for every cell of `elevations`.
///
/// `flowdirs` is resized to match and inherits the DEM's geometry. Cells
/// receive:
/// - `flowdirs.no_data` where the elevation is NoData;
/// - an off-raster direction on the grid border (top row drains N, corners
///   drain diagonally, and so on);
/// - otherwise the direction code of the lowest strictly-lower 8-neighbour,
///   or [`NO_FLOW`] when no neighbour is strictly lower.
///
/// NoData neighbours rank below every defined elevation, so water reaching
/// the edge of the mapped region drains off it rather than ponding. Ties
/// between equally low neighbours prefer a cardinal step over an earlier
/// diagonal candidate.
pub fn d8_flow_directions<T: Elevation>(elevations: &Raster<T>, flowdirs: &mut Raster<u8>) {
    flowdirs.resize_to(elevations, NO_FLOW);
    flowdirs.copy_geometry(elevations);

    for row in 0..elevations.height {
        for col in 0..elevations.width {
            let code = if elevations.get(row, col) == elevations.no_data {
                flowdirs.no_data
            } else {
                d8_flow_dir(elevations, row, col)
            };
            flowdirs.set(row, col, code);
        }
    }
}

/// Direction for one cell with defined elevation.
fn d8_flow_dir<T: Elevation>(elevations: &Raster<T>, row: usize, col: usize) -> u8 {
    let top = row == 0;
    let bottom = row == elevations.height - 1;
    let left = col == 0;
    let right = col == elevations.width - 1;

    // Border cells always drain off the raster.
    if top || bottom || left || right {
        return match (top, bottom, left, right) {
            (true, _, true, _) => 8,  // NW corner
            (true, _, _, true) => 2,  // NE corner
            (_, true, true, _) => 6,  // SW corner
            (_, true, _, true) => 4,  // SE corner
            (true, _, _, _) => 1,     // top row: N
            (_, true, _, _) => 5,     // bottom row: S
            (_, _, true, _) => 7,     // left col: W
            _ => 3,                   // right col: E
        };
    }

    let mut lowest = elevations.get(row, col);
    let mut lowest_is_nodata = false;
    let mut dir = NO_FLOW;

    // Interior cell: every neighbour is in-grid.
    for (k, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
        let code = (k + 1) as u8;
        let nz = elevations.get((row as isize + dr) as usize, (col as isize + dc) as usize);
        let nz_nodata = nz == elevations.no_data;

        let lower = if nz_nodata {
            !lowest_is_nodata
        } else {
            !lowest_is_nodata && nz < lowest
        };
        let equal = if nz_nodata {
            lowest_is_nodata
        } else {
            !lowest_is_nodata && nz == lowest
        };

        if lower || (equal && dir > 0 && dir % 2 == 0 && code % 2 == 1) {
            lowest = nz;
            lowest_is_nodata = nz_nodata;
            dir = code;
        }
    }

    dir
}
