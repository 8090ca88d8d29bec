//! DEM flow conditioning: D8 directions → flat resolution → mask consumption.
pub mod d8;
pub mod flat_apply;
mod flat_edges;
pub mod flat_mask;

use crate::raster::{Elevation, Raster};
use crate::util::StageClock;

pub use d8::{d8_flow_directions, FLOWDIR_NO_DATA, NO_FLOW};
pub use flat_apply::{assign_flow_in_flats, perturb_dem_by_mask};
pub use flat_mask::{resolve_flats, FlatResolution, FlatStatus};

/// Run the full flat-resolution pipeline on a DEM.
///
/// Steps:
/// 1. D8 steepest-descent directions for every cell.
/// 2. Flat resolution: edge scan, labeling, combined-gradient mask.
/// 3. Mask consumption, chosen by `alter`:
///    - `false` — assign directions inside flats from the mask, leaving the
///      elevations untouched;
///    - `true` — raise the DEM by the masked ULP increments in place, then
///      recompute directions on the perturbed elevations.
///
/// When the raster has no flats, or only flats without outlets, the
/// consumer stage is skipped and the zeroed resolution is returned; cells
/// that could not be resolved keep [`NO_FLOW`]. `flowdirs` always ends up
/// carrying the DEM's geometry.
pub fn barnes_flat_resolution_d8<T: Elevation>(
    elevations: &mut Raster<T>,
    flowdirs: &mut Raster<u8>,
    alter: bool,
) -> FlatResolution {
    let clock = StageClock::start("flat-resolution pipeline");

    d8_flow_directions(elevations, flowdirs);
    let resolution = resolve_flats(elevations, flowdirs);

    let drainable = matches!(
        resolution.status,
        FlatStatus::Resolved | FlatStatus::ResolvedWithPits
    );
    if drainable {
        if alter {
            let saturated = perturb_dem_by_mask(&resolution.mask, &resolution.labels, elevations);
            if saturated > 0 {
                log::warn!("{saturated} cells ran out of precision during perturbation");
            }
            d8_flow_directions(elevations, flowdirs);
        } else {
            assign_flow_in_flats(&resolution.mask, &resolution.labels, flowdirs);
        }
    }

    flowdirs.copy_geometry(elevations);
    clock.finish(format_args!(
        "{:?}, {} flats",
        resolution.status, resolution.flat_count
    ));
    resolution
}
