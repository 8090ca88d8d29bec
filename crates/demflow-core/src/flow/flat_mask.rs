//! Flat resolution after Barnes, Lehman, and Mulla (2014): build an integer
//! increment mask that drains every flat with an outlet.
//!
//! Two breadth-first passes run over each labeled flat. The away pass grows
//! from the high-edge cells and records each cell's distance from higher
//! terrain; the toward pass grows from the low-edge cells and superimposes
//! its distance onto the away gradient. The combined value strictly
//! decreases along some 8-connected path from every cell to an outlet, so
//! the mask can drive flow assignment or a minimal DEM perturbation.
use std::collections::VecDeque;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::raster::{Elevation, Raster};
use crate::util::StageClock;

use super::d8::{D8_OFFSETS, NO_FLOW};
use super::flat_edges::{find_flat_edges, label_flats};

/// Queue sentinel separating BFS wavefronts; consuming it advances the
/// wavefront counter.
const WAVEFRONT_MARKER: usize = usize::MAX;

/// Outcome of a flat-resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlatStatus {
    /// The raster contains no flat cells at all.
    NoFlats,
    /// Flats exist but none has an outlet; nothing was resolved.
    NoOutlets,
    /// Every flat drains.
    Resolved,
    /// Flats with outlets were resolved; the rest are pits or mesas and
    /// were left untouched.
    ResolvedWithPits,
}

/// Increment mask and flat labels produced by [`resolve_flats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatResolution {
    /// Per-cell increment count; 0 outside resolvable flats, `no_data` = -1.
    pub mask: Raster<i32>,
    /// Flat membership: 0 = not in a labeled flat, ≥ 1 = flat id.
    pub labels: Raster<i32>,
    /// Number of distinct flats that received a label.
    pub flat_count: u32,
    pub status: FlatStatus,
}

/// Build the combined-gradient increment mask for every drainable flat.
///
/// `flowdirs` must hold steepest-descent directions with [`NO_FLOW`] marking
/// cells inside flats (see [`d8_flow_directions`](super::d8_flow_directions)).
/// Rasters must share dimensions; a mismatch is a programmer error.
///
/// Never fails: undrainable terrain is reported through
/// [`FlatResolution::status`] and warning log records, and the returned
/// mask/labels are zeroed for whatever could not be resolved.
pub fn resolve_flats<T: Elevation>(
    elevations: &Raster<T>,
    flowdirs: &Raster<u8>,
) -> FlatResolution {
    assert_eq!(
        (elevations.width, elevations.height),
        (flowdirs.width, flowdirs.height),
        "elevation and flow-direction rasters must share dimensions"
    );
    let clock = StageClock::start("flat resolution");

    let mut labels = Raster::filled(elevations.width, elevations.height, 0i32, 0);
    labels.copy_geometry(elevations);
    let mut mask = Raster::filled(elevations.width, elevations.height, 0i32, -1);
    mask.copy_geometry(elevations);

    let (low_edges, mut high_edges) = find_flat_edges(elevations, flowdirs);

    if low_edges.is_empty() {
        let status = if high_edges.is_empty() {
            log::info!("No flats found");
            FlatStatus::NoFlats
        } else {
            log::warn!("There were flats, but none of them had outlets!");
            FlatStatus::NoOutlets
        };
        return FlatResolution { mask, labels, flat_count: 0, status };
    }

    let group_number = label_flats(elevations, &low_edges, &mut labels);
    let flat_count = (group_number - 1) as u32;
    log::info!("Found {} unique flats", flat_count);

    // Flats without an outlet never received a label; their high-edge cells
    // must not seed the away gradient.
    let before = high_edges.len();
    high_edges.retain(|&i| labels.data[i] != 0);
    let status = if high_edges.len() < before {
        log::warn!("Not all flats have outlets; the DEM contains sinks/pits/depressions!");
        FlatStatus::ResolvedWithPits
    } else {
        FlatStatus::Resolved
    };

    let mut flat_height = vec![0i32; group_number as usize];

    build_away_gradient(flowdirs, &mut mask, high_edges, &mut flat_height, &labels);
    build_toward_gradient(flowdirs, &mut mask, low_edges, &flat_height, &labels);

    clock.finish(format_args!("{flat_count} flats labeled"));
    FlatResolution { mask, labels, flat_count, status }
}

/// Away pass: multi-source BFS from the high-edge cells. Each reached cell
/// gets the current wavefront number (its hop distance from higher terrain,
/// counted from 1); `flat_height[label]` ends up holding the deepest
/// wavefront seen in that flat.
fn build_away_gradient(
    flowdirs: &Raster<u8>,
    flat_mask: &mut Raster<i32>,
    mut edges: VecDeque<usize>,
    flat_height: &mut [i32],
    labels: &Raster<i32>,
) {
    let clock = StageClock::start("away gradient");
    let mut loops: i32 = 1;

    edges.push_back(WAVEFRONT_MARKER);
    while let Some(i) = edges.pop_front() {
        if i == WAVEFRONT_MARKER {
            if edges.is_empty() {
                break;
            }
            loops += 1;
            edges.push_back(WAVEFRONT_MARKER);
            continue;
        }

        // First arrival wins; later wavefronts re-deliver cells.
        if flat_mask.data[i] > 0 {
            continue;
        }
        flat_mask.data[i] = loops;
        flat_height[labels.data[i] as usize] = loops;

        let (row, col) = flat_mask.coords_of(i);
        for &(dr, dc) in &D8_OFFSETS {
            let (nr, nc) = (row as isize + dr, col as isize + dc);
            if labels.in_grid(nr, nc)
                && labels.get(nr as usize, nc as usize) == labels.data[i]
                && flowdirs.get(nr as usize, nc as usize) == NO_FLOW
            {
                edges.push_back(labels.index_of(nr as usize, nc as usize));
            }
        }
    }

    clock.finish(format_args!("{loops} wavefronts"));
}

/// Toward pass: multi-source BFS from the low-edge cells, superimposing the
/// outlet-distance gradient onto the away gradient.
///
/// A cell the away pass reached with depth `a` receives
/// `(flat_height[label] − a) + 2·loops`; an untouched cell receives
/// `2·loops`. The factor 2 makes consecutive wavefronts differ by more than
/// the ±1 the away term can vary between neighbours, which is what keeps the
/// combined mask strictly decreasing toward the outlets.
fn build_toward_gradient(
    flowdirs: &Raster<u8>,
    flat_mask: &mut Raster<i32>,
    mut edges: VecDeque<usize>,
    flat_height: &[i32],
    labels: &Raster<i32>,
) {
    let clock = StageClock::start("toward gradient");

    // Negate the away gradient so "touched by the away pass" rides in the
    // sign; the BFS below treats negative as touched and positive as done.
    flat_mask.data.par_iter_mut().for_each(|m| *m = -*m);

    let mut loops: i32 = 1;
    edges.push_back(WAVEFRONT_MARKER);
    while let Some(i) = edges.pop_front() {
        if i == WAVEFRONT_MARKER {
            if edges.is_empty() {
                break;
            }
            loops += 1;
            edges.push_back(WAVEFRONT_MARKER);
            continue;
        }

        if flat_mask.data[i] > 0 {
            continue;
        }
        flat_mask.data[i] = if flat_mask.data[i] != 0 {
            // Negative value: the away pass reached this cell.
            (flat_height[labels.data[i] as usize] + flat_mask.data[i]) + 2 * loops
        } else {
            2 * loops
        };

        let (row, col) = flat_mask.coords_of(i);
        for &(dr, dc) in &D8_OFFSETS {
            let (nr, nc) = (row as isize + dr, col as isize + dc);
            if labels.in_grid(nr, nc)
                && labels.get(nr as usize, nc as usize) == labels.data[i]
                && flowdirs.get(nr as usize, nc as usize) == NO_FLOW
            {
                edges.push_back(labels.index_of(nr as usize, nc as usize));
            }
        }
    }

    clock.finish(format_args!("{loops} wavefronts"));
}
