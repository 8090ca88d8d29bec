use serde::{Deserialize, Serialize};

/// A rectangular raster of per-cell values, row-major.
/// Coordinate math uses f64 for the geographic bounds; cell values are `T`.
///
/// Every raster carries a `no_data` sentinel of its own element type; cells
/// holding that exact value are treated as absent measurements. The sentinel
/// must be a value that compares equal to itself (for float rasters, use a
/// finite sentinel such as -9999.0, not NaN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster<T> {
    /// Row-major cell values.
    pub data: Vec<T>,
    pub width: usize,
    pub height: usize,
    /// Sentinel marking cells with no measurement.
    pub no_data: T,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl<T: Copy> Raster<T> {
    /// Create a new Raster with the given bounds, filled with `fill`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: usize,
        height: usize,
        min_lon: f64,
        max_lon: f64,
        min_lat: f64,
        max_lat: f64,
        fill: T,
        no_data: T,
    ) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            no_data,
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    /// Create a Raster with whole-globe placeholder bounds, filled with `fill`.
    pub fn filled(width: usize, height: usize, fill: T, no_data: T) -> Self {
        Self::new(width, height, -180.0, 180.0, -90.0, 90.0, fill, no_data)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.width + col] = val;
    }

    /// Whether signed cell coordinates fall inside the raster.
    #[inline]
    pub fn in_grid(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    /// Flat row-major index of (row, col).
    #[inline]
    pub fn index_of(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// (row, col) of a flat row-major index.
    #[inline]
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        (index / self.width, index % self.width)
    }

    /// Overwrite every cell with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Resize to match another raster's dimensions, filling with `fill`.
    /// Existing contents are discarded.
    pub fn resize_to<U>(&mut self, other: &Raster<U>, fill: T) {
        self.width = other.width;
        self.height = other.height;
        self.data.clear();
        self.data.resize(self.width * self.height, fill);
    }

    /// Copy another raster's geographic bounds onto this one.
    pub fn copy_geometry<U>(&mut self, other: &Raster<U>) {
        self.min_lon = other.min_lon;
        self.max_lon = other.max_lon;
        self.min_lat = other.min_lat;
        self.max_lat = other.max_lat;
    }
}

/// Cell types usable as elevations: ordered, copyable, and steppable by one
/// unit in the last place so a DEM can be raised by the smallest
/// representable amounts.
pub trait Elevation: Copy + PartialOrd {
    /// The next representable value toward +∞ at this type's precision.
    fn step_up(self) -> Self;
}

impl Elevation for f32 {
    #[inline]
    fn step_up(self) -> Self {
        self.next_up()
    }
}

impl Elevation for f64 {
    #[inline]
    fn step_up(self) -> Self {
        self.next_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_roundtrip() {
        let mut r = Raster::filled(4, 3, 0i32, -1);
        r.set(2, 3, 42);
        assert_eq!(r.get(2, 3), 42);
        assert_eq!(r.get(0, 0), 0);
    }

    #[test]
    fn in_grid_rejects_out_of_bounds() {
        let r = Raster::filled(4, 3, 0u8, 255);
        assert!(r.in_grid(0, 0));
        assert!(r.in_grid(2, 3));
        assert!(!r.in_grid(-1, 0));
        assert!(!r.in_grid(0, -1));
        assert!(!r.in_grid(3, 0));
        assert!(!r.in_grid(0, 4));
    }

    #[test]
    fn flat_index_roundtrip() {
        let r = Raster::filled(5, 4, 0i32, -1);
        let i = r.index_of(3, 2);
        assert_eq!(r.coords_of(i), (3, 2));
    }

    #[test]
    fn resize_to_matches_dims_and_discards() {
        let big = Raster::filled(7, 6, 1.0f32, -9999.0);
        let mut r = Raster::filled(2, 2, 9i32, -1);
        r.resize_to(&big, 0);
        assert_eq!((r.width, r.height), (7, 6));
        assert!(r.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn copy_geometry_copies_bounds_only() {
        let src = Raster::new(4, 4, 10.0, 11.0, 50.0, 51.0, 0.0f32, -9999.0);
        let mut dst = Raster::filled(4, 4, 0u8, 255);
        dst.copy_geometry(&src);
        assert_eq!(dst.min_lon, 10.0);
        assert_eq!(dst.max_lat, 51.0);
        assert_eq!(dst.no_data, 255);
    }

    #[test]
    fn step_up_is_one_ulp() {
        let v = 1.0f32;
        let up = v.step_up();
        assert!(up > v);
        assert_eq!(up, f32::from_bits(v.to_bits() + 1));

        let d = 1.0f64;
        assert!(d.step_up() > d);
    }

    #[test]
    fn step_up_at_large_magnitude_is_coarse() {
        // At 1e7 the f32 ULP is 1.0; the perturber relies on this being the
        // smallest possible raise at the cell's own precision.
        let v = 1.0e7f32;
        assert_eq!(v.step_up() - v, 1.0);
    }
}
