//! Conversions between GDAL geo transforms and [`geo::AffineTransform`],
//! and the coordinate-to-pixel-index mapping used everywhere else.

use geo::AffineTransform;

/// Build an [`AffineTransform`] from GDAL's coefficient ordering
/// `[xoff, a, b, yoff, d, e]`.
pub fn affine_from_gdal(gdal_transform: [f64; 6]) -> AffineTransform {
    AffineTransform::new(
        gdal_transform[1],
        gdal_transform[2],
        gdal_transform[0],
        gdal_transform[4],
        gdal_transform[5],
        gdal_transform[3],
    )
}

pub fn affine_to_gdal(transform: &AffineTransform) -> [f64; 6] {
    [
        transform.xoff(),
        transform.a(),
        transform.b(),
        transform.yoff(),
        transform.d(),
        transform.e(),
    ]
}

/// Nearest `(row, col)` pixel index for a geographic coordinate.
///
/// `col = floor((lon - xoff) / a)`, `row = floor((lat - yoff) / e)`.
/// Points exactly on a pixel boundary resolve toward the lower index.
/// No bounds checking is performed; callers must guard against indices
/// outside the raster.
pub fn pixel_index(transform: &AffineTransform, lon: f64, lat: f64) -> (isize, isize) {
    let col = ((lon - transform.xoff()) / transform.a()).floor() as isize;
    let row = ((lat - transform.yoff()) / transform.e()).floor() as isize;
    (row, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn transform() -> AffineTransform {
        // 0.5 degree pixels, origin at (149.0, -30.0), north-up
        AffineTransform::new(0.5, 0., 149.0, 0., -0.5, -30.0)
    }

    #[rstest]
    fn gdal_roundtrip() {
        let gt = [149.0, 0.5, 0., -30.0, 0., -0.5];
        assert_eq!(affine_to_gdal(&affine_from_gdal(gt)), gt);
    }

    #[rstest]
    #[case(149.25, -30.25, (0, 0))]
    #[case(149.75, -30.25, (0, 1))]
    #[case(149.25, -31.75, (3, 0))]
    fn interior_points(#[case] lon: f64, #[case] lat: f64, #[case] expected: (isize, isize)) {
        assert_eq!(pixel_index(&transform(), lon, lat), expected);
    }

    #[rstest]
    fn boundary_resolves_to_lower_index() {
        // (149.5, -30.5) sits exactly on the corner between four pixels
        assert_eq!(pixel_index(&transform(), 149.5, -30.5), (1, 1));
    }

    #[rstest]
    fn matches_manual_inverse_affine() {
        let t = transform();
        let (lon, lat) = (149.62, -31.17);
        let manual_col = ((lon - t.xoff()) / t.a()).floor() as isize;
        let manual_row = ((lat - t.yoff()) / t.e()).floor() as isize;
        assert_eq!(pixel_index(&t, lon, lat), (manual_row, manual_col));
    }

    #[rstest]
    fn no_bounds_check_on_outside_points() {
        assert_eq!(pixel_index(&transform(), 140.0, -20.0), (-20, -18));
    }
}
