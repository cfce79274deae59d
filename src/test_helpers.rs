//! ASCII-grid helpers shared across this crate's unit tests.

use crate::im::Im;
use crate::region::Region;

/// Builds a root `Region` over `[-1, 1]^3` at resolution `n^3`, with the
/// standard linear `L` ramp from `0` at the near plane to `u16::MAX` at the
/// far plane.
pub fn unit_cube_region(n: usize) -> Region {
    let x = linspace(-1.0, 1.0, n);
    let y = linspace(-1.0, 1.0, n);
    let z = linspace(-1.0, 1.0, n);
    let l: Vec<u16> = (0..=n).map(|k| ((k * 65535) / n) as u16).collect();
    Region::new(0, 0, x, y, z, l).expect("unit_cube_region produces a well-formed region")
}

pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    (0..=n).map(|i| lo + (hi - lo) * (i as f64) / (n as f64)).collect()
}

/// Renders a label grid (`'#'` = solid, `'.'` = empty) of `0`s/`1`s into a
/// single-channel image, useful for asserting a depth image's silhouette
/// without spelling out luminance values.
pub fn silhouette_to_ascii<D: Copy + PartialEq + Default, Tag>(im: &Im<D, 1, Tag>) -> String {
    let mut out = String::new();
    for y in 0..im.h {
        for x in 0..im.w {
            let v = *im.get(x, y, 0);
            out.push(if v == D::default() { '.' } else { '#' });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_cube_region_has_expected_extent() {
        let r = unit_cube_region(8);
        assert_eq!(r.ni, 8);
        assert_eq!(r.nj, 8);
        assert_eq!(r.nk, 8);
        assert_eq!(r.ltop16(), 65535);
    }

    #[test]
    fn silhouette_to_ascii_marks_nonzero_pixels() {
        use crate::im::Lum8Im;
        let mut im = Lum8Im::new(3, 2);
        *im.get_mut(1, 0, 0) = 5;
        let s = silhouette_to_ascii(&im);
        assert_eq!(s, ".#.\n...\n");
    }
}
