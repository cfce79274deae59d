//! The recursive rasteriser (spec.md §4.2) and its leaf path (§4.3).

use crate::eval::{with_prune, PackedPoints, Renderable};
use crate::im::{Im, Lum16Im, Lum8Im};
use crate::region::{LeafGrid, Region};
use std::sync::atomic::{AtomicBool, Ordering};

/// Run-time form of spec.md's two compile-time options. Both are fixed for
/// the lifetime of a single `render8`/`render16` call, but — unlike the C
/// original's `#define MIN_VOLUME`/`#if PRUNE` — nothing prevents two
/// concurrent calls (on independent trees/images) from using different
/// values.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Voxel count threshold below which recursion delegates to the leaf
    /// rasteriser. Must be at least 1.
    pub min_volume: usize,
    /// Enables the subtree-pruning step (spec.md §4.2 step 7).
    pub prune: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            min_volume: 64,
            prune: true,
        }
    }
}

/// Per-bit-depth luminance operations, so `render_core`/`leaf_fill` are
/// written once and instantiated for both `u8` and `u16` outputs (spec.md
/// §9's "Open question — 8-bit `L` shift": the 8-bit path always reads the
/// same 16-bit `L` table, right-shifted by 8).
pub trait LumDepth: Copy + PartialOrd + Default + 'static {
    fn ltop(region: &Region) -> Self;
    fn l_at(grid: &LeafGrid, k: usize) -> Self;
}

impl LumDepth for u8 {
    #[inline]
    fn ltop(region: &Region) -> Self {
        region.ltop8()
    }
    #[inline]
    fn l_at(grid: &LeafGrid, k: usize) -> Self {
        grid.l8_at(k)
    }
}

impl LumDepth for u16 {
    #[inline]
    fn ltop(region: &Region) -> Self {
        region.ltop16()
    }
    #[inline]
    fn l_at(grid: &LeafGrid, k: usize) -> Self {
        grid.l16_at(k)
    }
}

/// `render8`: paints an 8-bit height image. The tree is a plain `&mut T`
/// (never null) — in Rust that constraint is enforced by the type system
/// rather than documented as "caller's responsibility" (spec.md §4.7).
pub fn render8<T: Renderable>(
    tree: &mut T,
    region: Region,
    image: &mut Lum8Im,
    halt: &AtomicBool,
    callback: Option<&mut dyn FnMut()>,
    opts: RenderOptions,
) {
    render_core(tree, region, image, halt, callback, opts);
}

/// `render16`: paints a 16-bit height image. A `None` tree is a no-op,
/// mirroring the C original's `if (tree == NULL) return;`.
pub fn render16<T: Renderable>(
    tree: Option<&mut T>,
    region: Region,
    image: &mut Lum16Im,
    halt: &AtomicBool,
    opts: RenderOptions,
) {
    let Some(tree) = tree else { return };
    render_core(tree, region, image, halt, None, opts);
}

fn render_core<T: Renderable, D: LumDepth, Tag>(
    tree: &mut T,
    region: Region,
    image: &mut Im<D, 1, Tag>,
    halt: &AtomicBool,
    mut callback: Option<&mut dyn FnMut()>,
    opts: RenderOptions,
) {
    // 1. Halt check.
    if halt.load(Ordering::Relaxed) {
        log::trace!("render_core: halted with {} voxels remaining", region.voxels);
        return;
    }

    // 2. Leaf dispatch. A 1-voxel region can never be bisected (bisect
    // requires voxels > 1), so it must always take the leaf path regardless
    // of min_volume, or it would fall through to the bisect guard below and
    // be dropped unpainted.
    if region.voxels > 0 && (region.voxels < opts.min_volume || region.voxels == 1) {
        log::trace!("render_core: leaf dispatch at {} voxels", region.voxels);
        if let Some(cb) = callback.as_deref_mut() {
            cb();
        }
        leaf_fill(tree, region, image);
        return;
    }

    // InvalidRegion per spec.md §7: an empty region is a no-op.
    if region.voxels == 0 {
        return;
    }

    // 3. Occlusion cull: nothing in this region can beat what's painted.
    let ltop = D::ltop(&region);
    let mut cull = true;
    'cull: for row in region.jmin..region.jmin + region.nj {
        for col in region.imin..region.imin + region.ni {
            if ltop > *image.get(col, row, 0) {
                cull = false;
                break 'cull;
            }
        }
    }
    if cull {
        log::trace!("render_core: culled {} voxels (already occluded)", region.voxels);
        return;
    }

    // 4. Interval probe.
    let result = tree.eval_i(region.interval_x(), region.interval_y(), region.interval_z());

    // 5. Fill: the whole box is strictly inside the solid.
    if result.upper < 0.0 {
        log::trace!("render_core: filled {} voxels (fully inside)", region.voxels);
        for row in region.jmin..region.jmin + region.nj {
            for col in region.imin..region.imin + region.ni {
                let px = image.get_mut(col, row, 0);
                if ltop > *px {
                    *px = ltop;
                }
            }
        }
        return;
    }

    // 6. Empty: the whole box is strictly outside the solid.
    if result.lower >= 0.0 {
        return;
    }

    // 7-9. Prune (optional), bisect, recurse far-then-near, restore.
    with_prune(tree, opts.prune, |tree| {
        // Leaf dispatch above already routed every voxels == 1 region
        // through leaf_fill, so voxels > 1 here always.
        let (a, b) = region
            .bisect()
            .expect("voxels > 1 guarantees a longest axis with extent >= 2");
        log::debug!(
            "render_core: bisected {} voxels into {} (far) + {} (near)",
            region.voxels,
            b.voxels,
            a.voxels
        );
        render_core(tree, b, image, halt, callback.as_deref_mut(), opts);
        render_core(tree, a, image, halt, callback, opts);
    });
}

/// `region<B>`: the leaf rasteriser. Materialises the region's sample grid,
/// evaluates it in one bulk call, and writes pixel heights top-slice-first.
fn leaf_fill<T: Renderable, D: LumDepth, Tag>(tree: &mut T, region: Region, image: &mut Im<D, 1, Tag>) {
    let grid = region.into_leaf_grid();
    if grid.ni == 0 || grid.nj == 0 || grid.nk == 0 {
        return;
    }

    let voxels = grid.ni * grid.nj * grid.nk;
    let mut points = PackedPoints::with_capacity(voxels);
    for k in (0..grid.nk).rev() {
        for j in 0..grid.nj {
            for i in 0..grid.ni {
                points.push(grid.x[i], grid.y[j], grid.z[k]);
            }
        }
    }

    let result = tree.eval_r(&points);
    debug_assert_eq!(result.len(), voxels);

    let mut idx = 0;
    for k in (0..grid.nk).rev() {
        let l = D::l_at(&grid, k);
        for j in 0..grid.nj {
            let row = grid.jmin + j;
            for i in 0..grid.ni {
                let col = grid.imin + i;
                let v = result[idx];
                idx += 1;
                if v < 0.0 {
                    let px = image.get_mut(col, row, 0);
                    if *px < l {
                        *px = l;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::Lum16Im;
    use crate::test_helpers::{silhouette_to_ascii, unit_cube_region};
    use crate::tree::Tree;
    use std::sync::atomic::AtomicBool;

    fn sphere_tree(radius: f64) -> Tree {
        let mut t = Tree::new();
        let x = t.x();
        let y = t.y();
        let z = t.z();
        let x2 = t.square(x);
        let y2 = t.square(y);
        let z2 = t.square(z);
        let xy = t.add(x2, y2);
        let sum = t.add(xy, z2);
        let r2 = t.constant(radius * radius);
        let f = t.sub(sum, r2);
        t.set_root(f);
        t
    }

    fn constant_tree(v: f64) -> Tree {
        let mut t = Tree::new();
        let c = t.constant(v);
        t.set_root(c);
        t
    }

    fn root_region(n: usize) -> Region {
        unit_cube_region(n)
    }

    /// Brute-force per-voxel rasteriser with no subdivision, no culling, no
    /// pruning: the oracle for property P6.
    fn brute_force<T: Renderable>(tree: &mut T, region: Region, image: &mut Lum16Im) {
        let grid = region.into_leaf_grid();
        for k in (0..grid.nk).rev() {
            let l = grid.l16_at(k);
            for j in 0..grid.nj {
                for i in 0..grid.ni {
                    let mut pts = PackedPoints::with_capacity(1);
                    pts.push(grid.x[i], grid.y[j], grid.z[k]);
                    let v = tree.eval_r(&pts)[0];
                    if v < 0.0 {
                        let row = grid.jmin + j;
                        let col = grid.imin + i;
                        let px = image.get_mut(col, row, 0);
                        if *px < l {
                            *px = l;
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn empty_tree_leaves_image_zeroed() {
        let mut tree = constant_tree(1.0);
        let region = root_region(16);
        let mut image = Lum16Im::new(16, 16);
        let halt = AtomicBool::new(false);
        render16(Some(&mut tree), region, &mut image, &halt, RenderOptions::default());
        assert!(image.arr.iter().all(|&v| v == 0));
    }

    #[test]
    fn filled_tree_paints_every_pixel_to_ltop() {
        let mut tree = constant_tree(-1.0);
        let region = root_region(16);
        let ltop = region.ltop16();
        let mut image = Lum16Im::new(16, 16);
        let halt = AtomicBool::new(false);
        render16(Some(&mut tree), region, &mut image, &halt, RenderOptions::default());
        assert!(image.arr.iter().all(|&v| v == ltop));
    }

    #[test]
    fn render16_with_null_tree_is_a_noop() {
        let region = root_region(8);
        let mut image = Lum16Im::new(8, 8);
        let halt = AtomicBool::new(false);
        render16::<Tree>(None, region, &mut image, &halt, RenderOptions::default());
        assert!(image.arr.iter().all(|&v| v == 0));
    }

    #[test]
    fn sphere_matches_brute_force_oracle_p6() {
        for min_volume in [1usize, 4, 64, 512] {
            for prune in [false, true] {
                let region = root_region(16);
                let mut recursive_image = Lum16Im::new(16, 16);
                let mut tree = sphere_tree(0.5);
                let halt = AtomicBool::new(false);
                render16(
                    Some(&mut tree),
                    region.clone(),
                    &mut recursive_image,
                    &halt,
                    RenderOptions { min_volume, prune },
                );

                let mut brute_image = Lum16Im::new(16, 16);
                let mut tree2 = sphere_tree(0.5);
                brute_force(&mut tree2, region, &mut brute_image);

                assert_eq!(
                    recursive_image.arr, brute_image.arr,
                    "min_volume={min_volume} prune={prune}"
                );
            }
        }
    }

    #[test]
    fn monotone_writes_p1() {
        let mut tree = sphere_tree(0.5);
        let region = root_region(16);
        let mut image = Lum16Im::new(16, 16);
        let halt = AtomicBool::new(false);

        // Seed the image with a higher-than-possible value at one pixel and
        // confirm render never lowers it.
        *image.get_mut(8, 8, 0) = u16::MAX;
        render16(Some(&mut tree), region, &mut image, &halt, RenderOptions::default());
        assert_eq!(*image.get(8, 8, 0), u16::MAX);
    }

    #[test]
    fn halt_before_start_leaves_image_untouched_p7() {
        let mut tree = sphere_tree(0.5);
        let region = root_region(16);
        let mut image = Lum16Im::new(16, 16);
        let halt = AtomicBool::new(true);
        render16(Some(&mut tree), region, &mut image, &halt, RenderOptions::default());
        assert!(image.arr.iter().all(|&v| v == 0));
    }

    #[test]
    fn unit_sphere_8bit_16x16x16_disc_scenario() {
        // Scenario 1 from spec.md §8: unit sphere over [-1,1]^3 at 16^3,
        // expect a centered disc matching the brute-force oracle exactly.
        let region = root_region(16);
        let mut recursive_image = Lum8Im::new(16, 16);
        let mut tree = sphere_tree(0.5);
        let halt = AtomicBool::new(false);
        render8(
            &mut tree,
            region.clone(),
            &mut recursive_image,
            &halt,
            None,
            RenderOptions::default(),
        );

        let mut brute_image16 = Lum16Im::new(16, 16);
        let mut tree2 = sphere_tree(0.5);
        brute_force(&mut tree2, region, &mut brute_image16);

        for y in 0..16 {
            for x in 0..16 {
                let expected8 = (*brute_image16.get(x, y, 0) >> 8) as u8;
                assert_eq!(*recursive_image.get(x, y, 0), expected8, "pixel ({x},{y})");
            }
        }

        // The center pixel sits well inside the sphere's silhouette.
        assert!(*recursive_image.get(8, 8, 0) > 0);
        // A far corner pixel lies outside the sphere's footprint.
        assert_eq!(*recursive_image.get(0, 0, 0), 0);

        // The silhouette is a centered disc: every corner quadrant's corner
        // pixel is empty, and the center is painted.
        let ascii = silhouette_to_ascii(&recursive_image);
        let rows: Vec<&str> = ascii.lines().collect();
        assert_eq!(rows.len(), 16);
        assert_eq!(rows[8].as_bytes()[8], b'#');
        assert_eq!(rows[0].as_bytes()[0], b'.');
        assert_eq!(rows[0].as_bytes()[15], b'.');
        assert_eq!(rows[15].as_bytes()[0], b'.');
        assert_eq!(rows[15].as_bytes()[15], b'.');
    }
}
