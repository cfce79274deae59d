//! CLI front-end: loads a JSON scene, rasterises it, writes a PNG.

use imp_raster::config::parse_scene_json;
use imp_raster::im::RgbIm;
use imp_raster::render::render8;
use imp_raster::shade::shaded8;
use std::env;
use std::fs;
use std::sync::atomic::AtomicBool;

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let scene_path = args.next().unwrap_or_else(|| {
        eprintln!("usage: raster <scene.json> <out.png>");
        std::process::exit(1);
    });
    let output_path = args.next().unwrap_or_else(|| {
        eprintln!("usage: raster <scene.json> <out.png>");
        std::process::exit(1);
    });

    let json_text = fs::read_to_string(&scene_path)
        .unwrap_or_else(|e| panic!("failed to read {scene_path}: {e}"));
    let scene = parse_scene_json(&json_text)
        .unwrap_or_else(|e| panic!("failed to parse {scene_path}: {e}"));

    let mut tree = scene.tree.build();
    let region = scene.region();
    let opts = scene.render_options();
    let halt = AtomicBool::new(false);

    log::info!(
        "rendering {}x{}x{} scene from {scene_path}",
        scene.resolution.ni,
        scene.resolution.nj,
        scene.resolution.nk
    );

    let mut depth = imp_raster::im::Lum8Im::new(scene.resolution.ni, scene.resolution.nj);
    render8(&mut tree, region.clone(), &mut depth, &halt, None, opts);

    let mut shaded = RgbIm::new(scene.resolution.ni, scene.resolution.nj);
    shaded8(&mut tree, &region, &depth, &mut shaded, &halt, None, opts);

    save_png(&shaded, &output_path);
    log::info!("wrote {output_path}");
}

#[cfg(feature = "io")]
fn save_png(shaded: &RgbIm, path: &str) {
    let mut img = image::RgbImage::new(shaded.w as u32, shaded.h as u32);
    for y in 0..shaded.h {
        for x in 0..shaded.w {
            let px = image::Rgb([
                *shaded.get(x, y, 0),
                *shaded.get(x, y, 1),
                *shaded.get(x, y, 2),
            ]);
            img.put_pixel(x as u32, y as u32, px);
        }
    }
    img.save(path).unwrap_or_else(|e| panic!("failed to save {path}: {e}"));
}

#[cfg(not(feature = "io"))]
fn save_png(_shaded: &RgbIm, _path: &str) {
    unreachable!("the raster binary requires the io feature");
}
