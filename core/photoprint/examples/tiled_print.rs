//! Lay out a passport photo print from the command line.
//!
//! Usage:
//!   cargo run --example tiled_print -- <photo> <request.json> <output.png> [model.bin]
//!
//! `request.json` holds a tiled print request (`standard`, `canvas`,
//! `crownPoint`, `chinPoint`). With the `rustface` feature and a SeetaFace
//! model, crown and chin are detected instead of taken from the request.

use photoprint::{PppEngine, TiledPrintRequest};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: tiled_print <photo> <request.json> <output.png> [model.bin]");
        std::process::exit(2);
    }

    let photo = std::fs::read(&args[0]).expect("failed to read photo");
    let request_json = std::fs::read_to_string(&args[1]).expect("failed to read request");
    let mut request = TiledPrintRequest::from_json(&request_json).expect("invalid request");

    let mut engine = PppEngine::new();
    let id = engine.set_image(&photo).expect("failed to decode photo");

    if let Some(model) = args.get(3) {
        let config = serde_json::json!({ "detectorSettings": { "face": { "modelPath": model } } });
        engine
            .configure(&config.to_string())
            .expect("failed to load face model");
        let landmarks = engine
            .detect_landmarks(&id)
            .expect("landmark detection failed");
        println!(
            "detected crown ({:.1}, {:.1}) and chin ({:.1}, {:.1})",
            landmarks.crown_point.x,
            landmarks.crown_point.y,
            landmarks.chin_point.x,
            landmarks.chin_point.y,
        );
        request.crown_point = landmarks.crown_point;
        request.chin_point = landmarks.chin_point;
    }

    let print = engine
        .create_tiled_print_with(&id, &request)
        .expect("failed to create print");
    std::fs::write(&args[2], &print).expect("failed to write print");

    let (width, height) = request
        .canvas
        .pixel_size()
        .expect("canvas was validated with the request");
    println!(
        "{}: {width}x{height} px at {:.3} px/mm, {} bytes",
        args[2],
        request.canvas.resolution_ppmm(),
        print.len()
    );
}
