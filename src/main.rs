use std::time::Instant;

use curvature_ocr::{util::open_raster, OcrEngine, Region, SimpleResolver};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn main() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(alphabet), Some(page)) = (args.next(), args.next()) else {
        eprintln!("usage: curvature-ocr <alphabet.png> <page.png> [font]");
        std::process::exit(2);
    };
    let font = args.next().unwrap_or_else(|| "default".to_string());

    let sheet = open_raster(&alphabet).expect("Failed to load alphabet sheet");
    let page = open_raster(&page).expect("Failed to load page");
    let mut engine = OcrEngine::builder()
        .build()
        .expect("Failed to build engine");
    let learned = engine
        .learn_alphabet(&font, &sheet, None)
        .expect("Failed to learn alphabet");
    log::debug!("Learned {learned} templates.");

    let start = Instant::now();
    engine
        .load_page(page, Region::full())
        .expect("Failed to load page");
    let words = engine
        .scan(Region::full(), &SimpleResolver::default())
        .expect("Failed recognition.");
    log::debug!("{:?}", start.elapsed());

    for word in words {
        let score = word.score().map_or("-".to_string(), |s| format!("{s:.3}"));
        println!("{}\t{score}\t{:?}", word, word.rect);
    }
}
