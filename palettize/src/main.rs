use std::{path::PathBuf, sync::Arc, time::Instant};

use clap::Parser;
use palettize::{
    buffer,
    catalog::Catalog,
    kernel::parse_dithering,
    resample::{check_factor, downscale},
    Error, Job, OutputFormat,
};
use pbr::ProgressBar;
use tracing::{info, warn};

#[derive(Parser)]
#[clap(about = "Turns an image into pixel art, once per palette")]
struct Args {
    /// The image to process.
    image: PathBuf,

    /// JSON palette catalog to look palettes up in.
    #[clap(long, default_value = "palettes.json")]
    palette_file: PathBuf,

    /// Slug or name of a palette to apply. May be given multiple times.
    #[clap(long = "palette", required = true)]
    palettes: Vec<String>,

    /// Error diffusion kernel, or `none`.
    #[clap(long, default_value = "none")]
    kernel: String,

    /// Integer factor to downscale the image by.
    #[clap(long, default_value_t = 2)]
    factor: u32,

    /// Scale the result back up by the same factor.
    #[clap(long)]
    upscale: bool,

    #[clap(long, default_value_t = OutputFormat::Png)]
    format: OutputFormat,

    #[clap(long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let catalog = Catalog::load(&args.palette_file)?;
    let kernel = parse_dithering(&args.kernel)?;
    let palettes = catalog.resolve(args.palettes.iter().map(String::as_str))?;

    info!("loading {:?}", args.image);
    let image = buffer::decode(&std::fs::read(&args.image)?)?;
    check_factor(image.width(), image.height(), args.factor)?;

    let start = Instant::now();
    let source = Arc::new(downscale(&image, args.factor));
    let stem = args
        .image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());

    let mut progress = ProgressBar::new(palettes.len() as u64);
    for palette in palettes {
        progress.message(&format!("{} ", palette.name()));
        let job = Job {
            source: Arc::clone(&source),
            palette: Arc::clone(&palette),
            kernel,
            factor: args.factor,
            upscale: args.upscale,
            format: args.format,
        };
        // Encoding errors only cost the palette they happened on.
        match job.run() {
            Ok(encoded) => {
                let path = args.output_dir.join(format!(
                    "{stem}-{}.{}",
                    palette.name().replace(|c: char| !c.is_alphanumeric(), "_"),
                    encoded.format.extension()
                ));
                std::fs::write(&path, &encoded.bytes)?;
            }
            Err(error) => warn!("cannot encode {}: {error}", palette.name()),
        }
        progress.inc();
    }
    progress.finish();

    info!(
        "processing completed in {:.3} s",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
