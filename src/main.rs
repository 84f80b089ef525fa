use clap::{Parser, Subcommand};
use rawshelf::archive::ExportJob;
use rawshelf::preview::SizeVariant;
use rawshelf::{Library, config, output};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rawshelf")]
#[command(about = "Browse a photo library: safe listings, cached previews, RAW-aware zip exports")]
#[command(long_about = "\
Browse a photo library: safe listings, cached previews, RAW-aware zip exports

Every path argument is relative to the library root and may not leave it.
Images (jpg, jpeg, png, webp, gif) with a sibling .ARW file of the same stem
are shown as RAW pairs; `export --raw` archives those RAW files instead of
the images.

Previews are JPEGs that fit a square box (small: 400px, big: 2560px by
default) and are cached on disk, so each one is rendered once.

Set RUST_LOG (e.g. RUST_LOG=rawshelf=debug) for more detail.
Run 'rawshelf gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Library root (overrides `root` in the config file)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Preview cache directory (overrides `cache_dir` in the config file)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List one directory of the library
    List {
        /// Directory, relative to the root
        #[arg(default_value = "")]
        path: String,
        /// Show only images and folders
        #[arg(long)]
        only_images: bool,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the preview of one image
    Preview {
        path: String,
        #[arg(long, default_value = "small")]
        size: SizeVariant,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Copy one original file out of the library
    Fetch {
        path: String,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Zip a selection of files
    Export {
        #[arg(required = true)]
        paths: Vec<String>,
        /// Archive the sibling .ARW of each file instead
        #[arg(long)]
        raw: bool,
        /// Destination (default: the suggested archive name)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Pre-render previews for the whole library
    Warmup {
        /// Variants to render (default: from config)
        #[arg(long = "size")]
        sizes: Vec<SizeVariant>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings {
        config: cli.config,
        root: cli.root,
        cache_dir: cli.cache_dir,
    };

    match cli.command {
        Command::List {
            path,
            only_images,
            json,
        } => {
            let listing = settings.open()?.list(&path, only_images)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                output::print_listing(&listing);
            }
        }
        Command::Preview { path, size, output } => {
            let bytes = settings.open()?.preview(&path, size)?;
            std::fs::write(&output, &bytes)?;
            println!("{} ({}) → {}", path, size, output.display());
        }
        Command::Fetch { path, output } => {
            let mut download = settings.open()?.open_file(&path, false)?;
            let mut dest = std::fs::File::create(&output)?;
            let copied = std::io::copy(&mut download.file, &mut dest)?;
            dest.flush()?;
            println!("{} ({} bytes) → {}", download.file_name, copied, output.display());
        }
        Command::Export {
            paths,
            raw,
            output: dest,
        } => {
            let mut stream = settings.open()?.export(&ExportJob::new(paths, raw))?;
            let dest = dest.unwrap_or_else(|| PathBuf::from(stream.file_name()));
            let mut file = std::fs::File::create(&dest)?;
            let bytes = std::io::copy(&mut stream, &mut file)?;
            file.flush()?;
            output::print_export(stream.file_name(), stream.entries(), bytes, &dest);
        }
        Command::Warmup { sizes } => {
            let library = settings.open()?;
            let sizes = if sizes.is_empty() {
                library.config().warmup.sizes.clone()
            } else {
                sizes
            };
            let report = library.warmup(&sizes);
            output::print_warmup(&report, &library.cache_stats());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Global flags that shape the library.
struct Settings {
    config: PathBuf,
    root: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
}

impl Settings {
    /// Load the config file, apply flag overrides, and open the library.
    fn open(self) -> Result<Library, Box<dyn std::error::Error>> {
        let mut shelf_config = config::load_config(&self.config)?;
        if let Some(root) = self.root {
            shelf_config.root = root;
        }
        if let Some(cache_dir) = self.cache_dir {
            shelf_config.cache_dir = cache_dir;
        }
        Ok(Library::open(shelf_config)?)
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
