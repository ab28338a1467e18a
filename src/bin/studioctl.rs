use std::path::PathBuf;

use clap::{Parser, Subcommand};
use product_studio::vision::models::{self, checkpoints, is_present};
use product_studio::workflows::{multicolor, object_change, product_replace, UploadForm};
use product_studio::{palette, Config, Studio};

#[derive(Parser, Debug)]
#[command(name = "studioctl", about = "CLI for the product photo studio", version)]
struct Cli {
    /// Override STATIC_DIR (output, tmp and textures live below it)
    #[arg(global = true, long)]
    static_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Local vision checkpoints
    Models {
        #[command(subcommand)]
        cmd: ModelsCmd,
    },
    /// List the fabric palette and whether each texture is on disk
    Palette,
    /// Detect the distinct product colors in an image
    Colors {
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
    },
    /// Replace the accessory in an image
    Accessory {
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
        /// Description of the new accessory
        #[arg(long = "new", value_name = "TEXT")]
        new_accessory: String,
    },
    /// List the objects the editor sees in a setup photo
    Analyze {
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ModelsCmd {
    /// Show where each checkpoint is expected and whether it exists
    Status,
    /// Download any missing checkpoints
    Fetch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Load env and parse CLI
    Config::dotenv_load();
    let cli = Cli::parse();

    let needs_providers = matches!(cli.command, Commands::Colors { .. } | Commands::Accessory { .. } | Commands::Analyze { .. });
    let mut conf = if needs_providers { Config::new()? } else { Config::offline()? };
    if let Some(dir) = cli.static_dir {
        conf.static_dir = dir;
    }

    match cli.command {
        Commands::Models { cmd } => match cmd {
            ModelsCmd::Status => {
                for ckpt in checkpoints(&conf) {
                    let state = if is_present(&ckpt.path).await { "present" } else { "missing" };
                    let source = ckpt.url.as_deref().unwrap_or("<no url>");
                    println!("{:<24} {:<8} {} ({}={})", ckpt.name, state, ckpt.path.display(), ckpt.env_var, source);
                }
                Ok(())
            }
            ModelsCmd::Fetch => {
                let files = models::ensure_checkpoints(&conf).await?;
                println!("{}", files.dino_model.display());
                println!("{}", files.dino_tokenizer.display());
                println!("{}", files.sam_encoder.display());
                println!("{}", files.sam_decoder.display());
                Ok(())
            }
        },
        Commands::Palette => {
            let dir = conf.texture_dir();
            for name in palette::color_names() {
                let Some(path) = palette::texture_path(&dir, name) else { continue };
                let mark = if path.is_file() { "ok" } else { "missing" };
                println!("{:<16} {:<8} {}", name, mark, path.display());
            }
            Ok(())
        }
        Commands::Colors { image } => {
            let studio = Studio::without_local_vision(&conf).await?;
            let form = UploadForm::new().with_file(multicolor::IMAGE_FIELD, tokio::fs::read(&image).await?);
            let detected = multicolor::detect_multicolors(&studio, &form).await?;
            for c in &detected.colors {
                println!("{}", c);
            }
            eprintln!("Saved {}", studio.store.output_path(&detected.filename).display());
            Ok(())
        }
        Commands::Accessory { image, new_accessory } => {
            let studio = Studio::without_local_vision(&conf).await?;
            let form = UploadForm::new()
                .with_file(object_change::IMAGE_FIELD, tokio::fs::read(&image).await?)
                .with_text(object_change::ACCESSORY_FIELD, &new_accessory);
            let replaced = object_change::replace_accessory(&studio, &form).await?;
            println!("Saved {}", studio.store.output_path(&replaced.filename).display());
            Ok(())
        }
        Commands::Analyze { image } => {
            let studio = Studio::without_local_vision(&conf).await?;
            let form = UploadForm::new().with_file(product_replace::SETUP_FIELD, tokio::fs::read(&image).await?);
            let analysis = product_replace::analyze_image(&studio, &form).await?;
            for item in &analysis.items {
                println!("{}", item);
            }
            eprintln!("Setup stored as {}", studio.store.tmp_path(&analysis.setup_path).display());
            Ok(())
        }
    }
}
