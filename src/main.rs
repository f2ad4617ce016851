//! plates - illustration reconciliation for ebook sources

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plates::pipeline::default_output_path;
use plates::{Config, SourceText, WidthTable, assign_files, parse_markers, run, target_widths};

#[derive(Parser)]
#[command(name = "plates")]
#[command(version, about = "Reconcile illustration markup with image files", long_about = None)]
#[command(after_help = "EXAMPLES:
    plates check book-src.txt --profile epub       Report missing, unused and oversized images
    plates update-widths book-src.txt              Write book-out.txt with real image widths
    plates assign-files book-src.txt --images images
    plates calc-widths book-src.txt --max-width 800
    plates target-width images/i_001.jpg")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile illustrations with the image directory and validate images
    Check {
        #[command(flatten)]
        run: RunArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set every illustration's w= to the real width of its image
    UpdateWidths {
        #[command(flatten)]
        run: RunArgs,

        /// Output file (default: <stem>-out.txt next to the input)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// List the changes without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Fill in fn= for bare [Illustration] tags from their scan page
    AssignFiles {
        #[command(flatten)]
        run: RunArgs,

        /// Output file (default: <stem>-out.txt next to the input)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// List the assignments without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute target widths for percentage-sized illustrations
    CalcWidths {
        /// Source text
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Page width in pixels that percentages refer to
        #[arg(long, value_name = "N")]
        max_width: u32,

        /// Width table to update
        #[arg(long, value_name = "FILE", default_value = "images.json")]
        table: PathBuf,
    },
    /// Print the target width recorded for an image
    TargetWidth {
        #[arg(value_name = "IMAGE")]
        image: String,

        /// Width table to read
        #[arg(long, value_name = "FILE", default_value = "images.json")]
        table: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Source text
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Image directory
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    /// Validation profile (epub, mobi, or one from the config file)
    #[arg(long = "profile", value_name = "NAME")]
    profiles: Vec<String>,

    /// Cover image file name
    #[arg(long, value_name = "FILE")]
    cover: Option<String>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Include images in subdirectories
    #[arg(long)]
    recursive: bool,
}

impl RunArgs {
    /// Configuration file overlaid with command line flags.
    fn config(&self) -> plates::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.images {
            config.image_directory = dir.clone();
        }
        if !self.profiles.is_empty() {
            config.validation_profiles = self.profiles.clone();
        }
        if let Some(cover) = &self.cover {
            config.cover_filename = Some(cover.clone());
        }
        config.recursive |= self.recursive;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Check { run, json } => check(&run, json),
        Command::UpdateWidths {
            run,
            output,
            dry_run,
        } => update_widths(&run, output, dry_run),
        Command::AssignFiles {
            run,
            output,
            dry_run,
        } => assign(&run, output, dry_run),
        Command::CalcWidths {
            input,
            max_width,
            table,
        } => calc_widths(&input, max_width, &table),
        Command::TargetWidth { image, table } => target_width(&image, &table),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Returns `Ok(false)` when the report contains errors.
fn check(args: &RunArgs, json: bool) -> plates::Result<bool> {
    let config = args.config()?;
    let source = SourceText::load(&args.input)?;
    let output = run(&source.text, &config)?;

    if json {
        println!("{}", output.report.to_json()?);
    } else {
        print!("{}", output.report.render_text());
    }
    Ok(!output.report.has_errors())
}

fn update_widths(args: &RunArgs, output: Option<PathBuf>, dry_run: bool) -> plates::Result<bool> {
    let config = args.config()?.with_rewrite_widths(true);
    let source = SourceText::load(&args.input)?;
    let result = run(&source.text, &config)?;

    for issue in &result.report.issues {
        tracing::warn!("{}: {}", issue.subject, issue.detail);
    }

    if dry_run {
        let changes = result.width_changes();
        for change in &changes {
            println!(
                "line {}: {} w={} -> {}",
                change.line,
                change.filename,
                change.old.as_deref().unwrap_or("(none)"),
                change.new
            );
        }
        println!("{} illustrations would change", changes.len());
        return Ok(!result.report.has_errors());
    }

    let Some(rewrite) = result.rewrite else {
        return Ok(!result.report.has_errors());
    };
    let output = output.unwrap_or_else(|| default_output_path(&args.input));
    source.save(&rewrite.text, &output)?;
    tracing::info!(
        "wrote {} ({}, {} illustrations updated)",
        output.display(),
        source.encoding_name(),
        rewrite.updated.len()
    );
    Ok(!result.report.has_errors())
}

/// Returns `Ok(false)` when some tag had no image.
fn assign(args: &RunArgs, output: Option<PathBuf>, dry_run: bool) -> plates::Result<bool> {
    let config = args.config()?;
    let source = SourceText::load(&args.input)?;
    let result = assign_files(&source.text, &config)?;

    if dry_run {
        for a in &result.assignments {
            println!("line {}: scan page {} -> {}", a.line, a.scan_page, a.file_name);
        }
        println!("{} illustrations would be assigned", result.assignments.len());
    } else {
        let output = output.unwrap_or_else(|| default_output_path(&args.input));
        source.save(&result.text, &output)?;
        tracing::info!(
            "wrote {} ({} illustrations assigned)",
            output.display(),
            result.assignments.len()
        );
    }
    Ok(result.unresolved.is_empty())
}

fn calc_widths(input: &Path, max_width: u32, table_path: &Path) -> plates::Result<bool> {
    let source = SourceText::load(input)?;
    let markers = parse_markers(&source.text)?;
    let widths = target_widths(&markers, max_width);

    let mut table = WidthTable::load(table_path)?;
    let count = widths.len();
    table.merge(widths);
    table.save(table_path)?;

    tracing::info!("wrote {} target widths to {}", count, table_path.display());
    Ok(true)
}

fn target_width(image: &str, table_path: &Path) -> plates::Result<bool> {
    let table = WidthTable::load(table_path)?;
    let key = image.replace('\\', "/");
    let width = table
        .target_width(&key)
        .or_else(|| table.target_width(&format!("images/{key}")));

    match width {
        Some(width) => {
            println!("{width}");
            Ok(true)
        }
        None => {
            tracing::error!("no target width for {image} in {}", table_path.display());
            Ok(false)
        }
    }
}
