use std::{
    io::{stdout, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use jwalk::WalkDir;
use mkrd::{write_image, BuildOptions, HostSource, DEFAULT_MAX_DEPTH};
use rdfs::{Directory, Image, Node};

mod args;
use args::*;

#[derive(Parser)]
#[command(about, version)]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an image from a directory
    Build {
        /// Deepest directory nesting accepted below the input directory
        #[arg(short = 'd', long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth:        usize,
        /// Leave out symlinks and special files instead of failing
        #[arg(short = 's', long)]
        skip_unsupported: bool,
        /// Path to the input directory
        input:            PathBuf,
        /// Path to the output image
        output:           PathBuf,
    },
    /// List the contents of an image
    List {
        /// Path to the image
        image: PathBuf,
    },
    /// Write a file stored in an image to stdout
    Cat {
        /// Path to the image
        image: PathBuf,
        /// Slash separated path of the file inside the image
        path:  String,
    },
    /// Check that every directory in an image spans exactly its entries
    Check {
        /// Path to the image
        image: PathBuf,
    },
}

fn main() {
    color_backtrace::install();

    let args = Args::parse();

    match args.command {
        Command::Build {
            max_depth,
            skip_unsupported,
            input,
            output,
        } => build(
            &get_source(&input),
            &get_output(&output),
            &BuildOptions {
                max_depth,
                skip_unsupported,
            },
        ),
        Command::List { image } => list(&get_image(&image)),
        Command::Cat { image, path } => cat(&get_image(&image), &path),
        Command::Check { image } => check(&get_image(&image)),
    }
}

fn build(source: &Path, output: &Path, options: &BuildOptions) {
    println!(
        "{} {}counting contents of {}…",
        style("[1/3]").bold().dim(),
        Emoji("🔍 ", ""),
        style(get_display_path(source)).blue()
    );
    let count = WalkDir::new(source).skip_hidden(false).into_iter().count() as u64;

    println!(
        "{} {}writing {} files and directories to {}…",
        style("[2/3]").bold().dim(),
        Emoji("🚚 ", ""),
        style(count).magenta(),
        style(get_display_path(output)).blue()
    );
    let bar_progress = ProgressBar::new(count).with_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} {elapsed_precise} [{wide_bar:.green}] {pos}/{len}\n{spinner:.green} {wide_msg}",
            )
            .unwrap(),
    );
    bar_progress.enable_steady_tick(Duration::from_millis(12));
    let summary = write_image(HostSource, source, output, options, |path| {
        bar_progress.inc(1);
        bar_progress.set_message(format!(
            "{}",
            style(path.strip_prefix(source).unwrap_or(path).display()).blue()
        ));
    });
    bar_progress.finish_and_clear();
    let summary = summary.unwrap_or_else(|e| fail("couldn't build image", e));
    for skipped in &summary.skipped {
        println!(
            "      {}{}",
            Emoji("⚠ ", ""),
            style(format!("skipped {}", get_display_path(skipped))).red()
        );
    }

    println!(
        "{} {}verifying image…",
        style("[3/3]").bold().dim(),
        Emoji("📃 ", "")
    );
    let bytes = get_image(output);
    let entries = Image::new(&bytes)
        .and_then(|image| image.root().verify())
        .unwrap_or_else(|e| fail("image verification failed", e));

    println!(
        "      {}{} {} {} {} {}",
        Emoji("✨ ", ""),
        style("successfully wrote").green(),
        style(entries).magenta(),
        style("entries,").green(),
        style(summary.size).magenta(),
        style("bytes").green(),
    );
}

fn list(bytes: &[u8]) {
    let image = Image::new(bytes).unwrap_or_else(|e| fail("couldn't read image", e));
    print_directory(image.root()).unwrap_or_else(|e| fail("couldn't read image", e));
}

fn print_directory(directory: Directory) -> rdfs::Result<()> {
    for item in directory.walk() {
        let (depth, node) = item?;
        let name = String::from_utf8_lossy(node.name());
        let indent = "  ".repeat(depth);
        match node {
            Node::Directory(directory) => {
                println!(
                    "{}{}/ {}",
                    indent,
                    style(name).blue().bold(),
                    style(directory.len()).dim()
                );
            }
            Node::File(file) => {
                println!("{}{} {}", indent, name, style(file.len()).dim());
            }
        }
    }
    Ok(())
}

fn cat(bytes: &[u8], path: &str) {
    let image = Image::new(bytes).unwrap_or_else(|e| fail("couldn't read image", e));
    match image.lookup(path) {
        Ok(Node::File(file)) => {
            let mut out = stdout().lock();
            out.write_all(file.data())
                .and_then(|_| out.flush())
                .unwrap_or_else(|e| fail("couldn't write to stdout", e));
        }
        Ok(Node::Directory(_)) => fail("path is a directory", path),
        Err(e) => fail("couldn't read file", e),
    }
}

fn check(bytes: &[u8]) {
    let entries = Image::new(bytes)
        .and_then(|image| image.root().verify())
        .unwrap_or_else(|e| fail("image verification failed", e));
    println!(
        "{}{} {} {} {} {}",
        Emoji("✨ ", ""),
        style("image is consistent:").green(),
        style(entries).magenta(),
        style("entries,").green(),
        style(bytes.len()).magenta(),
        style("bytes").green(),
    );
}
