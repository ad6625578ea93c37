use std::{
    fmt::Display,
    fs::read,
    path::{Path, PathBuf},
};

use console::style;

pub fn fail(message: &str, detail: impl Display) -> ! {
    println!("{}: {}", style(message).red(), detail);
    std::process::exit(-1);
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| fail("couldn't get the current directory", e))
}

/// `path` relative to the current directory when it is below it.
pub fn get_display_path(path: &Path) -> String {
    std::fs::canonicalize(current_dir())
        .ok()
        .and_then(|current| path.strip_prefix(current).ok().map(Path::to_owned))
        .unwrap_or_else(|| path.to_owned())
        .display()
        .to_string()
}

pub fn get_source(source: &Path) -> PathBuf {
    let source = current_dir().join(source);
    let source = std::fs::canonicalize(&source)
        .unwrap_or_else(|_| fail("input path does not exist", source.display()));
    if !source.is_dir() {
        fail("input path is not a directory", source.display());
    }
    source
}

pub fn get_output(output: &Path) -> PathBuf {
    let output = current_dir().join(output);
    let parent = match output.parent() {
        Some(parent) if parent.is_dir() => parent,
        _ => fail("output path has no parent directory", output.display()),
    };
    if output.is_dir() {
        fail("output path is a directory", output.display());
    }
    let name = output
        .file_name()
        .unwrap_or_else(|| fail("output path is invalid", output.display()));
    std::fs::canonicalize(parent)
        .unwrap_or_else(|_| fail("output path is invalid", output.display()))
        .join(name)
}

pub fn get_image(image: &Path) -> Vec<u8> {
    let image = current_dir().join(image);
    if !image.is_file() {
        fail("image path is not a file", image.display());
    }
    read(&image).unwrap_or_else(|e| {
        fail(
            "couldn't read image",
            format!("{}: {}", image.display(), e),
        )
    })
}
