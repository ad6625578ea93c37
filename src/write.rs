use std::{
    fs::{remove_file, rename, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use rand::distr::{Alphanumeric, Distribution};

use crate::{
    error::{Error, Result},
    serialize::Serializer,
    source::Source,
    BuildOptions,
};

/// Outcome of a successful build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    /// Size of the image in bytes.
    pub size:    u64,
    /// Entries left out because they were neither files nor directories.
    pub skipped: Vec<PathBuf>,
}

/// Serialize `root` and write the image to `output`.
///
/// The image is written to a temporary file next to `output` which replaces
/// `output` only once it is complete, so a failed build never leaves a
/// partial image behind. `progress_callback` is called for every emitted
/// file and directory.
pub fn write_image<S: Source, P: Fn(&Path)>(
    source: S, root: &Path, output: &Path, options: &BuildOptions, progress_callback: P,
) -> Result<Summary> {
    let mut serializer = Serializer::with_options(source, options);

    let size = serializer.oracle().size_of(root)?;
    if size > u32::MAX as u64 {
        return Err(Error::TooLarge {
            path: root.to_owned(),
            size,
        });
    }

    let temporary = temporary_path(output);
    let file = File::create(&temporary).map_err(|e| Error::write(&temporary, e))?;
    let written = (|| -> Result<u64> {
        let mut writer = BufWriter::new(file);
        let written = serializer.serialize(root, &mut writer, output, &progress_callback)?;
        writer.flush().map_err(|e| Error::write(output, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| Error::write(output, e.into_error()))?;
        file.sync_all().map_err(|e| Error::write(output, e))?;
        Ok(written)
    })();
    let written = match written {
        Ok(written) => written,
        Err(e) => {
            let _ = remove_file(&temporary);
            return Err(e);
        }
    };
    if let Err(e) = rename(&temporary, output) {
        let _ = remove_file(&temporary);
        return Err(Error::write(output, e));
    }

    Ok(Summary {
        size:    written,
        skipped: serializer.oracle().snapshot().skipped().to_vec(),
    })
}

fn temporary_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let suffix = Alphanumeric
        .sample_iter(rand::rng())
        .map(char::from)
        .take(16)
        .collect::<String>();
    output.with_file_name(format!(".{}.{}.tmp", name, suffix))
}
