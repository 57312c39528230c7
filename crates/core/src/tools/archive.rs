use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{self, BufReader},
    path::Path,
};

use tracing::{debug, info};

use crate::error::InstallError;

/// Copy the file named `binary` out of a `.tar.xz` archive into `dest`,
/// wherever it sits in the archive's tree, and mark it executable.
pub fn extract_binary(archive_path: &Path, binary: &str, dest: &Path) -> Result<(), InstallError> {
    info!(
        archive = %archive_path.display(),
        dest = %dest.display(),
        "extracting {}", binary
    );
    let failed = |reason: String| InstallError::Extraction {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| failed(e.to_string()))?;
    let decoder = xz2::read::XzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);

    for entry in archive.entries().map_err(|e| failed(e.to_string()))? {
        let mut entry = entry.map_err(|e| failed(e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(|e| failed(e.to_string()))?.into_owned();
        if path.file_name() != Some(OsStr::new(binary)) {
            continue;
        }
        debug!(entry = %path.display(), "found binary in archive");

        let mut partial_name = dest.as_os_str().to_owned();
        partial_name.push(".part");
        let partial = Path::new(&partial_name);

        let mut out = File::create(partial)?;
        if let Err(e) = io::copy(&mut entry, &mut out) {
            drop(out);
            let _ = fs::remove_file(partial);
            return Err(failed(format!("{} was only partially extracted: {}", binary, e)));
        }
        drop(out);

        fs::rename(partial, dest)?;
        make_executable(dest)?;
        return Ok(());
    }

    Err(failed(format!("{} not found in archive", binary)))
}

/// Sets 0o755 on Unix. No-op elsewhere.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
        debug!("Set executable permission on {}", path.display());
    }
    Ok(())
}
