use std::{
    fs::File,
    io::{self, BufRead},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{LadderError, Result},
    lattice::IntervalLattice,
};

/// Where interval lattices are read from and written to.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeDirectory {
    #[default]
    None,
    Combined(PathBuf),
    Split {
        read: PathBuf,
        write: PathBuf,
    },
}

impl LatticeDirectory {
    pub fn read(&self) -> Option<&PathBuf> {
        match self {
            Self::None => None,
            Self::Combined(x) => Some(x),
            Self::Split { read, .. } => Some(read),
        }
    }

    pub fn write(&self) -> Option<&PathBuf> {
        match self {
            Self::None => None,
            Self::Combined(x) => Some(x),
            Self::Split { write, .. } => Some(write),
        }
    }

    pub fn push<P: AsRef<Path>>(&mut self, p: P) {
        match self {
            Self::None => {}
            Self::Combined(d) => {
                d.push(p);
            }
            Self::Split { read, write } => {
                read.push(&p);
                write.push(p);
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Look for a stored lattice. `Ok(None)` means there is nothing to read.
    pub fn load_lattice(&self, length: usize, height: usize) -> Result<Option<IntervalLattice>> {
        match self.read() {
            Some(dir) => IntervalLattice::load_from_dir(dir, length, height),
            None => Ok(None),
        }
    }

    pub fn save_lattice(&self, lattice: &IntervalLattice) -> Result<()> {
        match self.write() {
            Some(dir) => lattice.save_to_dir(dir),
            None => Ok(()),
        }
    }
}

impl From<Option<PathBuf>> for LatticeDirectory {
    fn from(x: Option<PathBuf>) -> Self {
        match x {
            None => Self::None,
            Some(x) => Self::Combined(x),
        }
    }
}

pub fn lattice_file_name(length: usize, height: usize) -> String {
    format!("lattice_{length:03}_{height:03}.json")
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> LadderError {
    LadderError::Storage(format!("{}: {e}", path.display()))
}

/// Open the file pointed to by `path`. If the file does not exist, look for compressed versions.
/// Empty files are removed and treated as missing.
pub(crate) fn open_file(path: PathBuf) -> Result<Option<Box<dyn io::Read>>> {
    match File::open(&path) {
        Ok(f) => {
            let mut reader = io::BufReader::new(f);
            if reader
                .fill_buf()
                .map_err(|e| storage_error(&path, e))?
                .is_empty()
            {
                std::fs::remove_file(&path).map_err(|e| storage_error(&path, e))?;
                return Ok(None);
            }
            return Ok(Some(Box::new(reader)));
        }
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(storage_error(&path, e)),
        Err(_) => {}
    }

    #[cfg(feature = "zstd")]
    {
        let mut path = path;
        path.set_extension("json.zst");
        match File::open(&path) {
            Ok(f) => {
                let decoder =
                    zstd::stream::Decoder::new(f).map_err(|e| storage_error(&path, e))?;
                return Ok(Some(Box::new(decoder)));
            }
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                return Err(storage_error(&path, e))
            }
            Err(_) => {}
        }
    }

    Ok(None)
}

impl IntervalLattice {
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| storage_error(dir, e))?;
        } else if !dir.is_dir() {
            return Err(storage_error(dir, "not a directory"));
        }
        let path = dir.join(lattice_file_name(self.length(), self.height()));
        let f = File::create(&path).map_err(|e| storage_error(&path, e))?;
        serde_json::to_writer(io::BufWriter::new(f), self).map_err(|e| storage_error(&path, e))?;
        tracing::info!("Saved lattice to {}", path.to_string_lossy());
        Ok(())
    }

    /// Read a lattice written by [`IntervalLattice::save_to_dir`]. A file whose size does not
    /// match the request is an error.
    pub fn load_from_dir(dir: &Path, length: usize, height: usize) -> Result<Option<Self>> {
        let path = dir.join(lattice_file_name(length, height));
        let Some(reader) = open_file(path.clone())? else {
            return Ok(None);
        };
        let lattice: Self =
            serde_json::from_reader(reader).map_err(|e| storage_error(&path, e))?;
        if lattice.length() != length || lattice.height() != height {
            return Err(storage_error(
                &path,
                format!(
                    "contains a {}x{} lattice",
                    lattice.height(),
                    lattice.length()
                ),
            ));
        }
        lattice.reindex().map(Some)
    }
}
