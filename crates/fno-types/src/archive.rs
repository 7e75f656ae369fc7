//! NumPy `.npz` archive access shared by every persisted artifact.
//!
//! Scalars are stored as one-element arrays so archives stay readable from
//! `numpy.load`. Keys are looked up with and without the `.npy` suffix.

use crate::error::{FnoError, FnoResult};
use ndarray::{Array, Array1, ArrayBase, Data, Dimension, Ix1, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter, WritableElement};
use std::fs::File;
use std::path::Path;

/// Read side of an `.npz` artifact.
pub struct ArchiveReader {
    path: String,
    npz: NpzReader<File>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> FnoResult<Self> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| FnoError::Artifact {
            path: display.clone(),
            message: format!("cannot open: {e}"),
        })?;
        let npz = NpzReader::new(file).map_err(|e| FnoError::Artifact {
            path: display.clone(),
            message: format!("not an npz archive: {e}"),
        })?;
        Ok(Self { path: display, npz })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn array<D: Dimension>(&mut self, key: &str) -> FnoResult<Array<f64, D>> {
        let npz = &mut self.npz;
        npz.by_name::<OwnedRepr<f64>, D>(&format!("{key}.npy"))
            .or_else(|_| npz.by_name::<OwnedRepr<f64>, D>(key))
            .map_err(|e| FnoError::Artifact {
                path: self.path.clone(),
                message: format!("failed to read key '{key}': {e}"),
            })
    }

    pub fn scalar_f64(&mut self, key: &str) -> FnoResult<f64> {
        let values: Array1<f64> = self.array(key)?;
        values.iter().next().copied().ok_or_else(|| FnoError::Artifact {
            path: self.path.clone(),
            message: format!("scalar key '{key}' is empty"),
        })
    }

    /// Integer scalar, accepting int64, int32 or float64 storage.
    pub fn scalar_usize(&mut self, key: &str) -> FnoResult<usize> {
        let npz = &mut self.npz;
        let v_i64: Result<Array1<i64>, _> = npz
            .by_name::<OwnedRepr<i64>, Ix1>(&format!("{key}.npy"))
            .or_else(|_| npz.by_name::<OwnedRepr<i64>, Ix1>(key));
        if let Ok(v) = v_i64 {
            if let Some(x) = v.iter().next() {
                return Ok((*x).max(0) as usize);
            }
        }

        let v_i32: Result<Array1<i32>, _> = npz
            .by_name::<OwnedRepr<i32>, Ix1>(&format!("{key}.npy"))
            .or_else(|_| npz.by_name::<OwnedRepr<i32>, Ix1>(key));
        if let Ok(v) = v_i32 {
            if let Some(x) = v.iter().next() {
                return Ok((*x).max(0) as usize);
            }
        }

        let v_f64: Result<Array1<f64>, _> = npz
            .by_name::<OwnedRepr<f64>, Ix1>(&format!("{key}.npy"))
            .or_else(|_| npz.by_name::<OwnedRepr<f64>, Ix1>(key));
        if let Ok(v) = v_f64 {
            if let Some(x) = v.iter().next() {
                return Ok((*x).max(0.0) as usize);
            }
        }
        Err(FnoError::Artifact {
            path: self.path.clone(),
            message: format!("failed to read scalar key '{key}'"),
        })
    }
}

/// Write side of an `.npz` artifact. Parent directories are created on demand.
pub struct ArchiveWriter {
    path: String,
    npz: NpzWriter<File>,
}

impl ArchiveWriter {
    pub fn create(path: &Path) -> FnoResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            path: path.display().to_string(),
            npz: NpzWriter::new(file),
        })
    }

    pub fn array<A, S, D>(&mut self, key: &str, array: &ArrayBase<S, D>) -> FnoResult<()>
    where
        A: WritableElement,
        S: Data<Elem = A>,
        D: Dimension,
    {
        self.npz
            .add_array(key, array)
            .map_err(|e| FnoError::Artifact {
                path: self.path.clone(),
                message: format!("failed to write key '{key}': {e}"),
            })
    }

    pub fn scalar_usize(&mut self, key: &str, value: usize) -> FnoResult<()> {
        self.array(key, &Array1::from_vec(vec![value as i64]))
    }

    pub fn scalar_f64(&mut self, key: &str, value: f64) -> FnoResult<()> {
        self.array(key, &Array1::from_vec(vec![value]))
    }

    pub fn finish(self) -> FnoResult<()> {
        let path = self.path;
        self.npz.finish().map_err(|e| FnoError::Artifact {
            path,
            message: format!("failed to finalize archive: {e}"),
        })?;
        Ok(())
    }
}
