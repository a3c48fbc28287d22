//! OSRM dataset preparation for container tests (download + preprocess).

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct GeofabrikRegion {
    /// Geofabrik region path, e.g. "europe/monaco".
    pub path: String,
}

impl GeofabrikRegion {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("region")
    }

    pub fn url(&self) -> String {
        format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.path)
    }
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub region: GeofabrikRegion,
    pub data_root: PathBuf,
    /// Lua profile inside the backend image, e.g. "/opt/car.lua".
    pub profile_script: String,
}

impl DatasetConfig {
    pub fn new(region: GeofabrikRegion, data_root: impl Into<PathBuf>) -> Self {
        Self {
            region,
            data_root: data_root.into(),
            profile_script: "/opt/car.lua".to_string(),
        }
    }
}

/// A preprocessed MLD dataset on disk.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub data_dir: PathBuf,
    pub osrm_base: PathBuf,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("{step} failed: {status}")]
    Process { step: String, status: String },
}

impl Dataset {
    pub fn ensure(config: &DatasetConfig) -> Result<Self, DatasetError> {
        let data_root = if config.data_root.is_absolute() {
            config.data_root.clone()
        } else {
            std::env::current_dir()?.join(&config.data_root)
        };
        let name = config.region.name();
        let data_dir = data_root.join(name);
        fs::create_dir_all(&data_dir)?;

        let pbf_path = data_dir.join(format!("{name}-latest.osm.pbf"));
        if !pbf_path.exists() {
            download(&config.region.url(), &pbf_path)?;
        }

        let osrm_base = data_dir.join(format!("{name}-latest.osrm"));
        if !osrm_base.exists() {
            let input = format!("/data/{}", file_name(&pbf_path));
            run_docker(&["osrm-extract", "-p", &config.profile_script, &input], &data_dir)?;
        }
        if !mld_ready(&osrm_base) {
            let base = format!("/data/{}", file_name(&osrm_base));
            run_docker(&["osrm-partition", &base], &data_dir)?;
            run_docker(&["osrm-customize", &base], &data_dir)?;
        }

        Ok(Self { data_dir, osrm_base })
    }

    /// Path of the dataset as seen inside a container with `data_dir`
    /// mounted at `/data`.
    pub fn container_path(&self) -> String {
        format!("/data/{}", file_name(&self.osrm_base))
    }
}

fn download(url: &str, dest: &Path) -> Result<(), DatasetError> {
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    let tmp_path = dest.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    fs::rename(tmp_path, dest)?;
    Ok(())
}

fn mld_ready(osrm_base: &Path) -> bool {
    ["osrm.partition", "osrm.mldgr", "osrm.cells"]
        .iter()
        .all(|ext| osrm_base.with_extension(ext).exists())
}

fn run_docker(args: &[&str], data_dir: &Path) -> Result<(), DatasetError> {
    let status = Command::new("docker")
        .args(["run", "--rm", "-t", "-v"])
        .arg(format!("{}:/data", data_dir.display()))
        .arg("osrm/osrm-backend")
        .args(args)
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(DatasetError::Process {
            step: args.first().copied().unwrap_or("docker").to_string(),
            status: status.to_string(),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}
