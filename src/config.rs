use std::path::PathBuf;

use clap::Parser;
use xnat_slice_viewer::session::{SessionConfig, DEFAULT_CACHE_CAPACITY};
use xnat_slice_viewer::slices::DEFAULT_EXTENSION;
use xnat_slice_viewer::ScanRef;

/// Page through the DICOM slices of one XNAT scan.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// XNAT server base url, e.g. https://central.xnat.org
    #[arg(long, env = "XNAT_SERVER")]
    pub server: Option<String>,

    #[arg(long, env = "XNAT_USER")]
    pub user: Option<String>,

    #[arg(long, env = "XNAT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub experiment: Option<String>,

    #[arg(long)]
    pub scan: Option<String>,

    /// Open a folder of exported slices instead of a server scan.
    #[arg(long, conflicts_with = "experiment")]
    pub dir: Option<PathBuf>,

    /// Decoded slices kept in memory.
    #[arg(
        long,
        default_value_t = DEFAULT_CACHE_CAPACITY,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub cache_capacity: u64,

    /// Suffix identifying slice files in a listing.
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    pub extension: String,
}

/// What to open at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Xnat(XnatTarget),
    Local(PathBuf),
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XnatTarget {
    pub server: String,
    pub credentials: Option<(String, String)>,
    pub scan: ScanRef,
}

impl Args {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            cache_capacity: self.cache_capacity,
            extension: self.extension.clone(),
        }
    }

    pub fn launch(&self) -> Launch {
        if let Some(dir) = &self.dir {
            return Launch::Local(dir.clone());
        }

        match (&self.server, &self.experiment, &self.scan) {
            (Some(server), Some(experiment), Some(scan)) => {
                let mut scan = ScanRef::new(experiment.as_str(), scan.as_str());
                if let Some(project) = &self.project {
                    scan = scan.with_project(project.as_str());
                }
                let credentials = self.user.clone().zip(self.password.clone());
                Launch::Xnat(XnatTarget {
                    server: server.clone(),
                    credentials,
                    scan,
                })
            }
            _ => Launch::Idle,
        }
    }
}
