use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Store location and layout parameters shared by the Genodex binaries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub genome_assembly: String,
    pub window_size: u32,
}

impl StoreConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.genome_assembly.is_empty() {
            bail!("genomeAssembly must not be empty");
        }
        if self.window_size == 0 {
            bail!("windowSize must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn valid_config() {
        let json = r#"{
            "dataDir": "/data/annotation",
            "genomeAssembly": "GRCh38",
            "windowSize": 1000
        }"#;
        let f = write_config(json);
        let config = StoreConfig::from_file(f.path()).unwrap();
        assert_eq!(config.genome_assembly, "GRCh38");
        assert_eq!(config.window_size, 1000);
        assert_eq!(config.data_dir, PathBuf::from("/data/annotation"));
    }

    #[test]
    fn zero_window_size_rejected() {
        let json = r#"{
            "dataDir": "/data/annotation",
            "genomeAssembly": "GRCh38",
            "windowSize": 0
        }"#;
        let f = write_config(json);
        let err = StoreConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("windowSize"));
    }

    #[test]
    fn empty_assembly_rejected() {
        let json = r#"{
            "dataDir": "/data/annotation",
            "genomeAssembly": "",
            "windowSize": 1000
        }"#;
        let f = write_config(json);
        assert!(StoreConfig::from_file(f.path()).is_err());
    }

    #[test]
    fn malformed_json_rejected() {
        let f = write_config("{ not json");
        let err = StoreConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
