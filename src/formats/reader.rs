use std::path::Path;

/// Configuration for delimited file reading (CSV, TSV)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedConfig {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
        }
    }
}

impl DelimitedConfig {
    pub fn csv() -> Self {
        Self::default()
    }

    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            quote: b'"',
        }
    }

    /// Pick the dialect from the file extension: `.tsv` is tab-delimited,
    /// everything else is read as CSV.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => Self::tsv(),
            _ => Self::csv(),
        }
    }
}
