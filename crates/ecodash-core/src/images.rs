//! Local chart image lookup.
//!
//! Charts are rendered elsewhere and dropped into one directory; the bot only
//! checks whether a file exists before attaching it.

use crate::format::file_stem;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Charts that are always available under a fixed file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticChart {
    /// IRENA renewable energy capacity
    Renewables,
    /// Oxfam emissions by income group
    Emissions,
    /// WRI emissions by sector
    Wri,
    /// Countries with the highest deaths per million
    TopDeaths,
}

impl StaticChart {
    /// Charts shown together in the gallery, in display order
    pub const GALLERY: [Self; 3] = [Self::Renewables, Self::Emissions, Self::Wri];

    /// File name inside the image directory
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Renewables => "ig-irena-2020.png",
            Self::Emissions => "ig-oxfam-1080x1080.png",
            Self::Wri => "ig-wri-1080x1080.png",
            Self::TopDeaths => "corona-deaths-top-20.png",
        }
    }
}

/// Directory of pre-rendered chart images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Chart for a country or region, if one has been rendered.
    #[must_use]
    pub fn covid_chart(&self, name: &str) -> Option<PathBuf> {
        self.existing(&format!("covid-{}.png", file_stem(name)))
    }

    /// A fixed chart, if present.
    #[must_use]
    pub fn static_chart(&self, chart: StaticChart) -> Option<PathBuf> {
        self.existing(chart.file_name())
    }

    /// Gallery charts that are present, in display order.
    #[must_use]
    pub fn gallery(&self) -> Vec<PathBuf> {
        StaticChart::GALLERY
            .iter()
            .filter_map(|chart| self.static_chart(*chart))
            .collect()
    }

    /// Number of files in the directory; logs and returns 0 if unreadable.
    #[must_use]
    pub fn count(&self) -> usize {
        match std::fs::read_dir(&self.dir) {
            Ok(entries) => {
                let count = entries.filter_map(Result::ok).count();
                info!(dir = %self.dir.display(), count, "Image store scanned");
                count
            }
            Err(e) => {
                warn!(dir = %self.dir.display(), "Unable to scan image directory: {e}");
                0
            }
        }
    }

    fn existing(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.dir.join(file_name);
        if path.is_file() {
            debug!(path = %path.display(), "Found image");
            Some(path)
        } else {
            debug!(path = %path.display(), "Image not found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_with(files: &[&str]) -> (tempfile::TempDir, ImageStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        for file in files {
            fs::write(dir.path().join(file), b"png").expect("write image");
        }
        let store = ImageStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_covid_chart_uses_sanitized_name() {
        let (_dir, store) = store_with(&["covid-United_Kingdom.png"]);
        let path = store.covid_chart("United Kingdom").expect("chart exists");
        assert!(path.ends_with("covid-United_Kingdom.png"));
        assert!(store.covid_chart("France").is_none());
    }

    #[test]
    fn test_gallery_skips_missing() {
        let (_dir, store) = store_with(&["ig-wri-1080x1080.png", "ig-irena-2020.png"]);
        let gallery = store.gallery();
        assert_eq!(gallery.len(), 2);
        assert!(gallery[0].ends_with("ig-irena-2020.png"));
        assert!(gallery[1].ends_with("ig-wri-1080x1080.png"));
    }

    #[test]
    fn test_count_missing_dir() {
        let store = ImageStore::new("/nonexistent/ecodash/img");
        assert_eq!(store.count(), 0);
        let (_dir, store) = store_with(&["a.png", "b.png"]);
        assert_eq!(store.count(), 2);
    }
}
