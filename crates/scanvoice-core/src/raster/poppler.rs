//! PDF page rendering through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::DynamicImage;
use tokio::process::Command;
use tracing::{debug, info};

use super::{run_blocking, PageRenderer, PdfSource, Result};
use crate::error::RasterError;

/// File name prefix for rendered pages inside the staging directory.
const PAGE_PREFIX: &str = "page";

/// Renders PDF pages with `pdftoppm`.
///
/// Pages are staged in a temporary directory that is removed when rendering
/// finishes, fails, or the future is dropped. A dropped future also kills the
/// child process.
#[derive(Debug, Clone)]
pub struct PopplerRenderer {
    command: String,
    staging_root: Option<PathBuf>,
}

impl PopplerRenderer {
    /// Create a renderer invoking `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            staging_root: None,
        }
    }

    /// Stage renders under `root` instead of the system temp directory.
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    fn staging_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("scanvoice-");
        match &self.staging_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

impl Default for PopplerRenderer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

#[async_trait]
impl PageRenderer for PopplerRenderer {
    async fn render(&self, source: PdfSource, pages: usize, dpi: u32) -> Result<Vec<DynamicImage>> {
        let staging = self.staging_dir()?;
        let input = staging.path().join("document.pdf");
        tokio::fs::write(&input, source.bytes()).await?;

        info!("Rendering {} page(s) at {} DPI with {}", pages, dpi, self.command);

        let output = Command::new(&self.command)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-gray")
            .arg("-png")
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(pages.to_string())
            .arg(&input)
            .arg(staging.path().join(PAGE_PREFIX))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RasterError::Render(format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RasterError::Decode(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let rendered = collect_rendered_pages(staging.path())?;
        if rendered.len() != pages {
            return Err(RasterError::Render(format!(
                "expected {} rendered page(s), found {}",
                pages,
                rendered.len()
            )));
        }

        let images = run_blocking(move || {
            rendered
                .iter()
                .map(|path| image::open(path).map_err(|e| RasterError::Decode(e.to_string())))
                .collect()
        })
        .await?;

        debug!("Removing staging directory {}", staging.path().display());
        staging.close()?;
        Ok(images)
    }
}

/// Rendered page files in `dir`, ordered by page number.
///
/// `pdftoppm` zero-pads page numbers to the width of the page count, so the
/// number is parsed rather than sorted lexically.
fn collect_rendered_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::scanned_pdf;

    #[test]
    fn test_page_number() {
        assert_eq!(page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-010.png")), Some(10));
        assert_eq!(page_number(Path::new("/tmp/x/page-1.ppm")), None);
        assert_eq!(page_number(Path::new("/tmp/x/document.pdf")), None);
    }

    #[test]
    fn test_collect_rendered_pages_orders_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "document.pdf"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = collect_rendered_pages(dir.path()).unwrap();
        let names: Vec<String> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    /// Write an executable stand-in for `pdftoppm` running `body`.
    ///
    /// The last argument the renderer passes is the output prefix.
    #[cfg(unix)]
    fn fake_pdftoppm(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("pdftoppm");
        let script = format!("#!/bin/sh\nfor last; do :; done\n{}\n", body);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_staging_removed_after_successful_render() {
        let tools = tempfile::tempdir().unwrap();
        let fixture = tools.path().join("fixture.png");
        image::GrayImage::new(3, 2).save(&fixture).unwrap();
        let command = fake_pdftoppm(
            tools.path(),
            &format!(
                "cp '{0}' \"$last-1.png\" && cp '{0}' \"$last-2.png\"",
                fixture.display()
            ),
        );

        let root = tempfile::tempdir().unwrap();
        let renderer = PopplerRenderer::new(command.to_string_lossy()).with_staging_root(root.path());
        let source = PdfSource::open(scanned_pdf(&[(2, 2), (2, 2)])).unwrap();

        let images = renderer.render(source, 2, 200).await.unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].width(), 3);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_staging_removed_when_render_is_cancelled() {
        let tools = tempfile::tempdir().unwrap();
        let command = fake_pdftoppm(tools.path(), "sleep 5");

        let root = tempfile::tempdir().unwrap();
        let renderer = PopplerRenderer::new(command.to_string_lossy()).with_staging_root(root.path());
        let source = PdfSource::open(scanned_pdf(&[(2, 2)])).unwrap();

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(300),
            renderer.render(source, 1, 200),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_staging_removed_when_renderer_fails() {
        let root = tempfile::tempdir().unwrap();
        let renderer = PopplerRenderer::new("scanvoice-no-such-pdftoppm")
            .with_staging_root(root.path());
        let source = PdfSource::open(scanned_pdf(&[(2, 2)])).unwrap();

        let err = renderer.render(source, 1, 200).await.unwrap_err();

        assert!(matches!(err, RasterError::Render(_)));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
