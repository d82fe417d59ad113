// src/ocr.rs

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Is the optical-recognition toolchain (pdftoppm + tesseract) present?
/// Probed once per process; absence degrades to empty recognition
/// results rather than failing the pipeline.
pub fn engine_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        let ok = command_available("pdftoppm") && command_available("tesseract");
        if !ok {
            warn!("pdftoppm/tesseract not found — optical recovery disabled");
        }
        ok
    })
}

fn command_available(cmd: &str) -> bool {
    Command::new(cmd).arg("-v").output().is_ok()
}

/// Recognize one page of a PDF on disk at the given render scale.
/// Returns empty text on any failure: missing engine, render error,
/// recognition error. Page indices are zero-based.
pub fn recognize_page(pdf_path: &Path, page_index: usize, dpi: u32) -> String {
    if !engine_available() {
        return String::new();
    }

    let Some(image) = render_page(pdf_path, page_index, dpi) else {
        return String::new();
    };

    let output = Command::new("tesseract")
        .arg(&image)
        .arg("stdout")
        .args(["-l", "eng"])
        .output();
    let _ = std::fs::remove_file(&image);

    match output {
        Ok(out) if out.status.success() => {
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        }
        Ok(out) => {
            debug!(
                page = page_index,
                status = out.status.code(),
                "tesseract failed"
            );
            String::new()
        }
        Err(e) => {
            debug!(page = page_index, error = %e, "tesseract did not run");
            String::new()
        }
    }
}

/// Render a single page to a grayscale PNG in the temp directory.
fn render_page(pdf_path: &Path, page_index: usize, dpi: u32) -> Option<PathBuf> {
    let page = (page_index + 1).to_string(); // pdftoppm pages are 1-based
    let stem = std::env::temp_dir().join(format!(
        "tender-radar-{}-p{}",
        std::process::id(),
        page_index
    ));

    let status = Command::new("pdftoppm")
        .args(["-f", &page, "-l", &page])
        .args(["-r", &dpi.to_string()])
        .args(["-gray", "-png", "-singlefile"])
        .arg(pdf_path)
        .arg(&stem)
        .status();

    match status {
        Ok(s) if s.success() => {
            let image = stem.with_extension("png");
            image.exists().then_some(image)
        }
        Ok(s) => {
            debug!(page = page_index, status = s.code(), "pdftoppm failed");
            None
        }
        Err(e) => {
            debug!(page = page_index, error = %e, "pdftoppm did not run");
            None
        }
    }
}
