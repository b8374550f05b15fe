//! FFprobe frame geometry.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use vcomp_models::FrameGeometry;

use crate::error::{MediaError, MediaResult};

/// Probe duration and dimensions of the first video stream.
///
/// Both values must be present and positive; anything else is a probe
/// failure and the job must not proceed to transcoding.
pub async fn probe_geometry(ffprobe: &Path, path: &Path) -> MediaResult<FrameGeometry> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let duration_out = run_ffprobe(
        ffprobe,
        &[
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ],
        path,
    )
    .await?;
    let duration = parse_duration(&duration_out)?;

    let dims_out = run_ffprobe(
        ffprobe,
        &[
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ],
        path,
    )
    .await?;
    let (width, height) = parse_dimensions(&dims_out)?;

    debug!(
        path = %path.display(),
        width,
        height,
        duration,
        "Probed base video"
    );

    Ok(FrameGeometry::new(width, height, duration))
}

async fn run_ffprobe(ffprobe: &Path, args: &[&str], path: &Path) -> MediaResult<String> {
    let output = Command::new(ffprobe)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| MediaError::FfprobeFailed {
            message: format!("Failed to spawn FFprobe: {e}"),
            stderr: None,
        })?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `format=duration` output (a bare number of seconds).
pub fn parse_duration(output: &str) -> MediaResult<f64> {
    let duration = first_line(output)
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    duration.ok_or_else(|| {
        MediaError::probe_failed("Could not determine video duration. Is the file corrupted?")
    })
}

/// Parse `stream=width,height` CSV output (`WIDTHxHEIGHT`).
pub fn parse_dimensions(output: &str) -> MediaResult<(u32, u32)> {
    let dims = first_line(output).and_then(|line| {
        let mut parts = line.split('x');
        let width = parts.next()?.trim().parse::<u32>().ok()?;
        let height = parts.next()?.trim().parse::<u32>().ok()?;
        (width > 0 && height > 0).then_some((width, height))
    });

    dims.ok_or_else(|| MediaError::probe_failed("Could not determine video dimensions."))
}

fn first_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert!((parse_duration("12.345000\n").unwrap() - 12.345).abs() < 1e-9);
        assert!((parse_duration("\n  100\n").unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_duration_rejects_unusable_values() {
        for output in ["", "N/A", "0", "0.000000", "-3", "abc"] {
            let err = parse_duration(output).unwrap_err();
            assert!(matches!(err, MediaError::ProbeFailed(_)), "{output:?}");
        }
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1920x1080\n").unwrap(), (1920, 1080));
        // Some containers append an empty trailing field.
        assert_eq!(parse_dimensions("1280x720x\n").unwrap(), (1280, 720));
    }

    #[test]
    fn test_parse_dimensions_rejects_unusable_values() {
        for output in ["", "1920", "x1080", "0x0", "widexhigh"] {
            tokio_test::assert_err!(parse_dimensions(output), "{output:?}");
        }
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let result = probe_geometry(Path::new("ffprobe"), Path::new("/nonexistent/video.mp4")).await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
