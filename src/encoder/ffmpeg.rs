//! FFmpeg subprocess backend
//!
//! Drives the system `ffmpeg` binary. Frame sets are assembled through the
//! concat demuxer with an explicit per-frame duration so the output carries
//! exactly one video frame per source image; trims seek on the source and
//! re-encode video while copying audio. Every encode lands in a staging
//! file in the destination directory and is moved into place only on
//! success, so a crashed or failed run never leaves a half-written clip
//! behind and never overwrites a finished one.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::encoder::{Acceleration, EncodeBackend, EncodeError, EncodeResult, FramesJob, TrimJob};
use crate::error::{ClipmillError, ClipmillResult};

/// Encoder backed by the system `ffmpeg` binary
pub struct FfmpegEncoder {
    /// Hardware acceleration mode
    acceleration: Acceleration,
    /// Constant rate factor for software encodes (0-51, lower is better)
    crf: u8,
    /// x264 speed preset for software encodes
    preset: String,
    /// Verify output frame counts with ffprobe after frame-set encodes
    verify_frame_count: bool,
}

impl FfmpegEncoder {
    /// Create a software encoder with default quality settings
    pub fn new() -> Self {
        Self {
            acceleration: Acceleration::Software,
            crf: 18,
            preset: "medium".to_string(),
            verify_frame_count: false,
        }
    }

    /// Set the hardware acceleration mode
    pub fn with_acceleration(mut self, acceleration: Acceleration) -> Self {
        self.acceleration = acceleration;
        self
    }

    /// Set the constant rate factor for software encodes
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(51); // Clamp to valid range
        self
    }

    /// Set the x264 speed preset for software encodes
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Enable or disable ffprobe frame-count verification
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_frame_count = verify;
        self
    }

    /// Check that the binaries this backend shells out to are runnable.
    ///
    /// Called once before a batch starts; a missing encoder is a fatal
    /// configuration problem, not a per-clip one.
    pub async fn check_available(&self) -> ClipmillResult<()> {
        probe_binary("ffmpeg").await?;
        if self.verify_frame_count {
            probe_binary("ffprobe").await?;
        }
        Ok(())
    }

    /// Argument list for assembling a frame set via the concat demuxer
    fn frames_args(&self, manifest: &Path, job: &FramesJob, staging: &Path) -> Vec<String> {
        let mut args = base_args();
        args.extend([
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest.display().to_string(),
        ]);
        // Passthrough keeps one output frame per manifest entry instead of
        // resampling to a nominal rate.
        args.extend([
            "-fps_mode".to_string(),
            "passthrough".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);
        args.extend(self.codec_args(job.device));
        args.push(staging.display().to_string());
        args
    }

    /// Argument list for cutting a window out of a source video
    fn trim_args(&self, job: &TrimJob, staging: &Path) -> Vec<String> {
        let mut args = base_args();
        if self.acceleration.is_cuda() {
            args.extend(["-hwaccel".to_string(), "cuda".to_string()]);
            if let Some(device) = job.device {
                args.extend(["-hwaccel_device".to_string(), device.to_string()]);
            }
        }
        // Seek before the input for a fast keyframe seek, then decode the
        // window length from there.
        args.extend([
            "-ss".to_string(),
            format!("{:.6}", job.start_secs),
            "-i".to_string(),
            job.source.display().to_string(),
            "-t".to_string(),
            format!("{:.6}", job.duration_secs),
        ]);
        args.extend(self.codec_args(job.device));
        args.extend(["-c:a".to_string(), "copy".to_string()]);
        args.push(staging.display().to_string());
        args
    }

    /// Video codec arguments for the configured acceleration mode
    fn codec_args(&self, device: Option<usize>) -> Vec<String> {
        match self.acceleration {
            Acceleration::Software => vec![
                "-c:v".to_string(),
                "libx264".to_string(),
                "-crf".to_string(),
                self.crf.to_string(),
                "-preset".to_string(),
                self.preset.clone(),
            ],
            Acceleration::Cuda => {
                let mut args = vec!["-c:v".to_string(), "h264_nvenc".to_string()];
                if let Some(device) = device {
                    args.extend(["-gpu".to_string(), device.to_string()]);
                }
                args
            }
        }
    }

    /// Run ffmpeg to completion, mapping a non-zero exit to a per-clip error
    async fn run_ffmpeg(&self, args: &[String]) -> EncodeResult<()> {
        let rendered = render_command("ffmpeg", args);
        debug!("running {}", rendered);

        let output = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| EncodeError::Spawn {
                message: format!("{}: {}", rendered, e),
            })?;

        if !output.status.success() {
            return Err(EncodeError::Failed {
                command: rendered,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EncodeBackend for FfmpegEncoder {
    async fn encode_frames(&self, job: &FramesJob) -> EncodeResult<()> {
        if job.output.exists() {
            return Err(EncodeError::AlreadyExists {
                path: job.output.clone(),
            });
        }

        let dest_dir = destination_dir(&job.output)?;
        let manifest = write_concat_manifest(&job.frames, job.fps, dest_dir)?;
        let staging = staging_file(dest_dir)?;

        let args = self.frames_args(manifest.path(), job, staging.path());
        self.run_ffmpeg(&args).await?;

        if self.verify_frame_count {
            let actual = probe_frame_count(staging.path()).await?;
            check_frame_count(job.frames.len(), actual, &job.output)?;
        }

        persist_noclobber(staging, &job.output)
    }

    async fn trim_source(&self, job: &TrimJob) -> EncodeResult<()> {
        if job.output.exists() {
            return Err(EncodeError::AlreadyExists {
                path: job.output.clone(),
            });
        }

        let dest_dir = destination_dir(&job.output)?;
        let staging = staging_file(dest_dir)?;

        let args = self.trim_args(job, staging.path());
        self.run_ffmpeg(&args).await?;

        persist_noclobber(staging, &job.output)
    }
}

/// Shared leading arguments: overwrite the staging file, keep stderr to
/// real errors so captured output stays diagnostic
fn base_args() -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ]
}

/// Ensure the clip's destination directory exists and return it
fn destination_dir(output: &Path) -> EncodeResult<&Path> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    Ok(dir)
}

/// Write a concat-demuxer manifest giving every frame an equal duration
fn write_concat_manifest(frames: &[PathBuf], fps: f64, dir: &Path) -> EncodeResult<NamedTempFile> {
    let frame_duration = 1.0 / fps;
    let mut text = String::from("ffconcat version 1.0\n");
    for frame in frames {
        text.push_str(&format!(
            "file '{}'\nduration {:.6}\n",
            escape_concat_path(frame),
            frame_duration
        ));
    }

    let mut manifest = tempfile::Builder::new()
        .prefix(".clipmill-frames-")
        .suffix(".ffconcat")
        .tempfile_in(dir)?;
    manifest.write_all(text.as_bytes())?;
    manifest.flush()?;
    Ok(manifest)
}

/// Escape a path for a single-quoted concat manifest entry
fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

/// Staging file in the destination directory, promoted only on success
fn staging_file(dir: &Path) -> EncodeResult<NamedTempFile> {
    let staging = tempfile::Builder::new()
        .prefix(".clipmill-")
        .suffix(".mp4")
        .tempfile_in(dir)?;
    Ok(staging)
}

/// Move a finished staging file to its destination without overwriting.
///
/// A concurrent or earlier producer winning the rename is reported as
/// [`EncodeError::AlreadyExists`] so callers can count it as a skip.
fn persist_noclobber(staging: NamedTempFile, output: &Path) -> EncodeResult<()> {
    match staging.persist_noclobber(output) {
        Ok(_) => Ok(()),
        Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(EncodeError::AlreadyExists {
                path: output.to_path_buf(),
            })
        }
        Err(err) => Err(EncodeError::Io(err.error)),
    }
}

/// Count decoded video frames in a finished file with ffprobe
async fn probe_frame_count(path: &Path) -> EncodeResult<usize> {
    let args = [
        "-v".to_string(),
        "error".to_string(),
        "-count_frames".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream=nb_read_frames".to_string(),
        "-of".to_string(),
        "default=nokey=1:noprint_wrappers=1".to_string(),
        path.display().to_string(),
    ];
    let rendered = render_command("ffprobe", &args);
    debug!("running {}", rendered);

    let output = Command::new("ffprobe")
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| EncodeError::Probe {
            message: format!("{}: {}", rendered, e),
        })?;

    if !output.status.success() {
        return Err(EncodeError::Probe {
            message: format!(
                "{} exited with {}: {}",
                rendered,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            ),
        });
    }

    let text = String::from_utf8_lossy(&output.stdout);
    text.trim().parse::<usize>().map_err(|_| EncodeError::Probe {
        message: format!("unparseable ffprobe frame count: {:?}", text.trim()),
    })
}

/// Reject an encoded file whose frame count does not match the manifest
fn check_frame_count(expected: usize, actual: usize, output: &Path) -> EncodeResult<()> {
    if actual != expected {
        return Err(EncodeError::FrameCountMismatch {
            expected,
            actual,
            path: output.to_path_buf(),
        });
    }
    Ok(())
}

/// Render a command line for logs and error reports
fn render_command(program: &str, args: &[String]) -> String {
    format!("{} {}", program, args.join(" "))
}

/// Probe a binary by running its version banner
async fn probe_binary(program: &str) -> ClipmillResult<()> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ClipmillError::EncoderUnavailable {
            message: format!("{} is not runnable: {}", program, e),
        })?;

    if !output.status.success() {
        return Err(ClipmillError::EncoderUnavailable {
            message: format!("{} -version exited with {}", program, output.status),
        });
    }

    let banner = String::from_utf8_lossy(&output.stdout);
    debug!("encoder preflight: {}", banner.lines().next().unwrap_or(program));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn frames_job(dir: &Path) -> FramesJob {
        FramesJob {
            frames: vec![dir.join("000001.png"), dir.join("000002.png")],
            fps: 25.0,
            output: dir.join("clip.mp4"),
            device: None,
        }
    }

    #[test]
    fn test_frames_args_use_concat_demuxer() {
        let dir = TempDir::new().unwrap();
        let encoder = FfmpegEncoder::new().with_crf(20).with_preset("fast");
        let job = frames_job(dir.path());

        let args = encoder.frames_args(Path::new("list.ffconcat"), &job, Path::new("out.mp4"));
        assert!(args.contains(&"concat".to_string()));
        assert!(args.contains(&"-safe".to_string()));
        assert!(args.contains(&"passthrough".to_string()));
        assert!(args.contains(&"yuv420p".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"20".to_string()));
        assert!(args.contains(&"fast".to_string()));
    }

    #[test]
    fn test_trim_args_seek_before_input() {
        let encoder = FfmpegEncoder::new();
        let job = TrimJob {
            source: PathBuf::from("source.mp4"),
            start_secs: 12.5,
            duration_secs: 3.25,
            output: PathBuf::from("clip.mp4"),
            device: None,
        };

        let args = encoder.trim_args(&job, Path::new("out.mp4"));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "12.500000");
        assert!(args.contains(&"3.250000".to_string()));
        assert!(args.contains(&"copy".to_string()));
    }

    #[test]
    fn test_cuda_trim_args_pin_device() {
        let encoder = FfmpegEncoder::new().with_acceleration(Acceleration::Cuda);
        let job = TrimJob {
            source: PathBuf::from("source.mp4"),
            start_secs: 0.0,
            duration_secs: 1.0,
            output: PathBuf::from("clip.mp4"),
            device: Some(1),
        };

        let args = encoder.trim_args(&job, Path::new("out.mp4"));
        assert!(args.contains(&"cuda".to_string()));
        assert!(args.contains(&"-hwaccel_device".to_string()));
        assert!(args.contains(&"h264_nvenc".to_string()));
        assert!(args.contains(&"-gpu".to_string()));
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_crf_is_clamped() {
        let encoder = FfmpegEncoder::new().with_crf(99);
        let args = encoder.codec_args(None);
        assert!(args.contains(&"51".to_string()));
    }

    #[test]
    fn test_concat_manifest_contents() {
        let dir = TempDir::new().unwrap();
        let frames = vec![dir.path().join("a.png"), dir.path().join("b.png")];

        let manifest = write_concat_manifest(&frames, 25.0, dir.path()).unwrap();
        let text = std::fs::read_to_string(manifest.path()).unwrap();

        assert!(text.starts_with("ffconcat version 1.0\n"));
        assert_eq!(text.matches("duration 0.040000").count(), 2);
        assert!(text.contains(&format!("file '{}'", frames[0].display())));
    }

    #[test]
    fn test_concat_manifest_escapes_single_quotes() {
        let dir = TempDir::new().unwrap();
        let frames = vec![dir.path().join("it's.png")];

        let manifest = write_concat_manifest(&frames, 30.0, dir.path()).unwrap();
        let text = std::fs::read_to_string(manifest.path()).unwrap();
        assert!(text.contains("it'\\''s.png"));
    }

    #[test]
    fn test_persist_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clip.mp4");
        std::fs::write(&output, b"finished earlier").unwrap();

        let staging = staging_file(dir.path()).unwrap();
        let err = persist_noclobber(staging, &output).unwrap_err();
        assert!(err.is_already_produced());
        assert_eq!(std::fs::read(&output).unwrap(), b"finished earlier");
    }

    #[test]
    fn test_persist_moves_staging_into_place() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clip.mp4");

        let mut staging = staging_file(dir.path()).unwrap();
        staging.write_all(b"encoded").unwrap();
        persist_noclobber(staging, &output).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"encoded");
    }

    #[test]
    fn test_frame_count_mismatch_fails_the_clip() {
        let output = Path::new("clip.mp4");
        assert!(check_frame_count(10, 10, output).is_ok());

        let err = check_frame_count(10, 9, output).unwrap_err();
        match err {
            EncodeError::FrameCountMismatch { expected, actual, path } => {
                assert_eq!(expected, 10);
                assert_eq!(actual, 9);
                assert_eq!(path, output);
            }
            other => panic!("expected a frame count mismatch, got {:?}", other),
        }
    }
}
