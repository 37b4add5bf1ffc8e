use std::{
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::AppError,
    formats::resolve,
    model::{DownloadEvent, DownloadRequest, FetchedVideo, VideoInfo},
    progress::parse_progress_from_line,
};

/// Rejects empty input and anything that is not an http(s) URL.
pub fn validate_url(url: &str) -> Result<&str, AppError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::InvalidUrl("Please enter a video URL!".into()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::InvalidUrl(
            "Please enter a valid URL (starting with http:// or https://)".into(),
        ));
    }
    Ok(url)
}

/// Runs `yt-dlp -J <url>` and parses the JSON document it prints.
pub async fn fetch_video_info(config: &Config, url: &str) -> Result<VideoInfo, AppError> {
    info!(url, "fetching video information");
    let mut command = Command::new(&config.ytdlp_path);
    command.arg("-J").arg(url);
    query_metadata(command, &config.ytdlp_path).await
}

/// Fetches metadata and turns it into a quality menu.
pub async fn fetch_qualities(config: &Config, url: &str) -> Result<FetchedVideo, AppError> {
    let info = fetch_video_info(config, url).await?;
    let options = resolve(&info.formats);
    info!(title = %info.title, formats = info.formats.len(), qualities = options.len(), "resolved qualities");
    if options.is_empty() {
        return Err(AppError::NoQualitiesFound);
    }
    Ok(FetchedVideo { title: info.title, thumbnail: info.thumbnail, options })
}

async fn query_metadata(mut command: Command, tool: &str) -> Result<VideoInfo, AppError> {
    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| spawn_error(tool, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(status = ?output.status.code(), "metadata query failed");
        let message = if stderr.is_empty() {
            "Failed to fetch video information".to_string()
        } else {
            stderr
        };
        return Err(AppError::FetchFailed(message));
    }

    parse_video_info(&output.stdout)
}

pub fn parse_video_info(raw: &[u8]) -> Result<VideoInfo, AppError> {
    serde_json::from_slice(raw).map_err(AppError::ParseFailed)
}

fn spawn_error(tool: &str, err: io::Error) -> AppError {
    if err.kind() == io::ErrorKind::NotFound {
        AppError::DependencyMissing { tool: tool.to_string() }
    } else {
        AppError::Unexpected(err)
    }
}

/// Command line for a download, without the program name.
pub fn download_args(config: &Config, request: &DownloadRequest) -> Vec<String> {
    let mut args = vec!["-f".to_owned(), request.selection.selector()];

    args.push("--merge-output-format".to_owned());
    args.push(request.merge_output_format.clone());
    args.push("--newline".to_owned());

    args.push("-o".to_owned());
    args.push(output_template(&request.output_dir));

    if let Some(ffmpeg) = config.custom_ffmpeg() {
        args.push("--ffmpeg-location".to_owned());
        args.push(ffmpeg.to_owned());
    }
    args.push(request.url.clone());
    args
}

fn output_template(folder: &Path) -> String {
    folder.join("%(title)s.%(ext)s").display().to_string()
}

/// Downloads `request` and reports everything on `progress_tx`, ending with
/// exactly one [`DownloadEvent::Finished`]. The slot stays taken until then.
pub async fn spawn_download(
    config: Config,
    request: DownloadRequest,
    guard: DownloadGuard,
    progress_tx: UnboundedSender<DownloadEvent>,
) {
    let result = run_download(&config, &request, &progress_tx).await;
    match &result {
        Ok(folder) => info!(title = %request.title, folder = %folder.display(), "download finished"),
        Err(e) => warn!(title = %request.title, error = %e, "download failed"),
    }
    drop(guard);
    let _ = progress_tx.send(DownloadEvent::Finished(result));
}

async fn run_download(
    config: &Config,
    request: &DownloadRequest,
    progress_tx: &UnboundedSender<DownloadEvent>,
) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(&request.output_dir).await?;

    let args = download_args(config, request);
    info!(url = %request.url, quality = %request.label, selector = %args[1], "starting download");

    let mut command = Command::new(&config.ytdlp_path);
    command.args(&args);
    let status = stream_output(command, &config.ytdlp_path, progress_tx).await?;

    if !status.success() {
        return Err(AppError::DownloadFailed(status.code()));
    }
    let folder = tokio::fs::canonicalize(&request.output_dir)
        .await
        .unwrap_or_else(|_| request.output_dir.clone());
    Ok(folder)
}

/// Spawns `command` and feeds stdout and stderr, line by line, through the
/// progress parser until the process exits.
pub async fn stream_output(
    mut command: Command,
    tool: &str,
    progress_tx: &UnboundedSender<DownloadEvent>,
) -> Result<ExitStatus, AppError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(tool, e))?;

    let stdout = child.stdout.take().ok_or_else(|| io::Error::other("stdout not captured"))?;
    let stderr = child.stderr.take().ok_or_else(|| io::Error::other("stderr not captured"))?;
    let mut out = segments(stdout);
    let mut err = segments(stderr);
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        let segment = tokio::select! {
            seg = out.next_segment(), if out_open => {
                let seg = seg?;
                out_open = seg.is_some();
                seg
            }
            seg = err.next_segment(), if err_open => {
                let seg = seg?;
                err_open = seg.is_some();
                seg
            }
        };
        if let Some(bytes) = segment {
            let line = String::from_utf8_lossy(&bytes);
            let line = line.trim();
            debug!("yt-dlp> {}", line);
            if let Some(progress) = parse_progress_from_line(line) {
                let _ = progress_tx.send(DownloadEvent::Progress(progress));
            }
        }
    }

    Ok(child.wait().await?)
}

fn segments<R: AsyncRead + Unpin>(reader: R) -> tokio::io::Split<BufReader<R>> {
    BufReader::new(reader).split(b'\n')
}

/// Allows at most one download at a time.
#[derive(Debug, Clone, Default)]
pub struct DownloadSlot {
    busy: Arc<AtomicBool>,
}

impl DownloadSlot {
    pub fn try_acquire(&self) -> Result<DownloadGuard, AppError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::AlreadyInProgress)?;
        Ok(DownloadGuard { busy: Arc::clone(&self.busy) })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Frees the [`DownloadSlot`] when dropped.
#[derive(Debug)]
pub struct DownloadGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for DownloadGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
