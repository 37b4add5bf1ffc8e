//! Main application for the Universal Video Downloader GUI

use anyhow::{Context, anyhow};
use eframe::{App, Frame, egui};
use egui::{Align2, Color32, ColorImage, RichText, TextureOptions, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use std::{path::Path, time::Duration};
use tokio::{
    runtime::{Handle, Runtime},
    sync::mpsc::{UnboundedReceiver, error::TryRecvError, unbounded_channel},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use universal_video_downloader::{
    AppError,
    config::Config,
    deps::{DependencyReport, DependencyStatus, ensure_dependencies},
    downloader::{self, DownloadSlot, spawn_download, validate_url},
    model::{AppStatus, DownloadEvent, DownloadRequest, FetchedVideo, ProgressPhase, QualityOption},
    thumbnail,
};

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

const ACCENT: Color32 = Color32::from_rgb(0x66, 0x7e, 0xea);
const SUCCESS: Color32 = Color32::from_rgb(0x28, 0xa7, 0x45);
const BACKGROUND: Color32 = Color32::from_rgb(0x1e, 0x1e, 0x1e);
const FIELD: Color32 = Color32::from_rgb(0x40, 0x40, 0x40);
const MUTED: Color32 = Color32::from_rgb(0x88, 0x88, 0x88);

/// Program entry point: loads config, starts logging and the runtime, launches GUI
fn main() -> anyhow::Result<()> {
    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(&config.log_level);
    if let Some(e) = load_error {
        warn!("{e:#}; using default settings");
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("cannot create output folder {}", config.output_dir.display()))?;

    let handle = RUNTIME
        .get_or_try_init(Runtime::new)
        .context("failed to start tokio runtime")?
        .handle()
        .clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_title("Universal Video Downloader"),
        ..Default::default()
    };
    eframe::run_native(
        "Universal Video Downloader",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(dark_visuals());
            Box::new(DownloaderApp::new(config, handle, &cc.egui_ctx))
        }),
    )
    .map_err(|e| anyhow!("GUI failed: {e}"))
}

fn init_logging(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn dark_visuals() -> Visuals {
    let mut visuals = Visuals::dark();
    visuals.panel_fill = BACKGROUND;
    visuals.window_fill = BACKGROUND;
    visuals.extreme_bg_color = FIELD;
    visuals.selection.bg_fill = ACCENT;
    visuals.hyperlink_color = ACCENT;
    visuals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// Modal message shown on top of the main panel
struct Notice {
    kind: NoticeKind,
    title: &'static str,
    message: String,
}

impl Notice {
    fn from_error(err: &AppError) -> Self {
        if err.is_warning() {
            Self { kind: NoticeKind::Warning, title: "Warning", message: err.to_string() }
        } else {
            Self { kind: NoticeKind::Error, title: "Error", message: err.to_string() }
        }
    }
}

/// Application state for the GUI
struct DownloaderApp {
    config: Config,
    runtime: Handle,
    /// Input field for the video URL
    url_input: String,
    /// URL the current quality menu belongs to
    fetched_url: String,
    /// URL of the fetch in flight
    pending_url: String,
    video_title: String,
    quality_options: Vec<QualityOption>,
    selected_quality: Option<usize>,
    thumbnail: Option<egui::TextureHandle>,
    status: AppStatus,
    status_text: String,
    /// Percent in 0..=100
    progress: f32,
    notices: Vec<Notice>,
    slot: DownloadSlot,
    fetch_rx: Option<UnboundedReceiver<Result<FetchedVideo, AppError>>>,
    download_rx: Option<UnboundedReceiver<DownloadEvent>>,
    thumbnail_rx: Option<UnboundedReceiver<ColorImage>>,
    deps_rx: Option<UnboundedReceiver<Vec<DependencyReport>>>,
}

impl DownloaderApp {
    fn new(config: Config, runtime: Handle, ctx: &egui::Context) -> Self {
        let (tx, rx) = unbounded_channel();
        {
            let config = config.clone();
            let ctx = ctx.clone();
            runtime.spawn(async move {
                let reports = ensure_dependencies(&config).await;
                let _ = tx.send(reports);
                ctx.request_repaint();
            });
        }

        Self {
            config,
            runtime,
            url_input: String::new(),
            fetched_url: String::new(),
            pending_url: String::new(),
            video_title: String::new(),
            quality_options: Vec::new(),
            selected_quality: None,
            thumbnail: None,
            status: AppStatus::Ready,
            status_text: "Checking dependencies...".to_string(),
            progress: 0.0,
            notices: Vec::new(),
            slot: DownloadSlot::default(),
            fetch_rx: None,
            download_rx: None,
            thumbnail_rx: None,
            deps_rx: Some(rx),
        }
    }

    fn fetch_qualities(&mut self, ctx: &egui::Context) {
        let url = match validate_url(&self.url_input) {
            Ok(url) => url.to_string(),
            Err(e) => {
                self.notices.push(Notice::from_error(&e));
                return;
            }
        };

        self.status = AppStatus::FetchingInfo;
        self.status_text = "Fetching available qualities...".to_string();
        if !self.slot.is_busy() {
            self.progress = 0.0;
        }
        self.pending_url = url.clone();

        // Replacing the receiver drops the result of any earlier fetch
        let (tx, rx) = unbounded_channel();
        self.fetch_rx = Some(rx);
        let config = self.config.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = downloader::fetch_qualities(&config, &url).await;
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }

    fn on_fetched(&mut self, result: Result<FetchedVideo, AppError>, ctx: &egui::Context) {
        match result {
            Ok(video) => {
                self.status = AppStatus::Ready;
                self.status_text = format!(
                    "✅ Found {} qualities for: {}",
                    video.options.len(),
                    short_title(&video.title)
                );
                self.quality_options = video.options;
                // Best quality first
                self.selected_quality = Some(0);
                self.video_title = video.title;
                self.fetched_url = std::mem::take(&mut self.pending_url);
                self.thumbnail = None;
                self.thumbnail_rx = None;
                if let Some(url) = video.thumbnail.filter(|_| self.config.fetch_thumbnails) {
                    self.load_thumbnail(url, ctx);
                }
            }
            Err(e) => {
                self.status = if e.is_warning() { AppStatus::Ready } else { AppStatus::Failed };
                self.status_text = match &e {
                    AppError::FetchFailed(_) => "Error fetching qualities",
                    AppError::ParseFailed(_) => "Error parsing data",
                    AppError::NoQualitiesFound => "No qualities found",
                    _ => "Error occurred",
                }
                .to_string();
                self.notices.push(Notice::from_error(&e));
            }
        }
    }

    fn load_thumbnail(&mut self, url: String, ctx: &egui::Context) {
        let (tx, rx) = unbounded_channel();
        self.thumbnail_rx = Some(rx);
        let ctx = ctx.clone();
        // Spawn thumbnail fetch in blocking task
        self.runtime.spawn_blocking(move || match thumbnail::fetch_thumbnail(&url) {
            Ok(img) => {
                let _ = tx.send(img);
                ctx.request_repaint();
            }
            Err(e) => warn!("thumbnail unavailable: {e:#}"),
        });
    }

    fn download(&mut self) {
        let Some(option) = self.selected_quality.and_then(|i| self.quality_options.get(i)).cloned() else {
            self.notices.push(Notice {
                kind: NoticeKind::Warning,
                title: "Warning",
                message: "Please select a quality and enter URL!".to_string(),
            });
            return;
        };

        let guard = match self.slot.try_acquire() {
            Ok(guard) => guard,
            Err(e) => {
                self.notices.push(Notice { kind: NoticeKind::Info, title: "Info", message: e.to_string() });
                return;
            }
        };

        // Snapshot so a later fetch cannot change what is being downloaded
        let request = DownloadRequest {
            url: self.fetched_url.clone(),
            title: self.video_title.clone(),
            label: option.label.clone(),
            selection: option.selection.clone(),
            output_dir: self.config.output_dir.clone(),
            merge_output_format: self.config.merge_output_format.clone(),
        };
        info!(url = %request.url, quality = %request.label, "download requested");

        self.status = AppStatus::Downloading;
        self.status_text = "Starting download...".to_string();
        self.progress = 0.0;

        let (tx, rx) = unbounded_channel();
        self.download_rx = Some(rx);
        self.runtime.spawn(spawn_download(self.config.clone(), request, guard, tx));
    }

    fn on_download_event(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Progress(p) => match p.phase {
                ProgressPhase::Downloading => {
                    if let Some(percent) = p.percent {
                        self.status = AppStatus::Downloading;
                        self.progress = percent;
                        self.status_text = format!("Downloading... {percent:.1}%");
                    }
                }
                ProgressPhase::Merging => {
                    self.status = AppStatus::Merging;
                    self.status_text = "Merging video and audio...".to_string();
                }
                ProgressPhase::Unknown => {}
            },
            DownloadEvent::Finished(Ok(folder)) => {
                self.status = AppStatus::Done;
                self.progress = 100.0;
                self.status_text = "✅ Download completed successfully!".to_string();
                self.notices.push(Notice {
                    kind: NoticeKind::Info,
                    title: "Success",
                    message: format!("Video downloaded successfully!\nSaved to: {}", folder.display()),
                });
            }
            DownloadEvent::Finished(Err(e)) => {
                self.status = AppStatus::Failed;
                self.status_text = match &e {
                    AppError::DownloadFailed(_) => "❌ Download failed",
                    _ => "❌ Download error",
                }
                .to_string();
                self.notices.push(Notice::from_error(&e));
            }
        }
    }

    fn on_dependencies(&mut self, reports: Vec<DependencyReport>) {
        for report in &reports {
            if let Some(message) = report.notice() {
                let (kind, title) = match report.status {
                    DependencyStatus::Installed => (NoticeKind::Info, "Success"),
                    _ => (NoticeKind::Warning, "Dependency Missing"),
                };
                self.notices.push(Notice { kind, title, message });
            }
        }
        if self.status == AppStatus::Ready && self.fetch_rx.is_none() {
            self.status_text = "Ready".to_string();
        }
    }

    /// Drains every background channel; the only place background results touch UI state
    fn poll_background(&mut self, ctx: &egui::Context) {
        if let Some(received) = self.deps_rx.as_mut().map(|rx| rx.try_recv()) {
            match received {
                Ok(reports) => {
                    self.deps_rx = None;
                    self.on_dependencies(reports);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.deps_rx = None,
            }
        }

        if let Some(received) = self.fetch_rx.as_mut().map(|rx| rx.try_recv()) {
            match received {
                Ok(result) => {
                    self.fetch_rx = None;
                    self.on_fetched(result, ctx);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.fetch_rx = None,
            }
        }

        if let Some(received) = self.thumbnail_rx.as_mut().map(|rx| rx.try_recv()) {
            match received {
                Ok(img) => {
                    self.thumbnail_rx = None;
                    self.thumbnail = Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.thumbnail_rx = None,
            }
        }

        while let Some(received) = self.download_rx.as_mut().map(|rx| rx.try_recv()) {
            match received {
                Ok(event) => self.on_download_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.download_rx = None,
            }
        }
    }

    fn busy(&self) -> bool {
        self.fetch_rx.is_some() || self.download_rx.is_some() || self.deps_rx.is_some()
    }

    fn browse_output_folder(&mut self) {
        let Some(folder) = FileDialog::new().set_directory(&self.config.output_dir).pick_folder() else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(&folder) {
            warn!(folder = %folder.display(), error = %e, "cannot use output folder");
            return;
        }
        self.config.output_dir = folder;
        if let Err(e) = self.config.save() {
            warn!("settings not saved: {e:#}");
        }
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.notices.first() else { return };
        let color = match notice.kind {
            NoticeKind::Info => Color32::WHITE,
            NoticeKind::Warning => Color32::YELLOW,
            NoticeKind::Error => Color32::LIGHT_RED,
        };
        let mut close = false;
        egui::Window::new(notice.title)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(&notice.message).color(color));
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    close = true;
                }
            });
        if close {
            self.notices.remove(0);
        }
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for DownloaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_background(ctx);

        let mut fetch_clicked = false;
        let mut download_clicked = false;
        let mut browse_clicked = false;
        let mut open_clicked = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("🎥 Universal Video Downloader").size(24.0).strong().color(ACCENT));
            });
            ui.add_space(24.0);

            // URL input with Get Qualities button; Enter also fetches
            ui.label(RichText::new("📎 Video URL:").size(14.0));
            ui.horizontal(|ui| {
                let button_width = 130.0;
                let response = ui.add_sized(
                    [ui.available_width() - button_width - 10.0, 30.0],
                    egui::TextEdit::singleline(&mut self.url_input).hint_text("https://..."),
                );
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    fetch_clicked = true;
                }
                let fetch = egui::Button::new(RichText::new("Get Qualities").strong().color(Color32::WHITE))
                    .fill(ACCENT)
                    .min_size(egui::vec2(button_width, 30.0));
                if ui.add_enabled(self.fetch_rx.is_none(), fetch).clicked() {
                    fetch_clicked = true;
                }
            });
            ui.add_space(16.0);

            // Quality dropdown
            ui.label(RichText::new("📊 Select Quality:").size(14.0));
            let selected_text = self
                .selected_quality
                .and_then(|i| self.quality_options.get(i))
                .map_or_else(String::new, |o| o.label.clone());
            egui::ComboBox::from_id_source("quality")
                .selected_text(selected_text)
                .width(ui.available_width())
                .show_ui(ui, |ui| {
                    for (i, option) in self.quality_options.iter().enumerate() {
                        ui.selectable_value(&mut self.selected_quality, Some(i), option.label.as_str());
                    }
                });
            ui.add_space(16.0);

            if !self.video_title.is_empty() {
                ui.horizontal(|ui| {
                    if let Some(tex) = &self.thumbnail {
                        ui.add(egui::Image::new(tex).max_width(160.0));
                    }
                    ui.label(RichText::new(&self.video_title).strong());
                });
                ui.add_space(16.0);
            }

            // Download button logic
            let download = egui::Button::new(RichText::new("⬇️ Download Video").size(16.0).strong().color(Color32::WHITE))
                .fill(SUCCESS)
                .min_size(egui::vec2(ui.available_width(), 40.0));
            if ui.add_enabled(!self.quality_options.is_empty(), download).clicked() {
                download_clicked = true;
            }
            ui.add_space(16.0);

            ui.add(egui::ProgressBar::new(self.progress / 100.0).show_percentage());
            ui.add_space(6.0);
            ui.label(self.status_text.as_str());

            ui.with_layout(egui::Layout::bottom_up(egui::Align::Center), |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(format!(
                            "💾 Downloads will be saved to '{}'",
                            self.config.output_dir.display()
                        ))
                        .size(11.0)
                        .color(MUTED),
                    );
                    if ui.small_button("Browse…").clicked() {
                        browse_clicked = true;
                    }
                    if ui.small_button("Open Folder").clicked() {
                        open_clicked = true;
                    }
                });
            });
        });

        if fetch_clicked {
            self.fetch_qualities(ctx);
        }
        if download_clicked {
            self.download();
        }
        if browse_clicked {
            self.browse_output_folder();
        }
        if open_clicked {
            open_folder(&self.config.output_dir);
        }

        self.show_notice(ctx);

        // Request periodic repaint while background work is running
        if self.busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn short_title(title: &str) -> String {
    if title.chars().count() > 50 {
        format!("{}...", title.chars().take(50).collect::<String>())
    } else {
        title.to_string()
    }
}

fn open_folder(folder: &Path) {
    let folder = folder.to_path_buf();
    std::thread::spawn(move || {
        #[cfg(target_os = "windows")]
        let opener = "explorer";
        #[cfg(target_os = "macos")]
        let opener = "open";
        #[cfg(all(unix, not(target_os = "macos")))]
        let opener = "xdg-open";
        if let Err(e) = std::process::Command::new(opener).arg(&folder).spawn() {
            warn!(folder = %folder.display(), error = %e, "cannot open folder");
        }
    });
}
