use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use eframe::egui;
use rfd::FileDialog;
use spotboard::models::{ContestOracle, ContestSnapshot};
use spotboard::services::config_loader::{self, BoardConfig, CONFIG_FILE_NAME};
use spotboard::services::snapshot_loader::{SNAPSHOT_FILE_NAME, SnapshotEvent, spawn_snapshot_watcher};
use tracing::info;

pub enum LoadDataAction {
    Stay,
    Continue,
}

/// Everything the board screen needs once the first snapshot arrived.
pub struct BoardSession {
    pub data_dir: PathBuf,
    pub config: BoardConfig,
    pub snapshot: ContestSnapshot,
    pub generation: u64,
    pub receiver: Receiver<SnapshotEvent>,
}

#[derive(Default)]
pub struct LoadDataState {
    data_path: String,
    loaded_path: Option<String>,
    config: Option<BoardConfig>,
    receiver: Option<Receiver<SnapshotEvent>>,
    first_snapshot: Option<(u64, ContestSnapshot)>,
    errors: Vec<String>,
}

impl LoadDataState {
    /// Hands the loaded data over; `None` until a snapshot arrived.
    pub fn take_session(&mut self) -> Option<BoardSession> {
        let (generation, snapshot) = self.first_snapshot.take()?;
        let config = self.config.take()?;
        let receiver = self.receiver.take()?;
        let data_dir = PathBuf::from(self.loaded_path.clone()?);
        Some(BoardSession {
            data_dir,
            config,
            snapshot,
            generation,
            receiver,
        })
    }

    fn reset(&mut self) {
        self.loaded_path = None;
        self.config = None;
        self.receiver = None;
        self.first_snapshot = None;
        self.errors.clear();
    }

    fn is_waiting(&self) -> bool {
        self.receiver.is_some() && self.first_snapshot.is_none()
    }

    fn pump_events(&mut self) {
        let Some(rx) = &self.receiver else {
            return;
        };

        loop {
            match rx.try_recv() {
                Ok(SnapshotEvent::Loaded {
                    generation,
                    snapshot,
                }) => {
                    info!("First snapshot received (generation {})", generation);
                    self.first_snapshot = Some((generation, *snapshot));
                    self.errors.clear();
                    break;
                }
                Ok(SnapshotEvent::Failed { message }) => {
                    self.errors.push(message);
                    if self.errors.len() > 8 {
                        self.errors.remove(0);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.errors.push("Snapshot watcher stopped".to_string());
                    self.receiver = None;
                    break;
                }
            }
        }
    }
}

fn validate_data_folder(folder_path: &str) -> Result<PathBuf, Vec<String>> {
    let mut errors = Vec::new();
    let folder = Path::new(folder_path);

    if !folder.is_dir() {
        errors.push(format!("Not a folder: {}", folder.display()));
        return Err(errors);
    }

    let snapshot = folder.join(SNAPSHOT_FILE_NAME);
    if !snapshot.is_file() {
        errors.push(format!("Missing required file: {}", snapshot.display()));
    }

    let config_toml = folder.join(CONFIG_FILE_NAME);
    if config_toml.exists() && !config_toml.is_file() {
        errors.push(format!(
            "config.toml exists but is not a file: {}",
            config_toml.display()
        ));
    }

    if errors.is_empty() {
        Ok(snapshot)
    } else {
        Err(errors)
    }
}

pub fn ui(ui: &mut egui::Ui, state: &mut LoadDataState) -> LoadDataAction {
    ui.heading("Spotboard");
    ui.add_space(8.0);
    ui.label("Select the contest data folder");
    ui.add_space(12.0);

    let response = ui.add_sized(
        [900.0, 28.0],
        egui::TextEdit::singleline(&mut state.data_path).hint_text("Enter data folder path..."),
    );
    if response.changed() && state.loaded_path.as_deref() != Some(state.data_path.trim()) {
        state.reset();
    }
    ui.add_space(8.0);

    if ui.button("Choose folder").clicked()
        && let Some(path) = FileDialog::new().set_directory(".").pick_folder()
    {
        state.data_path = path.display().to_string();
        state.reset();
    }

    state.pump_events();
    if state.is_waiting() {
        ui.ctx().request_repaint();
    }

    ui.add_space(8.0);
    let folder_path = state.data_path.trim().to_string();
    let can_load = !folder_path.is_empty() && state.receiver.is_none();
    if ui
        .add_enabled(can_load, egui::Button::new("Load"))
        .clicked()
    {
        state.reset();
        state.loaded_path = Some(folder_path.clone());
        match validate_data_folder(&folder_path) {
            Ok(snapshot_path) => match config_loader::load_board_config(Path::new(&folder_path)) {
                Ok(config) => {
                    let interval =
                        Duration::from_secs(config.presentation.refresh_interval_seconds.max(1));
                    state.receiver = Some(spawn_snapshot_watcher(snapshot_path, interval));
                    state.config = Some(config);
                    ui.ctx().request_repaint();
                }
                Err(err) => state.errors = vec![format!("{err:#}")],
            },
            Err(validation_errors) => state.errors = validation_errors,
        }
    }

    ui.add_space(8.0);
    if state.is_waiting() {
        ui.horizontal(|ui| {
            ui.add(egui::Spinner::new());
            ui.label("Waiting for the first snapshot...");
        });
    } else if let Some((generation, snapshot)) = &state.first_snapshot {
        ui.colored_label(
            egui::Color32::LIGHT_GREEN,
            format!(
                "Loaded '{}' (generation {generation})",
                snapshot.contest().title
            ),
        );
    }

    if !state.errors.is_empty() {
        ui.add_space(8.0);
        egui::Frame::group(ui.style())
            .fill(egui::Color32::from_rgb(58, 22, 22))
            .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(180, 60, 60)))
            .show(ui, |ui| {
                ui.label(egui::RichText::new("Load Errors").strong());
                for err in &state.errors {
                    ui.colored_label(egui::Color32::from_rgb(255, 170, 170), err);
                }
            });
    }

    ui.add_space(8.0);
    if ui
        .add_enabled(state.first_snapshot.is_some(), egui::Button::new("Continue"))
        .clicked()
    {
        return LoadDataAction::Continue;
    }

    LoadDataAction::Stay
}
