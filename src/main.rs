mod screens;

use eframe::egui;
use screens::board::{BoardAction, BoardScreen};
use screens::load_data::{LoadDataAction, LoadDataState};
use std::fs;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

enum SpotboardState {
    LoadData,
    Board,
}

struct SpotboardApp {
    state: SpotboardState,
    load_data: LoadDataState,
    board: Option<BoardScreen>,
}

impl Default for SpotboardApp {
    fn default() -> Self {
        Self {
            state: SpotboardState::LoadData,
            load_data: LoadDataState::default(),
            board: None,
        }
    }
}

impl eframe::App for SpotboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            match self.state {
                SpotboardState::LoadData => {
                    ui.vertical_centered(|ui| {
                        if let LoadDataAction::Continue = screens::load_data::ui(ui, &mut self.load_data)
                        {
                            if let Some(session) = self.load_data.take_session() {
                                self.board = Some(BoardScreen::new(session));
                                info!("Transition: LoadData -> Board");
                                self.state = SpotboardState::Board;
                            } else {
                                warn!("Cannot continue: no snapshot loaded yet");
                            }
                        }
                    });
                }
                SpotboardState::Board => {
                    if let Some(board) = self.board.as_mut() {
                        match screens::board::ui(ui, ctx, board) {
                            BoardAction::Stay => {}
                        }
                    } else {
                        ui.colored_label(
                            egui::Color32::RED,
                            "Contest data missing. Go back to Load Data.",
                        );
                    }
                }
            }
        });
    }
}

fn init_tracing() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true);

    let _ = fs::create_dir_all("logs");
    let file_appender = tracing_appender::rolling::daily("logs", "spotboard.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_target(true);

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = init_result {
        eprintln!("tracing init failed: {err}");
        return None;
    }

    Some(file_guard)
}

fn main() -> eframe::Result<()> {
    let _log_guard = init_tracing();
    info!("Starting Spotboard");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Spotboard",
        options,
        Box::new(|cc| {
            let mut style = (*cc.egui_ctx.style()).clone();
            style
                .text_styles
                .insert(egui::TextStyle::Heading, egui::FontId::proportional(34.0));
            style
                .text_styles
                .insert(egui::TextStyle::Body, egui::FontId::proportional(20.0));
            style
                .text_styles
                .insert(egui::TextStyle::Button, egui::FontId::proportional(20.0));
            style.spacing.button_padding = egui::vec2(14.0, 9.0);
            cc.egui_ctx.set_style(style);

            Ok(Box::new(SpotboardApp::default()))
        }),
    )
}
