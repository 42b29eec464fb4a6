use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};

use eframe::egui;
use spotboard::models::{ContestOracle, ContestSnapshot};
use spotboard::services::notifier::BoardEvent;
use spotboard::services::palette::{ProblemBadge, Rgb, problem_badges};
use spotboard::services::rank_tier::RankTier;
use spotboard::services::row_sync::RowReorder;
use spotboard::services::rows::{IndicatorState, Row, RowRecord, RowRenderer};
use spotboard::services::scoreboard::{ContestHeader, Scoreboard, contest_header};
use spotboard::services::snapshot_loader::SnapshotEvent;
use tracing::{debug, info, warn};

use crate::screens::load_data::BoardSession;

const ROW_HEIGHT: f32 = 44.0;
const INDICATOR_SIZE: f32 = 18.0;

pub enum BoardAction {
    Stay,
}

#[derive(Clone, Copy)]
struct RowMoveAnim {
    from_index: usize,
    to_index: usize,
    started_at: f64,
    duration_sec: f32,
}

/// Per-row UI state kept alive across refreshes.
pub struct RowView {
    name: String,
    group: String,
    fly: Option<RowMoveAnim>,
}

struct EguiRowRenderer;

impl RowRenderer for EguiRowRenderer {
    type Handle = RowView;

    fn render(&mut self, record: &RowRecord) -> RowView {
        RowView {
            name: record.name.clone(),
            group: record.group.clone(),
            fly: None,
        }
    }
}

pub struct BoardScreen {
    snapshot: ContestSnapshot,
    generation: u64,
    receiver: Receiver<SnapshotEvent>,
    board: Scoreboard<RowView>,
    events: Receiver<BoardEvent>,
    header: ContestHeader,
    palette: Vec<egui::Color32>,
    badges: HashMap<String, ProblemBadge>,
    data_dir: PathBuf,
    balloon_textures: HashMap<PathBuf, Option<egui::TextureHandle>>,
    row_fly_seconds_per_row: f32,
    search_text: String,
    last_error: Option<String>,
    redraws: u64,
}

fn to_color32(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

fn tier_color(tier: RankTier) -> egui::Color32 {
    match tier {
        RankTier::Top => egui::Color32::from_rgb(92, 70, 12),
        RankTier::High => egui::Color32::from_rgb(40, 56, 84),
        RankTier::Mid => egui::Color32::from_gray(32),
        RankTier::Low => egui::Color32::from_gray(16),
    }
}

fn indicator_color(state: IndicatorState) -> egui::Color32 {
    match state {
        IndicatorState::Solved => egui::Color32::from_rgb(49, 201, 80),
        IndicatorState::Pending => egui::Color32::from_rgb(43, 127, 255),
        IndicatorState::Failed => egui::Color32::from_rgb(251, 44, 54),
        IndicatorState::Neutral => egui::Color32::from_rgb(98, 116, 142),
    }
}

fn balloon_color(color_name: Option<&str>) -> egui::Color32 {
    let Some(name) = color_name else {
        return egui::Color32::from_gray(160);
    };
    if let Some(hex) = name.strip_prefix('#')
        && hex.len() == 6
        && let Ok(value) = u32::from_str_radix(hex, 16)
    {
        return egui::Color32::from_rgb((value >> 16) as u8, (value >> 8) as u8, value as u8);
    }
    match name.to_ascii_lowercase().as_str() {
        "red" => egui::Color32::from_rgb(230, 40, 40),
        "orange" => egui::Color32::from_rgb(255, 140, 0),
        "yellow" => egui::Color32::from_rgb(250, 210, 40),
        "green" => egui::Color32::from_rgb(40, 180, 70),
        "blue" => egui::Color32::from_rgb(40, 100, 230),
        "purple" => egui::Color32::from_rgb(140, 60, 200),
        "pink" => egui::Color32::from_rgb(240, 120, 180),
        "white" => egui::Color32::WHITE,
        "black" => egui::Color32::from_gray(20),
        _ => egui::Color32::from_gray(160),
    }
}

fn load_image_texture(
    ctx: &egui::Context,
    texture_id: &str,
    path: &Path,
) -> Option<egui::TextureHandle> {
    let bytes = std::fs::read(path).ok()?;
    let decoded = image::load_from_memory(&bytes).ok()?;
    let rgba = decoded.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
    Some(ctx.load_texture(texture_id.to_string(), image, egui::TextureOptions::LINEAR))
}

fn anim_progress(now: f64, started_at: f64, duration_sec: f32) -> f32 {
    if duration_sec <= 0.0 {
        return 1.0;
    }
    ((now - started_at) / f64::from(duration_sec)).clamp(0.0, 1.0) as f32
}

fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

fn row_move_duration_seconds(from_index: usize, to_index: usize, seconds_per_row: f32) -> f32 {
    let distance_rows = from_index.abs_diff(to_index) as f32;
    (distance_rows * seconds_per_row).max(0.01)
}

/// Vertical offset, in rows, still left for a flying row.
fn fly_offset_rows(view: &RowView, now: f64) -> f32 {
    let Some(anim) = view.fly else {
        return 0.0;
    };
    let progress = ease_out_cubic(anim_progress(now, anim.started_at, anim.duration_sec));
    (anim.from_index as f32 - anim.to_index as f32) * (1.0 - progress)
}

fn ranked_ids(snapshot: &ContestSnapshot) -> HashSet<&str> {
    snapshot
        .ranked_team_statuses()
        .iter()
        .filter(|status| {
            snapshot
                .team(&status.team_id)
                .is_some_and(|team| !snapshot.is_team_excluded(team))
        })
        .map(|status| status.team_id.as_str())
        .collect()
}

impl BoardScreen {
    pub fn new(session: BoardSession) -> Self {
        let mut board = Scoreboard::new(&session.config);
        let events = board.subscribe();
        let mut screen = Self {
            header: contest_header(
                &session.snapshot,
                option_env!("CARGO_PKG_VERSION"),
                if cfg!(debug_assertions) {
                    "develop"
                } else {
                    "production"
                },
            ),
            badges: HashMap::new(),
            data_dir: session.data_dir,
            balloon_textures: HashMap::new(),
            palette: Vec::new(),
            snapshot: session.snapshot,
            generation: session.generation,
            receiver: session.receiver,
            board,
            events,
            row_fly_seconds_per_row: session.config.presentation.row_fly_animation_seconds,
            search_text: String::new(),
            last_error: None,
            redraws: 0,
        };
        screen.redraw();
        screen
    }

    fn redraw(&mut self) {
        self.board
            .draw_scoreboard(&self.snapshot, &mut EguiRowRenderer);
        self.restyle();
        info!("Board redrawn for generation {}", self.generation);
    }

    fn restyle(&mut self) {
        self.palette = self.board.palette().into_iter().map(to_color32).collect();
        self.badges = problem_badges(self.snapshot.problems())
            .into_iter()
            .map(|badge| (badge.problem_id.clone(), badge))
            .collect();
    }

    fn needs_rebuild(&self) -> bool {
        let ranked = ranked_ids(&self.snapshot);
        ranked.len() != self.board.rows().len()
            || self
                .board
                .rows()
                .iter()
                .any(|row| !ranked.contains(row.team_id()))
    }

    fn apply_snapshot(&mut self, generation: u64, snapshot: ContestSnapshot, now: f64) {
        self.snapshot = snapshot;
        self.generation = generation;

        if self.needs_rebuild() {
            info!("Team set changed, rebuilding the board");
            self.redraw();
            return;
        }

        if let Some(reorder) = self.board.refresh_visible_slots(&self.snapshot) {
            self.spawn_row_move_animations(&reorder, now);
        }
        self.restyle();
    }

    fn spawn_row_move_animations(&mut self, reorder: &RowReorder, now: f64) {
        if !self.board.flags().animation {
            return;
        }
        for (team_id, from_index, to_index) in reorder.moves() {
            let duration_sec =
                row_move_duration_seconds(from_index, to_index, self.row_fly_seconds_per_row);
            if let Some(row) = self.board.row_mut(team_id) {
                row.handle_mut().fly = Some(RowMoveAnim {
                    from_index,
                    to_index,
                    started_at: now,
                    duration_sec,
                });
            }
        }
    }

    /// Loads balloon images not tried yet; a missing file is remembered as `None`.
    fn load_balloon_textures(&mut self, ctx: &egui::Context) {
        for badge in self.badges.values() {
            let Some(image) = &badge.balloon_image else {
                continue;
            };
            if self.balloon_textures.contains_key(image) {
                continue;
            }
            let path = self.data_dir.join(image);
            let texture = load_image_texture(ctx, &format!("balloon_{}", image.display()), &path);
            if texture.is_none() {
                debug!("No balloon image at {}, drawing a plain balloon", path.display());
            }
            self.balloon_textures.insert(image.clone(), texture);
        }
    }

    fn balloon_texture(&self, problem_id: &str) -> Option<&egui::TextureHandle> {
        let image = self.badges.get(problem_id)?.balloon_image.as_ref()?;
        self.balloon_textures.get(image)?.as_ref()
    }

    fn pump_snapshots(&mut self, now: f64) {
        loop {
            match self.receiver.try_recv() {
                Ok(SnapshotEvent::Loaded {
                    generation,
                    snapshot,
                }) => {
                    self.last_error = None;
                    self.apply_snapshot(generation, *snapshot, now);
                }
                Ok(SnapshotEvent::Failed { message }) => {
                    warn!("Snapshot refresh failed: {message}");
                    self.last_error = Some(message);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.last_error = Some("Snapshot watcher stopped".to_string());
                    break;
                }
            }
        }

        for event in self.events.try_iter() {
            if event == BoardEvent::Drew {
                self.redraws += 1;
            }
            debug!("Board event {:?}", event);
        }
    }

    fn animating(&mut self, now: f64) -> bool {
        let mut active = false;
        let team_ids: Vec<String> = self
            .board
            .rows()
            .iter()
            .filter(|row| row.handle().fly.is_some())
            .map(|row| row.team_id().to_string())
            .collect();
        for team_id in team_ids {
            let Some(row) = self.board.row_mut(&team_id) else {
                continue;
            };
            let view = row.handle_mut();
            if let Some(anim) = view.fly {
                if anim_progress(now, anim.started_at, anim.duration_sec) >= 1.0 {
                    view.fly = None;
                } else {
                    active = true;
                }
            }
        }
        active
    }
}

pub fn ui(ui: &mut egui::Ui, ctx: &egui::Context, screen: &mut BoardScreen) -> BoardAction {
    let now = ctx.input(|input| input.time);
    screen.pump_snapshots(now);
    screen.load_balloon_textures(ctx);

    ui.heading(screen.header.title.as_str());
    ui.horizontal(|ui| {
        ui.label(screen.header.system.as_str());
        if let Some(version) = &screen.header.version {
            ui.weak(version.as_str());
        }
        ui.weak(format!(
            "snapshot #{} | redraws {}",
            screen.generation, screen.redraws
        ));
    });
    if let Some(err) = &screen.last_error {
        ui.colored_label(egui::Color32::LIGHT_RED, err.as_str());
    }
    ui.add_space(6.0);

    ui.horizontal(|ui| {
        ui.label("Search");
        if ui.text_edit_singleline(&mut screen.search_text).changed() {
            let filter = screen.search_text.clone();
            screen.board.set_search_filter(&screen.snapshot, &filter);
        }
        ui.add_space(16.0);
        let prev = ui.button("< Prev").clicked()
            || ctx.input(|input| input.key_pressed(egui::Key::PageUp));
        let next = ui.button("Next >").clicked()
            || ctx.input(|input| input.key_pressed(egui::Key::PageDown));
        let delta = i64::from(next) - i64::from(prev);
        if delta != 0 {
            screen.board.paginate(&screen.snapshot, delta);
        }
        ui.label(format!(
            "Page {} / {}",
            screen.board.current_page() + 1,
            screen.board.page_count()
        ));
    });
    ui.add_space(4.0);

    let show_group = screen.board.flags().show_team_group;
    egui::ScrollArea::vertical()
        .id_salt("scoreboard_rows")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let visible: Vec<&Row<RowView>> = screen.board.visible_rows().collect();
            if visible.is_empty() {
                ui.label("No teams to show.");
                return;
            }

            let (rect, _) = ui.allocate_exact_size(
                egui::vec2(ui.available_width(), visible.len() as f32 * ROW_HEIGHT),
                egui::Sense::hover(),
            );
            for (slot, row) in visible.iter().enumerate() {
                let y = (slot as f32 + fly_offset_rows(row.handle(), now)) * ROW_HEIGHT;
                let row_rect = egui::Rect::from_min_size(
                    egui::pos2(rect.left(), rect.top() + y),
                    egui::vec2(rect.width(), ROW_HEIGHT),
                );
                draw_row(ui, row, row_rect, screen, show_group);
            }
        });

    if screen.animating(now) {
        ctx.request_repaint();
    }

    BoardAction::Stay
}

fn draw_row(
    ui: &egui::Ui,
    row: &Row<RowView>,
    rect: egui::Rect,
    screen: &BoardScreen,
    show_group: bool,
) {
    let painter = ui.painter();
    let font = egui::FontId::proportional(18.0);
    let small = egui::FontId::proportional(13.0);
    painter.rect_filled(rect.shrink(1.0), 0.0, tier_color(row.tier));

    let mid_y = rect.center().y;
    painter.text(
        egui::pos2(rect.left() + 36.0, mid_y),
        egui::Align2::CENTER_CENTER,
        row.rank.to_string(),
        font.clone(),
        egui::Color32::WHITE,
    );

    let badge_rect = egui::Rect::from_center_size(
        egui::pos2(rect.left() + 86.0, mid_y),
        egui::vec2(34.0, ROW_HEIGHT - 8.0),
    );
    let badge_color = screen
        .palette
        .get(row.solved_count)
        .copied()
        .unwrap_or(egui::Color32::from_gray(60));
    painter.rect_filled(badge_rect, 4.0, badge_color);
    if let Some(label) = &row.bucket.label {
        painter.text(
            badge_rect.center(),
            egui::Align2::CENTER_CENTER,
            label,
            font.clone(),
            egui::Color32::WHITE,
        );
    }
    if row.bucket.last {
        painter.line_segment(
            [rect.left_bottom(), rect.right_bottom()],
            egui::Stroke::new(2.0, badge_color),
        );
    }

    let view = row.handle();
    let name_pos = egui::pos2(rect.left() + 116.0, mid_y);
    painter.text(
        name_pos,
        egui::Align2::LEFT_BOTTOM,
        &view.name,
        font.clone(),
        egui::Color32::WHITE,
    );
    if show_group && !view.group.is_empty() {
        painter.text(
            name_pos,
            egui::Align2::LEFT_TOP,
            &view.group,
            small.clone(),
            egui::Color32::from_gray(170),
        );
    }

    let mut x = rect.left() + rect.width() * 0.42;
    for indicator in &row.indicators {
        let cell = egui::Rect::from_center_size(
            egui::pos2(x, mid_y),
            egui::vec2(INDICATOR_SIZE, INDICATOR_SIZE),
        );
        painter.rect_filled(cell, 3.0, indicator_color(indicator.state));
        if let Some(badge) = screen.badges.get(&indicator.problem_id) {
            ui.interact(
                cell,
                ui.id().with((row.team_id(), &indicator.problem_id)),
                egui::Sense::hover(),
            )
            .on_hover_text(badge.label.as_str());
        }
        x += INDICATOR_SIZE + 4.0;
    }
    x += 10.0;
    for indicator in &row.opt_indicators {
        let cell = egui::Rect::from_center_size(
            egui::pos2(x, mid_y),
            egui::vec2(INDICATOR_SIZE, INDICATOR_SIZE),
        );
        let color = if indicator.has_score {
            egui::Color32::from_rgb(250, 190, 40)
        } else {
            indicator_color(IndicatorState::Neutral)
        };
        painter.circle_filled(cell.center(), INDICATOR_SIZE * 0.5, color);
        x += INDICATOR_SIZE + 4.0;
    }

    x += 10.0;
    for balloon in &row.balloons {
        let color_name = screen
            .snapshot
            .problem(&balloon.problem_id)
            .and_then(|problem| problem.color.as_deref());
        let center = egui::pos2(x, mid_y);
        if let Some(texture) = screen.balloon_texture(&balloon.problem_id) {
            painter.image(
                texture.id(),
                egui::Rect::from_center_size(center, egui::vec2(14.0, 18.0)),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        } else {
            painter.circle_filled(center, 7.0, balloon_color(color_name));
        }
        ui.interact(
            egui::Rect::from_center_size(center, egui::vec2(14.0, 14.0)),
            ui.id().with((row.team_id(), "balloon", &balloon.problem_id)),
            egui::Sense::hover(),
        )
        .on_hover_text(balloon.tooltip.as_str());
        x += 16.0;
    }

    let score_x = rect.right() - 200.0;
    for (offset, text) in [
        (0.0, format!("{}", row.cp_score)),
        (70.0, format!("{}", row.opt_score)),
        (140.0, format!("{}", row.time)),
    ] {
        painter.text(
            egui::pos2(score_x + offset, mid_y),
            egui::Align2::CENTER_CENTER,
            text,
            font.clone(),
            egui::Color32::WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balloon_colors_accept_hex_and_names() {
        assert_eq!(
            balloon_color(Some("#102030")),
            egui::Color32::from_rgb(0x10, 0x20, 0x30)
        );
        assert_eq!(balloon_color(Some("Red")), egui::Color32::from_rgb(230, 40, 40));
        assert_eq!(balloon_color(None), egui::Color32::from_gray(160));
    }

    #[test]
    fn fly_offset_shrinks_to_zero() {
        let mut view = RowView {
            name: String::new(),
            group: String::new(),
            fly: Some(RowMoveAnim {
                from_index: 4,
                to_index: 1,
                started_at: 10.0,
                duration_sec: 1.0,
            }),
        };
        assert_eq!(fly_offset_rows(&view, 10.0), 3.0);
        assert_eq!(fly_offset_rows(&view, 11.5), 0.0);
        view.fly = None;
        assert_eq!(fly_offset_rows(&view, 10.0), 0.0);
    }

    #[test]
    fn missing_balloon_image_loads_nothing() {
        let ctx = egui::Context::default();
        let dir = tempfile::tempdir().unwrap();
        assert!(load_image_texture(&ctx, "balloon_red", &dir.path().join("red.png")).is_none());

        let broken = dir.path().join("blue.png");
        std::fs::write(&broken, b"not a png").unwrap();
        assert!(load_image_texture(&ctx, "balloon_blue", &broken).is_none());
    }

    #[test]
    fn balloon_image_becomes_a_texture() {
        let ctx = egui::Context::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbaImage::from_pixel(2, 3, image::Rgba([230, 40, 40, 255]))
            .save(&path)
            .unwrap();

        let texture = load_image_texture(&ctx, "balloon_red", &path).unwrap();
        assert_eq!(texture.size(), [2, 3]);
    }

    #[test]
    fn move_duration_scales_with_distance() {
        assert_eq!(row_move_duration_seconds(5, 1, 0.5), 2.0);
        assert_eq!(row_move_duration_seconds(3, 3, 0.5), 0.01);
    }
}
