//! Native GUI viewer using egui
//!
//! Perspective projection of the tree into an egui_plot canvas, a clickable
//! mode legend, a simulated hand standing in for the webcam and the photo
//! caption dialog.

use std::time::Instant;

use eframe::egui;
use egui_plot::{MarkerShape, PlotPoint, PlotPoints, Points, Text};
use glam::{Mat4, Vec3};
use tracing::{info, warn};

use gesture_tree::config::Settings;
use gesture_tree::experience::Experience;
use gesture_tree::gesture::{Gesture, GestureInput, HandPipeline, SimulatedHand};
use gesture_tree::mode::{Mode, Transition};
use gesture_tree::photos::{ImageHandle, MAX_CAPTION_CHARS};
use gesture_tree::script::CAMERA_MS;

use crate::render::element_color;

/// Run the native GUI viewer
pub fn run_viewer(settings: Settings) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Gesture Tree"),
        ..Default::default()
    };

    eframe::run_native(
        "Gesture Tree",
        options,
        Box::new(|cc| Ok(Box::new(TreeApp::new(cc, settings)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

struct TreeApp {
    experience: Experience,
    input: GestureInput<SimulatedHand>,
    started: Instant,
    last_frame: Instant,
    last_camera_ms: u64,
    // Hand simulation
    follow_mouse: bool,
    // Photo UI state
    upload_path: String,
    caption_text: String,
    status: String,
    point_size: f32,
}

impl TreeApp {
    fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let pipeline = HandPipeline::new(settings.gesture);
        let now = Instant::now();
        Self {
            experience: Experience::new(settings),
            input: GestureInput::new(SimulatedHand::default(), pipeline),
            started: now,
            last_frame: now,
            last_camera_ms: 0,
            follow_mouse: true,
            upload_path: String::new(),
            caption_text: String::new(),
            status: String::new(),
            point_size: 1.5,
        }
    }

    /// Camera loop: classify the simulated hand at roughly camera rate
    fn camera_step(&mut self) {
        let now_ms = self.started.elapsed().as_millis() as u64;
        if now_ms < self.last_camera_ms + CAMERA_MS {
            return;
        }
        self.last_camera_ms = now_ms;

        let pose = self.input.poll();
        if let Transition::Accepted { to, .. } = self.experience.on_pose(pose, now_ms) {
            self.status = format!("{} via {}", to.label(), pose.gesture.label());
        }
    }

    /// Render loop step
    fn frame_step(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;
        self.experience.tick(dt);
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        ctx.input(|i| {
            let hand = self.input.source_mut();
            let keys = [
                (egui::Key::F, Gesture::Fist),
                (egui::Key::O, Gesture::OpenPalm),
                (egui::Key::P, Gesture::Pinch),
                (egui::Key::Y, Gesture::Yeah),
                (egui::Key::N, Gesture::None),
            ];
            for (key, gesture) in keys {
                if i.key_pressed(key) {
                    hand.gesture = gesture;
                    hand.present = true;
                }
            }
            if i.key_pressed(egui::Key::H) {
                hand.present = !hand.present;
            }
            if i.key_down(egui::Key::ArrowLeft) {
                hand.center.0 = (hand.center.0 + 0.01).min(1.0);
            }
            if i.key_down(egui::Key::ArrowRight) {
                hand.center.0 = (hand.center.0 - 0.01).max(0.0);
            }
            if i.key_down(egui::Key::Plus) {
                hand.hand_size = (hand.hand_size + 0.005).min(0.6);
            }
            if i.key_down(egui::Key::Minus) {
                hand.hand_size = (hand.hand_size - 0.005).max(0.02);
            }
            if i.raw_scroll_delta.y != 0.0 {
                hand.hand_size = (hand.hand_size + i.raw_scroll_delta.y * 0.0005).clamp(0.02, 0.6);
            }
        });
    }

    fn start_upload(&mut self) {
        let path = self.upload_path.trim().to_string();
        if path.is_empty() {
            return;
        }
        match image::image_dimensions(&path) {
            Ok((w, h)) => match self.experience.upload_photo(ImageHandle::new(path.clone())) {
                Ok(id) => {
                    info!("Uploaded {} ({}x{}) as {}", path, w, h, id);
                    self.caption_text.clear();
                    self.status = format!("Caption {}", path);
                }
                Err(e) => self.status = e.to_string(),
            },
            Err(e) => {
                warn!("Rejected upload {}: {}", path, e);
                self.status = format!("Not an image: {}", e);
            }
        }
    }

    fn caption_dialog(&mut self, ctx: &egui::Context) {
        if !self.experience.gallery().is_editing() {
            return;
        }
        let mut confirm = false;
        let mut cancel = false;
        egui::Window::new("Caption")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Add a caption to this memory");
                let edit = ui.add(
                    egui::TextEdit::singleline(&mut self.caption_text)
                        .char_limit(MAX_CAPTION_CHARS)
                        .hint_text("optional"),
                );
                if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    confirm = true;
                }
                ui.label(format!("{}/{}", self.caption_text.chars().count(), MAX_CAPTION_CHARS));
                ui.horizontal(|ui| {
                    confirm |= ui.button("Confirm").clicked();
                    cancel |= ui.button("Cancel").clicked();
                });
            });

        let result = if confirm {
            self.experience.confirm_caption(&self.caption_text)
        } else if cancel {
            self.experience.cancel_caption()
        } else {
            return;
        };
        if let Err(e) = result {
            warn!("Caption dialog: {}", e);
        }
        self.caption_text.clear();
    }

    /// Perspective projection onto [-1, 1] screen space, None behind the eye
    fn projector(&self) -> impl Fn(Vec3) -> Option<[f64; 2]> {
        let cam = self.experience.camera().pose();
        let view = Mat4::look_at_rh(cam.position, cam.target, Vec3::Y);
        let focal = 1.0 / (cam.fov_degrees.to_radians() / 2.0).tan();
        let scene = Mat4::from_rotation_y(self.experience.scene_yaw());
        let transform = view * scene;
        move |p: Vec3| {
            let v = transform.transform_point3(p);
            if v.z > -0.1 {
                return None;
            }
            Some([(v.x * focal / -v.z) as f64, (v.y * focal / -v.z) as f64])
        }
    }
}

impl eframe::App for TreeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_keys(ctx);
        self.camera_step();
        self.frame_step();

        // Left panel - legend and hand
        egui::SidePanel::left("legend_panel").min_width(230.0).show(ctx, |ui| {
            ui.heading("Modes");
            ui.separator();

            let current = self.experience.mode();
            for mode in Mode::ALL {
                let text = format!("{}  ({})", mode.label(), mode.gesture().label());
                if ui.selectable_label(mode == current, text).clicked() {
                    self.experience.select_mode(mode);
                }
            }

            ui.separator();
            ui.heading("Hand");
            let mut enabled = self.input.is_enabled();
            if ui.checkbox(&mut enabled, "Gesture input").changed() {
                self.input.set_enabled(enabled);
            }
            ui.checkbox(&mut self.follow_mouse, "Follow mouse");
            {
                let hand = self.input.source_mut();
                ui.checkbox(&mut hand.present, "Hand in view");
                egui::ComboBox::from_id_salt("gesture")
                    .selected_text(hand.gesture.label())
                    .show_ui(ui, |ui| {
                        for g in Gesture::ALL {
                            ui.selectable_value(&mut hand.gesture, g, g.label());
                        }
                    });
                ui.add(egui::Slider::new(&mut hand.hand_size, 0.02..=0.6).text("Hand size"));
            }
            ui.label("Keys: F O P Y N gesture | H hand | scroll size");

            ui.separator();
            ui.heading("Memories");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.upload_path);
                if ui.button("Upload").clicked() {
                    self.start_upload();
                }
            });

            let mut to_remove: Option<String> = None;
            egui::ScrollArea::vertical().max_height(200.0).show(ui, |ui| {
                for (i, photo) in self.experience.gallery().photos().iter().enumerate() {
                    ui.horizontal(|ui| {
                        let focused = self.experience.focus() == Some(i);
                        let name = photo.caption.as_deref().unwrap_or(photo.image.as_str());
                        if focused {
                            ui.colored_label(egui::Color32::YELLOW, name);
                        } else {
                            ui.label(name);
                        }
                        if ui.small_button("x").clicked() {
                            to_remove = Some(photo.id.clone());
                        }
                    });
                }
            });
            if let Some(id) = to_remove {
                if let Err(e) = self.experience.remove_photo(&id) {
                    warn!("Remove failed: {}", e);
                }
            }
        });

        // Bottom panel - status
        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            let snap = self.experience.snapshot();
            ui.horizontal(|ui| {
                ui.label(format!("Mode: {}", snap.mode.label()));
                ui.separator();
                let pose = snap.pose;
                if pose.is_detected {
                    ui.label(format!(
                        "Hand: {} at ({:.2}, {:.2}) size {:.2}",
                        pose.gesture.label(),
                        pose.x,
                        pose.y,
                        pose.hand_size
                    ));
                } else {
                    ui.label("Hand: none");
                }
                ui.separator();
                if let Some(g) = snap.groups.first() {
                    ui.label(format!("scatter {:.2} message {:.2}", g.weights.scatter, g.weights.message));
                }
                ui.separator();
                ui.label(format!("zoom {:.1}", snap.camera.distance));
                ui.separator();
                ui.add(egui::Slider::new(&mut self.point_size, 0.5..=4.0).text("Point size"));
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(&self.status);
                }
            });
        });

        self.caption_dialog(ctx);

        // Central panel - 3D view
        egui::CentralPanel::default().show(ctx, |ui| {
            let project = self.projector();
            let time = self.experience.snapshot().time;

            let plot = egui_plot::Plot::new("tree_plot")
                .data_aspect(1.0)
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .show_axes(false)
                .show_grid(false)
                .include_x(-1.0)
                .include_x(1.0)
                .include_y(-1.0)
                .include_y(1.0);

            let response = plot.show(ui, |plot_ui| {
                for group in self.experience.groups() {
                    let uniforms = group.uniforms(time);
                    let points: Vec<[f64; 2]> = group.positions().iter().filter_map(|&p| project(p)).collect();
                    let [r, g, b] = element_color(group.kind(), uniforms.message_weight);
                    plot_ui.points(
                        Points::new(PlotPoints::from(points))
                            .radius(self.point_size)
                            .color(egui::Color32::from_rgb(r, g, b))
                            .name(group.kind().label()),
                    );
                }

                let star = self.experience.star().transform();
                if let Some(p) = project(star.position) {
                    plot_ui.points(
                        Points::new(PlotPoints::from(vec![p]))
                            .shape(MarkerShape::Asterisk)
                            .radius(star.scale * 10.0)
                            .color(egui::Color32::GOLD)
                            .name("Star"),
                    );
                }

                let gallery = self.experience.gallery();
                for photo in gallery.photos().iter().chain(gallery.pending()) {
                    if let Some(p) = project(photo.transform.position) {
                        plot_ui.points(
                            Points::new(PlotPoints::from(vec![p]))
                                .shape(MarkerShape::Square)
                                .radius(photo.transform.scale * 4.0)
                                .color(egui::Color32::WHITE),
                        );
                        if let Some(caption) = &photo.caption {
                            plot_ui.text(Text::new(PlotPoint::new(p[0], p[1] - 0.04), caption.as_str()));
                        }
                    }
                }
            });

            // Mouse position over the view drives the simulated hand
            if self.follow_mouse {
                if let Some(pos) = response.response.hover_pos() {
                    let rect = response.response.rect;
                    let hand = self.input.source_mut();
                    // Mirrored like a selfie camera
                    hand.center.0 = 1.0 - ((pos.x - rect.left()) / rect.width()).clamp(0.0, 1.0);
                    hand.center.1 = ((pos.y - rect.top()) / rect.height()).clamp(0.0, 1.0);
                }
            }
        });
    }
}
