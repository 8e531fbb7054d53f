#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(not(target_os = "windows"))]
fn main() {
    eprintln!("pathedit edits the Windows registry and only runs on Windows.");
}

#[cfg(target_os = "windows")]
mod app {
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::process;
    use std::rc::Rc;

    use eframe::egui::{self, Color32, RichText, ScrollArea, TextEdit};
    use pathedit::logging::init_tracing;
    use pathedit::registry::{is_admin, restart_as_admin};
    use pathedit::{
        Error, Field, PathEntry, PathList, PathReader, PathScope, ProcessEnv, RegistryStore,
        Settings, SharedEnv,
    };
    use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
    use tracing::{error, info};

    const MISSING_COLOR: Color32 = Color32::from_rgb(232, 120, 96);
    const DISABLED_COLOR: Color32 = Color32::from_gray(120);

    pub fn run() -> eframe::Result<()> {
        let (settings, settings_error) = match Settings::load(&ProcessEnv) {
            Ok(settings) => (settings, None),
            Err(err) => (Settings::default(), Some(err)),
        };
        init_tracing(&settings.log_filter);
        if let Some(err) = settings_error {
            error!(error = %err, "using default settings");
        }
        info!(dry_run = settings.dry_run, "starting PATH editor");

        let native_options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default().with_inner_size([1220.0, 780.0]),
            ..Default::default()
        };

        eframe::run_native(
            "PATH Editor",
            native_options,
            Box::new(move |cc| Box::new(PathEditorApp::new(cc, &settings))),
        )
    }

    /// One scope's list plus its view state.
    struct Panel {
        list: PathList,
        filter: String,
        selected: BTreeSet<usize>,
        load_error: Option<String>,
        editing: Option<RowEdit>,
        dirty: Rc<Cell<bool>>,
    }

    /// In-place edit of one row's path text.
    struct RowEdit {
        idx: usize,
        text: String,
        focus: bool,
    }

    impl Panel {
        fn load(reader: &PathReader<RegistryStore>, scope: PathScope, env: &SharedEnv) -> Self {
            let (mut list, load_error) = match reader.load(scope, env.clone()) {
                Ok(list) => (list, None),
                Err(err) => (PathList::new(scope, env.clone()), Some(err.to_string())),
            };
            let dirty = Rc::new(Cell::new(false));
            list.subscribe_all(mark_dirty(&dirty));
            Self {
                list,
                filter: String::new(),
                selected: BTreeSet::new(),
                load_error,
                editing: None,
                dirty,
            }
        }

        fn push(&mut self, path: &str) -> bool {
            if !self.list.push(path) {
                return false;
            }
            let listener = mark_dirty(&self.dirty);
            if let Some(entry) = self.list.get_mut(self.list.len() - 1) {
                entry.subscribe(listener);
            }
            self.dirty.set(true);
            true
        }

        fn title(&self) -> &'static str {
            match self.list.scope() {
                PathScope::User => "User PATH (HKCU)",
                PathScope::System => "System PATH (HKLM)",
            }
        }

        fn filtering(&self) -> bool {
            !self.filter.trim().is_empty()
        }
    }

    #[derive(Default)]
    struct AddDialog {
        scope: Option<PathScope>,
        input: String,
    }

    #[derive(Clone, Copy)]
    enum Action {
        Add,
        Browse,
        Remove,
        MoveUp,
        MoveDown,
        Dedupe,
        Sort,
        Expanded,
        Recheck,
        Reload,
        Save,
    }

    struct PathEditorApp {
        env: SharedEnv,
        reader: PathReader<RegistryStore>,
        user: Panel,
        system: Panel,
        status: String,
        is_admin: bool,
        add_dialog: AddDialog,
        expanded_scope: Option<PathScope>,
    }

    impl PathEditorApp {
        fn new(cc: &eframe::CreationContext<'_>, settings: &Settings) -> Self {
            apply_style(&cc.egui_ctx);

            let env = ProcessEnv::shared();
            let reader = PathReader::new(RegistryStore, settings.dry_run);
            let user = Panel::load(&reader, PathScope::User, &env);
            let system = Panel::load(&reader, PathScope::System, &env);

            Self {
                env,
                reader,
                user,
                system,
                status: "Ready".to_string(),
                is_admin: is_admin(),
                add_dialog: AddDialog::default(),
                expanded_scope: None,
            }
        }

        fn panel(&self, scope: PathScope) -> &Panel {
            match scope {
                PathScope::User => &self.user,
                PathScope::System => &self.system,
            }
        }

        fn panel_mut(&mut self, scope: PathScope) -> &mut Panel {
            match scope {
                PathScope::User => &mut self.user,
                PathScope::System => &mut self.system,
            }
        }

        fn apply(&mut self, scope: PathScope, action: Action) {
            match action {
                Action::Add => {
                    self.add_dialog.scope = Some(scope);
                    self.add_dialog.input.clear();
                }
                Action::Browse => {
                    if let Some(folder) = FileDialog::new().pick_folder() {
                        self.panel_mut(scope).push(&folder.display().to_string());
                        self.status = format!("Added folder to {}", panel_title(scope));
                    }
                }
                Action::Remove => {
                    let panel = self.panel_mut(scope);
                    let removed = panel.list.remove(&panel.selected);
                    panel.selected.clear();
                    panel.editing = None;
                    panel.dirty.set(panel.dirty.get() || removed > 0);
                    self.status = format!("Removed {removed} entry/entries from {}", panel_title(scope));
                }
                Action::MoveUp | Action::MoveDown => self.move_selected(scope, action),
                Action::Dedupe => {
                    let panel = self.panel_mut(scope);
                    let removed = panel.list.dedupe();
                    panel.selected.clear();
                    panel.editing = None;
                    panel.dirty.set(panel.dirty.get() || removed > 0);
                    self.status = format!("Dedupe removed {removed} entries from {}", panel_title(scope));
                }
                Action::Sort => {
                    let panel = self.panel_mut(scope);
                    panel.list.sort();
                    panel.selected.clear();
                    panel.editing = None;
                    panel.dirty.set(true);
                    self.status = format!("Sorted {}", panel_title(scope));
                }
                Action::Expanded => self.expanded_scope = Some(scope),
                Action::Recheck => {
                    let changed = self.panel_mut(scope).list.refresh_existence();
                    self.status = format!("Re-checked {}: {changed} changed", panel_title(scope));
                }
                Action::Reload => {
                    let panel = Panel::load(&self.reader, scope, &self.env);
                    *self.panel_mut(scope) = panel;
                    self.status = format!("Reloaded {}", panel_title(scope));
                }
                Action::Save => {
                    self.save(scope);
                }
            }
        }

        fn move_selected(&mut self, scope: PathScope, action: Action) {
            let panel = self.panel_mut(scope);
            if panel.filtering() {
                MessageDialog::new()
                    .set_level(MessageLevel::Info)
                    .set_title("Move disabled while filtering")
                    .set_description("Clear the filter before moving entries.")
                    .set_buttons(MessageButtons::Ok)
                    .show();
                return;
            }
            if panel.selected.is_empty() {
                return;
            }
            panel.editing = None;
            panel.dirty.set(true);
            panel.selected = match action {
                Action::MoveUp => panel.list.move_up(&panel.selected),
                _ => panel.list.move_down(&panel.selected),
            };
            self.status = format!("Reordered {}", panel_title(scope));
        }

        /// Returns true when the value was written (or traced in dry-run mode).
        fn save(&mut self, scope: PathScope) -> bool {
            if let Some(err) = &self.panel(scope).load_error {
                show_error(
                    "Save blocked",
                    &format!("{} could not be read, so it will not be overwritten.\n\n{err}", panel_title(scope)),
                );
                return false;
            }
            if scope == PathScope::System && !self.is_admin && !self.reader.is_dry_run() {
                self.offer_elevation();
                return false;
            }

            let list = match scope {
                PathScope::User => &self.user.list,
                PathScope::System => &self.system.list,
            };
            match self.reader.save(list) {
                Ok(()) => {
                    self.status = if self.reader.is_dry_run() {
                        format!("Dry run: {} not written (see log)", panel_title(scope))
                    } else {
                        self.panel(scope).dirty.set(false);
                        format!("Saved {} and broadcast the change", panel_title(scope))
                    };
                    true
                }
                Err(Error::PermissionDenied { .. }) => {
                    self.offer_elevation();
                    false
                }
                Err(err) => {
                    self.status = format!("Saving {} failed", panel_title(scope));
                    show_error("Save failed", &err.to_string());
                    false
                }
            }
        }

        fn save_all(&mut self) {
            if !self.save(PathScope::User) {
                return;
            }
            if self.is_admin || self.reader.is_dry_run() {
                if self.save(PathScope::System) {
                    self.status = "Saved User + System PATH".to_string();
                }
            } else {
                self.status = "Saved User PATH (System PATH skipped - not admin)".to_string();
            }
        }

        fn offer_elevation(&mut self) {
            let answer = MessageDialog::new()
                .set_level(MessageLevel::Warning)
                .set_title("Administrator required")
                .set_description(
                    "Saving the System PATH requires administrator rights.\n\nRestart as Administrator now? Unsaved edits will be lost.",
                )
                .set_buttons(MessageButtons::YesNo)
                .show();
            if matches!(answer, MessageDialogResult::Yes) {
                self.restart_elevated();
            }
        }

        fn restart_elevated(&mut self) {
            match restart_as_admin() {
                Ok(()) => process::exit(0),
                Err(err) => show_error("Failed to restart as Administrator", &err.to_string()),
            }
        }

        fn draw_panel(&mut self, ui: &mut egui::Ui, scope: PathScope) {
            let mut actions = Vec::new();
            let mut row_status = None;
            let panel = self.panel_mut(scope);

            ui.group(|ui| {
                ui.vertical(|ui| {
                    if panel.dirty.get() {
                        ui.heading(format!("{} *", panel.title()));
                    } else {
                        ui.heading(panel.title());
                    }
                    if let Some(err) = &panel.load_error {
                        ui.label(RichText::new(err).color(MISSING_COLOR));
                    } else {
                        let missing = panel.list.missing().len();
                        ui.label(
                            RichText::new(format!(
                                "{} entries, {missing} missing. Unchecked entries are dropped on save.",
                                panel.list.len()
                            ))
                            .small()
                            .color(Color32::from_gray(170)),
                        );
                    }
                    ui.add_space(8.0);

                    ui.horizontal(|ui| {
                        ui.label("Filter");
                        ui.add(
                            TextEdit::singleline(&mut panel.filter)
                                .hint_text("Type to filter PATH entries")
                                .desired_width(f32::INFINITY),
                        );
                    });
                    ui.add_space(8.0);

                    row_status = draw_rows(ui, panel, scope);
                    ui.add_space(8.0);

                    let can_move = !panel.filtering();
                    ui.horizontal_wrapped(|ui| {
                        for (label, action, enabled) in [
                            ("Add", Action::Add, true),
                            ("Browse", Action::Browse, true),
                            ("Remove", Action::Remove, true),
                            ("Move Up", Action::MoveUp, can_move),
                            ("Move Down", Action::MoveDown, can_move),
                            ("Dedupe", Action::Dedupe, true),
                            ("Sort", Action::Sort, true),
                            ("Expanded", Action::Expanded, true),
                            ("Re-check", Action::Recheck, true),
                            ("Reload", Action::Reload, true),
                        ] {
                            if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                                actions.push(action);
                            }
                        }
                    });

                    ui.add_space(8.0);
                    ui.label(RichText::new("Value to save").small());
                    let mut preview = panel.list.to_raw();
                    ui.add(
                        TextEdit::multiline(&mut preview)
                            .desired_rows(5)
                            .interactive(false)
                            .desired_width(f32::INFINITY),
                    );

                    ui.add_space(8.0);
                    if ui.button("Save this PATH").clicked() {
                        actions.push(Action::Save);
                    }
                });
            });

            if let Some(status) = row_status {
                self.status = status;
            }
            for action in actions {
                self.apply(scope, action);
            }
        }

        fn draw_add_dialog(&mut self, ctx: &egui::Context) {
            let Some(scope) = self.add_dialog.scope else {
                return;
            };

            let mut open = true;
            let mut close = false;
            let title = match scope {
                PathScope::User => "Add User PATH Entry",
                PathScope::System => "Add System PATH Entry",
            };

            egui::Window::new(title)
                .open(&mut open)
                .collapsible(false)
                .resizable(false)
                .default_width(640.0)
                .show(ctx, |ui| {
                    ui.label("Entry (supports %VAR% tokens, e.g. %SystemRoot%\\System32)");
                    ui.add_space(6.0);
                    ui.add(
                        TextEdit::singleline(&mut self.add_dialog.input)
                            .desired_width(f32::INFINITY)
                            .hint_text(r"C:\Tools\bin"),
                    );

                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Browse...").clicked() {
                            if let Some(folder) = FileDialog::new().pick_folder() {
                                self.add_dialog.input = folder.display().to_string();
                            }
                        }

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Add").clicked() {
                                let input = std::mem::take(&mut self.add_dialog.input);
                                let added = match scope {
                                    PathScope::User => self.user.push(&input),
                                    PathScope::System => self.system.push(&input),
                                };
                                if added {
                                    self.status = format!("Added entry to {}", panel_title(scope));
                                }
                                close = true;
                            }
                            if ui.button("Cancel").clicked() {
                                close = true;
                            }
                        });
                    });
                });

            if close || !open {
                self.add_dialog = AddDialog::default();
            }
        }

        fn draw_expanded_dialog(&mut self, ctx: &egui::Context) {
            let Some(scope) = self.expanded_scope else {
                return;
            };

            let mut open = true;
            let title = match scope {
                PathScope::User => "Expanded User PATH",
                PathScope::System => "Expanded System PATH",
            };
            let mut content = self.panel(scope).list.expanded_report();

            egui::Window::new(title)
                .open(&mut open)
                .collapsible(false)
                .resizable(true)
                .default_size([980.0, 420.0])
                .show(ctx, |ui| {
                    ui.add(
                        TextEdit::multiline(&mut content)
                            .desired_width(f32::INFINITY)
                            .desired_rows(24)
                            .interactive(false),
                    );
                });

            if !open {
                self.expanded_scope = None;
            }
        }
    }

    impl eframe::App for PathEditorApp {
        fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
            egui::TopBottomPanel::top("header").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("PATH Editor");
                    ui.separator();
                    ui.label("Edits the registry PATH values for the current user and the machine.");

                    let mut dry_run = self.reader.is_dry_run();
                    if ui
                        .checkbox(&mut dry_run, "Dry run")
                        .on_hover_text("Log the value instead of writing it")
                        .changed()
                    {
                        self.reader.set_dry_run(dry_run);
                        info!(dry_run, "dry run toggled");
                    }

                    if !self.is_admin {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui
                                .button(RichText::new("Restart as Admin").color(Color32::WHITE).strong())
                                .clicked()
                            {
                                self.restart_elevated();
                            }
                        });
                    }
                });
            });

            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(&self.status).small());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button(RichText::new("Save ALL").strong().color(Color32::WHITE))
                            .clicked()
                        {
                            self.save_all();
                        }
                    });
                });
            });

            egui::CentralPanel::default().show(ctx, |ui| {
                ui.columns(2, |cols| {
                    self.draw_panel(&mut cols[0], PathScope::User);
                    self.draw_panel(&mut cols[1], PathScope::System);
                });
            });

            self.draw_add_dialog(ctx);
            self.draw_expanded_dialog(ctx);
        }
    }

    /// The entry list: an enabled checkbox and a selectable path per row.
    /// Double-clicking a path edits it in place; Enter or clicking away
    /// commits, Escape cancels.
    fn draw_rows(ui: &mut egui::Ui, panel: &mut Panel, scope: PathScope) -> Option<String> {
        let visible = panel.list.matching(&panel.filter);
        let mut finished = None;
        let mut start_edit = None;

        egui::Frame::canvas(ui.style()).show(ui, |ui| {
            ui.set_height(300.0);
            ScrollArea::vertical()
                .id_source(format!("list_{scope}"))
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for idx in visible {
                        let Some(entry) = panel.list.get_mut(idx) else {
                            continue;
                        };
                        let selected = panel.selected.contains(&idx);

                        ui.horizontal(|ui| {
                            let mut enabled = entry.enabled();
                            if ui.checkbox(&mut enabled, "").changed() {
                                entry.set_enabled(enabled);
                            }

                            if let Some(edit) = panel.editing.as_mut().filter(|e| e.idx == idx) {
                                let response = ui.add(
                                    TextEdit::singleline(&mut edit.text).desired_width(f32::INFINITY),
                                );
                                if edit.focus {
                                    response.request_focus();
                                    edit.focus = false;
                                }
                                if response.lost_focus() {
                                    let cancelled = ui.input(|i| i.key_pressed(egui::Key::Escape));
                                    finished = Some(!cancelled);
                                }
                                return;
                            }

                            let mut text = RichText::new(entry.path());
                            if !entry.enabled() {
                                text = text.color(DISABLED_COLOR).strikethrough();
                            } else if !entry.exists() {
                                text = text.color(MISSING_COLOR);
                            }
                            let hover = if entry.exists() {
                                entry.path_expanded()
                            } else {
                                format!("{} (directory not found)", entry.path_expanded())
                            };

                            let response = ui.selectable_label(selected, text).on_hover_text(hover);
                            if response.double_clicked() {
                                start_edit = Some((idx, entry.path().to_string()));
                            } else if response.clicked() {
                                let ctrl = ui.input(|i| i.modifiers.ctrl || i.modifiers.command);
                                if !ctrl {
                                    panel.selected.clear();
                                    panel.selected.insert(idx);
                                } else if selected {
                                    panel.selected.remove(&idx);
                                } else {
                                    panel.selected.insert(idx);
                                }
                            }
                        });
                    }
                });
        });

        if let Some((idx, text)) = start_edit {
            panel.editing = Some(RowEdit {
                idx,
                text,
                focus: true,
            });
        }

        match finished {
            Some(true) => panel.editing.take().and_then(|edit| commit_edit(panel, edit)),
            Some(false) => {
                panel.editing = None;
                None
            }
            None => None,
        }
    }

    fn commit_edit(panel: &mut Panel, edit: RowEdit) -> Option<String> {
        let text = edit.text.trim();
        if text.is_empty() {
            return Some("Empty path ignored; use Remove to delete an entry".to_string());
        }
        let entry = panel.list.get_mut(edit.idx)?;
        let changed = entry.set_path(text);
        if changed.is_empty() {
            return None;
        }
        let note = if !changed.contains(&Field::Exists) {
            ""
        } else if entry.exists() {
            " (directory found)"
        } else {
            " (directory not found)"
        };
        Some(format!("Edited {}{note}", entry.path()))
    }

    /// Listener that flags a panel as having unsaved changes.
    fn mark_dirty(dirty: &Rc<Cell<bool>>) -> impl FnMut(&PathEntry, Field) + Clone + 'static {
        let dirty = Rc::clone(dirty);
        move |_: &PathEntry, _: Field| dirty.set(true)
    }

    fn panel_title(scope: PathScope) -> &'static str {
        match scope {
            PathScope::User => "User PATH",
            PathScope::System => "System PATH",
        }
    }

    fn show_error(title: &str, description: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title(title)
            .set_description(description)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn apply_style(ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.button_padding = egui::vec2(10.0, 6.0);
        style.visuals = egui::Visuals::dark();
        style.visuals.window_fill = Color32::from_rgb(20, 24, 30);
        style.visuals.panel_fill = Color32::from_rgb(17, 20, 26);
        style.visuals.widgets.active.bg_fill = Color32::from_rgb(0, 120, 212);
        style.visuals.widgets.hovered.bg_fill = Color32::from_rgb(0, 96, 172);
        style.visuals.widgets.inactive.bg_fill = Color32::from_rgb(37, 44, 54);
        ctx.set_style(style);
    }
}

#[cfg(target_os = "windows")]
fn main() -> eframe::Result<()> {
    app::run()
}
