//! Sync controller
//!
//! Owns the settings state and runs the handshake with the module:
//!
//! ```text
//! Uninitialized --document ready--> AwaitingModule --module loaded--> Active
//!       |                                                               ^
//!       +--module loaded (latched), then document ready-----------------+
//! ```
//!
//! The panel and the module initialize independently. Whichever finishes
//! second triggers activation, and activation sends the single
//! `requestSettings` of the session.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ElementsConfig;
use crate::marshal::Parameter;
use crate::metrics::{Metric, MetricsSink};
use crate::link::ModulePort;
use crate::protocol::{ModuleFault, ModuleMessage, PanelMessage, SettingsPatch, decode_module};
use crate::settings::SettingsState;
use crate::surface::Surface;

/// Lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    /// Controls are not wired yet
    Uninitialized,
    /// Controls are wired; the module has not signalled readiness
    AwaitingModule,
    /// Module is ready and settings were requested
    Active,
}

/// Where an input change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    /// A person changed the control; relay to the module
    User,
    /// A module broadcast mirrored into the control; never relayed
    Broadcast,
}

/// Facts that outlive any single event
#[derive(Debug, Default)]
struct Session {
    /// Latched as soon as the module signals readiness, whatever our state
    module_ready: bool,
    controls_revealed: bool,
    settings_requested: bool,
}

/// Point-in-time view of the controller for display
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    pub module_ready: bool,
    pub controls_revealed: bool,
    pub params: Vec<ParamView>,
    pub metrics: Vec<MetricView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamView {
    pub param: Parameter,
    pub raw: String,
    pub synced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricView {
    pub metric: Metric,
    pub value: Option<f64>,
}

/// Reconciles panel controls with the module's settings
pub struct SyncController<S: Surface> {
    state: ControllerState,
    session: Session,
    settings: SettingsState,
    metrics: MetricsSink,
    elements: ElementsConfig,
    surface: S,
    module: Option<Box<dyn ModulePort>>,
}

impl<S: Surface> SyncController<S> {
    pub fn new(elements: ElementsConfig, surface: S) -> Self {
        Self {
            state: ControllerState::Uninitialized,
            session: Session::default(),
            settings: SettingsState::new(&elements),
            metrics: MetricsSink::new(&elements),
            elements,
            surface,
            module: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn settings(&self) -> &SettingsState {
        &self.settings
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Panel wiring is complete; start listening to the controls
    ///
    /// If the module already signalled readiness, activates immediately.
    pub fn on_document_ready(&mut self) {
        debug!(state = ?self.state, "on_document_ready: called");
        if self.state != ControllerState::Uninitialized {
            warn!("Document ready signalled twice, ignoring");
            return;
        }

        self.surface.set_visible(&self.elements.controls, false);
        self.state = ControllerState::AwaitingModule;
        info!("Controls wired, awaiting module");

        if self.session.module_ready {
            info!("Module finished loading first, activating now");
            self.activate();
        }
    }

    /// The module finished loading and can receive messages through `port`
    pub fn on_module_load(&mut self, port: Box<dyn ModulePort>) {
        debug!(state = ?self.state, "on_module_load: called");
        if self.session.module_ready {
            warn!("Module ready signalled twice, ignoring");
            return;
        }

        self.session.module_ready = true;
        self.module = Some(port);

        match self.state {
            ControllerState::Uninitialized => info!("Module ready before controls, latching"),
            ControllerState::AwaitingModule => self.activate(),
            ControllerState::Active => {}
        }
    }

    fn activate(&mut self) {
        self.state = ControllerState::Active;
        self.surface.set_visible(&self.elements.loader, false);
        info!("Controller active, requesting settings");

        if !self.session.settings_requested {
            self.session.settings_requested = true;
            self.post(&PanelMessage::RequestSettings);
        }
    }

    /// A control's value changed
    ///
    /// The monitor always mirrors the raw value. A user edit additionally
    /// sends the complete, marshalled parameter set to the module.
    pub fn on_input_change(&mut self, param: Parameter, raw: &str, origin: EditOrigin) {
        debug!(%param, %raw, ?origin, "on_input_change: called");
        if self.state == ControllerState::Uninitialized {
            debug!("on_input_change: controls not wired, ignoring");
            return;
        }

        self.settings
            .set_raw(param, raw, origin == EditOrigin::Broadcast);
        let container = &self.settings.descriptor(param).container;
        self.surface.set_text(container, raw);

        if origin == EditOrigin::User {
            self.relay_settings();
        }
    }

    fn relay_settings(&mut self) {
        let snapshot = self.settings.snapshot();
        self.post(&PanelMessage::ChangeSettings(snapshot));
    }

    pub fn on_start(&mut self) {
        debug!("on_start: called");
        self.post(&PanelMessage::Start);
    }

    pub fn on_stop(&mut self) {
        debug!("on_stop: called");
        self.post(&PanelMessage::Stop);
    }

    /// A raw line arrived from the module
    pub fn on_module_line(&mut self, line: &str) {
        if self.state != ControllerState::Active {
            debug!(state = ?self.state, "on_module_line: not subscribed yet, dropping");
            return;
        }

        match decode_module(line) {
            Ok(message) => self.on_message(message),
            Err(e) if e.is_unknown_subject() => warn!(error = %e, "Ignoring message with unknown subject"),
            Err(e) => warn!(error = %e, %line, "Ignoring undecodable module message"),
        }
    }

    /// Dispatch a decoded module message
    pub fn on_message(&mut self, message: ModuleMessage) {
        debug!(subject = message.subject(), "on_message: called");
        match message {
            ModuleMessage::SettingsBroadcast(patch) => self.on_settings_broadcast(&patch),
            ModuleMessage::FpsBroadcast(report) => {
                self.metrics.apply(&report, &mut self.surface);
            }
            ModuleMessage::Error(fault) => Self::on_module_error(&fault),
        }
    }

    fn on_settings_broadcast(&mut self, patch: &SettingsPatch) {
        for (param, value) in patch.iter() {
            let text = value.to_string();
            let container = self.settings.descriptor(param).container.clone();
            self.surface.set_input(&container, &text);
            self.on_input_change(param, &text, EditOrigin::Broadcast);
        }

        if !self.session.controls_revealed {
            self.session.controls_revealed = true;
            self.surface.set_visible(&self.elements.controls, true);
            info!("First settings broadcast received, controls revealed");
        }
    }

    fn on_module_error(fault: &ModuleFault) {
        warn!(
            message = ?fault.message,
            original = ?fault.original_message,
            "Module reports error"
        );
    }

    /// Post to the module if one is attached; otherwise a no-op
    fn post(&self, message: &PanelMessage) -> bool {
        let Some(port) = self.module.as_ref().filter(|_| self.state == ControllerState::Active) else {
            debug!(subject = message.subject(), "post: no module attached, skipping");
            return false;
        };

        match port.post(message) {
            Ok(()) => true,
            Err(e) => {
                warn!(subject = message.subject(), error = %e, "Failed to post to module, dropping");
                false
            }
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state,
            module_ready: self.session.module_ready,
            controls_revealed: self.session.controls_revealed,
            params: self
                .settings
                .iter()
                .map(|d| ParamView {
                    param: d.param,
                    raw: d.raw().to_string(),
                    synced: d.is_synced(),
                })
                .collect(),
            metrics: Metric::ALL
                .into_iter()
                .map(|metric| MetricView {
                    metric,
                    value: self.metrics.current(metric),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::ChannelPort;
    use crate::marshal::ParamValue;
    use crate::surface::MemorySurface;
    use tokio::sync::mpsc;

    fn controller() -> SyncController<MemorySurface> {
        SyncController::new(ElementsConfig::default(), MemorySurface::new())
    }

    /// Sent messages, read back strictly so every changeSettings must be complete
    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<PanelMessage> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(serde_json::from_str(&line).unwrap());
        }
        out
    }

    fn active_controller() -> (SyncController<MemorySurface>, mpsc::Receiver<String>) {
        let mut ctl = controller();
        let (port, mut rx) = ChannelPort::channel(16);
        ctl.on_document_ready();
        ctl.on_module_load(Box::new(port));
        assert_eq!(drain(&mut rx), vec![PanelMessage::RequestSettings]);
        (ctl, rx)
    }

    const FULL_BROADCAST: &str =
        r#"{"subject":"settingsBroadcast","bleed":0.95,"radius":3,"decayExp":0.02,"decayLin":1,"fps":20}"#;

    #[test]
    fn test_document_first_then_module() {
        let mut ctl = controller();
        let (port, mut rx) = ChannelPort::channel(16);

        ctl.on_document_ready();
        assert_eq!(ctl.state(), ControllerState::AwaitingModule);
        assert!(drain(&mut rx).is_empty());

        ctl.on_module_load(Box::new(port));
        assert_eq!(ctl.state(), ControllerState::Active);
        assert_eq!(drain(&mut rx), vec![PanelMessage::RequestSettings]);
        assert_eq!(ctl.surface().is_visible("loader"), Some(false));
    }

    #[test]
    fn test_module_first_is_latched() {
        let mut ctl = controller();
        let (port, mut rx) = ChannelPort::channel(16);

        ctl.on_module_load(Box::new(port));
        assert_eq!(ctl.state(), ControllerState::Uninitialized);
        assert!(drain(&mut rx).is_empty());

        ctl.on_document_ready();
        assert_eq!(ctl.state(), ControllerState::Active);
        assert_eq!(drain(&mut rx), vec![PanelMessage::RequestSettings]);
    }

    #[test]
    fn test_duplicate_signals_send_one_request() {
        let mut ctl = controller();
        let (port, mut rx) = ChannelPort::channel(16);
        let (second_port, mut second_rx) = ChannelPort::channel(16);

        ctl.on_module_load(Box::new(port));
        ctl.on_document_ready();
        ctl.on_document_ready();
        ctl.on_module_load(Box::new(second_port));

        assert_eq!(drain(&mut rx), vec![PanelMessage::RequestSettings]);
        assert!(drain(&mut second_rx).is_empty());
    }

    #[test]
    fn test_edit_while_awaiting_module_updates_monitor_only() {
        let mut ctl = controller();
        ctl.on_document_ready();

        ctl.on_input_change(Parameter::Radius, "7", EditOrigin::User);

        assert_eq!(ctl.surface().text("radius"), Some("7"));
        assert_eq!(ctl.settings().descriptor(Parameter::Radius).raw(), "7");
    }

    #[test]
    fn test_edit_before_wiring_is_ignored() {
        let mut ctl = controller();
        ctl.on_input_change(Parameter::Radius, "7", EditOrigin::User);

        assert_eq!(ctl.surface().text("radius"), None);
        assert_eq!(ctl.settings().descriptor(Parameter::Radius).raw(), "");
    }

    #[test]
    fn test_user_edit_relays_full_settings() {
        let (mut ctl, mut rx) = active_controller();
        ctl.on_module_line(FULL_BROADCAST);
        assert!(drain(&mut rx).is_empty());

        ctl.on_input_change(Parameter::Bleed, "0.5", EditOrigin::User);

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        let PanelMessage::ChangeSettings(snapshot) = &sent[0] else {
            panic!("Expected changeSettings, got {:?}", sent[0]);
        };
        assert_eq!(snapshot.bleed, ParamValue::Float(0.5));
        assert_eq!(snapshot.radius, ParamValue::Int(3));
        assert_eq!(snapshot.decay_exp, ParamValue::Float(0.02));
        assert_eq!(snapshot.decay_lin, ParamValue::Int(1));
        assert_eq!(snapshot.fps, ParamValue::Int(20));
        assert!(!ctl.settings().descriptor(Parameter::Bleed).is_synced());
    }

    #[test]
    fn test_partial_broadcast_touches_only_present_params() {
        let (mut ctl, mut rx) = active_controller();
        ctl.on_module_line(FULL_BROADCAST);

        ctl.on_module_line(r#"{"subject":"settingsBroadcast","bleed":0.5}"#);

        let surface = ctl.surface();
        assert_eq!(surface.input("bleed"), Some("0.5"));
        assert_eq!(surface.text("bleed"), Some("0.5"));
        assert_eq!(surface.text("radius"), Some("3"));
        assert_eq!(surface.text("decay_exp"), Some("0.02"));
        assert_eq!(surface.text("target_fps"), Some("20"));
        // Broadcasts are mirrored, never relayed back
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_controls_revealed_exactly_once() {
        let (mut ctl, _rx) = active_controller();
        assert_eq!(ctl.surface().is_visible("controls"), Some(false));

        ctl.on_module_line(FULL_BROADCAST);
        ctl.on_module_line(r#"{"subject":"settingsBroadcast","fps":30}"#);
        ctl.on_module_line(r#"{"subject":"settingsBroadcast"}"#);

        assert_eq!(ctl.surface().times_shown("controls"), 1);
        assert_eq!(ctl.surface().is_visible("controls"), Some(true));
        assert!(ctl.snapshot().controls_revealed);
    }

    #[test]
    fn test_fps_broadcast_formats_metrics() {
        let (mut ctl, _rx) = active_controller();

        ctl.on_module_line(r#"{"subject":"fpsBroadcast","processingFps":59.9999,"renderingFps":30}"#);
        ctl.on_module_line(r#"{"subject":"fpsBroadcast","renderingFps":24.5}"#);

        assert_eq!(ctl.surface().text("fps_processing"), Some("60.000"));
        assert_eq!(ctl.surface().text("fps_rendering"), Some("24.500"));
    }

    #[test]
    fn test_start_stop_without_module_are_noops() {
        let mut ctl = controller();
        ctl.on_document_ready();
        ctl.on_start();
        ctl.on_stop();
        assert_eq!(ctl.state(), ControllerState::AwaitingModule);
    }

    #[test]
    fn test_start_stop_with_module() {
        let (mut ctl, mut rx) = active_controller();
        ctl.on_start();
        ctl.on_stop();
        assert_eq!(drain(&mut rx), vec![PanelMessage::Start, PanelMessage::Stop]);
        assert_eq!(ctl.state(), ControllerState::Active);
    }

    #[test]
    fn test_unknown_and_error_subjects_are_ignored() {
        let (mut ctl, mut rx) = active_controller();

        ctl.on_module_line(r#"{"subject":"telemetry","x":1}"#);
        ctl.on_module_line(r#"{"subject":"error","message":"invalid message"}"#);
        ctl.on_module_line("garbage");

        assert!(drain(&mut rx).is_empty());
        assert!(!ctl.settings().is_populated());
        assert_eq!(ctl.state(), ControllerState::Active);
    }

    #[test]
    fn test_messages_before_activation_are_dropped() {
        let mut ctl = controller();
        ctl.on_document_ready();
        ctl.on_module_line(FULL_BROADCAST);

        assert!(!ctl.settings().is_populated());
        assert_eq!(ctl.surface().times_shown("controls"), 0);
    }

    #[test]
    fn test_malformed_edit_forwards_sentinel() {
        let (mut ctl, mut rx) = active_controller();
        ctl.on_module_line(FULL_BROADCAST);

        ctl.on_input_change(Parameter::Radius, "wide", EditOrigin::User);

        assert_eq!(ctl.surface().text("radius"), Some("wide"));
        let sent = drain(&mut rx);
        let PanelMessage::ChangeSettings(snapshot) = &sent[0] else {
            panic!("Expected changeSettings");
        };
        assert_eq!(snapshot.radius, ParamValue::NotANumber);
    }
}
