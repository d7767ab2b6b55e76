//! Port bundle: assembles independent adapters into one [`ControlPorts`].
//!
//! The control worker drives all four control-side ports through a single
//! value.  Robots usually have a separate adapter per collaborator; this
//! wrapper delegates each trait to its own field.
//!
//! [`ControlPorts`]: crate::app::ports::ControlPorts

use core::time::Duration;

use crate::app::events::{ChargeFeedback, ConnectResponse, SubsystemResponse};
use crate::app::ports::{
    ChargerPort, DockPort, DockSession, FeedbackSink, Reply, WirelessPort,
};

use super::log_sink::LogFeedbackSink;

pub struct PortBundle<W, D, C, F = LogFeedbackSink> {
    pub wireless: W,
    pub dock: D,
    pub charger: C,
    pub feedback: F,
}

impl<W, D, C> PortBundle<W, D, C> {
    /// Bundle with feedback going to the log.
    pub fn new(wireless: W, dock: D, charger: C) -> Self {
        Self {
            wireless,
            dock,
            charger,
            feedback: LogFeedbackSink::new(),
        }
    }
}

impl<W, D, C, F> PortBundle<W, D, C, F> {
    pub fn with_feedback<G>(self, feedback: G) -> PortBundle<W, D, C, G> {
        PortBundle {
            wireless: self.wireless,
            dock: self.dock,
            charger: self.charger,
            feedback,
        }
    }
}

impl<W: WirelessPort, D, C, F> WirelessPort for PortBundle<W, D, C, F> {
    fn wait_for_start_service(&mut self, timeout: Duration) -> bool {
        self.wireless.wait_for_start_service(timeout)
    }

    fn request_start(&mut self, reply: Reply<SubsystemResponse>) {
        self.wireless.request_start(reply);
    }

    fn request_stop(&mut self, reply: Reply<SubsystemResponse>) {
        self.wireless.request_stop(reply);
    }

    fn request_connect(&mut self, address: &str, reply: Reply<ConnectResponse>) {
        self.wireless.request_connect(address, reply);
    }
}

impl<W, D: DockPort, C, F> DockPort for PortBundle<W, D, C, F> {
    fn wait_for_server(&mut self, timeout: Duration) -> bool {
        self.dock.wait_for_server(timeout)
    }

    fn execute(&mut self, session: DockSession) {
        self.dock.execute(session);
    }

    fn cancel(&mut self) {
        self.dock.cancel();
    }
}

impl<W, D, C: ChargerPort, F> ChargerPort for PortBundle<W, D, C, F> {
    fn begin_charging(&mut self) {
        self.charger.begin_charging();
    }
}

impl<W, D, C, F: FeedbackSink> FeedbackSink for PortBundle<W, D, C, F> {
    fn emit(&mut self, feedback: &ChargeFeedback) {
        self.feedback.emit(feedback);
    }
}
