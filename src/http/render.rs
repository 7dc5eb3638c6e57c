use crate::pairing::png_data_uri;
use crate::session::{format_uptime, ConnectionStatus, ManagerState};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Page served at `/` when the configured index file is missing
pub const FALLBACK_INDEX: &str = include_str!("../../static/index.html");

/// htmx status fragment for a snapshot
pub fn status_fragment(state: &ManagerState, now: DateTime<Utc>) -> String {
    let status = state.status;
    let mut html = format!(
        "<div class=\"status-text status-{}\">{}</div>\n",
        status.tag(),
        status.label()
    );

    if let Some(uptime) = state.uptime(now) {
        html.push_str(&format!(
            "<div class=\"uptime\">Connected for: {}</div>\n",
            format_uptime(uptime)
        ));
    }

    if status == ConnectionStatus::WaitingForPairing {
        if let Some(payload) = &state.pairing_payload {
            html.push_str("<p>Scan this QR code with WhatsApp:</p>\n");
            html.push_str(&format!(
                "<img src=\"{}\" alt=\"QR Code\">\n",
                png_data_uri(payload)
            ));
        }
    }

    html.push_str("<div class=\"actions\">\n");
    if status.accepts_connect() {
        html.push_str(
            "<button hx-post=\"/connect\" hx-target=\"#status-box\">Connect</button>\n",
        );
    }
    if status == ConnectionStatus::Connected {
        html.push_str(
            "<button class=\"disconnect-btn\" hx-post=\"/disconnect\" hx-target=\"#status-box\">Disconnect</button>\n",
        );
    }
    html.push_str("</div>\n");

    html
}

/// JSON view of a snapshot for non-HTML consumers
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub status: ConnectionStatus,
    pub label: &'static str,
    pub uptime_secs: Option<i64>,
    pub has_pairing_code: bool,
}

impl StatusView {
    pub fn new(state: &ManagerState, now: DateTime<Utc>) -> Self {
        Self {
            status: state.status,
            label: state.status.label(),
            uptime_secs: state
                .uptime(now)
                .map(|d| (d.num_milliseconds().max(0) + 500) / 1000),
            has_pairing_code: state.pairing_payload.is_some(),
        }
    }
}
