//! Output formatting for CLI commands.
//!
//! Every printer takes an [`OutputMode`]: `Text` renders a human-readable
//! view with optional colors, `Json` pretty-prints the underlying value.

use crate::domain::{Connection, ConnectionReceipt, ReceiptStatus, Role, User};
use crate::network::{NetworkNode, NetworkPayload};
use crate::pending::PendingInvitation;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, Write};

const DEFAULT_TERMINAL_WIDTH: u16 = 80;

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Text rendering settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Lines longer than this are truncated with an ellipsis.
    pub max_width: usize,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Read settings from the terminal and environment.
    ///
    /// Colors are disabled by `NO_COLOR` (any value) or `LIAISON_COLOR=0|false`.
    pub fn from_env() -> Self {
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("LIAISON_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            max_width: terminal_width(),
            use_colors,
        }
    }

    /// Plain output at a fixed width.
    #[cfg(test)]
    fn plain(max_width: usize) -> Self {
        Self {
            max_width,
            use_colors: false,
        }
    }

    fn paint(&self, text: &str, style: fn(&str) -> colored::ColoredString) -> String {
        if self.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map_or(DEFAULT_TERMINAL_WIDTH, |(w, _)| w.0)
        .into()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max || max < 2 {
        return text.to_string();
    }
    let kept: String = text.chars().take(max - 1).collect();
    format!("{kept}…")
}

fn write_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

/// Print a connection network.
pub fn print_network(payload: &NetworkPayload, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_network(&mut handle, payload, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, payload),
    }
}

/// Print a newly requested connection.
pub fn print_connection(connection: &Connection, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            writeln!(
                handle,
                "{} {} -> {} ({})",
                config.paint(connection.id.as_str(), |s| s.cyan()),
                connection.requester_id,
                connection.addressee_id,
                config.paint(&connection.status.to_string(), |s| s.yellow()),
            )
        }
        OutputMode::Json => write_json(&mut handle, connection),
    }
}

/// Print the outcome of a respond or withdraw.
pub fn print_receipt(receipt: &ConnectionReceipt, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            writeln!(
                handle,
                "{} is now {}",
                config.paint(receipt.id.as_str(), |s| s.cyan()),
                paint_receipt_status(receipt.status, &config),
            )
        }
        OutputMode::Json => write_json(&mut handle, receipt),
    }
}

/// Print a user record.
pub fn print_user(user: &User, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => {
            let summary = crate::hydrate::summarize(user);
            writeln!(handle, "Saved {} ({}) as {}", summary.name, summary.id, summary.role)
        }
        OutputMode::Json => write_json(&mut handle, user),
    }
}

/// Print the policy matrix.
pub fn print_policy(matrix: &BTreeMap<Role, Vec<Role>>, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_policy(&mut handle, matrix, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, matrix),
    }
}

fn paint_receipt_status(status: ReceiptStatus, config: &OutputConfig) -> String {
    let text = status.to_string();
    match status {
        ReceiptStatus::Accepted => config.paint(&text, |s| s.green()),
        ReceiptStatus::Rejected => config.paint(&text, |s| s.red()),
        ReceiptStatus::Pending | ReceiptStatus::Withdrawn => config.paint(&text, |s| s.yellow()),
    }
}

fn write_policy<W: Write>(
    w: &mut W,
    matrix: &BTreeMap<Role, Vec<Role>>,
    config: &OutputConfig,
) -> io::Result<()> {
    for (role, allowed) in matrix {
        let allowed: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
        writeln!(
            w,
            "{:<11} {}",
            config.paint(role.as_str(), |s| s.bold()),
            allowed.join(", ")
        )?;
    }
    Ok(())
}

fn write_network<W: Write>(
    w: &mut W,
    payload: &NetworkPayload,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{} ({}, {})",
        config.paint(&payload.subject.name, |s| s.bold()),
        payload.subject.id,
        payload.subject.role
    )?;
    writeln!(
        w,
        "{} total: {} 1st, {} 2nd, {} 3rd",
        payload.summary.total,
        payload.summary.first_degree,
        payload.summary.second_degree,
        payload.summary.third_degree
    )?;

    for (title, nodes) in [
        ("1st degree", &payload.first_degree),
        ("2nd degree", &payload.second_degree),
        ("3rd degree", &payload.third_degree),
    ] {
        if nodes.is_empty() {
            continue;
        }
        writeln!(w)?;
        writeln!(w, "{}", config.paint(title, |s| s.bold()))?;
        for node in nodes {
            write_node(w, node, config)?;
        }
    }

    if let Some(pending) = &payload.pending {
        for (title, list) in [("Incoming", &pending.incoming), ("Outgoing", &pending.outgoing)] {
            if list.is_empty() {
                continue;
            }
            writeln!(w)?;
            writeln!(w, "{}", config.paint(&format!("{title} invitations"), |s| s.bold()))?;
            for invitation in list {
                write_invitation(w, invitation, config)?;
            }
        }
    }

    if !payload.suggested_connections.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", config.paint("Suggested", |s| s.bold()))?;
        for node in &payload.suggested_connections {
            writeln!(
                w,
                "  {} ({} mutual)",
                node.summary.name, node.mutual_connections
            )?;
        }
    }

    let analytics = &payload.invitation_analytics;
    if analytics.closed_count > 0 {
        writeln!(w)?;
        writeln!(
            w,
            "Invitations: {} closed, {}% accepted, median response {}",
            analytics.closed_count,
            analytics.acceptance_rate.unwrap_or(0),
            analytics.median_response.as_deref().unwrap_or("-")
        )?;
    }

    Ok(())
}

fn write_node<W: Write>(w: &mut W, node: &NetworkNode, config: &OutputConfig) -> io::Result<()> {
    let mut line = format!("  {} [{}]", node.summary.name, node.summary.role);
    if let Some(headline) = &node.summary.headline {
        line.push_str(" - ");
        line.push_str(headline);
    }
    writeln!(w, "{}", truncate(&line, config.max_width))?;

    if node.degree > 1 {
        let inner = node
            .path
            .get(1..node.path.len().saturating_sub(1))
            .unwrap_or_default();
        let via: Vec<&str> = inner
            .iter()
            .map(|step| step.name.as_str())
            .collect();
        writeln!(
            w,
            "    {} {} ({} mutual)",
            config.paint("via", |s| s.dimmed()),
            via.join(" > "),
            node.mutual_connections
        )?;
    }
    if let Some(reason) = &node.actions.reason {
        writeln!(w, "    {}", config.paint(reason, |s| s.red()))?;
    }
    Ok(())
}

fn write_invitation<W: Write>(
    w: &mut W,
    invitation: &PendingInvitation,
    config: &OutputConfig,
) -> io::Result<()> {
    let id = invitation.connection_id.as_str();
    let mut rest = format!(
        " {} [{}] {} mutual",
        invitation.counterpart.name, invitation.counterpart.role, invitation.mutual_connections
    );
    if let Some(note) = &invitation.note {
        rest.push_str(": ");
        rest.push_str(note);
    }
    // Width is measured on the unpainted text; the id is never cut
    let budget = config
        .max_width
        .max(40)
        .saturating_sub(2 + id.chars().count());
    writeln!(
        w,
        "  {}{}",
        config.paint(id, |s| s.cyan()),
        truncate(&rest, budget)
    )
}
