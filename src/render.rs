use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::store::{FetchStatus, ViewState};

fn colored<W: WriteColor>(out: &mut W, color: Color, bold: bool, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold))?;
    write!(out, "{}", text)?;
    out.reset()
}

fn stale_notice<W: WriteColor>(out: &mut W, what: &str, status: &FetchStatus) -> io::Result<()> {
    if let FetchStatus::Failed(reason) = status {
        colored(out, Color::Yellow, false, &format!("! {} may be stale: {}", what, reason))?;
        writeln!(out)?;
    }
    Ok(())
}

/// Draw the whole dashboard for one state snapshot.
pub fn render<W: WriteColor>(out: &mut W, view: &ViewState) -> io::Result<()> {
    if view.loading {
        writeln!(out, "Loading dashboard...")?;
        return out.flush();
    }

    colored(out, Color::White, true, "=== Security Monitoring Dashboard ===")?;
    writeln!(out)?;
    writeln!(out, "Real-time USB and device monitoring")?;
    writeln!(out)?;

    let stats = view.stats();
    write!(out, "Total Devices: {}   Online: ", stats.total_devices)?;
    colored(out, Color::Green, true, &stats.online_devices.to_string())?;
    write!(out, "   Hardware Events: ")?;
    colored(out, Color::Magenta, true, &stats.total_events.to_string())?;
    write!(out, "   Alerts: ")?;
    colored(out, Color::Red, true, &stats.alert_count.to_string())?;
    writeln!(out)?;

    stale_notice(out, "Devices", &view.devices_status)?;
    stale_notice(out, "Events", &view.logs_status)?;

    writeln!(out, "\n--- Connected Devices ---")?;
    if view.devices.is_empty() {
        writeln!(out, "(no devices)")?;
    }
    for device in &view.devices {
        let marker = if view.is_selected(&device.device_id) { ">" } else { " " };
        write!(out, "{} ", marker)?;
        if device.is_online() {
            colored(out, Color::Green, false, "●")?;
        } else {
            colored(out, Color::Ansi256(8), false, "●")?;
        }
        writeln!(
            out,
            " {} [{}]  {}  {}",
            device.device_name, device.device_id, device.owner, device.location
        )?;
    }

    writeln!(out)?;
    match &view.selected_device {
        Some(device) => {
            writeln!(out, "--- Device Information ---")?;
            writeln!(out, "Hostname:   {}", device.hostname)?;
            writeln!(out, "IP Address: {}", device.ip_address)?;

            writeln!(out, "\n--- USB Activity ---")?;
            let logs = view.selected_logs();
            if logs.is_empty() {
                writeln!(out, "(no recent events)")?;
            }
            for entry in logs {
                let color = if entry.is_connect() { Color::Green } else { Color::Red };
                colored(out, color, true, &entry.event)?;
                writeln!(out, "  {}  {}", entry.message, entry.display_time())?;
            }
        }
        None => {
            writeln!(out, "Select a Device")?;
            writeln!(out, "Type a device id to view details")?;
        }
    }

    out.flush()
}
