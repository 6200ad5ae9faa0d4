//! Text rendering for CLI output.

use droidwalk_core::adb::AndroidDevice;
use droidwalk_core::element::UIElement;
use droidwalk_core::walkthrough::RunReport;

/// One line per procedure plus a summary line.
pub fn report(report: &RunReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let status = if outcome.passed { "PASS" } else { "FAIL" };
        out.push_str(&format!(
            "{} {} ({}ms, {} actions)\n",
            status, outcome.procedure, outcome.elapsed_ms, outcome.actions
        ));
        if let Some(ref error) = outcome.error {
            out.push_str(&format!("     {}\n", error));
        }
    }
    out.push_str(&format!("{} passed, {} failed\n", report.passed(), report.failed()));
    out
}

pub fn devices(devices: &[AndroidDevice]) -> String {
    if devices.is_empty() {
        return "No devices attached\n".to_string();
    }
    let mut out = String::new();
    for device in devices {
        let model = device.model.as_deref().unwrap_or("-");
        out.push_str(&format!("{:<24} {:<14} {}\n", device.serial, device.state, model));
    }
    out
}

/// Elements as `class "text" [id] (desc) @ l,t,r,b`, indented by depth.
pub fn elements(elements: &[UIElement]) -> String {
    let mut out = String::new();
    write_elements(elements, 0, &mut out);
    out
}

fn write_elements(elements: &[UIElement], depth: usize, out: &mut String) {
    for element in elements {
        out.push_str(&"  ".repeat(depth));
        let class_name = element.class_name.as_deref().unwrap_or("?");
        let short_class = class_name.rsplit('.').next().unwrap_or(class_name);
        out.push_str(short_class);
        if let Some(ref text) = element.text {
            out.push_str(&format!(" \"{}\"", text));
        }
        if let Some(ref id) = element.resource_id {
            out.push_str(&format!(" [{}]", id));
        }
        if let Some(ref desc) = element.content_desc {
            out.push_str(&format!(" ({})", desc));
        }
        if let Some(bounds) = element.bounds {
            out.push_str(&format!(
                " @ {},{},{},{}",
                bounds.left, bounds.top, bounds.right, bounds.bottom
            ));
        }
        out.push('\n');
        write_elements(&element.children, depth + 1, out);
    }
}
