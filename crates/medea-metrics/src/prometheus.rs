//! Prometheus text exposition format.
//!
//! Renders counter families for scraping by a Prometheus server or
//! compatible agent.

use crate::counter::CounterFamily;

/// Content type of the exposition body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render counter families into Prometheus text format.
///
/// Families with no series still emit their HELP/TYPE lines; unlabeled
/// families with no increments render as `0`.
pub fn render_prometheus(families: &[&CounterFamily]) -> String {
    let mut out = String::new();

    for family in families {
        out.push_str(&format!("# HELP {} {}\n", family.name(), family.help()));
        out.push_str(&format!("# TYPE {} counter\n", family.name()));

        let series = family.series();
        match family.label() {
            Some(label) => {
                for (value, count) in series {
                    out.push_str(&format!(
                        "{}{{{}=\"{}\"}} {}\n",
                        family.name(),
                        label,
                        escape_label(&value),
                        count
                    ));
                }
            }
            None => {
                let count = series.first().map(|(_, c)| *c).unwrap_or(0);
                out.push_str(&format!("{} {}\n", family.name(), count));
            }
        }
    }

    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
