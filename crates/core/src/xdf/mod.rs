//! XDF document emission.
//!
//! Renders detected maps as the tuner-community XML layout format. The
//! document is deterministic apart from the generation timestamp, which is
//! injectable for tests.

use chrono::Utc;

use crate::model::DetectedMap;

/// Escape the characters XML forbids in attribute and text content.
pub fn xml_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render maps as an XDF document stamped with the current UTC time.
pub fn render_xdf(maps: &[DetectedMap], tool: &str) -> String {
    render_xdf_with_timestamp(maps, tool, &Utc::now().to_rfc3339())
}

/// `render_xdf` with an explicit generation timestamp.
pub fn render_xdf_with_timestamp(maps: &[DetectedMap], tool: &str, generated: &str) -> String {
    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    doc.push_str("<XDF>\n");
    doc.push_str("  <Header>");
    doc.push_str(&format!("<Tool>{}</Tool>", xml_escape(tool)));
    doc.push_str(&format!("<Generated>{}</Generated>", xml_escape(generated)));
    doc.push_str("</Header>\n");
    doc.push_str("  <Maps>\n");

    for map in maps {
        doc.push_str(&format!(
            "    <Map name=\"{}\" offset=\"0x{:x}\" rows=\"{}\" cols=\"{}\" elementSize=\"{}\">\n",
            xml_escape(&map.name),
            map.offset,
            map.rows,
            map.cols,
            map.element_size,
        ));
        if let Some(axis) = &map.axis_x {
            push_axis(&mut doc, "XAxis", axis);
        }
        if let Some(axis) = &map.axis_y {
            push_axis(&mut doc, "YAxis", axis);
        }
        doc.push_str("      <Values>\n");
        for row in map.values.chunks(map.cols.max(1)) {
            doc.push_str("        <Row>");
            for value in row {
                doc.push_str(&format!("<V>{value}</V>"));
            }
            doc.push_str("</Row>\n");
        }
        doc.push_str("      </Values>\n");
        doc.push_str("    </Map>\n");
    }

    doc.push_str("  </Maps>\n");
    doc.push_str("</XDF>\n");
    doc
}

fn push_axis(doc: &mut String, tag: &str, axis: &[f64]) {
    doc.push_str(&format!("      <{tag}>"));
    for value in axis {
        doc.push_str(&format!("<V>{value}</V>"));
    }
    doc.push_str(&format!("</{tag}>\n"));
}
