use std::collections::BTreeMap;

use rommap_core::image::ByteImage;
use rommap_core::templates::{
    parse_embedded_data, Template, TemplateDatatype, TemplateRescanner,
};

fn table_bytes() -> Vec<u8> {
    [10u16, 20, 11, 21, 12, 22].iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn template_with_xml(raw_xml: &str) -> Template {
    Template { raw_xml: raw_xml.to_string(), ..Template::default() }
}

#[test]
fn parses_attributes_in_any_case_and_quoting() {
    let xml = r#"<embeddeddata MMEDADDRESS='0x7F00' ColCount="4" rowcount='6' mmedelementsizebits="16"/>"#;
    let elements = parse_embedded_data(xml).expect("parse");
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].address, 0x7F00);
    assert_eq!(elements[0].cols, 4);
    assert_eq!(elements[0].rows, 6);
    assert_eq!(elements[0].element_bytes, 2);
    assert_eq!(elements[0].bytes_needed(), 48);
}

#[test]
fn accepts_decimal_addresses_and_alternate_names() {
    let xml = r#"<EMBEDDEDDATA mmedaddress="32512" mmedcolcount="2" mmedrowcount="3" mmedelementsize="8"/>"#;
    let elements = parse_embedded_data(xml).expect("parse");
    assert_eq!(elements[0].address, 32_512);
    assert_eq!(elements[0].element_bytes, 1);
}

#[test]
fn malformed_fragments_do_not_parse() {
    // No EMBEDDEDDATA at all.
    assert!(parse_embedded_data("<XDFTABLE/>").is_none());
    // Missing address.
    assert!(parse_embedded_data(r#"<EMBEDDEDDATA colcount="2" rowcount="3" mmedelementsizebits="16"/>"#).is_none());
    // Non-positive dims.
    assert!(parse_embedded_data(r#"<EMBEDDEDDATA mmedaddress="16" colcount="0" rowcount="3" mmedelementsizebits="16"/>"#).is_none());
    // Unsupported element width.
    assert!(parse_embedded_data(r#"<EMBEDDEDDATA mmedaddress="16" colcount="2" rowcount="3" mmedelementsizebits="24"/>"#).is_none());
}

/// A template recorded at 0x20 whose table drifted down to offset 16: the
/// sweep finds it and rewrites the padded hex address reference.
#[test]
fn drifted_template_is_relocated_with_rewritten_address() {
    let mut bytes = vec![0u8; 16];
    bytes.extend(table_bytes());
    let image = ByteImage::new(bytes);

    let template = template_with_xml(
        r#"<EMBEDDEDDATA mmedaddress="0x00000020" mmedcolcount="2" mmedrowcount="3" mmedelementsizebits="16"/>"#,
    );
    let rescanner = TemplateRescanner::new(16, 2);
    let relocated = rescanner.rescan(&image, &[template], &BTreeMap::new());

    assert_eq!(relocated.len(), 1);
    let xml = relocated.get(&16).expect("relocated to 16");
    assert!(xml.contains("0x000010"), "rewritten: {xml}");
    assert!(!xml.contains("0x00000020"));
}

/// With a zero search range a template that still points at a plausible
/// region relocates to its own address.
#[test]
fn zero_search_range_is_a_no_op_relocation() {
    let mut bytes = vec![0u8; 32];
    bytes.extend(table_bytes());
    let image = ByteImage::new(bytes);

    let template = template_with_xml(
        r#"<EMBEDDEDDATA mmedaddress="0x20" mmedcolcount="2" mmedrowcount="3" mmedelementsizebits="16"/>"#,
    );
    let rescanner = TemplateRescanner::new(0, 2);
    let relocated = rescanner.rescan(&image, &[template], &BTreeMap::new());

    assert_eq!(relocated.len(), 1);
    let xml = relocated.get(&32).expect("pinned at its own address");
    assert!(xml.contains("0x000020"), "rewritten: {xml}");
}

/// Decimal address references are rewritten in decimal.
#[test]
fn decimal_addresses_are_rewritten_in_decimal() {
    let mut bytes = vec![0u8; 24];
    bytes.extend(table_bytes());
    let image = ByteImage::new(bytes);

    let template = template_with_xml(
        r#"<EMBEDDEDDATA mmedaddress="32" mmedcolcount="2" mmedrowcount="3" mmedelementsizebits="16"/>"#,
    );
    let rescanner = TemplateRescanner::new(8, 2);
    let relocated = rescanner.rescan(&image, &[template], &BTreeMap::new());

    let xml = relocated.get(&24).expect("relocated to 24");
    assert!(xml.contains(r#"mmedaddress="24""#), "rewritten: {xml}");
}

/// Offsets already pinned by the caller are skipped, including overlaps.
#[test]
fn known_regions_are_not_reclaimed() {
    let mut bytes = vec![0u8; 16];
    bytes.extend(table_bytes());
    let image = ByteImage::new(bytes);

    let template = template_with_xml(
        r#"<EMBEDDEDDATA mmedaddress="0x20" mmedcolcount="2" mmedrowcount="3" mmedelementsizebits="16"/>"#,
    );
    let known: BTreeMap<usize, String> = [(16usize, "<pinned/>".to_string())].into_iter().collect();
    let rescanner = TemplateRescanner::new(16, 2);

    assert!(rescanner.rescan(&image, &[template], &known).is_empty());
}

/// Signed 8-bit templates decode through the signed path and still relocate.
#[test]
fn signed_byte_template_relocates() {
    let mut bytes = vec![0u8; 8];
    bytes.extend([0x80u8, 0x7F, 0x00, 0x10, 0xF0, 0x20]);
    let image = ByteImage::new(bytes);

    let template = Template {
        datatype: Some(TemplateDatatype::Signed),
        raw_xml: r#"<EMBEDDEDDATA mmedaddress="8" colcount="2" rowcount="3" mmedelementsizebits="8"/>"#
            .to_string(),
        ..Template::default()
    };
    let rescanner = TemplateRescanner::new(0, 2);
    let relocated = rescanner.rescan(&image, &[template], &BTreeMap::new());
    assert!(relocated.contains_key(&8));
}

/// Pointer-table magnitudes fail the plausibility mean bound.
#[test]
fn pointer_tables_are_rejected() {
    // Six u32 values around 0x00800000 (8.4M) look like a pointer run.
    let mut bytes = Vec::new();
    for value in [0x0080_0000u32, 0x0080_0010, 0x0080_0020, 0x0080_0030, 0x0080_0040, 0x0080_0050]
    {
        bytes.extend(value.to_le_bytes());
    }
    let image = ByteImage::new(bytes);

    let template = template_with_xml(
        r#"<EMBEDDEDDATA mmedaddress="0" colcount="2" rowcount="3" mmedelementsizebits="32"/>"#,
    );
    let rescanner = TemplateRescanner::new(0, 2);
    assert!(rescanner.rescan(&image, &[template], &BTreeMap::new()).is_empty());
}

/// A malformed template never aborts the rescan of the others.
#[test]
fn malformed_templates_are_skipped_not_fatal() {
    let mut bytes = vec![0u8; 16];
    bytes.extend(table_bytes());
    let image = ByteImage::new(bytes);

    let broken = template_with_xml(r#"<EMBEDDEDDATA colcount="2" rowcount="3"/>"#);
    let good = template_with_xml(
        r#"<EMBEDDEDDATA mmedaddress="0x10" mmedcolcount="2" mmedrowcount="3" mmedelementsizebits="16"/>"#,
    );
    let rescanner = TemplateRescanner::new(0, 2);
    let relocated = rescanner.rescan(&image, &[broken, good], &BTreeMap::new());

    assert_eq!(relocated.len(), 1);
    assert!(relocated.contains_key(&16));
}

/// `rescan_detailed` keeps the source template attached to each hit.
#[test]
fn detailed_hits_carry_their_template() {
    let mut bytes = vec![0u8; 16];
    bytes.extend(table_bytes());
    let image = ByteImage::new(bytes);

    let template = Template {
        title: Some("Injector base".to_string()),
        units: Some("ms".to_string()),
        raw_xml: r#"<EMBEDDEDDATA mmedaddress="0x10" mmedcolcount="2" mmedrowcount="3" mmedelementsizebits="16"/>"#
            .to_string(),
        ..Template::default()
    };
    let templates = vec![template];
    let rescanner = TemplateRescanner::new(0, 2);
    let hits = rescanner.rescan_detailed(&image, &templates, &BTreeMap::new());

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].new_offset, 16);
    assert_eq!(hits[0].template.units.as_deref(), Some("ms"));
}
