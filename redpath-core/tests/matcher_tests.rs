use redpath_core::{MatchError, PropertyMatcher, parse_path};

fn matcher(paths: &[&str]) -> PropertyMatcher {
    PropertyMatcher::new(paths.iter().map(|p| parse_path(p).unwrap()).collect())
}

#[test]
fn bare_key_captures_odata_id() {
    let mut m = matcher(&["Chassis"]);
    m.write(br#"{"Chassis":{"@odata.id":"/redfish/v1/Chassis"}}"#)
        .unwrap();
    let out = m.release();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].value, "/redfish/v1/Chassis");
    assert_eq!(out[0].path, parse_path("Chassis").unwrap());
}

#[test]
fn wildcard_head_captures_collection_uri() {
    let mut m = matcher(&["Chassis[*]/Sensors"]);
    m.write(br#"{"Chassis":{"@odata.id":"/redfish/v1/Chassis"}}"#)
        .unwrap();
    assert_eq!(m.release()[0].value, "/redfish/v1/Chassis");
}

#[test]
fn match_works_at_depth() {
    // The rule is a suffix match on the running key, so a head key found
    // deeper in the document still hits.
    let mut m = matcher(&["Chassis"]);
    m.write(br#"{"Links":{"Chassis":{"@odata.id":"/deep"}}}"#)
        .unwrap();
    assert_eq!(m.release()[0].value, "/deep");
}

#[test]
fn unrelated_keys_do_not_match() {
    let mut m = matcher(&["Chassis"]);
    m.write(br#"{"Systems":{"@odata.id":"/redfish/v1/Systems"},"Chassis":"plain"}"#)
        .unwrap();
    assert_eq!(m.release()[0].value, "");
}

#[test]
fn first_bare_name_hit_stops_the_scan() {
    let mut m = matcher(&["Chassis", "Chassis"]);
    m.write(br#"{"Chassis":{"@odata.id":"/c"}}"#).unwrap();
    let out = m.release();
    assert_eq!(out[0].value, "/c");
    assert_eq!(out[1].value, "", "scan stops at the first bare-name hit");
}

#[test]
fn filtered_head_records_without_stopping() {
    let mut m = matcher(&["Chassis[*]", "Chassis[*]"]);
    m.write(br#"{"Chassis":{"@odata.id":"/c"}}"#).unwrap();
    let out = m.release();
    assert_eq!(out[0].value, "/c");
    assert_eq!(out[1].value, "/c");
}

#[test]
fn non_string_scalars_are_captured_textually() {
    let mut m = matcher(&["Count", "Enabled", "Absent"]);
    m.write(br#"{"Count":{"@odata.id":7},"Enabled":{"@odata.id":true},"Absent":{"@odata.id":null}}"#)
        .unwrap();
    let out = m.release();
    assert_eq!(out[0].value, "7");
    assert_eq!(out[1].value, "true");
    assert_eq!(out[2].value, "null");
}

#[test]
fn later_hit_overwrites_earlier_value() {
    // Two containers both end in Chassis/@odata.id; the scan stop on a
    // bare-name hit is per scalar event, so a later event still
    // overwrites the recorded value.
    let doc = br#"{"A":{"Chassis":{"@odata.id":"/one"}},"B":{"Chassis":{"@odata.id":"/two"}}}"#;
    let mut m = matcher(&["Chassis"]);
    m.write(doc).unwrap();
    assert_eq!(m.release()[0].value, "/two");
}

#[test]
fn arrays_do_not_push_key_segments() {
    // Scalars inside an array each pop a segment the array never pushed,
    // eroding the parent key; nothing after the array can match at its
    // original depth. The walk must still complete cleanly.
    let mut m = matcher(&["Chassis"]);
    m.write(br#"{"Ids":[1,2,3],"Chassis":{"@odata.id":"/c"}}"#)
        .unwrap();
    assert_eq!(m.release()[0].value, "");
}

#[test]
fn trailing_bytes_report_extra_data() {
    let mut m = matcher(&["Chassis"]);
    let err = m.write(br#"{"Chassis":{"@odata.id":"/c"}}{"again":1}"#).unwrap_err();
    assert!(matches!(err, MatchError::ExtraData));
}

#[test]
fn parse_error_keeps_entries_recorded_so_far() {
    let mut m = matcher(&["Chassis"]);
    let err = m.write(br#"{"Chassis":{"@odata.id":"/c"}, !garbage"#);
    assert!(matches!(err, Err(MatchError::Parse(_))));
    assert_eq!(m.release()[0].value, "/c");
}

#[test]
fn comments_are_rejected() {
    let mut m = matcher(&["Chassis"]);
    assert!(m.write(b"// comment\n{}").is_err());
}

#[test]
fn empty_document_matches_nothing() {
    let mut m = matcher(&["Chassis"]);
    m.write(b"{}").unwrap();
    assert_eq!(m.release()[0].value, "");
}
