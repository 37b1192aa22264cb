use redpath_core::{KeyFilter, Path, PathComponent, parse_path};

fn name(s: &str) -> PathComponent {
    PathComponent::Name(s.to_string())
}

fn wildcard(s: &str) -> PathComponent {
    PathComponent::Filter(KeyFilter {
        key: s.to_string(),
        filter: '*',
    })
}

// ── Parsing ────────────────────────────────────────────────────────────

#[test]
fn parse_bare_key() {
    assert_eq!(
        parse_path("Chassis").unwrap(),
        Path {
            first: name("Chassis"),
            filters: vec![],
        }
    );
}

#[test]
fn parse_wildcard_filter() {
    assert_eq!(
        parse_path("Chassis[*]").unwrap(),
        Path {
            first: wildcard("Chassis"),
            filters: vec![],
        }
    );
}

#[test]
fn parse_compound() {
    assert_eq!(
        parse_path("Chassis[*]/Sensors").unwrap(),
        Path {
            first: wildcard("Chassis"),
            filters: vec![name("Sensors")],
        }
    );
}

#[test]
fn parse_deep_compound() {
    assert_eq!(
        parse_path("Systems[*]/Processors[*]/Name").unwrap(),
        Path {
            first: wildcard("Systems"),
            filters: vec![wildcard("Processors"), name("Name")],
        }
    );
}

#[test]
fn key_names_allow_digits_after_first() {
    assert_eq!(
        parse_path("Dimm0/Status").unwrap(),
        Path {
            first: name("Dimm0"),
            filters: vec![name("Status")],
        }
    );
}

// ── Round trip ─────────────────────────────────────────────────────────

#[test]
fn to_string_round_trips() {
    for expr in [
        "Chassis",
        "Chassis[*]",
        "Chassis[*]/Sensors",
        "Systems[*]/Processors[*]/Name",
        "Members[*]/Sensors",
    ] {
        assert_eq!(parse_path(expr).unwrap().to_string(), expr);
    }
}

// ── Ordering and equality ──────────────────────────────────────────────

#[test]
fn paths_are_totally_ordered() {
    let alpha = parse_path("Alpha").unwrap();
    let beta = parse_path("Beta").unwrap();
    assert!(alpha < beta);
    assert_eq!(alpha, parse_path("Alpha").unwrap());

    // A bare name orders before a filter on the same key.
    assert!(parse_path("Chassis").unwrap() < parse_path("Chassis[*]").unwrap());
}

// ── strip_parent ───────────────────────────────────────────────────────

#[test]
fn strip_parent_substitutes_members_for_wildcard_head() {
    let stripped = parse_path("Chassis[*]/Sensors").unwrap().strip_parent().unwrap();
    assert_eq!(
        stripped,
        Path {
            first: wildcard("Members"),
            filters: vec![name("Sensors")],
        }
    );

    let again = stripped.strip_parent().unwrap();
    assert_eq!(
        again,
        Path {
            first: name("Sensors"),
            filters: vec![],
        }
    );
}

#[test]
fn strip_parent_members_head_falls_through_to_drop() {
    // A head already named Members takes the drop-head branch directly.
    let stripped = parse_path("Members[*]/Sensors").unwrap().strip_parent().unwrap();
    assert_eq!(
        stripped,
        Path {
            first: name("Sensors"),
            filters: vec![],
        }
    );
}

#[test]
fn strip_parent_name_head_drops_and_shifts() {
    let stripped = parse_path("Chassis/Thermal/Fans").unwrap().strip_parent().unwrap();
    assert_eq!(
        stripped,
        Path {
            first: name("Thermal"),
            filters: vec![name("Fans")],
        }
    );
}

#[test]
fn strip_parent_without_tail_is_none() {
    assert!(parse_path("Chassis").unwrap().strip_parent().is_none());
    assert!(parse_path("Chassis[*]").unwrap().strip_parent().is_none());
}
