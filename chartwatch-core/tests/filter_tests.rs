//! Kind/name matching rules and the two filter shapes.

use chartwatch_core::{Document, FilterConfig, FilterEntry, FilterError, FilterSpec};
use rstest::rstest;

fn entry(flag: &str) -> FilterEntry {
    flag.parse::<FilterConfig>()
        .and_then(|config| config.compile())
        .expect("entry")
}

fn doc(yaml: &str) -> Document {
    Document::from_value(serde_yaml::from_str(yaml).expect("yaml")).expect("document")
}

fn deployment(name: &str) -> Document {
    doc(&format!(
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {name}\n"
    ))
}

fn service(name: &str) -> Document {
    doc(&format!("apiVersion: v1\nkind: Service\nmetadata:\n  name: {name}\n"))
}

// ---------------------------------------------------------------------------
// 1. Single entry
// ---------------------------------------------------------------------------

#[rstest]
#[case("deployment", ".*", "web", true)]
#[case("Deployment", ".*", "web", true)]
#[case("DEPLOYMENT", "web", "web", true)]
#[case("deployment", "eb", "web", true)]
#[case("deployment", "^eb", "web", false)]
#[case("deployment", "^web$", "web-canary", false)]
#[case("service", ".*", "web", false)]
fn entry_matches_kind_case_insensitively_and_name_by_search(
    #[case] kind: &str,
    #[case] pattern: &str,
    #[case] name: &str,
    #[case] expected: bool,
) {
    let entry = FilterEntry::new(kind, pattern).expect("entry");
    assert_eq!(entry.matches(&deployment(name)).expect("named"), expected);
}

#[test]
fn document_kind_is_lowercased_before_comparison() {
    let entry = FilterEntry::any_name("statefulset").expect("entry");
    let doc = doc("apiVersion: apps/v1\nkind: StatefulSet\nmetadata:\n  name: db\n");
    assert!(entry.matches(&doc).expect("named"));
}

#[test]
fn kind_filter_selects_only_the_deployment() {
    let spec = FilterSpec::single("deployment", ".*").expect("spec");
    assert_eq!(spec.select(&deployment("web")).expect("named"), vec![0]);
    assert!(spec.select(&service("web-svc")).expect("named").is_empty());
}

// ---------------------------------------------------------------------------
// 2. Multiple entries
// ---------------------------------------------------------------------------

#[test]
fn overlapping_entries_select_twice() {
    let spec = FilterSpec::new(vec![
        FilterEntry::new("deployment", "^web$").expect("exact"),
        FilterEntry::new("deployment", ".*").expect("any"),
    ])
    .expect("spec");
    assert_eq!(spec.select(&deployment("web")).expect("named"), vec![0, 1]);
    assert_eq!(spec.select(&deployment("api")).expect("named"), vec![1]);
}

#[test]
fn mixed_kinds_select_independently() {
    let spec = FilterSpec::new(vec![
        entry("deployment=^web"),
        entry("service"),
    ])
    .expect("spec");
    assert_eq!(spec.select(&service("anything")).expect("named"), vec![1]);
    assert_eq!(spec.select(&deployment("web-1")).expect("named"), vec![0]);
    assert!(spec.select(&deployment("api")).expect("named").is_empty());
    assert_eq!(spec.to_string(), "deployment/^web, service/.*");
}

// ---------------------------------------------------------------------------
// 3. Missing names
// ---------------------------------------------------------------------------

#[test]
fn unnamed_document_fails_only_when_its_kind_is_selected() {
    let unnamed = doc("apiVersion: v1\nkind: ConfigMap\ndata: {}\n");

    let other = FilterSpec::single("deployment", ".*").expect("spec");
    assert!(other.select(&unnamed).expect("kind does not match").is_empty());

    let selecting = FilterSpec::single("configmap", ".*").expect("spec");
    let err = selecting.select(&unnamed).unwrap_err();
    assert_eq!(err.kind, "ConfigMap");
    assert!(err.to_string().contains("metadata.name"), "got: {err}");
}

// ---------------------------------------------------------------------------
// 4. Parsing and validation
// ---------------------------------------------------------------------------

#[rstest]
#[case("deployment=^web$", "deployment", "^web$")]
#[case("Service", "service", ".*")]
#[case("pod=", "pod", ".*")]
#[case("configmap=a=b", "configmap", "a=b")]
fn entry_parses_kind_and_optional_pattern(
    #[case] input: &str,
    #[case] kind: &str,
    #[case] pattern: &str,
) {
    let parsed = entry(input);
    assert_eq!(parsed.kind(), kind);
    assert_eq!(parsed.pattern(), pattern);
}

#[test]
fn empty_kind_is_rejected() {
    let err = "=web".parse::<FilterConfig>().unwrap_err();
    assert!(matches!(err, FilterError::EmptyKind { .. }), "got: {err}");
}

#[test]
fn invalid_pattern_is_rejected_with_context() {
    let err = FilterEntry::new("deployment", "web(").unwrap_err();
    assert!(matches!(err, FilterError::InvalidPattern { .. }), "got: {err}");
    assert!(err.to_string().contains("web("));
}

#[test]
fn empty_spec_is_rejected() {
    assert!(matches!(FilterSpec::new(vec![]), Err(FilterError::NoEntries)));
}
