use std::path::Path;

use super::*;

const VALID: &str = r#"
sources:
  - id: quickbasket
    name: QuickBasket
    priority: 2
    search_url: "https://quickbasket.example/s?q={query}&lat={lat}&lon={lon}"
    extractor: next_data
  - id: freshmart
    name: FreshMart
    priority: 1
    search_url: "https://freshmart.example/search?q={query}"
    extractor: json_ld
"#;

#[test]
fn parse_sources_accepts_valid_registry() {
    let file = parse_sources(VALID).expect("valid registry");
    assert_eq!(file.sources.len(), 2);
    assert_eq!(file.sources[0].extractor, ExtractorKind::NextData);
    assert_eq!(file.sources[1].extractor, ExtractorKind::JsonLd);
}

#[test]
fn entries_are_listed_in_priority_order() {
    let file = parse_sources(VALID).unwrap();
    let ids: Vec<&str> = file.by_priority().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["freshmart", "quickbasket"]);
}

#[test]
fn rejects_empty_registry() {
    let err = parse_sources("sources: []").unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("at least one")));
}

#[test]
fn rejects_duplicate_ids() {
    let yaml = r#"
sources:
  - id: freshmart
    name: FreshMart
    priority: 1
    search_url: "https://a.example/?q={query}"
    extractor: json_ld
  - id: freshmart
    name: FreshMart Again
    priority: 2
    search_url: "https://b.example/?q={query}"
    extractor: json_ld
"#;
    let err = parse_sources(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate source id")));
}

#[test]
fn rejects_duplicate_priorities() {
    let yaml = r#"
sources:
  - id: alpha
    name: Alpha
    priority: 1
    search_url: "https://a.example/?q={query}"
    extractor: json_ld
  - id: beta
    name: Beta
    priority: 1
    search_url: "https://b.example/?q={query}"
    extractor: json_ld
"#;
    let err = parse_sources(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("priority")));
}

#[test]
fn rejects_template_without_query_placeholder() {
    let yaml = r#"
sources:
  - id: alpha
    name: Alpha
    priority: 1
    search_url: "https://a.example/search"
    extractor: json_ld
"#;
    let err = parse_sources(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("{query}")));
}

#[test]
fn rejects_relative_template() {
    let yaml = r#"
sources:
  - id: alpha
    name: Alpha
    priority: 1
    search_url: "/search?q={query}"
    extractor: json_ld
"#;
    assert!(parse_sources(yaml).is_err());
}

#[test]
fn rejects_invalid_source_id() {
    let yaml = r#"
sources:
  - id: "Fresh Mart"
    name: FreshMart
    priority: 1
    search_url: "https://a.example/?q={query}"
    extractor: json_ld
"#;
    assert!(matches!(
        parse_sources(yaml),
        Err(ConfigError::SourcesFileParse(_))
    ));
}

#[test]
fn rejects_unknown_extractor() {
    let yaml = r#"
sources:
  - id: alpha
    name: Alpha
    priority: 1
    search_url: "https://a.example/?q={query}"
    extractor: xpath
"#;
    assert!(matches!(
        parse_sources(yaml),
        Err(ConfigError::SourcesFileParse(_))
    ));
}

#[test]
fn load_sources_reports_missing_file() {
    let err = load_sources(Path::new("/nonexistent/sources.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::SourcesFileIo { .. }));
}
