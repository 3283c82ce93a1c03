use super::*;

// =============================================================================
// normalize_route
// =============================================================================

#[test]
fn normalize_route_keeps_root() {
    assert_eq!(normalize_route("/"), "/");
}

#[test]
fn normalize_route_empty_is_root() {
    assert_eq!(normalize_route(""), "/");
    assert_eq!(normalize_route("   "), "/");
}

#[test]
fn normalize_route_strips_trailing_slash() {
    assert_eq!(normalize_route("/dashboard/"), "/dashboard");
}

#[test]
fn normalize_route_strips_query_and_fragment() {
    assert_eq!(normalize_route("/leads?page=2"), "/leads");
    assert_eq!(normalize_route("/leads#top"), "/leads");
    assert_eq!(normalize_route("/login/?next=/leads#x"), "/login");
}

#[test]
fn normalize_route_adds_leading_slash() {
    assert_eq!(normalize_route("dashboard"), "/dashboard");
}

#[test]
fn normalize_route_query_only_is_root() {
    assert_eq!(normalize_route("?ref=home"), "/");
}

#[test]
fn normalize_route_collapses_repeated_slashes() {
    assert_eq!(normalize_route("//dashboard///leads//"), "/dashboard/leads");
}

#[test]
fn normalize_route_resolves_dot_segments() {
    assert_eq!(normalize_route("/auth/../dashboard"), "/dashboard");
    assert_eq!(normalize_route("/a//b/./c/"), "/a/b/c");
    assert_eq!(normalize_route("/leads/./"), "/leads");
}

#[test]
fn normalize_route_parent_never_climbs_above_root() {
    assert_eq!(normalize_route("/.."), "/");
    assert_eq!(normalize_route("/../../login"), "/login");
}

#[test]
fn normalize_route_resolves_percent_encoded_dots() {
    assert_eq!(normalize_route("/auth/%2e%2e/dashboard"), "/dashboard");
    assert_eq!(normalize_route("/auth/%2E./dashboard"), "/dashboard");
    assert_eq!(normalize_route("/auth/%2e/login"), "/auth/login");
}

#[test]
fn normalize_route_keeps_dots_inside_names() {
    assert_eq!(normalize_route("/files/report.v2"), "/files/report.v2");
    assert_eq!(normalize_route("/.well-known"), "/.well-known");
}

// =============================================================================
// RouteSet
// =============================================================================

#[test]
fn route_set_parse_ignores_blank_entries() {
    let set = RouteSet::parse(" /, ,/login ,");
    assert!(set.contains("/"));
    assert!(set.contains("/login"));
    assert!(!set.contains("/dashboard"));
}

#[test]
fn route_set_exact_match_normalizes_input() {
    let set = RouteSet::parse("/login");
    assert!(set.contains("/login/"));
    assert!(set.contains("/login?next=%2Fleads"));
}

#[test]
fn route_set_exact_entry_does_not_cover_children() {
    let set = RouteSet::parse("/login");
    assert!(!set.contains("/login/extra"));
}

#[test]
fn route_set_prefix_entry_matches_subtree() {
    let set = RouteSet::parse("/auth/*");
    assert!(set.contains("/auth"));
    assert!(set.contains("/auth/login"));
    assert!(set.contains("/auth/facebook/callback"));
}

#[test]
fn route_set_prefix_requires_segment_boundary() {
    let set = RouteSet::parse("/auth/*");
    assert!(!set.contains("/authors"));
}

#[test]
fn route_set_prefix_cannot_be_escaped_with_dot_segments() {
    let set = RouteSet::parse("/auth/*");
    assert!(!set.contains("/auth/../dashboard"));
    assert!(!set.contains("/auth/%2e%2e/dashboard"));
    assert!(!set.contains("/auth/./../leads"));
    assert!(set.contains("/auth/./callback"));
}

#[test]
fn route_set_root_prefix_matches_everything() {
    let set = RouteSet::parse("/*");
    assert!(set.contains("/dashboard"));
    assert!(set.contains("/"));
}

#[test]
fn route_set_empty() {
    let set = RouteSet::parse("");
    assert!(set.is_empty());
    assert!(!set.contains("/"));
}

#[test]
fn route_set_insert_adds_entry() {
    let mut set = RouteSet::new();
    set.insert("/privacy/");
    assert!(set.contains("/privacy"));
    assert!(!set.is_empty());
}
