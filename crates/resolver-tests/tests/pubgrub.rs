//! Exercises the PubGrub-style solver end to end, styled after the
//! teacher's `tests/pubgrub.rs` but scaled to this resolver's fixtures.

use resolver_tests::{dep, dep_req, pkg, pkg_dep, registry, resolve, resolve_and_validated, sat::SatResolver};

#[test]
fn picks_highest_satisfying_version() {
    let reg = registry(vec![
        resolver_tests::pkg_at("foo", "1.0.0"),
        resolver_tests::pkg_at("foo", "1.0.2"),
    ]);
    let mut sat_resolver = SatResolver::new(&reg);
    let solution = resolve_and_validated(vec![dep_req("foo", "^1.0.0")], &reg, &mut sat_resolver).unwrap();
    assert_eq!(solution.decided.len(), 1);
}

#[test]
fn shared_transitive_dependency_resolves_to_one_version() {
    let reg = registry(vec![
        resolver_tests::pkg_dep_at("a", "1.0.0", vec![dep_req("c", "^1.0.0")]),
        resolver_tests::pkg_dep_at("b", "1.0.0", vec![dep_req("c", "^1.0.0")]),
        resolver_tests::pkg_at("c", "1.0.0"),
        resolver_tests::pkg_at("c", "1.2.0"),
    ]);
    let mut sat_resolver = SatResolver::new(&reg);
    let result = resolve_and_validated(vec![dep("a"), dep("b")], &reg, &mut sat_resolver);
    assert!(result.is_ok());
}

#[test]
fn unrelated_package_does_not_affect_resolution() {
    let reg = registry(vec![pkg("a"), pkg("unrelated")]);
    let mut sat_resolver = SatResolver::new(&reg);
    assert!(resolve_and_validated(vec![dep("a")], &reg, &mut sat_resolver).is_ok());
}

#[test]
fn renamed_identity_round_trips_case_folding() {
    // Identity is case-folded, so "Foo" and "foo" refer to the same
    // package; this guards against the classifier/resolver boundary
    // silently treating them as distinct.
    let reg = registry(vec![pkg("Foo")]);
    let solution = resolve(vec![dep("foo")], &reg).unwrap();
    assert_eq!(solution.decided[0].0.as_str(), "foo");
}

#[test]
fn missing_package_is_unsatisfiable() {
    let reg = registry(vec![pkg_dep("root", vec![dep("missing")])]);
    let err = resolve(vec![dep("root")], &reg).unwrap_err();
    assert!(matches!(err, pkgresolve::ResolverError::Unsatisfiable { .. }));
}
