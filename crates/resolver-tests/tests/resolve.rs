//! End-to-end resolver scenarios (spec.md §8, S1 and S4).

use resolver_tests::{dep_req, pkg_at, pkg_dep_at, registry, resolve};

use pkgresolve::pins::PinState;
use pkgresolve::reconciler::{MemoryCheckouts, Reconciler};
use pkgresolve::reference::PackageReference;
use pkgresolve::resolver::CancellationToken;

#[test]
fn s1_reconciler_persists_a_pin_for_a_previously_unpinned_package() {
    let reg = registry(vec![pkg_at("foo", "1.0.0"), pkg_at("foo", "1.0.2")]);
    let dir = tempfile::tempdir().unwrap();
    let pins_path = dir.path().join("pins.json");
    let checkouts = MemoryCheckouts::default();
    let foo = pkgresolve::identity::PackageIdentity::from_raw("foo");
    let roots = vec![(PackageReference::Registry { identity: foo.clone() }, dep_req("foo", "^1.0.0").1)];
    let mut reconciler = Reconciler::new(&pins_path, pkgresolve::mirrors::Mirrors::new(), &reg, &checkouts, roots);

    reconciler.load().unwrap();
    reconciler.resolve(&CancellationToken::new()).unwrap();
    reconciler.apply().unwrap();

    let pin = reconciler.pins().get(&foo).expect("foo should be pinned after apply");
    match &pin.state {
        PinState::Version { version, .. } => assert_eq!(version.to_string(), "1.0.2"),
        other => panic!("expected a version pin, got {other:?}"),
    }
}

#[test]
fn s1_basic_pin_round_trip_picks_highest_satisfying_version() {
    let reg = registry(vec![pkg_at("foo", "1.0.0"), pkg_at("foo", "1.0.2")]);
    let solution = resolve(vec![dep_req("foo", "^1.0.0")], &reg).unwrap();
    assert_eq!(solution.decided.len(), 1);
    let (identity, decision) = &solution.decided[0];
    assert_eq!(identity.as_str(), "foo");
    match decision {
        pkgresolve::resolver::Decision::Version(v) => assert_eq!(v.to_string(), "1.0.2"),
        other => panic!("expected a version decision, got {other:?}"),
    }
}

#[test]
fn s4_conflicting_transitive_requirements_are_unsatisfiable() {
    let reg = registry(vec![
        pkg_dep_at("a", "1.0.0", vec![dep_req("c", "^1.0.0")]),
        pkg_dep_at("b", "1.0.0", vec![dep_req("c", "^2.0.0")]),
        pkg_at("c", "1.0.0"),
        pkg_at("c", "2.0.0"),
    ]);
    let err = resolve(vec![dep_req("a", "^1.0.0"), dep_req("b", "^1.0.0")], &reg).unwrap_err();
    match err {
        pkgresolve::ResolverError::Unsatisfiable { derivation } => {
            assert!(derivation.contains('a'), "derivation should mention 'a': {derivation}");
            assert!(derivation.contains('b'), "derivation should mention 'b': {derivation}");
        }
        other => panic!("expected Unsatisfiable, got {other:?}"),
    }
}
